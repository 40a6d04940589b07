//! # LegalEase Common Library
//!
//! Shared code for the LegalEase service and its tooling:
//! - Domain models (documents, analyses, clauses, analytics)
//! - Database initialization
//! - Event types (`LegalEaseEvent`) and the event bus
//! - Configuration loading
//! - Password and token helpers

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod secrets;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
