//! HTTP API handlers for legalease-api

pub mod auth;
pub mod documents;
pub mod health;
pub mod insights;
pub mod language;
pub mod sse;

pub use auth::{auth_routes, CurrentUser};
pub use documents::document_routes;
pub use health::health_routes;
pub use insights::insight_routes;
pub use language::language_routes;
pub use sse::event_stream;
