//! Database access for legalease-api
//!
//! Runtime `sqlx` queries against the schema created by
//! `legalease_common::db::create_schema`.

pub mod analyses;
pub mod documents;
pub mod sessions;
pub mod users;

pub use analyses::{completed_with_analysis, get_analysis, AnalyzedDocument};
pub use documents::{
    begin_analysis, complete_analysis, count_documents, create_document, delete_document,
    fail_analysis, get_document, list_documents, list_pending, requeue_analysis, reset_interrupted,
    DocumentQuery,
};
pub use sessions::{create_session, delete_session, lookup_session, purge_expired_sessions};
pub use users::{create_user, get_password_hash, get_user_by_email, get_user_by_id};

use legalease_common::Error;
use uuid::Uuid;

/// Parse a stored UUID column
pub(crate) fn parse_guid(column: &str, value: &str) -> legalease_common::Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| Error::Internal(format!("Invalid UUID in {}: {}", column, e)))
}
