//! Database access for Takt
//!
//! SQLite via sqlx. Schema is created idempotently at startup; all primary
//! keys are TEXT UUIDs (`guid` columns).

pub mod candidates;
pub mod catalog;
pub mod init;
pub mod models;
pub mod recordings;
pub mod selections;

pub use init::{init_database, init_schema};

/// Parse a TEXT guid column into a Uuid; a malformed value means the row was
/// written outside this codebase
pub(crate) fn parse_guid(value: &str) -> crate::Result<uuid::Uuid> {
    uuid::Uuid::parse_str(value)
        .map_err(|e| crate::Error::Internal(format!("malformed guid in database: {}", e)))
}
