//! Audit sink trait and error types

use crate::audit::{AuditRecord, QueryAuditEntry};
use thiserror::Error;

/// Errors that can occur while writing or reading the audit log
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("Failed to start audit runtime: {0}")]
    Runtime(std::io::Error),

    #[error("Failed to start audit writer: {0}")]
    Writer(std::io::Error),

    #[error("Audit connection lock poisoned")]
    Poisoned,

    #[error("Unknown audit status '{0}'")]
    UnknownStatus(String),
}

/// Result type for audit operations
pub type AuditResult<T> = Result<T, AuditError>;

/// Append-only destination for audit entries
///
/// Implementations must never modify or remove an entry once appended.
/// Both methods block; they are called from the audit writer thread or the
/// blocking thread pool, never from an async task.
pub trait AuditSink: Send + Sync {
    /// Appends one entry
    ///
    /// # Returns
    ///
    /// The id assigned to the new entry
    fn append(&self, entry: &QueryAuditEntry) -> AuditResult<i64>;

    /// The most recent `limit` entries, newest first
    fn recent(&self, limit: usize) -> AuditResult<Vec<AuditRecord>>;
}
