//! Query audit log
//!
//! Every attempted query is appended here with the raw HTML the portal
//! returned, the outcome and a timestamp. Invalid input, failures and
//! abandoned queries are recorded too. Nothing in this module can change
//! what a search returns: a failed write is logged and swallowed.
//!
//! # Components
//!
//! - `AuditSink`: the append-only seam
//! - `SqliteAuditLog`: the SQLite implementation (default)
//! - `PostgresAuditLog`: the PostgreSQL implementation
//! - `QueryAuditLogger`: queues entries for a dedicated writer thread

mod postgres;
mod schema;
mod sqlite;
mod traits;

pub use postgres::PostgresAuditLog;
pub use sqlite::SqliteAuditLog;
pub use traits::{AuditError, AuditResult, AuditSink};

use crate::config::{AuditBackend, AuditConfig};
use crate::model::CaseQuery;
use crate::SearchError;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Opens the audit store selected by `config`
pub fn open_sink(config: &AuditConfig) -> AuditResult<Arc<dyn AuditSink>> {
    match config.backend() {
        AuditBackend::Sqlite { path } => Ok(Arc::new(SqliteAuditLog::new(&path)?)),
        AuditBackend::Postgres(settings) => Ok(Arc::new(PostgresAuditLog::new(&settings))),
    }
}

/// Outcome of one query attempt, as stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStatus {
    Success,
    NotFound,
    Error,
}

impl AuditStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NotFound => "not_found",
            Self::Error => "error",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "not_found" => Some(Self::NotFound),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// One audit entry to append
#[derive(Debug, Clone)]
pub struct QueryAuditEntry {
    pub query: CaseQuery,
    /// Last portal page received: the submission response, or the search
    /// page when the query failed before submitting
    pub raw_html: Option<String>,
    pub status: AuditStatus,
    /// Failure kind and detail for `AuditStatus::Error`
    pub error_detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl QueryAuditEntry {
    /// Builds the entry for a finished query attempt
    pub fn from_outcome<T>(
        query: CaseQuery,
        raw_html: Option<String>,
        outcome: &Result<T, SearchError>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let (status, error_detail) = match outcome {
            Ok(_) => (AuditStatus::Success, None),
            Err(SearchError::NotFound { .. }) => (AuditStatus::NotFound, None),
            Err(err) => (AuditStatus::Error, Some(format!("{}: {}", err.kind(), err))),
        };

        Self {
            query,
            raw_html,
            status,
            error_detail,
            timestamp,
        }
    }

    /// Builds the entry for a query abandoned before it finished
    pub fn cancelled(query: CaseQuery, raw_html: Option<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            query,
            raw_html,
            status: AuditStatus::Error,
            error_detail: Some("cancelled: search dropped before completion".to_string()),
            timestamp,
        }
    }
}

/// A stored audit entry, as read back for operators
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub id: i64,
    pub case_type: String,
    pub case_number: String,
    pub filing_year: u16,
    pub raw_html: Option<String>,
    pub status: AuditStatus,
    pub error_detail: Option<String>,
    /// RFC 3339 timestamp
    pub created_at: String,
}

enum AuditCommand {
    Append(QueryAuditEntry),
    Flush(oneshot::Sender<()>),
}

/// Queues audit entries for a dedicated writer thread
///
/// `record` never waits on the database, so a slow or unreachable audit
/// store cannot delay a search response. Entries are written in the order
/// they were queued. The writer exits once every clone of the logger has
/// been dropped and the queue is drained.
#[derive(Clone)]
pub struct QueryAuditLogger {
    tx: mpsc::UnboundedSender<AuditCommand>,
}

impl QueryAuditLogger {
    /// Starts the writer thread for `sink`
    pub fn new(sink: Arc<dyn AuditSink>) -> AuditResult<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name("audit-writer".to_string())
            .spawn(move || run_writer(sink, rx))
            .map_err(AuditError::Writer)?;

        Ok(Self { tx })
    }

    /// Queues `entry` and returns immediately
    ///
    /// Write errors are logged by the writer and dropped.
    pub fn record(&self, entry: QueryAuditEntry) {
        if let Err(mpsc::error::SendError(AuditCommand::Append(entry))) =
            self.tx.send(AuditCommand::Append(entry))
        {
            tracing::error!(
                "Audit writer has stopped; entry for {} ({}) dropped",
                entry.query,
                entry.status.to_db_string()
            );
        }
    }

    /// Waits until every entry queued so far has been written or has failed
    pub async fn flush(&self) {
        let (done, finished) = oneshot::channel();
        if self.tx.send(AuditCommand::Flush(done)).is_ok() {
            // An error means the writer is gone, which leaves nothing to wait for
            let _ = finished.await;
        }
    }
}

impl std::fmt::Debug for QueryAuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryAuditLogger").finish_non_exhaustive()
    }
}

fn run_writer(sink: Arc<dyn AuditSink>, mut rx: mpsc::UnboundedReceiver<AuditCommand>) {
    while let Some(command) = rx.blocking_recv() {
        match command {
            AuditCommand::Append(entry) => match sink.append(&entry) {
                Ok(id) => tracing::debug!(
                    "Audit entry {} written for {} ({})",
                    id,
                    entry.query,
                    entry.status.to_db_string()
                ),
                Err(e) => {
                    tracing::error!("Failed to write audit entry for {}: {}", entry.query, e)
                }
            },
            AuditCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    tracing::debug!("Audit writer stopped");
}
