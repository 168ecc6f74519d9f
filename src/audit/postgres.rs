//! PostgreSQL audit log
//!
//! This module provides the PostgreSQL-backed implementation of `AuditSink`,
//! for deployments that keep the audit trail on a shared server. The sink is
//! called from blocking threads, so it drives its single connection on a
//! private current-thread runtime.

use crate::audit::traits::{AuditError, AuditResult, AuditSink};
use crate::audit::{AuditRecord, AuditStatus, QueryAuditEntry};
use crate::config::PostgresSettings;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Connection, Executor, Row};
use std::sync::Mutex;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Table, indexes and the triggers that make the table append-only
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS query_audit (
    id BIGSERIAL PRIMARY KEY,
    case_type TEXT NOT NULL,
    case_number TEXT NOT NULL,
    filing_year INTEGER NOT NULL,
    raw_html TEXT,
    status TEXT NOT NULL CHECK (status IN ('success', 'not_found', 'error')),
    error_detail TEXT,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_query_audit_created_at ON query_audit(created_at);
CREATE INDEX IF NOT EXISTS idx_query_audit_case ON query_audit(case_type, case_number, filing_year);

CREATE OR REPLACE FUNCTION query_audit_append_only() RETURNS trigger AS $$
BEGIN
    RAISE EXCEPTION 'query_audit is append-only';
END;
$$ LANGUAGE plpgsql;

DROP TRIGGER IF EXISTS query_audit_no_update ON query_audit;
CREATE TRIGGER query_audit_no_update BEFORE UPDATE ON query_audit
    FOR EACH ROW EXECUTE FUNCTION query_audit_append_only();

DROP TRIGGER IF EXISTS query_audit_no_delete ON query_audit;
CREATE TRIGGER query_audit_no_delete BEFORE DELETE ON query_audit
    FOR EACH ROW EXECUTE FUNCTION query_audit_append_only();
"#;

/// PostgreSQL audit backend
///
/// Connects on first use, not on construction, so a down server only costs
/// failed (logged) audit writes. A connection that reports an error is
/// dropped and the next call reconnects.
pub struct PostgresAuditLog {
    options: PgConnectOptions,
    target: String,
    state: Mutex<Option<Connected>>,
}

struct Connected {
    // Dropped before the runtime it was opened on
    conn: PgConnection,
    runtime: Runtime,
}

impl PostgresAuditLog {
    /// Creates the sink without connecting
    ///
    /// Settings left out are read by the driver from `PGUSER`, `PGPASSWORD`
    /// and `PGDATABASE`.
    pub fn new(settings: &PostgresSettings) -> Self {
        let mut options = PgConnectOptions::new()
            .host(&settings.host)
            .port(settings.port);
        if let Some(database) = &settings.database {
            options = options.database(database);
        }
        if let Some(user) = &settings.user {
            options = options.username(user);
        }
        if let Some(password) = &settings.password {
            options = options.password(password);
        }

        Self {
            options,
            target: format!("{}:{}", settings.host, settings.port),
            state: Mutex::new(None),
        }
    }

    fn connect(&self) -> AuditResult<Connected> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(AuditError::Runtime)?;

        let mut conn = runtime.block_on(async {
            tokio::time::timeout(CONNECT_TIMEOUT, PgConnection::connect_with(&self.options))
                .await
                .map_err(|_| {
                    AuditError::Database(format!("connection to {} timed out", self.target))
                })?
                .map_err(AuditError::from)
        })?;

        runtime.block_on(conn.execute(SCHEMA_SQL))?;
        tracing::debug!("Audit log connected to {}", self.target);

        Ok(Connected { conn, runtime })
    }

    /// Runs `f` on the shared connection, connecting first if needed
    fn with_connection<T>(
        &self,
        f: impl FnOnce(&Runtime, &mut PgConnection) -> Result<T, sqlx::Error>,
    ) -> AuditResult<T> {
        let mut state = self.state.lock().map_err(|_| AuditError::Poisoned)?;

        let mut connected = match state.take() {
            Some(connected) => connected,
            None => self.connect()?,
        };

        let result = f(&connected.runtime, &mut connected.conn)?;
        *state = Some(connected);
        Ok(result)
    }
}

impl AuditSink for PostgresAuditLog {
    fn append(&self, entry: &QueryAuditEntry) -> AuditResult<i64> {
        self.with_connection(|runtime, conn| {
            runtime.block_on(async {
                let row = sqlx::query(
                    "INSERT INTO query_audit
                        (case_type, case_number, filing_year, raw_html, status, error_detail, created_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7)
                     RETURNING id",
                )
                .bind(entry.query.case_type.as_str())
                .bind(entry.query.case_number.as_str())
                .bind(i32::from(entry.query.filing_year))
                .bind(entry.raw_html.as_deref())
                .bind(entry.status.to_db_string())
                .bind(entry.error_detail.as_deref())
                .bind(entry.timestamp)
                .fetch_one(&mut *conn)
                .await?;

                row.try_get::<i64, _>("id")
            })
        })
    }

    fn recent(&self, limit: usize) -> AuditResult<Vec<AuditRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = self.with_connection(|runtime, conn| {
            runtime.block_on(
                sqlx::query(
                    "SELECT id, case_type, case_number, filing_year, raw_html, status, error_detail, created_at
                     FROM query_audit ORDER BY id DESC LIMIT $1",
                )
                .bind(limit)
                .fetch_all(&mut *conn),
            )
        })?;

        rows.iter().map(record_from_row).collect()
    }
}

fn record_from_row(row: &PgRow) -> AuditResult<AuditRecord> {
    let filing_year: i32 = row.try_get("filing_year")?;
    let status: String = row.try_get("status")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(AuditRecord {
        id: row.try_get("id")?,
        case_type: row.try_get("case_type")?,
        case_number: row.try_get("case_number")?,
        filing_year: u16::try_from(filing_year)
            .map_err(|_| AuditError::Database(format!("filing year {} out of range", filing_year)))?,
        raw_html: row.try_get("raw_html")?,
        status: AuditStatus::from_db_string(&status).ok_or(AuditError::UnknownStatus(status))?,
        error_detail: row.try_get("error_detail")?,
        created_at: created_at.to_rfc3339(),
    })
}
