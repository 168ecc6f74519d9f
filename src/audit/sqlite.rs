//! SQLite audit log
//!
//! This module provides the SQLite-backed implementation of `AuditSink`.

use crate::audit::schema::initialize_schema;
use crate::audit::traits::{AuditError, AuditResult, AuditSink};
use crate::audit::{AuditRecord, AuditStatus, QueryAuditEntry};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite audit backend
///
/// The connection is shared behind a mutex; every write is a single INSERT.
pub struct SqliteAuditLog {
    conn: Mutex<Connection>,
}

impl SqliteAuditLog {
    /// Opens or creates the audit database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteAuditLog)` - Database opened and schema in place
    /// * `Err(AuditError)` - Failed to open the database
    pub fn new(path: &Path) -> AuditResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;
        tracing::debug!("Audit log opened at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory audit log
    pub fn new_in_memory() -> AuditResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Number of entries in the log
    pub fn count(&self) -> AuditResult<i64> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM query_audit", [], |row| row.get(0))?;
        Ok(count)
    }

    fn lock(&self) -> AuditResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| AuditError::Poisoned)
    }
}

impl AuditSink for SqliteAuditLog {
    fn append(&self, entry: &QueryAuditEntry) -> AuditResult<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO query_audit
                (case_type, case_number, filing_year, raw_html, status, error_detail, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.query.case_type,
                entry.query.case_number,
                entry.query.filing_year,
                entry.raw_html,
                entry.status.to_db_string(),
                entry.error_detail,
                entry.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn recent(&self, limit: usize) -> AuditResult<Vec<AuditRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, case_type, case_number, filing_year, raw_html, status, error_detail, created_at
             FROM query_audit ORDER BY id DESC LIMIT ?1",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u16>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, case_type, case_number, filing_year, raw_html, status, error_detail, created_at) =
                row?;
            let status = AuditStatus::from_db_string(&status)
                .ok_or(AuditError::UnknownStatus(status))?;
            records.push(AuditRecord {
                id,
                case_type,
                case_number,
                filing_year,
                raw_html,
                status,
                error_detail,
                created_at,
            });
        }

        Ok(records)
    }
}
