//! Audit table schema
//!
//! The table is append-only: triggers abort any UPDATE or DELETE, so the log
//! stays trustworthy even if another tool opens the database.

/// SQL schema for the audit database
pub const SCHEMA_SQL: &str = r#"
-- One row per attempted query
CREATE TABLE IF NOT EXISTS query_audit (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    case_type TEXT NOT NULL,
    case_number TEXT NOT NULL,
    filing_year INTEGER NOT NULL,
    raw_html TEXT,
    status TEXT NOT NULL CHECK (status IN ('success', 'not_found', 'error')),
    error_detail TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_query_audit_created ON query_audit(created_at);
CREATE INDEX IF NOT EXISTS idx_query_audit_case
    ON query_audit(case_type, case_number, filing_year);

CREATE TRIGGER IF NOT EXISTS query_audit_no_update
BEFORE UPDATE ON query_audit
BEGIN
    SELECT RAISE(ABORT, 'query_audit is append-only');
END;

CREATE TRIGGER IF NOT EXISTS query_audit_no_delete
BEFORE DELETE ON query_audit
BEGIN
    SELECT RAISE(ABORT, 'query_audit is append-only');
END;
"#;

/// Creates the audit table, indexes and triggers if they do not exist
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}
