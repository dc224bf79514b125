//! Append-only SQLite audit store.
//!
//! A single connection behind a mutex serializes writers; each append is
//! one INSERT and therefore atomic. Nothing in the crate updates or deletes
//! rows once written.

use std::path::Path;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde::Serialize;
use thiserror::Error;

use crate::logic::audit::record::AuditRecord;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS loan_audits (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    decision TEXT NOT NULL,
    probability REAL,
    raw_input TEXT NOT NULL,
    drivers TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_loan_audits_timestamp ON loan_audits(timestamp);
"#;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("audit record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// An audit row as read back from the store.
#[derive(Debug, Clone, Serialize)]
pub struct StoredAudit {
    pub id: i64,
    #[serde(flatten)]
    pub record: AuditRecord,
}

/// Handle to the audit database. Cheap to share behind an `Arc`.
pub struct AuditStore {
    conn: Mutex<Connection>,
}

impl AuditStore {
    /// Opens (creating if needed) the audit database at `path`.
    pub fn open(path: &Path) -> Result<Self, AuditError> {
        Self::initialize(Connection::open(path)?)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, AuditError> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self, AuditError> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Appends one record and returns its row id.
    pub fn append(&self, record: &AuditRecord) -> Result<i64, AuditError> {
        let raw_input = serde_json::to_string(&record.input)?;
        let drivers = serde_json::to_string(&record.drivers)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO loan_audits (timestamp, decision, probability, raw_input, drivers)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![record.timestamp, record.decision, record.probability, raw_input, drivers],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn count(&self) -> Result<u64, AuditError> {
        let conn = self.conn.lock();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM loan_audits", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    /// Reads rows in insertion order. `None` reads everything.
    pub fn fetch(&self, limit: Option<usize>) -> Result<Vec<StoredAudit>, AuditError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, decision, probability, raw_input, drivers
             FROM loan_audits ORDER BY id ASC LIMIT ?1",
        )?;
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map(|n| n as i64).unwrap_or(-1);
        let rows = stmt.query_map(params![limit], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<f64>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut audits = Vec::new();
        for row in rows {
            let (id, timestamp, decision, probability, raw_input, drivers) = row?;
            audits.push(StoredAudit {
                id,
                record: AuditRecord {
                    timestamp,
                    decision,
                    probability,
                    input: serde_json::from_str(&raw_input)?,
                    drivers: serde_json::from_str(&drivers)?,
                },
            });
        }
        Ok(audits)
    }
}
