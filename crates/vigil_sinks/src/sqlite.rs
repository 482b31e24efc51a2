//! SQLite record sink.
//!
//! One row per qualifying finding; the profile-specific detail is stored
//! as its serialized tagged JSON so the schema never chases profile
//! fields. Rows are written once and never updated by the pipeline.

use rusqlite::{params, Connection};
use std::path::Path;
use tracing::{debug, info};
use vigil_protocol::LogRecord;

use crate::{RecordSink, Result, SinkError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS log_records (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    artifact    TEXT NOT NULL,
    captured_at TEXT NOT NULL,
    profile     TEXT NOT NULL,
    label       TEXT NOT NULL,
    confidence  REAL NOT NULL,
    detail      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_log_records_artifact ON log_records(artifact);
";

/// One persisted row, as read back for the `records` CLI command.
#[derive(Debug, Clone)]
pub struct RecordRow {
    pub id: i64,
    pub artifact: String,
    pub captured_at: String,
    pub profile: String,
    pub label: String,
    pub confidence: f64,
    pub detail: String,
}

/// Sink writing to a local SQLite database.
pub struct SqliteSink {
    conn: Option<Connection>,
}

impl SqliteSink {
    /// Open (or create) the database and ensure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        info!(path = %path.display(), "Record database opened");
        Ok(Self { conn: Some(conn) })
    }

    /// In-memory database, for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Some(conn) })
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(SinkError::Closed)
    }

    /// Most recent records, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<RecordRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, artifact, captured_at, profile, label, confidence, detail
             FROM log_records ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(RecordRow {
                id: row.get(0)?,
                artifact: row.get(1)?,
                captured_at: row.get(2)?,
                profile: row.get(3)?,
                label: row.get(4)?,
                confidence: row.get(5)?,
                detail: row.get(6)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Total number of persisted records.
    pub fn record_count(&self) -> Result<i64> {
        let conn = self.conn()?;
        let n = conn.query_row("SELECT COUNT(*) FROM log_records", [], |row| row.get(0))?;
        Ok(n)
    }
}

impl RecordSink for SqliteSink {
    fn persist(&mut self, record: &LogRecord) -> Result<()> {
        let detail = serde_json::to_string(&record.finding.detail)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO log_records (artifact, captured_at, profile, label, confidence, detail)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.artifact,
                record.captured_at.to_rfc3339(),
                record.finding.detail.profile().as_str(),
                record.finding.detail.label(),
                record.finding.confidence,
                detail,
            ],
        )?;
        debug!(artifact = %record.artifact, label = %record.finding.detail.label(), "Record persisted");
        Ok(())
    }

    fn close(&mut self) {
        if self.conn.take().is_some() {
            info!("Record database closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_protocol::{Finding, FindingDetail};

    fn violation_record(artifact: &str, violation: &str, confidence: f64) -> LogRecord {
        LogRecord::new(
            artifact,
            Finding::new(
                FindingDetail::Violation {
                    violation: violation.to_string(),
                    plate: Some("ABCD-12".to_string()),
                    vehicle_color: None,
                    vehicle_make: None,
                    plate_confidence: 0.5,
                },
                confidence,
            ),
        )
    }

    #[test]
    fn test_persist_and_read_back() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        sink.persist(&violation_record("photo1.jpg", "double parked", 0.95))
            .unwrap();
        sink.persist(&violation_record("photo2.jpg", "on sidewalk", 0.8))
            .unwrap();

        assert_eq!(sink.record_count().unwrap(), 2);

        let rows = sink.recent(10).unwrap();
        assert_eq!(rows.len(), 2);
        // Newest first
        assert_eq!(rows[0].artifact, "photo2.jpg");
        assert_eq!(rows[1].artifact, "photo1.jpg");
        assert_eq!(rows[1].profile, "parking");
        assert_eq!(rows[1].label, "double parked");

        // Detail round-trips through the tagged JSON payload.
        let detail: FindingDetail = serde_json::from_str(&rows[1].detail).unwrap();
        assert!(matches!(detail, FindingDetail::Violation { .. }));
    }

    #[test]
    fn test_recent_respects_limit() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        for i in 0..5 {
            sink.persist(&violation_record(&format!("p{i}.jpg"), "double parked", 0.9))
                .unwrap();
        }
        assert_eq!(sink.recent(3).unwrap().len(), 3);
    }

    #[test]
    fn test_close_is_idempotent_and_final() {
        let mut sink = SqliteSink::open_in_memory().unwrap();
        sink.close();
        sink.close();
        let err = sink
            .persist(&violation_record("p.jpg", "double parked", 0.9))
            .unwrap_err();
        assert!(matches!(err, SinkError::Closed));
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("records.sqlite3");
        let mut sink = SqliteSink::open(&path).unwrap();
        sink.persist(&violation_record("p.jpg", "bike lane", 0.9))
            .unwrap();
        sink.close();
        assert!(path.is_file());

        // Reopen and see the same data.
        let sink = SqliteSink::open(&path).unwrap();
        assert_eq!(sink.record_count().unwrap(), 1);
    }
}
