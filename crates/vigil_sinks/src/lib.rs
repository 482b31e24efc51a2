//! Record sinks: where qualifying findings go to live.
//!
//! Each sink persists `LogRecord`s to a destination behind one trait so
//! the agent loop is indifferent to the backend. A persist failure is an
//! ordinary value the loop interprets (move the artifact to the error
//! stage or not, per policy) - a sink must never take the loop down.

use thiserror::Error;
use vigil_protocol::LogRecord;

mod jsonl;
mod sqlite;

pub use jsonl::JsonlSink;
pub use sqlite::{RecordRow, SqliteSink};

/// Sink operation result type.
pub type Result<T> = std::result::Result<T, SinkError>;

/// Errors returned by sink writes.
#[derive(Error, Debug)]
pub enum SinkError {
    /// SQLite error (connection, statement, ...)
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error (jsonl file, directory creation)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Sink already closed; nothing will be written
    #[error("sink is closed")]
    Closed,
}

/// Persists structured results. One connection held for the lifetime of
/// the loop, reused sequentially across artifacts.
pub trait RecordSink {
    /// Write one record. An `Err` means this record was not persisted;
    /// the sink remains usable for the next one.
    fn persist(&mut self, record: &LogRecord) -> Result<()>;

    /// Release any held connection. Idempotent; `persist` after `close`
    /// returns `SinkError::Closed`.
    fn close(&mut self);
}

impl<T: RecordSink + ?Sized> RecordSink for Box<T> {
    fn persist(&mut self, record: &LogRecord) -> Result<()> {
        (**self).persist(record)
    }

    fn close(&mut self) {
        (**self).close()
    }
}
