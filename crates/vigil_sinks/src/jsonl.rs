//! JSON-lines record sink, for runs without a database.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::info;
use vigil_protocol::LogRecord;

use crate::{RecordSink, Result, SinkError};

/// Appends one serialized `LogRecord` per line.
pub struct JsonlSink {
    file: Option<File>,
}

impl JsonlSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        info!(path = %path.display(), "Record log opened");
        Ok(Self { file: Some(file) })
    }
}

impl RecordSink for JsonlSink {
    fn persist(&mut self, record: &LogRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        let file = self.file.as_mut().ok_or(SinkError::Closed)?;
        writeln!(file, "{}", line)?;
        // Flush per record: the loop is low volume and a crash must not
        // lose an acknowledged write.
        file.flush()?;
        Ok(())
    }

    fn close(&mut self) {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_protocol::{Finding, FindingDetail};

    #[test]
    fn test_appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");

        let mut sink = JsonlSink::open(&path).unwrap();
        for name in ["breakfast.jpg", "lunch.jpg"] {
            sink.persist(&LogRecord::new(
                name,
                Finding::new(
                    FindingDetail::FoodItem {
                        name: "oatmeal".to_string(),
                        portion: Some("1 bowl".to_string()),
                        nutrition: None,
                    },
                    0.9,
                ),
            ))
            .unwrap();
        }
        sink.close();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let back: LogRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(back.artifact, "breakfast.jpg");
    }

    #[test]
    fn test_persist_after_close_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonlSink::open(dir.path().join("r.jsonl")).unwrap();
        sink.close();
        sink.close();
        let err = sink
            .persist(&LogRecord::new(
                "p.jpg",
                Finding::new(
                    FindingDetail::FoodItem {
                        name: "apple".to_string(),
                        portion: None,
                        nutrition: None,
                    },
                    0.5,
                ),
            ))
            .unwrap_err();
        assert!(matches!(err, SinkError::Closed));
    }
}
