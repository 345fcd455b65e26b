//! Audit log — append-only JSON-lines with an ISO-8601 UTC timestamp
//! prepended to each record.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::{Map, Value};

use crate::models::AuditEntry;

/// Writes structured audit entries to a JSON-lines file.
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one audit entry. Write failures are logged, never raised.
    pub fn log(&self, entry: &AuditEntry) {
        let mut record = Map::new();
        record.insert(
            "timestamp".to_string(),
            Value::String(Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()),
        );
        if let Ok(Value::Object(fields)) = serde_json::to_value(entry) {
            record.extend(fields);
        }

        let line = match serde_json::to_string(&Value::Object(record)) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize audit record");
                return;
            }
        };

        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{line}"));
        if let Err(e) = result {
            tracing::error!(error = %e, path = %self.path.display(), "failed to write audit log");
        }
    }

    /// Read the most recent `count` entries, skipping unparseable lines.
    pub fn read_recent(&self, count: usize) -> Vec<Value> {
        let Ok(file) = std::fs::File::open(&self.path) else {
            return Vec::new();
        };

        let mut entries: Vec<Value> = Vec::new();
        for line in BufReader::new(file).lines() {
            let Ok(line) = line else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Ok(value) = serde_json::from_str(line) {
                entries.push(value);
            }
        }

        let skip = entries.len().saturating_sub(count);
        entries.split_off(skip)
    }
}
