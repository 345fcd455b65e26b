//! Rollback store — per-(file, function) snapshots of original source.
//!
//! A snapshot is written before any patch attempt; rollback restores the
//! byte-identical original.

use codemend_core::FxHashMap;

/// A source snapshot for rollback.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub file_path: String,
    pub function_name: String,
    pub original_source: String,
}

/// Owns snapshots by value for the duration of one pipeline run.
#[derive(Debug, Default)]
pub struct RollbackStore {
    snapshots: FxHashMap<(String, String), Snapshot>,
}

impl RollbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save the original source before patching.
    pub fn save_snapshot(&mut self, file_path: &str, function_name: &str, source: &str) {
        self.snapshots.insert(
            (file_path.to_string(), function_name.to_string()),
            Snapshot {
                file_path: file_path.to_string(),
                function_name: function_name.to_string(),
                original_source: source.to_string(),
            },
        );
        tracing::debug!(file_path, function_name, "snapshot saved");
    }

    /// The original source for rollback, or `None` when no snapshot exists.
    pub fn rollback(&self, file_path: &str, function_name: &str) -> Option<&str> {
        let snapshot = self
            .snapshots
            .get(&(file_path.to_string(), function_name.to_string()));
        match snapshot {
            Some(snapshot) => {
                tracing::info!(file_path, function_name, "rolling back");
                Some(&snapshot.original_source)
            }
            None => {
                tracing::error!(file_path, function_name, "no snapshot found for rollback");
                None
            }
        }
    }

    /// Read the original source without logging a rollback.
    pub fn get_original(&self, file_path: &str, function_name: &str) -> Option<&str> {
        self.snapshots
            .get(&(file_path.to_string(), function_name.to_string()))
            .map(|s| s.original_source.as_str())
    }

    pub fn has_snapshot(&self, file_path: &str, function_name: &str) -> bool {
        self.snapshots
            .contains_key(&(file_path.to_string(), function_name.to_string()))
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
        tracing::debug!("all snapshots cleared");
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
