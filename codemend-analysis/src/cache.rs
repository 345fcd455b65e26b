//! Per-file result cache — content-addressed, TTL-expired.
//!
//! Keyed by `(file_path, xxh3 of content)`, so collisions are
//! content-equivalent and safe across concurrent scans. The cache is an
//! accelerator only: bypassing it yields the same scan result.

use std::time::Duration;

use moka::sync::Cache;
use xxhash_rust::xxh3::xxh3_64;

use crate::parser::ModuleAst;
use crate::rules::Violation;

/// Cached analysis for one file.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub content_hash: u64,
    pub module_ast: ModuleAst,
    pub violations: Vec<Violation>,
}

/// In-memory file-level cache with lazy TTL eviction on read.
pub struct FileCache {
    inner: Cache<(String, u64), CacheEntry>,
}

impl FileCache {
    /// Create a cache with the given capacity and entry TTL.
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Hash file content the way cache keys are built.
    pub fn hash_content(content: &str) -> u64 {
        xxh3_64(content.as_bytes())
    }

    /// Look up the cached result for a file. `None` when absent, expired,
    /// or the content changed.
    pub fn get(&self, file_path: &str, content: &str) -> Option<CacheEntry> {
        let key = (file_path.to_string(), Self::hash_content(content));
        self.inner.get(&key)
    }

    /// Cache analysis results for a file.
    pub fn put(
        &self,
        file_path: &str,
        content: &str,
        module_ast: ModuleAst,
        violations: Vec<Violation>,
    ) {
        let content_hash = Self::hash_content(content);
        self.inner.insert(
            (file_path.to_string(), content_hash),
            CacheEntry {
                content_hash,
                module_ast,
                violations,
            },
        );
    }

    /// Drop the entry for one (path, content) pair.
    pub fn invalidate(&self, file_path: &str, content: &str) {
        let key = (file_path.to_string(), Self::hash_content(content));
        self.inner.invalidate(&key);
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }
}

impl Default for FileCache {
    fn default() -> Self {
        // Default: up to 10,000 files, one hour TTL.
        Self::new(10_000, Duration::from_secs(3600))
    }
}
