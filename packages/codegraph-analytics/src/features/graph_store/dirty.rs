//! Dirty-path tracking between rebuilds.
//!
//! The watcher marks files dirty as they change; the next rebuild drains the
//! set and re-parses exactly those files. Entries are plain paths; the graph
//! itself never mutates after freeze, so "incremental" here means
//! rebuild-with-a-smaller-parse, not in-place patching.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::time::Instant;

/// Concurrent-safe dirty set with per-path bookkeeping.
///
/// Reads take the shared lock; `mark_dirty`/`mark_clean`/`drain` take the
/// exclusive lock.
#[derive(Debug, Default)]
pub struct DirtyTracker {
    entries: RwLock<FxHashMap<String, DirtyEntry>>,
}

#[derive(Debug, Clone)]
struct DirtyEntry {
    first_marked: Instant,
    marks: u64,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change for `path`. Re-marking an already-dirty path bumps
    /// its counter but keeps the original mark time.
    pub fn mark_dirty(&self, path: &str) {
        let mut entries = self.entries.write();
        entries
            .entry(path.to_string())
            .and_modify(|e| e.marks += 1)
            .or_insert(DirtyEntry {
                first_marked: Instant::now(),
                marks: 1,
            });
    }

    /// Remove one path (after it has been re-parsed)
    pub fn mark_clean(&self, path: &str) {
        self.entries.write().remove(path);
    }

    /// Drop everything (full rebuild)
    pub fn clear_all(&self) {
        self.entries.write().clear();
    }

    pub fn is_dirty(&self, path: &str) -> bool {
        self.entries.read().contains_key(path)
    }

    pub fn dirty_count(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Number of times `path` was marked since it last went clean
    pub fn mark_count(&self, path: &str) -> u64 {
        self.entries.read().get(path).map(|e| e.marks).unwrap_or(0)
    }

    /// How long `path` has been dirty
    pub fn dirty_for(&self, path: &str) -> Option<std::time::Duration> {
        self.entries
            .read()
            .get(path)
            .map(|e| e.first_marked.elapsed())
    }

    /// Sorted snapshot of the dirty paths without clearing them
    pub fn dirty_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.entries.read().keys().cloned().collect();
        paths.sort_unstable();
        paths
    }

    /// Take the whole set for a rebuild pass, leaving the tracker empty.
    pub fn drain(&self) -> Vec<String> {
        let mut entries = self.entries.write();
        let mut paths: Vec<String> = entries.keys().cloned().collect();
        entries.clear();
        paths.sort_unstable();
        paths
    }
}
