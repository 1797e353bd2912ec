//! Directory existence cache
//!
//! Remembers every remote directory path that a PROPFIND or MKCOL confirmed
//! to exist, so upload workers do not re-probe the same ancestors for every
//! file. Entries are never invalidated: this daemon never deletes remotely,
//! so a cached "exists" can only go stale through an external actor, a
//! trade-off accepted for the saved round-trips.

use dashmap::DashSet;

/// Process-wide, append-only set of confirmed remote directory paths
///
/// Shared via `Arc` between the WAN and LAN clients and safe to use from
/// many concurrent upload workers without external locking.
#[derive(Debug, Default)]
pub struct DirectoryCache {
    entries: DashSet<String>,
}

impl DirectoryCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when `path` was previously confirmed to exist
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains(path)
    }

    /// Records `path` as existing
    pub fn add(&self, path: impl Into<String>) {
        self.entries.insert(path.into());
    }

    /// Number of cached directory paths
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been cached yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
