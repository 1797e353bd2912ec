//! Filesystem change events
//!
//! Two representations exist: [`RawEvent`] is the transient form produced by
//! the OS watcher and held in the in-memory buffer; [`PersistedEvent`] is the
//! durable form stored in the append-only event log. Raw events are consumed
//! exactly once when the buffer is drained into the database.

use std::path::{Path, PathBuf};

use chrono::Utc;

/// The kind of change the OS watcher reported for a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A new file or directory appeared
    Created,
    /// An existing file's content or metadata changed
    Modified,
    /// A file or directory was removed
    Deleted,
    /// A file or directory was moved to a new path
    Renamed,
}

/// A raw change notification as captured from the OS watcher
///
/// For renames, `path` is the destination and `old_path` the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Affected path (destination path for renames)
    pub path: PathBuf,
    /// What happened to the path
    pub kind: ChangeKind,
    /// Original path, present only for renames
    pub old_path: Option<PathBuf>,
    /// When the notification was captured, epoch seconds
    pub captured_at: i64,
}

impl RawEvent {
    /// Creates a non-rename event for the given path, captured now
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind,
            old_path: None,
            captured_at: Utc::now().timestamp(),
        }
    }

    /// Creates a rename event from `old` to `new`, captured now
    pub fn renamed(old: impl Into<PathBuf>, new: impl Into<PathBuf>) -> Self {
        Self {
            path: new.into(),
            kind: ChangeKind::Renamed,
            old_path: Some(old.into()),
            captured_at: Utc::now().timestamp(),
        }
    }

    /// Returns the primary path associated with this event
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A row of the durable event log
///
/// Rows are append-only: they are never deleted, only flipped to
/// `processed` once the corresponding upload (or no-op) has completed.
/// Several unprocessed rows may exist for the same `file_path`; the
/// selection query only ever yields the newest one per path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedEvent {
    /// Monotonic row id (primary key)
    pub id: i64,
    /// Absolute local path the event refers to
    pub file_path: String,
    /// Whether the event has been applied remotely
    pub processed: bool,
    /// Capture time, epoch seconds
    pub created_timestamp: i64,
    /// Completion time, epoch seconds; `None` while unprocessed
    pub processed_timestamp: Option<i64>,
}
