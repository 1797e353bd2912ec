//! Filesystem watcher
//!
//! Attaches a recursive OS watcher to the configured root and feeds the
//! shared [`EventBuffer`]. The notify callback runs on the watcher's own
//! thread, so it must stay cheap: map the notification, push it into the
//! buffer, return.

use std::path::Path;
use std::sync::Arc;

use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{error, info, trace};

use davwatch_core::{ChangeKind, RawEvent};

use crate::buffer::EventBuffer;
use crate::SyncError;

/// Owns the OS watcher; dropping it detaches from the filesystem
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Starts watching `root` recursively, feeding mapped events into
    /// `buffer`.
    ///
    /// # Errors
    /// Returns [`SyncError::Watch`] if the watcher cannot be created or
    /// the root cannot be attached.
    pub fn start(root: &Path, buffer: Arc<EventBuffer>) -> Result<Self, SyncError> {
        let mut watcher =
            notify::recommended_watcher(move |result: Result<notify::Event, notify::Error>| {
                match result {
                    Ok(event) => {
                        trace!(kind = ?event.kind, paths = ?event.paths, "Watcher notification");
                        if let Some(raw) = map_event(event) {
                            buffer.add(raw);
                        }
                    }
                    Err(e) => error!(error = %e, "Watcher notification error"),
                }
            })?;

        watcher.watch(root, RecursiveMode::Recursive)?;
        info!(root = %root.display(), "Filesystem watcher started");

        Ok(Self { _watcher: watcher })
    }
}

/// Maps an OS notification onto the pipeline's event model.
///
/// Access notifications and rename halves whose counterpart never arrived
/// are discarded. A complete rename carries the source and destination
/// paths in order.
fn map_event(event: notify::Event) -> Option<RawEvent> {
    let mut paths = event.paths.into_iter();

    match event.kind {
        EventKind::Create(_) => Some(RawEvent::new(ChangeKind::Created, paths.next()?)),
        EventKind::Remove(_) => Some(RawEvent::new(ChangeKind::Deleted, paths.next()?)),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let old = paths.next()?;
            let new = paths.next()?;
            Some(RawEvent::renamed(old, new))
        }
        // An unpaired "rename to" is a path appearing, same as a create.
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            Some(RawEvent::new(ChangeKind::Created, paths.next()?))
        }
        // The source half alone carries no destination to sync.
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => None,
        EventKind::Modify(_) => Some(RawEvent::new(ChangeKind::Modified, paths.next()?)),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
    }
}
