//! Buffer-to-queue ingest
//!
//! Periodically drains the in-memory buffer into the durable event log.
//! Between the flush and the insert, three transformations are applied in
//! order:
//!
//! 1. Reject filtering, against patterns re-read from the side file on
//!    every cycle so edits apply without a restart
//! 2. Burst dedup: only the first occurrence of each path in a single
//!    drain is recorded
//! 3. Rename inflation: a renamed directory implicitly moves everything
//!    under it, so its whole destination subtree is recorded
//!
//! The cycle is all-or-nothing at the insert: either every surviving row
//! lands in one transaction or the cycle fails and is retried by the
//! store's own retry policy.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use davwatch_core::fsutil::{path_kind, walk_subtree, PathKind};
use davwatch_core::{ChangeKind, RawEvent, RejectPatterns};
use davwatch_store::{EventRepository, NewEvent};

use crate::buffer::EventBuffer;
use crate::SyncError;

/// Periodic task that persists buffered watcher events
pub struct IngestService {
    buffer: Arc<EventBuffer>,
    repository: EventRepository,
    patterns_file: PathBuf,
}

impl IngestService {
    /// Creates the ingest task over a shared buffer and event repository.
    pub fn new(
        buffer: Arc<EventBuffer>,
        repository: EventRepository,
        patterns_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            buffer,
            repository,
            patterns_file: patterns_file.into(),
        }
    }

    /// Runs one ingest cycle, logging instead of propagating failures so
    /// the schedule keeps ticking.
    pub async fn run_cycle(&self) {
        if let Err(e) = self.try_cycle().await {
            error!(error = %e, "Ingest cycle failed");
        }
    }

    async fn try_cycle(&self) -> Result<(), SyncError> {
        let events = self.buffer.flush();
        if events.is_empty() {
            return Ok(());
        }

        let patterns = match RejectPatterns::load(&self.patterns_file) {
            Ok(patterns) => patterns,
            Err(e) => {
                warn!(
                    file = %self.patterns_file.display(),
                    error = %e,
                    "Reject patterns unavailable, ingesting unfiltered"
                );
                RejectPatterns::default()
            }
        };

        let rows = expand_events(&events, &patterns);
        if !rows.is_empty() {
            self.repository.insert_events(&rows).await?;
        }

        info!(
            captured = events.len(),
            recorded = rows.len(),
            "Ingest cycle complete"
        );
        Ok(())
    }
}

/// Applies filtering, dedup and rename inflation to one drained batch.
///
/// Events are visited in arrival order and the first occurrence of a path
/// wins the dedup; every row inherits its source event's capture time
/// (subtree rows inherit the rename's).
fn expand_events(events: &[RawEvent], patterns: &RejectPatterns) -> Vec<NewEvent> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut rows: Vec<NewEvent> = Vec::new();

    let mut record = |path: String, captured_at: i64, rows: &mut Vec<NewEvent>| {
        if seen.insert(path.clone()) {
            rows.push(NewEvent {
                file_path: path,
                created_timestamp: captured_at,
            });
        }
    };

    for event in events {
        let dest = event.path().to_string_lossy().to_string();

        match event.kind {
            ChangeKind::Renamed if path_kind(event.path()) == PathKind::File => {
                record(dest, event.captured_at, &mut rows);
            }
            ChangeKind::Renamed => {
                if patterns.is_rejected(&dest) {
                    continue;
                }
                // The watcher only reported the directory itself; its
                // contents moved with it and each entry needs its own row.
                // A target that is already gone walks to nothing.
                for entry in walk_subtree(event.path()) {
                    let path = entry.to_string_lossy().to_string();
                    if patterns.is_rejected(&path) {
                        continue;
                    }
                    record(path, event.captured_at, &mut rows);
                }
            }
            _ => {
                if patterns.is_rejected(&dest) {
                    continue;
                }
                record(dest, event.captured_at, &mut rows);
            }
        }
    }

    rows
}
