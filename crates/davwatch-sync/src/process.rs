//! Batch processing orchestrator
//!
//! Replicates unprocessed events from the durable log to the remote
//! store. Each cycle:
//!
//! 1. Probes the LAN endpoint and picks WAN or LAN for the whole cycle
//! 2. Pulls the deduplicated unprocessed batch from the log
//! 3. Splits it into per-worker sub-batches and uploads them with
//!    bounded parallelism
//! 4. Flips successfully replicated events to processed, one status
//!    update per sub-batch
//!
//! Per-event failures are logged and the event stays unprocessed, so the
//! next cycle retries it. Two outcomes deliberately leave an event
//! pending without an error: a large file while only the WAN endpoint is
//! reachable, and an upload racing a not-yet-created remote parent.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info, warn};

use davwatch_core::fsutil::{apply_remap, normalize_separators, path_kind, relative_to_root, PathKind};
use davwatch_core::{Config, PersistedEvent};
use davwatch_store::{DatabasePool, EventRepository};
use davwatch_webdav::{DirectoryStatus, LanProbe, UploadOutcome, WebDavClient};

use crate::SyncError;

/// Periodic task that drains the durable log to the remote store
pub struct ProcessService {
    db: Arc<DatabasePool>,
    wan: Arc<WebDavClient>,
    lan: Arc<WebDavClient>,
    probe: LanProbe,
    config: Arc<Config>,
}

impl ProcessService {
    /// Creates the orchestrator over both endpoint clients.
    ///
    /// # Arguments
    /// * `db` - Shared event log pool; each worker builds its own repository over it
    /// * `wan` - Client for the internet-facing endpoint
    /// * `lan` - Client for the local-network endpoint
    /// * `probe` - Short-timeout LAN availability check
    /// * `config` - Daemon configuration (batch sizes, thresholds, remap rules)
    pub fn new(
        db: Arc<DatabasePool>,
        wan: Arc<WebDavClient>,
        lan: Arc<WebDavClient>,
        probe: LanProbe,
        config: Arc<Config>,
    ) -> Self {
        Self {
            db,
            wan,
            lan,
            probe,
            config,
        }
    }

    /// Runs one processing cycle, logging instead of propagating failures
    /// so the schedule keeps ticking.
    pub async fn run_cycle(&self) {
        if let Err(e) = self.try_cycle().await {
            error!(error = %e, "Processing cycle failed");
        }
    }

    async fn try_cycle(&self) -> Result<(), SyncError> {
        // A probe timeout is an answer; any other probe failure ends the
        // cycle here and the backlog waits for the next tick.
        let lan_up = self.probe.is_reachable().await?;
        let client = if lan_up {
            Arc::clone(&self.lan)
        } else {
            Arc::clone(&self.wan)
        };
        debug!(lan = lan_up, "Endpoint selected for this cycle");

        let repository = self.repository();
        let pending = repository
            .unprocessed_earliest(self.config.queue.unprocessed_batch_count)
            .await?;
        if pending.is_empty() {
            return Ok(());
        }
        let total = pending.len();

        // One shared completion timestamp per cycle keeps the cascade
        // update consistent across workers.
        let processed_timestamp = Utc::now().timestamp();
        let semaphore = Arc::new(Semaphore::new(self.config.upload.parallel_connections));
        let mut workers = JoinSet::new();

        for chunk in pending.chunks(self.config.upload.events_per_connection) {
            let events = chunk.to_vec();
            let semaphore = Arc::clone(&semaphore);
            let client = Arc::clone(&client);
            let config = Arc::clone(&self.config);
            let repository = self.repository();

            workers.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return 0,
                };
                process_chunk(events, &client, &repository, &config, processed_timestamp).await
            });
        }

        let mut processed = 0usize;
        while let Some(result) = workers.join_next().await {
            match result {
                Ok(count) => processed += count,
                Err(e) => error!(error = %e, "Upload worker panicked"),
            }
        }

        info!(processed, total, lan = lan_up, "Processing cycle complete");
        Ok(())
    }

    fn repository(&self) -> EventRepository {
        EventRepository::new(
            self.db.pool().clone(),
            self.config.queue.retry_limit,
            self.config.queue.retry_sleep_ms,
        )
    }
}

/// Processes one sub-batch sequentially and flips its completed events.
///
/// Returns the number of events marked processed. A failed status update
/// leaves the events pending; the uploads were idempotent full-content
/// PUTs, so redoing them next cycle is safe.
async fn process_chunk(
    events: Vec<PersistedEvent>,
    client: &WebDavClient,
    repository: &EventRepository,
    config: &Config,
    processed_timestamp: i64,
) -> usize {
    let mut completed: Vec<PersistedEvent> = Vec::with_capacity(events.len());

    for mut event in events {
        match process_event(&event, client, config).await {
            Ok(true) => {
                event.processed = true;
                event.processed_timestamp = Some(processed_timestamp);
                completed.push(event);
            }
            Ok(false) => {
                debug!(path = %event.file_path, "Event deferred to a later cycle");
            }
            Err(e) => {
                error!(path = %event.file_path, error = %e, "Failed to process event");
            }
        }
    }

    let count = completed.len();
    if count > 0 {
        if let Err(e) = repository.update_processed_status(&completed).await {
            error!(error = %e, "Failed to persist processed status");
            return 0;
        }
    }
    count
}

/// Replicates a single event; `Ok(true)` means it can be marked processed.
async fn process_event(
    event: &PersistedEvent,
    client: &WebDavClient,
    config: &Config,
) -> Result<bool, SyncError> {
    let local = Path::new(&event.file_path);

    match path_kind(local) {
        // Gone since capture. Nothing to replicate; deletion is not
        // propagated remotely.
        PathKind::Missing => {
            info!(path = %event.file_path, "Local path vanished, nothing to upload");
            Ok(true)
        }
        PathKind::Directory => {
            let remote = remote_path_for(local, config);
            if remote.is_empty() {
                return Ok(true);
            }
            if client.check_directory_exists(&remote).await? == DirectoryStatus::Absent {
                client.create_recursive_remote_path(&remote).await?;
            }
            Ok(true)
        }
        PathKind::File => {
            let metadata = tokio::fs::metadata(local).await?;
            if metadata.len() > config.remote.lan_threshold_bytes && !client.is_lan() {
                debug!(
                    path = %event.file_path,
                    size = metadata.len(),
                    "Large file deferred until the LAN endpoint is reachable"
                );
                return Ok(false);
            }

            let remote = remote_path_for(local, config);
            let parent = remote_parent(&remote);
            if !parent.is_empty()
                && client.check_directory_exists(parent).await? == DirectoryStatus::Absent
            {
                client.create_recursive_remote_path(parent).await?;
            }

            let file = tokio::fs::File::open(local).await?;
            let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
            match client.upload_file(body, &remote).await? {
                UploadOutcome::Uploaded => {
                    debug!(path = %event.file_path, remote = %remote, "Uploaded");
                    Ok(true)
                }
                UploadOutcome::ParentMissing => {
                    warn!(
                        path = %event.file_path,
                        remote = %remote,
                        "Remote parent disappeared under the upload"
                    );
                    Ok(false)
                }
            }
        }
    }
}

/// Maps an absolute local path onto its relative remote counterpart.
fn remote_path_for(local: &Path, config: &Config) -> String {
    let relative = relative_to_root(&config.watch.root, local);
    let remapped = apply_remap(
        &relative.to_string_lossy(),
        &config.filter.remap_patterns,
    );
    normalize_separators(&remapped)
}

/// Parent of a relative remote path; `""` for a top-level entry.
fn remote_parent(remote_path: &str) -> &str {
    match remote_path.rfind('/') {
        Some(idx) => &remote_path[..idx],
        None => "",
    }
}
