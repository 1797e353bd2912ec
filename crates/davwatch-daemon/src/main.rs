//! davwatch daemon - Background replication service
//!
//! This binary watches a local directory tree and replicates every change
//! to a WebDAV remote:
//! - OS change notifications buffered in memory
//! - Periodic ingest into a durable SQLite event log
//! - Periodic batch upload with LAN/WAN endpoint failover
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! Startup acquires a filesystem lock so only one instance runs per user,
//! then wires the watcher, the event buffer and the two periodic tasks
//! together. Both tasks are driven by the same `CancellationToken`, which
//! is triggered on receipt of SIGTERM or SIGINT.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use fs2::FileExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use davwatch_core::config::Config;
use davwatch_store::{DatabasePool, EventRepository};
use davwatch_sync::{scheduler, EventBuffer, FileWatcher, IngestService, ProcessService};
use davwatch_webdav::{DirectoryCache, LanProbe, Variant, WebDavClient};

// ============================================================================
// Single-instance lock
// ============================================================================

/// Default location of the instance lock file.
fn default_lock_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("davwatch")
        .join("davwatchd.lock")
}

/// Takes an exclusive advisory lock so only one daemon runs per user.
///
/// The lock is held by the returned file handle and released by the OS
/// when the process exits, so a crashed daemon never wedges the next
/// start.
fn acquire_instance_lock(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create lock directory {}", parent.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .open(path)
        .with_context(|| format!("Failed to open lock file {}", path.display()))?;

    file.try_lock_exclusive().with_context(|| {
        format!(
            "Another davwatchd instance is already running (lock file {})",
            path.display()
        )
    })?;

    Ok(file)
}

// ============================================================================
// HTTP client construction
// ============================================================================

/// Builds an HTTP client carrying the configured `Authorization` header
/// and a fixed request timeout.
///
/// Three of these exist at runtime: WAN uploads, LAN uploads and the LAN
/// probe, each with its own timeout budget.
fn build_http_client(auth: &str, timeout_ms: u64) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    if !auth.is_empty() {
        let mut value =
            HeaderValue::from_str(auth).context("Authorization header value is not valid")?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .context("Failed to build HTTP client")
}

// ============================================================================
// Daemon service
// ============================================================================

/// Main daemon service wiring the watcher, ingest and upload pipeline
struct DaemonService {
    config: Arc<Config>,
    db: Arc<DatabasePool>,
    shutdown: CancellationToken,
    /// Held for the daemon's lifetime; releasing it frees the instance slot.
    _instance_lock: File,
}

impl DaemonService {
    /// Loads and validates configuration, takes the instance lock and
    /// opens the event log database.
    async fn new(shutdown: CancellationToken) -> Result<Self> {
        let config_path = Config::default_path();
        let config = Config::load_or_default(&config_path);
        info!(config_path = %config_path.display(), "Loaded configuration");

        let errors = config.validate();
        if !errors.is_empty() {
            for e in &errors {
                error!(field = %e.field, "{}", e.message);
            }
            anyhow::bail!("Configuration is invalid ({} errors)", errors.len());
        }

        let instance_lock = acquire_instance_lock(&default_lock_path())?;

        let db = DatabasePool::new(&config.queue.db_path)
            .await
            .context("Failed to open event log database")?;

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            shutdown,
            _instance_lock: instance_lock,
        })
    }

    /// Runs the daemon until the shutdown token fires.
    ///
    /// 1. Builds the WAN/LAN clients and the LAN probe
    /// 2. Attaches the filesystem watcher to the configured root
    /// 3. Spawns the ingest and processing tasks on their periods
    /// 4. Waits for cancellation and joins both tasks
    async fn run(&self) -> Result<()> {
        let remote = &self.config.remote;
        let dir_cache = Arc::new(DirectoryCache::new());

        let wan = Arc::new(WebDavClient::new(
            build_http_client(&remote.auth, remote.timeout_ms)?,
            remote.host.clone(),
            remote.root_folder.clone(),
            Variant::Wan,
            Arc::clone(&dir_cache),
        ));
        let lan = Arc::new(WebDavClient::new(
            build_http_client(&remote.auth, remote.timeout_lan_ms)?,
            remote.host_lan.clone(),
            remote.root_folder.clone(),
            Variant::Lan,
            Arc::clone(&dir_cache),
        ));
        let probe = LanProbe::new(WebDavClient::new(
            build_http_client(&remote.auth, remote.probe_timeout_ms)?,
            remote.host_lan.clone(),
            remote.root_folder.clone(),
            Variant::Lan,
            Arc::clone(&dir_cache),
        ));

        let buffer = Arc::new(EventBuffer::new(self.config.watch.buffer_lock_timeout_ms));
        let _watcher = FileWatcher::start(&self.config.watch.root, Arc::clone(&buffer))
            .context("Failed to start filesystem watcher")?;

        let ingest = Arc::new(IngestService::new(
            Arc::clone(&buffer),
            self.repository(),
            self.config.filter.patterns_file.clone(),
        ));
        let process = Arc::new(ProcessService::new(
            Arc::clone(&self.db),
            wan,
            lan,
            probe,
            Arc::clone(&self.config),
        ));

        let ingest_task = scheduler::spawn_periodic(
            "ingest",
            Duration::from_secs(self.config.schedule.ingest_period_secs),
            self.shutdown.clone(),
            move || {
                let ingest = Arc::clone(&ingest);
                async move { ingest.run_cycle().await }
            },
        );
        let process_task = scheduler::spawn_periodic(
            "process",
            Duration::from_secs(self.config.schedule.process_period_secs),
            self.shutdown.clone(),
            move || {
                let process = Arc::clone(&process);
                async move { process.run_cycle().await }
            },
        );

        info!(
            root = %self.config.watch.root.display(),
            host = %remote.host,
            host_lan = %remote.host_lan,
            "davwatch daemon running"
        );

        self.shutdown.cancelled().await;
        info!("Shutdown requested, stopping periodic tasks");

        if let Err(e) = ingest_task.await {
            warn!(error = %e, "Ingest task did not stop cleanly");
        }
        if let Err(e) = process_task.await {
            warn!(error = %e, "Processing task did not stop cleanly");
        }

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

// ============================================================================
// Graceful shutdown signal handler
// ============================================================================

/// Waits for SIGTERM or SIGINT and triggers the cancellation token.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    info!("davwatch daemon starting (davwatchd)");

    let shutdown_token = CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = DaemonService::new(shutdown_token.clone()).await?;

    let result = service.run().await;

    match &result {
        Ok(()) => info!("davwatch daemon shut down gracefully"),
        Err(e) => error!(error = %e, "davwatch daemon exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
