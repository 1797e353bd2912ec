//! Configuration module for davwatch.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation and defaults. The reject-filter side file referenced
//! by [`FilterConfig::patterns_file`] is deliberately *not* loaded here; it is
//! re-read on every sync cycle (see `davwatch_core::filter`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration for davwatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub watch: WatchConfig,
    pub remote: RemoteConfig,
    pub queue: QueueConfig,
    pub upload: UploadConfig,
    pub schedule: ScheduleConfig,
    pub filter: FilterConfig,
}

/// Local watch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Root directory watched recursively for changes.
    pub root: PathBuf,
    /// OS notification buffer size hint, in bytes.
    pub internal_buffer_size: usize,
    /// Milliseconds to wait for the event buffer lock before giving up.
    pub buffer_lock_timeout_ms: u64,
}

/// Remote WebDAV endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// WAN endpoint base URL, e.g. `https://cloud.example.com`.
    pub host: String,
    /// LAN endpoint base URL, preferred for large files when reachable.
    pub host_lan: String,
    /// Remote root folder under `remote.php/dav/files/`.
    pub root_folder: String,
    /// Value of the `Authorization` header sent with every request.
    pub auth: String,
    /// Request timeout for the WAN client, milliseconds.
    pub timeout_ms: u64,
    /// Request timeout for the LAN client, milliseconds.
    pub timeout_lan_ms: u64,
    /// Request timeout for the LAN availability probe, milliseconds.
    pub probe_timeout_ms: u64,
    /// Files above this size (bytes) are only uploaded via the LAN endpoint.
    pub lan_threshold_bytes: u64,
}

/// Durable event queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Path of the SQLite event log database.
    pub db_path: PathBuf,
    /// Maximum deduplicated unprocessed events pulled per processing cycle.
    pub unprocessed_batch_count: i64,
    /// Attempts per database insert/update before giving up.
    pub retry_limit: u32,
    /// Fixed sleep between database retry attempts, milliseconds.
    pub retry_sleep_ms: u64,
}

/// Parallel upload settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum concurrent upload workers.
    pub parallel_connections: usize,
    /// Events handed to a single worker as one sub-batch.
    pub events_per_connection: usize,
}

/// Periodic task intervals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Seconds between buffer-to-queue sync cycles.
    pub ingest_period_secs: u64,
    /// Seconds between batch processing cycles.
    pub process_period_secs: u64,
}

/// A single local-prefix to remote-prefix rewrite rule.
///
/// Applied as a replace-first-occurrence substitution, not an anchored
/// prefix match. This mirrors the documented behaviour exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemapRule {
    pub from: String,
    pub to: String,
}

/// Filtering and path rewriting settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// JSON side file holding `reject_filter_patterns`; re-read every sync cycle.
    pub patterns_file: PathBuf,
    /// Ordered remap rules applied to the relative remote path.
    #[serde(default)]
    pub remap_patterns: Vec<RemapRule>,
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/davwatch/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("davwatch")
            .join("config.yaml")
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            root: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join("sync"),
            internal_buffer_size: 64 * 1024,
            buffer_lock_timeout_ms: 2_000,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            host_lan: String::new(),
            root_folder: String::new(),
            auth: String::new(),
            timeout_ms: 600_000,
            timeout_lan_ms: 600_000,
            probe_timeout_ms: 2_000,
            lan_threshold_bytes: 50 * 1024 * 1024,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("davwatch");
        Self {
            db_path: data_dir.join("events.db"),
            unprocessed_batch_count: 500,
            retry_limit: 3,
            retry_sleep_ms: 500,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            parallel_connections: 4,
            events_per_connection: 25,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            ingest_period_secs: 10,
            process_period_secs: 30,
        }
    }
}

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"queue.retry_limit"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- watch ---
        let root_str = self.watch.root.to_string_lossy();
        if !root_str.starts_with('~') && !self.watch.root.exists() {
            errors.push(ValidationError {
                field: "watch.root".into(),
                message: format!("directory does not exist: {}", self.watch.root.display()),
            });
        }
        if self.watch.buffer_lock_timeout_ms == 0 {
            errors.push(ValidationError {
                field: "watch.buffer_lock_timeout_ms".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- remote ---
        if self.remote.host.is_empty() {
            errors.push(ValidationError {
                field: "remote.host".into(),
                message: "must not be empty".into(),
            });
        }
        if self.remote.host_lan.is_empty() {
            errors.push(ValidationError {
                field: "remote.host_lan".into(),
                message: "must not be empty".into(),
            });
        }
        if self.remote.root_folder.is_empty() {
            errors.push(ValidationError {
                field: "remote.root_folder".into(),
                message: "must not be empty".into(),
            });
        }
        if self.remote.timeout_ms == 0 || self.remote.timeout_lan_ms == 0 {
            errors.push(ValidationError {
                field: "remote.timeout_ms".into(),
                message: "timeouts must be greater than 0".into(),
            });
        }

        // --- queue ---
        if self.queue.unprocessed_batch_count <= 0 {
            errors.push(ValidationError {
                field: "queue.unprocessed_batch_count".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.queue.retry_limit == 0 {
            errors.push(ValidationError {
                field: "queue.retry_limit".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- upload ---
        if self.upload.parallel_connections == 0 {
            errors.push(ValidationError {
                field: "upload.parallel_connections".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.upload.events_per_connection == 0 {
            errors.push(ValidationError {
                field: "upload.events_per_connection".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- schedule ---
        if self.schedule.ingest_period_secs == 0 {
            errors.push(ValidationError {
                field: "schedule.ingest_period_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.schedule.process_period_secs == 0 {
            errors.push(ValidationError {
                field: "schedule.process_period_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        errors
    }
}
