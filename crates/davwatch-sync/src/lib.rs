//! davwatch sync - Watcher, ingest and upload pipeline
//!
//! Ties the other crates together into the two periodic halves of the
//! daemon:
//!
//! - [`watcher`] + [`buffer`] - OS change notifications captured into a
//!   lock-protected in-memory buffer
//! - [`ingest`] - Drains the buffer into the durable event log, applying
//!   reject filters, burst dedup and rename inflation
//! - [`process`] - Pulls unprocessed events from the log and replicates
//!   them to the WebDAV endpoint with bounded parallelism
//! - [`scheduler`] - Fixed-period task driver that never overlaps runs
//!
//! Both halves are crash-tolerant by construction: an event is only
//! marked processed after its upload completed, so a failure anywhere
//! re-presents the event on the next cycle.

pub mod buffer;
pub mod ingest;
pub mod process;
pub mod scheduler;
pub mod watcher;

pub use buffer::EventBuffer;
pub use ingest::IngestService;
pub use process::ProcessService;
pub use watcher::FileWatcher;

use thiserror::Error;

/// Errors that can occur in the sync pipeline
#[derive(Debug, Error)]
pub enum SyncError {
    /// The OS watcher could not be created or attached
    #[error("Watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// The durable event log failed
    #[error("Store error: {0}")]
    Store(#[from] davwatch_store::StoreError),

    /// The remote endpoint failed
    #[error("WebDAV error: {0}")]
    WebDav(#[from] davwatch_webdav::WebDavError),

    /// A local filesystem operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
