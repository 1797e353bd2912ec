//! davwatch webdav - Remote storage client
//!
//! Async WebDAV adapter for the upload pipeline:
//! - File upload (PUT), directory probe (PROPFIND), directory create (MKCOL)
//! - Two interchangeable endpoint variants, WAN and LAN
//! - Process-wide directory existence cache shared by both variants
//! - LAN reachability probe
//!
//! ## Modules
//!
//! - [`cache`] - Concurrent set of remote directories confirmed to exist
//! - [`client`] - WebDAV HTTP client with status-code mapping
//! - [`probe`] - Per-cycle LAN availability check
//!
//! No operation in this crate retries on its own; retry/skip policy lives
//! with the processing orchestrator.

pub mod cache;
pub mod client;
pub mod probe;

pub use cache::DirectoryCache;
pub use client::{DirectoryStatus, UploadOutcome, Variant, WebDavClient};
pub use probe::LanProbe;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when talking to the WebDAV endpoint
#[derive(Debug, Error)]
pub enum WebDavError {
    /// The server answered with a status code the protocol mapping does
    /// not recognize for this operation
    #[error("Unexpected status {status} for {operation} '{path}'")]
    Protocol {
        /// Operation that was attempted (`upload`, `propfind`, `mkcol`)
        operation: &'static str,
        /// Remote path the operation targeted
        path: String,
        /// The unexpected HTTP status
        status: StatusCode,
    },

    /// Directory creation failed because the parent collection is missing
    #[error("Parent collection missing while creating '{0}'")]
    ParentMissing(String),

    /// A network-level error occurred
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}
