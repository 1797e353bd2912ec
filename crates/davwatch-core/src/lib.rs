//! davwatch core - Domain types and configuration
//!
//! Shared building blocks for the davwatch daemon:
//!
//! - [`config`] - Typed YAML configuration with validation and defaults
//! - [`events`] - Filesystem change events, transient and persisted forms
//! - [`filter`] - Reject-filter patterns loaded from the side config file
//! - [`fsutil`] - Path classification, subtree walking, remote path mapping

pub mod config;
pub mod events;
pub mod filter;
pub mod fsutil;

pub use config::Config;
pub use events::{ChangeKind, PersistedEvent, RawEvent};
pub use filter::RejectPatterns;
pub use fsutil::PathKind;
