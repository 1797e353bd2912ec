//! davwatch store - Durable event queue
//!
//! SQLite-backed append-only log of filesystem events. Rows are inserted
//! unprocessed by the ingest task and flipped to processed by the upload
//! orchestrator; they are never deleted.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with schema migration
//! - [`EventRepository`] - Insert, dedup-select and cascade-update operations
//! - [`StoreError`] - Error types for store operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use davwatch_store::{DatabasePool, EventRepository, StoreError};
//!
//! # async fn example() -> Result<(), StoreError> {
//! let pool = DatabasePool::new(Path::new("/var/lib/davwatch/events.db")).await?;
//! let repo = EventRepository::new(pool.pool().clone(), 3, 500);
//! let pending = repo.unprocessed_earliest(100).await?;
//! # Ok(())
//! # }
//! ```

pub mod pool;
pub mod repository;

pub use pool::DatabasePool;
pub use repository::{EventRepository, NewEvent};

/// Errors that can occur during store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A transactional operation failed on every configured attempt
    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// The logical operation that was retried
        operation: &'static str,
        /// Total attempts made
        attempts: u32,
        /// Error message of the final attempt
        last_error: String,
    },
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::QueryFailed(e.to_string())
    }
}
