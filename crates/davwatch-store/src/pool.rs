//! SQLite pool for the event log
//!
//! One pool is opened at daemon startup and shared by every repository
//! handle. Opening it creates the database file (and its parent
//! directory) on first run and applies the schema before anything else
//! touches the log.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::StoreError;

const SCHEMA: &str = include_str!("migrations/20260301_initial.sql");

/// Shared handle to the event log database
///
/// WAL journal mode lets the ingest writer overlap the orchestrator's
/// reads; the busy timeout absorbs write contention between status
/// updates issued by parallel upload workers.
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens the event log at `db_path`, creating file, parent directory
    /// and schema as needed.
    pub async fn new(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::ConnectionFailed(format!(
                    "Cannot create event log directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| {
                StoreError::ConnectionFailed(format!(
                    "Cannot open event log at {}: {}",
                    db_path.display(),
                    e
                ))
            })?;
        apply_schema(&pool).await?;

        info!(path = %db_path.display(), "Event log opened");
        Ok(Self { pool })
    }

    /// Opens a throwaway in-memory event log.
    ///
    /// Capped at one connection: an in-memory SQLite database lives and
    /// dies with its connection, and a second connection would see a
    /// separate empty database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                StoreError::ConnectionFailed(format!("Cannot open in-memory event log: {}", e))
            })?;
        apply_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// The underlying sqlx pool, for building repository handles over it.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
    debug!("Event log schema applied");
    Ok(())
}
