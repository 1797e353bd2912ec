//! SQLite event repository
//!
//! Implements the three operations of the durable event queue:
//!
//! - [`EventRepository::insert_events`] - transactional batch insert
//! - [`EventRepository::unprocessed_earliest`] - deduplicated selection
//! - [`EventRepository::update_processed_status`] - cascading status update
//!
//! Insert and update are retried a fixed number of times with a fixed sleep
//! between attempts; there is no backoff. Exhausting the retries aborts the
//! current task invocation only. The unprocessed rows stay unprocessed, so
//! the next scheduled cycle picks the work up again from persisted state.

use std::time::Duration;

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{error, info};

use davwatch_core::events::PersistedEvent;

use crate::StoreError;

/// Dedup selection: for each path with at least one unprocessed row, pick
/// only its most-recently-created unprocessed row, oldest ids first.
const UNPROCESSED_EARLIEST_QUERY: &str = "\
SELECT events.id                  AS id,
       events.file_path          AS file_path,
       events.processed          AS processed,
       events.created_timestamp  AS created_timestamp,
       events.processed_timestamp AS processed_timestamp
FROM events
         JOIN (SELECT file_path              AS file_path,
                      MAX(created_timestamp) AS latest_timestamp
               FROM events
               WHERE processed = 0
               GROUP BY file_path) AS path_latest
              ON events.file_path = path_latest.file_path
                  AND events.created_timestamp = path_latest.latest_timestamp
WHERE events.processed = 0
ORDER BY events.id
LIMIT ?1";

/// Cascade update: mark the given row processed together with every
/// earlier-or-equal unprocessed row sharing its path.
const UPDATE_PROCESSED_STATUS_COMMAND: &str = "\
UPDATE events
SET processed           = 1,
    processed_timestamp = ?2
WHERE file_path = (SELECT file_path FROM events WHERE id = ?1)
  AND processed = 0
  AND id <= ?1";

/// An event about to enter the durable queue (no id assigned yet)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    /// Absolute local path the event refers to
    pub file_path: String,
    /// Capture time, epoch seconds
    pub created_timestamp: i64,
}

/// Repository over the append-only event log
///
/// Cheap to construct; parallel upload workers each build their own handle
/// over a clone of the shared pool so transactional state never crosses
/// worker boundaries.
pub struct EventRepository {
    pool: SqlitePool,
    retry_limit: u32,
    retry_sleep: Duration,
}

impl EventRepository {
    /// Creates a repository handle over the given pool.
    ///
    /// `retry_limit` is the total number of attempts for insert/update
    /// operations; `retry_sleep_ms` the fixed delay between attempts.
    pub fn new(pool: SqlitePool, retry_limit: u32, retry_sleep_ms: u64) -> Self {
        Self {
            pool,
            retry_limit: retry_limit.max(1),
            retry_sleep: Duration::from_millis(retry_sleep_ms),
        }
    }

    /// Persists a batch of new events in a single transaction.
    ///
    /// Retried up to the configured attempt limit with a fixed delay.
    ///
    /// # Errors
    /// Returns `StoreError::RetriesExhausted` when every attempt failed.
    pub async fn insert_events(&self, events: &[NewEvent]) -> Result<(), StoreError> {
        if events.is_empty() {
            return Ok(());
        }

        let mut last_error = String::new();

        for attempt in 1..=self.retry_limit {
            info!(
                count = events.len(),
                first_path = %events[0].file_path,
                attempt,
                "Inserting events"
            );

            match self.try_insert(events).await {
                Ok(()) => {
                    info!(count = events.len(), "Successfully inserted events");
                    return Ok(());
                }
                Err(e) => {
                    error!(
                        attempt,
                        count = events.len(),
                        error = %e,
                        "Event insert attempt failed"
                    );
                    last_error = e.to_string();
                }
            }

            if attempt < self.retry_limit {
                tokio::time::sleep(self.retry_sleep).await;
            }
        }

        error!(
            retry_limit = self.retry_limit,
            "Reached maximum retries for event insert, bailing out"
        );
        Err(StoreError::RetriesExhausted {
            operation: "insert_events",
            attempts: self.retry_limit,
            last_error,
        })
    }

    async fn try_insert(&self, events: &[NewEvent]) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        for event in events {
            sqlx::query(
                "INSERT INTO events (file_path, processed, created_timestamp) \
                 VALUES (?1, 0, ?2)",
            )
            .bind(&event.file_path)
            .bind(event.created_timestamp)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }

    /// Returns, per distinct path with unprocessed rows, only the row with
    /// the greatest `created_timestamp`, ordered by ascending id and capped
    /// at `limit` rows total.
    ///
    /// A path touched five times before a processing cycle runs yields a
    /// single unit of work here; the older rows are collapsed later by
    /// [`update_processed_status`](Self::update_processed_status).
    pub async fn unprocessed_earliest(&self, limit: i64) -> Result<Vec<PersistedEvent>, StoreError> {
        let rows = sqlx::query(UNPROCESSED_EARLIEST_QUERY)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let mut events = Vec::with_capacity(rows.len());
        for row in &rows {
            events.push(event_from_row(row));
        }

        Ok(events)
    }

    /// Marks each given event processed, cascading to every unprocessed row
    /// that shares its path with an earlier-or-equal id. The whole batch is
    /// one transaction; every collapsed row receives the event's
    /// `processed_timestamp`.
    ///
    /// No-op on empty input. Same retry policy as insert.
    pub async fn update_processed_status(
        &self,
        events: &[PersistedEvent],
    ) -> Result<(), StoreError> {
        if events.is_empty() {
            return Ok(());
        }

        let mut last_error = String::new();

        for attempt in 1..=self.retry_limit {
            info!(
                count = events.len(),
                first_path = %events[0].file_path,
                attempt,
                "Updating processed status"
            );

            match self.try_update(events).await {
                Ok(()) => {
                    info!(count = events.len(), "Successfully updated processed status");
                    return Ok(());
                }
                Err(e) => {
                    error!(
                        attempt,
                        count = events.len(),
                        error = %e,
                        "Status update attempt failed"
                    );
                    last_error = e.to_string();
                }
            }

            if attempt < self.retry_limit {
                tokio::time::sleep(self.retry_sleep).await;
            }
        }

        error!(
            retry_limit = self.retry_limit,
            "Reached maximum retries for status update, bailing out"
        );
        Err(StoreError::RetriesExhausted {
            operation: "update_processed_status",
            attempts: self.retry_limit,
            last_error,
        })
    }

    async fn try_update(&self, events: &[PersistedEvent]) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        for event in events {
            sqlx::query(UPDATE_PROCESSED_STATUS_COMMAND)
                .bind(event.id)
                .bind(event.processed_timestamp)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await
    }
}

/// Maps a database row to a [`PersistedEvent`]
fn event_from_row(row: &SqliteRow) -> PersistedEvent {
    PersistedEvent {
        id: row.get("id"),
        file_path: row.get("file_path"),
        processed: row.get::<i64, _>("processed") != 0,
        created_timestamp: row.get("created_timestamp"),
        processed_timestamp: row.get("processed_timestamp"),
    }
}
