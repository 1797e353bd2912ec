//! Integration tests for the buffer-to-queue ingest cycle
//!
//! Verifies that drained watcher events land in the durable log with
//! filtering, dedup and rename inflation applied, using a real buffer
//! and an in-memory database.

use std::sync::Arc;

use davwatch_core::{ChangeKind, RawEvent};
use davwatch_sync::{EventBuffer, IngestService};

use crate::common;

fn write_patterns(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("patterns.json");
    std::fs::write(&path, body).unwrap();
    path
}

#[tokio::test]
async fn test_buffered_events_land_in_queue() {
    let dir = tempfile::tempdir().unwrap();
    let patterns = write_patterns(&dir, r#"{"reject_filter_patterns": []}"#);
    let db = common::in_memory_db().await;

    let buffer = Arc::new(EventBuffer::new(1_000));
    buffer.add(RawEvent::new(ChangeKind::Created, "/w/a.txt"));
    buffer.add(RawEvent::new(ChangeKind::Modified, "/w/b.txt"));

    let ingest = IngestService::new(Arc::clone(&buffer), common::repository(&db), &patterns);
    ingest.run_cycle().await;

    let pending = common::repository(&db).unprocessed_earliest(10).await.unwrap();
    assert_eq!(pending.len(), 2);
    assert!(buffer.is_empty());
}

#[tokio::test]
async fn test_burst_for_one_path_is_recorded_once() {
    let dir = tempfile::tempdir().unwrap();
    let patterns = write_patterns(&dir, r#"{"reject_filter_patterns": []}"#);
    let db = common::in_memory_db().await;

    let buffer = Arc::new(EventBuffer::new(1_000));
    for _ in 0..5 {
        buffer.add(RawEvent::new(ChangeKind::Modified, "/w/hot.txt"));
    }

    IngestService::new(buffer, common::repository(&db), &patterns)
        .run_cycle()
        .await;

    let pending = common::repository(&db).unprocessed_earliest(10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].file_path, "/w/hot.txt");
}

#[tokio::test]
async fn test_rejected_paths_never_reach_the_queue() {
    let dir = tempfile::tempdir().unwrap();
    let patterns = write_patterns(&dir, r#"{"reject_filter_patterns": ["\\.tmp$"]}"#);
    let db = common::in_memory_db().await;

    let buffer = Arc::new(EventBuffer::new(1_000));
    buffer.add(RawEvent::new(ChangeKind::Created, "/w/keep.txt"));
    buffer.add(RawEvent::new(ChangeKind::Created, "/w/drop.tmp"));

    IngestService::new(buffer, common::repository(&db), &patterns)
        .run_cycle()
        .await;

    let pending = common::repository(&db).unprocessed_earliest(10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].file_path, "/w/keep.txt");
}

#[tokio::test]
async fn test_pattern_edits_apply_next_cycle_without_restart() {
    let dir = tempfile::tempdir().unwrap();
    let patterns = write_patterns(&dir, r#"{"reject_filter_patterns": []}"#);
    let db = common::in_memory_db().await;

    let buffer = Arc::new(EventBuffer::new(1_000));
    let ingest = IngestService::new(Arc::clone(&buffer), common::repository(&db), &patterns);

    buffer.add(RawEvent::new(ChangeKind::Created, "/w/a.log"));
    ingest.run_cycle().await;

    // Tighten the filter between cycles.
    std::fs::write(&patterns, r#"{"reject_filter_patterns": ["\\.log$"]}"#).unwrap();
    buffer.add(RawEvent::new(ChangeKind::Created, "/w/b.log"));
    ingest.run_cycle().await;

    let pending = common::repository(&db).unprocessed_earliest(10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].file_path, "/w/a.log");
}

#[tokio::test]
async fn test_renamed_directory_records_whole_subtree() {
    let dir = tempfile::tempdir().unwrap();
    let patterns = write_patterns(&dir, r#"{"reject_filter_patterns": []}"#);
    let db = common::in_memory_db().await;

    let dest = dir.path().join("moved");
    std::fs::create_dir_all(dest.join("sub")).unwrap();
    std::fs::write(dest.join("a.txt"), b"x").unwrap();
    std::fs::write(dest.join("sub/b.txt"), b"x").unwrap();

    let buffer = Arc::new(EventBuffer::new(1_000));
    buffer.add(RawEvent::renamed(dir.path().join("orig"), &dest));

    IngestService::new(buffer, common::repository(&db), &patterns)
        .run_cycle()
        .await;

    // moved/, moved/a.txt, moved/sub/, moved/sub/b.txt
    let pending = common::repository(&db).unprocessed_earliest(10).await.unwrap();
    assert_eq!(pending.len(), 4);
}

#[tokio::test]
async fn test_missing_patterns_file_ingests_unfiltered() {
    let dir = tempfile::tempdir().unwrap();
    let db = common::in_memory_db().await;

    let buffer = Arc::new(EventBuffer::new(1_000));
    buffer.add(RawEvent::new(ChangeKind::Created, "/w/a.txt"));

    IngestService::new(
        buffer,
        common::repository(&db),
        dir.path().join("nonexistent.json"),
    )
    .run_cycle()
    .await;

    let pending = common::repository(&db).unprocessed_earliest(10).await.unwrap();
    assert_eq!(pending.len(), 1);
}

#[tokio::test]
async fn test_empty_buffer_cycle_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let patterns = write_patterns(&dir, r#"{"reject_filter_patterns": []}"#);
    let db = common::in_memory_db().await;

    IngestService::new(
        Arc::new(EventBuffer::new(1_000)),
        common::repository(&db),
        &patterns,
    )
    .run_cycle()
    .await;

    assert!(common::repository(&db)
        .unprocessed_earliest(10)
        .await
        .unwrap()
        .is_empty());
}
