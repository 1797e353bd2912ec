//! Integration tests for the WebDAV client status-code mapping
//!
//! Verifies against a wiremock endpoint:
//! - PUT upload outcomes (uploaded, parent missing, protocol error)
//! - PROPFIND existence checks and cache population
//! - MKCOL outcomes including the parent-missing hard failure
//! - Recursive collection creation order

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use davwatch_webdav::{DirectoryStatus, UploadOutcome, WebDavError};

use crate::common;

fn propfind() -> impl wiremock::Match {
    method("PROPFIND")
}

fn mkcol() -> impl wiremock::Match {
    method("MKCOL")
}

// ============================================================================
// Upload
// ============================================================================

#[tokio::test]
async fn test_upload_created_maps_to_uploaded() {
    let (server, client, _cache) = common::setup_wan().await;

    Mock::given(method("PUT"))
        .and(path(common::dav_path("docs/a.txt")))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let outcome = client
        .upload_file("hello".as_bytes().to_vec(), "docs/a.txt")
        .await
        .expect("Upload failed");
    assert_eq!(outcome, UploadOutcome::Uploaded);
}

#[tokio::test]
async fn test_upload_no_content_maps_to_uploaded() {
    let (server, client, _cache) = common::setup_wan().await;

    // Overwriting an existing file answers 204.
    Mock::given(method("PUT"))
        .and(path(common::dav_path("docs/a.txt")))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let outcome = client
        .upload_file("v2".as_bytes().to_vec(), "docs/a.txt")
        .await
        .unwrap();
    assert_eq!(outcome, UploadOutcome::Uploaded);
}

#[tokio::test]
async fn test_upload_not_found_maps_to_parent_missing() {
    let (server, client, _cache) = common::setup_wan().await;

    Mock::given(method("PUT"))
        .and(path(common::dav_path("missing/a.txt")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let outcome = client
        .upload_file(Vec::new(), "missing/a.txt")
        .await
        .unwrap();
    assert_eq!(outcome, UploadOutcome::ParentMissing);
}

#[tokio::test]
async fn test_upload_server_error_is_protocol_error() {
    let (server, client, _cache) = common::setup_wan().await;

    Mock::given(method("PUT"))
        .and(path(common::dav_path("docs/a.txt")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client
        .upload_file(Vec::new(), "docs/a.txt")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WebDavError::Protocol {
            operation: "upload",
            ..
        }
    ));
}

// ============================================================================
// Directory existence
// ============================================================================

#[tokio::test]
async fn test_check_directory_multi_status_exists_and_caches() {
    let (server, client, cache) = common::setup_wan().await;

    // The second call must be served from the cache, so the server may
    // only ever see one PROPFIND.
    Mock::given(propfind())
        .and(path(common::dav_path("docs")))
        .respond_with(ResponseTemplate::new(207))
        .expect(1)
        .mount(&server)
        .await;

    let first = client.check_directory_exists("docs").await.unwrap();
    assert_eq!(first, DirectoryStatus::Exists);
    assert!(cache.contains("docs"));

    let second = client.check_directory_exists("docs").await.unwrap();
    assert_eq!(second, DirectoryStatus::Exists);
}

#[tokio::test]
async fn test_check_directory_not_found_maps_to_absent() {
    let (server, client, cache) = common::setup_wan().await;

    Mock::given(propfind())
        .and(path(common::dav_path("nope")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let status = client.check_directory_exists("nope").await.unwrap();
    assert_eq!(status, DirectoryStatus::Absent);
    assert!(!cache.contains("nope"));
}

#[tokio::test]
async fn test_check_directory_unexpected_status_is_protocol_error() {
    let (server, client, _cache) = common::setup_wan().await;

    Mock::given(propfind())
        .and(path(common::dav_path("docs")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client.check_directory_exists("docs").await.unwrap_err();
    assert!(matches!(
        err,
        WebDavError::Protocol {
            operation: "propfind",
            ..
        }
    ));
}

// ============================================================================
// Directory creation
// ============================================================================

#[tokio::test]
async fn test_create_recursive_single_segment() {
    let (server, client, cache) = common::setup_wan().await;

    Mock::given(propfind())
        .and(path(common::dav_path("docs")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(mkcol())
        .and(path(common::dav_path("docs")))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    client.create_recursive_remote_path("docs").await.unwrap();
    assert!(cache.contains("docs"));
}

#[tokio::test]
async fn test_create_recursive_builds_ancestors_first() {
    let (server, client, cache) = common::setup_wan().await;

    // Nothing exists yet; each level answers 404 then accepts MKCOL.
    for dir in ["a", "a/b", "a/b/c"] {
        Mock::given(propfind())
            .and(path(common::dav_path(dir)))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(mkcol())
            .and(path(common::dav_path(dir)))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
    }

    client.create_recursive_remote_path("a/b/c").await.unwrap();

    assert!(cache.contains("a"));
    assert!(cache.contains("a/b"));
    assert!(cache.contains("a/b/c"));
}

#[tokio::test]
async fn test_create_recursive_skips_existing_levels() {
    let (server, client, cache) = common::setup_wan().await;

    // "a" is already cached; only "a/b" should be probed and created.
    cache.add("a");

    Mock::given(propfind())
        .and(path(common::dav_path("a/b")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(mkcol())
        .and(path(common::dav_path("a/b")))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    client.create_recursive_remote_path("a/b").await.unwrap();
    assert!(cache.contains("a/b"));
}

#[tokio::test]
async fn test_create_method_not_allowed_counts_as_existing() {
    let (server, client, cache) = common::setup_wan().await;

    // Lost race: someone else created the collection between the probe
    // and the MKCOL. 405 is success.
    Mock::given(propfind())
        .and(path(common::dav_path("docs")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(mkcol())
        .and(path(common::dav_path("docs")))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;

    client.create_recursive_remote_path("docs").await.unwrap();
    assert!(cache.contains("docs"));
}

#[tokio::test]
async fn test_create_conflict_is_hard_failure() {
    let (server, client, _cache) = common::setup_wan().await;

    Mock::given(propfind())
        .and(path(common::dav_path("docs")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(mkcol())
        .and(path(common::dav_path("docs")))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    let err = client
        .create_recursive_remote_path("docs")
        .await
        .unwrap_err();
    assert!(matches!(err, WebDavError::ParentMissing(p) if p == "docs"));
}

// ============================================================================
// Cache sharing
// ============================================================================

#[tokio::test]
async fn test_cache_shared_between_clients() {
    let (server, client, cache) = common::setup_wan().await;

    Mock::given(propfind())
        .and(path(common::dav_path("docs")))
        .respond_with(ResponseTemplate::new(207))
        .expect(1)
        .mount(&server)
        .await;

    client.check_directory_exists("docs").await.unwrap();

    // A second client over the same cache never hits the network.
    let second_server = MockServer::start().await;
    let second = davwatch_webdav::WebDavClient::new(
        reqwest::Client::new(),
        second_server.uri(),
        common::REMOTE_ROOT,
        davwatch_webdav::Variant::Lan,
        cache,
    );
    let status = second.check_directory_exists("docs").await.unwrap();
    assert_eq!(status, DirectoryStatus::Exists);
}
