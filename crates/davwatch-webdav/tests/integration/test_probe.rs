//! Integration tests for the LAN reachability probe
//!
//! Verifies that only a timeout maps to "not reachable" and that every
//! other failure surfaces to the caller.

use std::time::Duration;

use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_probe_reachable_when_root_answers() {
    let server = MockServer::start().await;
    Mock::given(method("PROPFIND"))
        .respond_with(ResponseTemplate::new(207))
        .mount(&server)
        .await;

    let probe = common::probe_for(&server, Duration::from_secs(2));
    assert!(probe.is_reachable().await.unwrap());
}

#[tokio::test]
async fn test_probe_propagates_protocol_errors() {
    // A 500 on the root check is not a timeout; it surfaces instead of
    // being read as an availability answer.
    let server = MockServer::start().await;
    Mock::given(method("PROPFIND"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let probe = common::probe_for(&server, Duration::from_secs(2));
    let err = probe.is_reachable().await.unwrap_err();
    assert!(matches!(
        err,
        davwatch_webdav::WebDavError::Protocol { status, .. } if status.as_u16() == 500
    ));
}

#[tokio::test]
async fn test_probe_timeout_means_not_reachable() {
    let server = MockServer::start().await;
    Mock::given(method("PROPFIND"))
        .respond_with(ResponseTemplate::new(207).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let probe = common::probe_for(&server, Duration::from_millis(100));
    assert!(!probe.is_reachable().await.unwrap());
}

#[tokio::test]
async fn test_probe_propagates_non_timeout_failures() {
    // Bind a server to learn a free port, then drop it so the port
    // refuses. Connection refusal is not a timeout and must surface.
    // A pooled server (`MockServer::start`) would keep listening after
    // drop, so build a dedicated one that really shuts down.
    let server = MockServer::builder().start().await;
    let probe = common::probe_for(&server, Duration::from_secs(2));
    drop(server);

    assert!(probe.is_reachable().await.is_err());
}

#[tokio::test]
async fn test_probe_not_found_root_counts_as_reachable() {
    // Misconfigured root folder: 404 maps to Absent, not an error, and
    // the endpoint answered, so it is reachable.
    let server = MockServer::start().await;
    Mock::given(method("PROPFIND"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let probe = common::probe_for(&server, Duration::from_secs(2));
    assert!(probe.is_reachable().await.unwrap());
}
