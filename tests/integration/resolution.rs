//! Identity resolution integration tests
//!
//! Header-borne API keys are resolved to their owning project by probing
//! the mock upstream; the resolved project must be memoized, shared across
//! concurrent requests, and never cached on failure.

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::{constants, RelayTestHarness};
use crate::mocks::vertex::MockVertex;

fn model_path() -> String {
    format!("/v1beta/models/{}", constants::TEST_MODEL_ACTION)
}

fn generation_body() -> Value {
    json!({
        "contents": [{ "role": "user", "parts": [{ "text": "Hello" }] }]
    })
}

#[tokio::test]
async fn test_header_key_resolves_to_project_scoped_path() {
    let harness = RelayTestHarness::new().await;
    harness
        .upstream
        .mock_probe_permission_denied(constants::TEST_PROJECT_ID)
        .await;
    harness
        .upstream
        .mock_project_call(
            constants::TEST_PROJECT_ID,
            constants::TEST_MODEL_ACTION,
            MockVertex::generation_response(),
        )
        .await;

    let response = harness
        .server
        .post(&model_path())
        .add_header(
            "x-goog-api-key".parse().unwrap(),
            constants::TEST_HEADER_KEY.parse().unwrap(),
        )
        .json(&generation_body())
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert!(json["candidates"].is_array());

    // The probe carried the caller's key on the generic path
    let probes = harness.upstream.probe_requests().await;
    assert_eq!(probes.len(), 1);
    assert!(probes[0]
        .url
        .query_pairs()
        .any(|(name, value)| name == "key" && value == constants::TEST_HEADER_KEY));
}

#[tokio::test]
async fn test_resolution_is_cached_across_requests() {
    let harness = RelayTestHarness::new().await;
    harness
        .upstream
        .mock_probe_permission_denied(constants::TEST_PROJECT_ID)
        .await;
    harness
        .upstream
        .mock_project_call(
            constants::TEST_PROJECT_ID,
            constants::TEST_MODEL_ACTION,
            MockVertex::generation_response(),
        )
        .await;

    for _ in 0..3 {
        let response = harness
            .server
            .post(&model_path())
            .add_header(
                "x-goog-api-key".parse().unwrap(),
                constants::TEST_HEADER_KEY.parse().unwrap(),
            )
            .json(&generation_body())
            .await;
        response.assert_status_ok();
    }

    assert_eq!(harness.upstream.probe_requests().await.len(), 1);
    assert_eq!(harness.upstream.forwarded_requests().await.len(), 3);
}

#[tokio::test]
async fn test_concurrent_requests_share_one_probe() {
    let harness = RelayTestHarness::new().await;
    harness
        .upstream
        .mock_probe_permission_denied_with_delay(
            constants::TEST_PROJECT_ID,
            Duration::from_millis(50),
        )
        .await;
    harness
        .upstream
        .mock_project_call(
            constants::TEST_PROJECT_ID,
            constants::TEST_MODEL_ACTION,
            MockVertex::generation_response(),
        )
        .await;

    let path = model_path();
    let body = generation_body();

    let (first, second) = tokio::join!(
        async {
            harness
                .server
                .post(&path)
                .add_header(
                    "x-goog-api-key".parse().unwrap(),
                    constants::TEST_HEADER_KEY.parse().unwrap(),
                )
                .json(&body)
                .await
        },
        async {
            harness
                .server
                .post(&path)
                .add_header(
                    "x-goog-api-key".parse().unwrap(),
                    constants::TEST_HEADER_KEY.parse().unwrap(),
                )
                .json(&body)
                .await
        },
    );

    first.assert_status_ok();
    second.assert_status_ok();
    assert_eq!(harness.upstream.probe_requests().await.len(), 1);
}

#[tokio::test]
async fn test_bearer_key_resolves_like_custom_header() {
    let harness = RelayTestHarness::new().await;
    harness
        .upstream
        .mock_probe_permission_denied(constants::TEST_PROJECT_ID)
        .await;
    harness
        .upstream
        .mock_project_call(
            constants::TEST_PROJECT_ID,
            constants::TEST_MODEL_ACTION,
            MockVertex::generation_response(),
        )
        .await;

    let response = harness
        .server
        .post(&model_path())
        .add_header(
            "authorization".parse().unwrap(),
            format!("Bearer {}", constants::TEST_HEADER_KEY)
                .parse()
                .unwrap(),
        )
        .json(&generation_body())
        .await;

    response.assert_status_ok();

    // The Bearer prefix is stripped before the key is used anywhere
    let probes = harness.upstream.probe_requests().await;
    assert_eq!(probes.len(), 1);
    assert!(probes[0]
        .url
        .query_pairs()
        .any(|(name, value)| name == "key" && value == constants::TEST_HEADER_KEY));
}

#[tokio::test]
async fn test_invalid_key_returns_401_and_is_not_cached() {
    let harness = RelayTestHarness::new().await;
    harness.upstream.mock_probe_invalid_key().await;

    for _ in 0..2 {
        let response = harness
            .server
            .post(&model_path())
            .add_header(
                "x-goog-api-key".parse().unwrap(),
                constants::TEST_HEADER_KEY.parse().unwrap(),
            )
            .json(&generation_body())
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let json: Value = response.json();
        assert!(json["error"].as_str().unwrap().contains("resolved"));
    }

    // The failure was not cached: every request probed again, and nothing
    // was ever forwarded
    assert_eq!(harness.upstream.probe_requests().await.len(), 2);
    assert!(harness.upstream.forwarded_requests().await.is_empty());
}

#[tokio::test]
async fn test_unusable_probe_response_returns_401() {
    let harness = RelayTestHarness::new().await;
    harness.upstream.mock_probe_unusable().await;

    let response = harness
        .server
        .post(&model_path())
        .add_header(
            "x-goog-api-key".parse().unwrap(),
            constants::TEST_HEADER_KEY.parse().unwrap(),
        )
        .json(&generation_body())
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert!(harness.upstream.forwarded_requests().await.is_empty());
}

#[tokio::test]
async fn test_query_key_skips_resolution() {
    let harness = RelayTestHarness::new().await;
    harness
        .upstream
        .mock_generic_call(
            constants::TEST_MODEL_ACTION,
            MockVertex::generation_response(),
        )
        .await;

    let response = harness
        .server
        .post(&format!(
            "{}?key={}",
            model_path(),
            constants::TEST_QUERY_KEY
        ))
        .json(&generation_body())
        .await;

    response.assert_status_ok();

    // No probe happened; the call rode the generic path with the query key
    assert_eq!(harness.upstream.probe_requests().await.len(), 0);
    let forwarded = harness.upstream.forwarded_requests().await;
    assert_eq!(forwarded.len(), 1);
    assert!(forwarded[0]
        .url
        .query_pairs()
        .any(|(name, value)| name == "key" && value == constants::TEST_QUERY_KEY));
}
