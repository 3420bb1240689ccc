//! Tests for error handling on the ingestion and session endpoints.
//!
//! Verifies the error codes and the `retryable` flag clients branch on.

use axum::http::StatusCode;
use integration_tests::{
    fixtures::{self, KIOSK_ID},
    setup::{start_session, TestContext},
};
use serde_json::Value;

/// Batch for a session that was never started returns SESSION_001
#[tokio::test]
async fn test_unknown_session_returns_session_001() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let events = fixtures::clicks("no-such-session", "/kiosk/home", 1);
    let response = server
        .post("/sessions/events")
        .json(&fixtures::batch("no-such-session", events))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["code"], "SESSION_001");
    assert_eq!(body["retryable"], false);
}

/// Batch for an ended session returns SESSION_002 and is not stored
#[tokio::test]
async fn test_ended_session_returns_session_002() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let session_id = start_session(&server, KIOSK_ID).await;

    server
        .post("/sessions/end")
        .json(&fixtures::end_body(&session_id, "abandoned"))
        .await
        .assert_status_ok();

    let events = fixtures::clicks(&session_id, "/kiosk/home", 2);
    let response = server
        .post("/sessions/events")
        .json(&fixtures::batch(&session_id, events))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["code"], "SESSION_002");
    assert_eq!(body["retryable"], false);

    let view: Value = server
        .get(&format!("/kiosks/{}/sessions/{}", KIOSK_ID, session_id))
        .await
        .json();
    assert_eq!(view["session"]["totalEvents"], 0);
    assert_eq!(view["session"]["outcome"], "abandoned");
}

/// Ending a session twice returns SESSION_002
#[tokio::test]
async fn test_double_end_returns_session_002() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let session_id = start_session(&server, KIOSK_ID).await;

    server
        .post("/sessions/end")
        .json(&fixtures::end_body(&session_id, "printed_card"))
        .await
        .assert_status_ok();

    let response = server
        .post("/sessions/end")
        .json(&fixtures::end_body(&session_id, "abandoned"))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["code"], "SESSION_002");
}

/// Malformed JSON returns VALID_001
#[tokio::test]
async fn test_invalid_json_returns_valid_001() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/sessions/events")
        .content_type("application/json")
        .bytes("not valid json {".into())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALID_001");
    assert_eq!(body["retryable"], false);
}

/// Unknown event type rejects the whole batch with VALID_001
#[tokio::test]
async fn test_unknown_event_type_rejects_batch() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let session_id = start_session(&server, KIOSK_ID).await;

    let mut events = fixtures::clicks(&session_id, "/kiosk/home", 2);
    events.push(fixtures::event(
        &session_id,
        "teleport",
        "/kiosk/home",
        chrono::Utc::now(),
    ));
    let response = server
        .post("/sessions/events")
        .json(&fixtures::batch(&session_id, events))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALID_001");

    let view: Value = server
        .get(&format!("/kiosks/{}/sessions/{}", KIOSK_ID, session_id))
        .await
        .json();
    assert_eq!(view["session"]["totalEvents"], 0);
}

/// Empty page rejects the whole batch with VALID_001
#[tokio::test]
async fn test_empty_page_rejects_batch() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let session_id = start_session(&server, KIOSK_ID).await;

    let events = vec![fixtures::event(&session_id, "click", "", chrono::Utc::now())];
    let response = server
        .post("/sessions/events")
        .json(&fixtures::batch(&session_id, events))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALID_001");
}

/// Too many events in one batch returns VALID_002
#[tokio::test]
async fn test_oversized_batch_returns_valid_002() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let session_id = start_session(&server, KIOSK_ID).await;

    let events = fixtures::clicks(&session_id, "/kiosk/home", 501);
    let response = server
        .post("/sessions/events")
        .json(&fixtures::batch(&session_id, events))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALID_002");
}

/// Event for another session inside the batch returns VALID_003
#[tokio::test]
async fn test_mixed_sessions_returns_valid_003() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let session_id = start_session(&server, KIOSK_ID).await;

    let mut events = fixtures::clicks(&session_id, "/kiosk/home", 1);
    events.extend(fixtures::clicks("someone-else", "/kiosk/home", 1));
    let response = server
        .post("/sessions/events")
        .json(&fixtures::batch(&session_id, events))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALID_003");
}

/// Missing kiosk id on start returns VALID_001
#[tokio::test]
async fn test_start_without_kiosk_returns_valid_001() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/sessions/start")
        .json(&fixtures::start_body(""))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALID_001");
}

/// Store failure returns STORE_001 marked retryable
#[tokio::test]
async fn test_store_failure_returns_retryable_store_001() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let session_id = start_session(&server, KIOSK_ID).await;

    ctx.set_store_failure(true);
    let events = fixtures::clicks(&session_id, "/kiosk/home", 3);
    let response = server
        .post("/sessions/events")
        .json(&fixtures::batch(&session_id, events))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["code"], "STORE_001");
    assert_eq!(body["retryable"], true);
}

/// Session read from another kiosk's path returns SESSION_001
#[tokio::test]
async fn test_foreign_kiosk_read_returns_session_001() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let session_id = start_session(&server, KIOSK_ID).await;

    let response = server
        .get(&format!("/kiosks/{}/sessions/{}", "kiosk-other", session_id))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["code"], "SESSION_001");
}
