//! End-to-end tests for session start, batch ingestion and session end.
//!
//! Drives the real Axum router against the in-process store.

use integration_tests::{
    fixtures::{self, KIOSK_ID},
    setup::{start_session, TestContext},
};
use serde_json::Value;

#[tokio::test]
async fn test_start_session_issues_id_and_recording_info() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/sessions/start")
        .json(&fixtures::start_body(KIOSK_ID))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert!(!body["sessionId"].as_str().unwrap().is_empty());
    assert_eq!(body["recording"]["enabled"], false);
}

#[tokio::test]
async fn test_batch_appended_and_aggregated() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let session_id = start_session(&server, KIOSK_ID).await;

    let now = chrono::Utc::now();
    let mut events = vec![fixtures::event(&session_id, "page_view", "/kiosk/home", now)];
    events.extend(fixtures::clicks(&session_id, "/kiosk/home", 3));
    events.push(fixtures::event(
        &session_id,
        "checkout_start",
        "/checkout",
        now + chrono::Duration::seconds(10),
    ));

    let response = server
        .post("/sessions/events")
        .json(&fixtures::batch(&session_id, events))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["received"], 5);

    let view: Value = server
        .get(&format!("/kiosks/{}/sessions/{}", KIOSK_ID, session_id))
        .await
        .json();
    let session = &view["session"];
    assert_eq!(session["totalEvents"], 5);
    assert_eq!(session["totalClicks"], 3);
    assert_eq!(session["pagesVisited"], serde_json::json!(["/kiosk/home"]));
    assert_eq!(session["reachedCheckout"], true);
    assert_eq!(session["outcome"], "in_progress");
    assert!(session["endedAt"].is_null());
}

#[tokio::test]
async fn test_null_detail_values_are_accepted() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let session_id = start_session(&server, KIOSK_ID).await;

    let events = vec![fixtures::event_with(
        &session_id,
        "search",
        "/templates",
        chrono::Utc::now(),
        serde_json::json!({ "searchQuery": null, "resultCount": 0 }),
    )];
    let response = server
        .post("/sessions/events")
        .json(&fixtures::batch(&session_id, events))
        .await;
    response.assert_status_ok();

    let view: Value = server
        .get(&format!("/kiosks/{}/sessions/{}", KIOSK_ID, session_id))
        .await
        .json();
    let details = &view["events"][0]["details"];
    assert!(details.get("searchQuery").is_none());
    assert_eq!(details["resultCount"], 0);
}

#[tokio::test]
async fn test_concurrent_batches_keep_every_count() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let session_id = start_session(&server, KIOSK_ID).await;

    let base_url = ctx.spawn_http().await;
    let client = reqwest::Client::new();
    let mut handles = Vec::new();
    for _ in 0..10 {
        let client = client.clone();
        let url = format!("{}/sessions/events", base_url);
        let session_id = session_id.clone();
        handles.push(tokio::spawn(async move {
            let events = fixtures::clicks(&session_id, "/templates", 10);
            let response = client
                .post(url)
                .json(&fixtures::batch(&session_id, events))
                .send()
                .await
                .expect("request failed");
            assert!(response.status().is_success());
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let view: Value = server
        .get(&format!("/kiosks/{}/sessions/{}", KIOSK_ID, session_id))
        .await
        .json();
    assert_eq!(view["session"]["totalEvents"], 100);
    assert_eq!(view["session"]["totalClicks"], 100);
    assert_eq!(view["events"].as_array().unwrap().len(), 100);
}

#[tokio::test]
async fn test_end_session_records_outcome_and_duration() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let session_id = start_session(&server, KIOSK_ID).await;

    let response = server
        .post("/sessions/end")
        .json(&fixtures::end_body(&session_id, "sent_digital"))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["session"]["outcome"], "sent_digital");
    assert!(body["session"]["endedAt"].is_string());
    assert!(body["session"]["durationSeconds"].as_i64().unwrap() >= 0);
}

#[tokio::test]
async fn test_end_with_in_progress_is_recorded_as_abandoned() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let session_id = start_session(&server, KIOSK_ID).await;

    let body: Value = server
        .post("/sessions/end")
        .json(&fixtures::end_body(&session_id, "in_progress"))
        .await
        .json();

    assert_eq!(body["session"]["outcome"], "abandoned");
}

#[tokio::test]
async fn test_recording_enabled_for_listed_kiosk() {
    let ctx = TestContext::with_recording(api::RecordingSettings {
        enabled: true,
        kiosks: vec![KIOSK_ID.to_string()],
        frame_rate: 2,
        max_duration_secs: 900,
    });
    let server = ctx.server();

    let listed: Value = server
        .post("/sessions/start")
        .json(&fixtures::start_body(KIOSK_ID))
        .await
        .json();
    assert_eq!(listed["recording"]["enabled"], true);
    assert_eq!(listed["recording"]["config"]["frameRate"], 2);

    let session_id = listed["sessionId"].as_str().unwrap();
    let view: Value = server
        .get(&format!("/kiosks/{}/sessions/{}", KIOSK_ID, session_id))
        .await
        .json();
    assert_eq!(view["session"]["hasRecording"], true);

    let other: Value = server
        .post("/sessions/start")
        .json(&fixtures::start_body("kiosk-unlisted"))
        .await
        .json();
    assert_eq!(other["recording"]["enabled"], false);
}
