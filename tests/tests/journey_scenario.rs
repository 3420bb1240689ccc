//! Journey reconstruction and behavior summary through the read endpoint.

use chrono::{Duration, Utc};
use integration_tests::{
    fixtures::{self, KIOSK_ID},
    setup::{start_session, TestContext},
};
use serde_json::{json, Value};

fn highlights(step: &Value) -> Vec<String> {
    step["highlights"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h.as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_printed_card_journey() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let session_id = start_session(&server, KIOSK_ID).await;

    let start = Utc::now() - Duration::minutes(3);
    server
        .post("/sessions/events")
        .json(&fixtures::batch(
            &session_id,
            fixtures::printed_card_journey(&session_id, start),
        ))
        .await
        .assert_status_ok();
    server
        .post("/sessions/end")
        .json(&fixtures::end_body(&session_id, "printed_card"))
        .await
        .assert_status_ok();

    let view: Value = server
        .get(&format!("/kiosks/{}/sessions/{}", KIOSK_ID, session_id))
        .await
        .json();

    let journey = view["journey"].as_array().unwrap();
    assert_eq!(journey.len(), 2);
    assert_eq!(journey[0]["page"], "/kiosk/home");
    assert_eq!(journey[0]["durationMs"], 10_000);
    assert_eq!(journey[0]["eventCount"], 2);
    assert_eq!(journey[1]["page"], "/templates");
    assert_eq!(journey[1]["eventCount"], 5);

    let marks = highlights(&journey[1]);
    for expected in [
        "Selected a greeting card",
        "Completed payment",
        "Printed successfully",
    ] {
        assert!(marks.iter().any(|m| m == expected), "missing {}", expected);
    }

    let summary = view["behaviorSummary"].as_str().unwrap();
    assert!(
        summary.ends_with("and successfully printed a greeting card."),
        "unexpected summary: {}",
        summary
    );
    assert!(summary.contains("visited 2 pages"));
    assert!(summary.contains("browsed greeting cards"));
    assert!(summary.contains("completed payment"));
    assert_eq!(view["session"]["outcome"], "printed_card");
}

#[tokio::test]
async fn test_out_of_order_batches_reconstruct_by_timestamp() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let session_id = start_session(&server, KIOSK_ID).await;

    let start = Utc::now() - Duration::minutes(2);
    let events = fixtures::printed_card_journey(&session_id, start);
    let (early, late) = events.split_at(3);

    // Late half arrives first, as after a requeued retry.
    for part in [late.to_vec(), early.to_vec()] {
        server
            .post("/sessions/events")
            .json(&fixtures::batch(&session_id, part))
            .await
            .assert_status_ok();
    }

    let view: Value = server
        .get(&format!("/kiosks/{}/sessions/{}", KIOSK_ID, session_id))
        .await
        .json();

    let pages: Vec<&str> = view["journey"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["page"].as_str().unwrap())
        .collect();
    assert_eq!(pages, vec!["/kiosk/home", "/templates"]);

    let types: Vec<&str> = view["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["eventType"].as_str().unwrap())
        .collect();
    assert_eq!(types[0], "page_view");
    assert_eq!(types[6], "print_complete");
}

#[tokio::test]
async fn test_active_session_summary_reports_in_progress() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let session_id = start_session(&server, KIOSK_ID).await;

    let now = Utc::now();
    let events = vec![
        fixtures::event(&session_id, "page_view", "/stickers", now),
        fixtures::event_with(
            &session_id,
            "sticker_search",
            "/stickers",
            now + Duration::seconds(4),
            json!({ "searchQuery": "cats", "resultCount": 12 }),
        ),
    ];
    server
        .post("/sessions/events")
        .json(&fixtures::batch(&session_id, events))
        .await
        .assert_status_ok();

    let view: Value = server
        .get(&format!("/kiosks/{}/sessions/{}", KIOSK_ID, session_id))
        .await
        .json();

    let summary = view["behaviorSummary"].as_str().unwrap();
    assert!(summary.contains("searched for \"cats\""), "{}", summary);
    assert!(summary.ends_with("and is still in progress."), "{}", summary);
    assert_eq!(view["session"]["outcome"], "in_progress");
}

#[tokio::test]
async fn test_session_without_page_views_has_empty_journey() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let session_id = start_session(&server, KIOSK_ID).await;

    server
        .post("/sessions/events")
        .json(&fixtures::batch(
            &session_id,
            fixtures::clicks(&session_id, "/kiosk/home", 2),
        ))
        .await
        .assert_status_ok();

    let view: Value = server
        .get(&format!("/kiosks/{}/sessions/{}", KIOSK_ID, session_id))
        .await
        .json();

    assert!(view["journey"].as_array().unwrap().is_empty());
    assert_eq!(view["events"].as_array().unwrap().len(), 2);
}
