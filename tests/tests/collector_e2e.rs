//! Collector against a live server.
//!
//! Serves the real router on a local port and drives it through the
//! collector's HTTP transport.

use collector::{Collector, CollectorConfig, HttpTransport, MemoryRecoveryStore, SessionState};
use integration_tests::{
    fixtures::{self, KIOSK_ID},
    setup::TestContext,
};
use journey_core::{Details, EventType, Outcome, ProductType};
use serde_json::Value;
use std::sync::Arc;

async fn connected_collector(ctx: &TestContext) -> Collector {
    let base_url = ctx.spawn_http().await;
    let mut config = CollectorConfig::new(base_url, KIOSK_ID);
    config.retry_delay_ms = 10;
    let transport = Arc::new(HttpTransport::new(&config).expect("Failed to build transport"));
    Collector::builder(config, transport)
        .recovery_store(Arc::new(MemoryRecoveryStore::new()))
        .build()
}

#[tokio::test]
async fn test_collector_session_round_trip() {
    let ctx = TestContext::new();
    let collector = connected_collector(&ctx).await;

    let session_id = collector.start_session().await.expect("start failed");
    assert_eq!(collector.state(), SessionState::Active);

    collector.track_page_view("/kiosk/home");
    collector.track_click("Greeting cards", None);
    collector.track_page_view("/templates");
    collector.track_search(EventType::CardSearch, "birthday", 8);
    collector.track_card_event(EventType::CardSelect, Details::new());
    collector.track_checkout_event(EventType::CheckoutStart, Details::new());
    collector.track_checkout_event(EventType::PaymentSuccess, Details::new());
    collector.track_output_event(EventType::PrintComplete, ProductType::Card, Details::new());

    assert!(collector.flush().await > 0);
    assert_eq!(collector.buffered(), 0);

    let outcome = collector.complete_session().await.expect("end failed");
    assert_eq!(outcome, Outcome::PrintedCard);
    assert_eq!(collector.state(), SessionState::Idle);

    let server = ctx.server();
    let view: Value = server
        .get(&format!("/kiosks/{}/sessions/{}", KIOSK_ID, session_id))
        .await
        .json();

    assert_eq!(view["session"]["outcome"], "printed_card");
    assert_eq!(view["session"]["pagesVisited"].as_array().unwrap().len(), 2);
    assert_eq!(view["session"]["usedSearch"], true);

    let journey = view["journey"].as_array().unwrap();
    assert_eq!(journey.len(), 2);
    assert_eq!(journey[1]["page"], "/templates");

    let types: Vec<&str> = view["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["eventType"].as_str().unwrap())
        .collect();
    assert_eq!(types.first(), Some(&"session_start"));
    assert_eq!(types.last(), Some(&"session_end"));
    assert!(types.contains(&"page_exit"));

    let summary = view["behaviorSummary"].as_str().unwrap();
    assert!(summary.contains("searched for \"birthday\""), "{}", summary);
    assert!(summary.ends_with("and successfully printed a greeting card."));
}

#[tokio::test]
async fn test_collector_stops_after_session_ended_elsewhere() {
    let ctx = TestContext::new();
    let collector = connected_collector(&ctx).await;
    let session_id = collector.start_session().await.expect("start failed");

    let server = ctx.server();
    server
        .post("/sessions/end")
        .json(&fixtures::end_body(&session_id, "abandoned"))
        .await
        .assert_status_ok();

    collector.track_page_view("/kiosk/home");
    assert_eq!(collector.flush().await, 0);

    assert_eq!(collector.state(), SessionState::Idle);
    assert!(collector.session_id().is_none());
    assert!(!collector.track_page_view("/templates"));
}

#[tokio::test]
async fn test_collector_requeues_while_store_is_down() {
    let ctx = TestContext::new();
    let collector = connected_collector(&ctx).await;
    collector.start_session().await.expect("start failed");
    collector.track_page_view("/kiosk/home");

    ctx.set_store_failure(true);
    assert_eq!(collector.flush().await, 0);
    assert_eq!(collector.buffered(), 2);
    assert_eq!(collector.state(), SessionState::Active);

    ctx.set_store_failure(false);
    assert_eq!(collector.flush().await, 2);
    assert_eq!(collector.buffered(), 0);
}

#[tokio::test]
async fn test_collector_offline_queue_delivered_on_reconnect() {
    let ctx = TestContext::new();
    let collector = connected_collector(&ctx).await;
    let session_id = collector.start_session().await.expect("start failed");

    collector.set_online(false).await;
    collector.track_page_view("/stickers");
    collector.track_sticker_event(EventType::StickerSelect, Details::new());
    assert_eq!(collector.flush().await, 0);

    collector.set_online(true).await;
    assert_eq!(collector.buffered(), 0);

    let server = ctx.server();
    let view: Value = server
        .get(&format!("/kiosks/{}/sessions/{}", KIOSK_ID, session_id))
        .await
        .json();
    assert_eq!(view["session"]["totalEvents"], 3);
    assert_eq!(view["session"]["browsedStickers"], true);
}

#[tokio::test]
async fn test_collector_end_delivers_size_flush_in_flight() {
    let ctx = TestContext::new();
    let collector = connected_collector(&ctx).await;
    let session_id = collector.start_session().await.expect("start failed");

    // session_start plus 120 clicks: one size-triggered batch of 100 is
    // still in flight when the session ends.
    for i in 0..120 {
        assert!(collector.track_click(&format!("tile-{}", i), None));
    }
    collector
        .end_session(Outcome::Abandoned)
        .await
        .expect("end failed");

    let server = ctx.server();
    let view: Value = server
        .get(&format!("/kiosks/{}/sessions/{}", KIOSK_ID, session_id))
        .await
        .json();
    assert_eq!(view["session"]["totalEvents"], 122);
    assert_eq!(view["session"]["totalClicks"], 120);
    assert_eq!(view["session"]["outcome"], "abandoned");
}
