//! ClickHouse store against a real server.
//!
//! Requires Docker (or `JOURNEY_TEST_CLICKHOUSE_URL`). Run with
//! `cargo test -p integration-tests --test clickhouse_store -- --ignored`.

use chrono::{Duration, Utc};
use integration_tests::{
    fixtures::{self, KIOSK_ID},
    setup::{start_session, ClickHouseContext},
};
use journey_core::{Event, EventType, Outcome, Session};
use serde_json::Value;
use session_store::{ch, SessionStore};

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_clickhouse_session_lifecycle() {
    let ctx = ClickHouseContext::new().await;
    ch::truncate_all(&ctx.client).await.ok();

    let session = Session::new(KIOSK_ID);
    ctx.store.create_session(&session).await.expect("create failed");
    let id = &session.session_id;

    let now = Utc::now();
    let first = vec![
        Event::new(id, EventType::PageView, "/kiosk/home").at(now),
        Event::new(id, EventType::Click, "/kiosk/home").at(now + Duration::seconds(1)),
    ];
    let second = vec![
        Event::new(id, EventType::PageView, "/templates").at(now + Duration::seconds(5)),
        Event::new(id, EventType::CheckoutStart, "/templates").at(now + Duration::seconds(9)),
    ];
    assert_eq!(ctx.store.append_events(id, second).await.unwrap(), 2);
    assert_eq!(ctx.store.append_events(id, first).await.unwrap(), 2);

    let loaded = ctx.store.get_session(id).await.unwrap().unwrap();
    assert_eq!(loaded.total_events, 4);
    assert_eq!(loaded.total_clicks, 1);
    assert_eq!(loaded.pages_visited.len(), 2);
    assert!(loaded.flags.reached_checkout);

    let events = ctx.store.list_events(id).await.unwrap();
    assert_eq!(events[0].page, "/kiosk/home");
    assert_eq!(events[3].event_type, EventType::CheckoutStart);
    assert_eq!(ch::count_events(&ctx.client, id).await.unwrap(), 4);

    let ended = ctx
        .store
        .end_session(id, Outcome::Abandoned, Utc::now())
        .await
        .unwrap();
    assert_eq!(ended.outcome, Outcome::Abandoned);
    assert!(ended.ended_at.is_some());

    let err = ctx
        .store
        .append_events(id, vec![Event::new(id, EventType::Click, "/")])
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), Some("SESSION_002"));

    let reloaded = ctx.store.get_session(id).await.unwrap().unwrap();
    assert_eq!(reloaded.outcome, Outcome::Abandoned);
    assert_eq!(reloaded.total_events, 4);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_clickhouse_journey_read_path() {
    let ctx = ClickHouseContext::new().await;
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

    assert_eq!(view["journey"].as_array().unwrap().len(), 2);
    assert_eq!(view["session"]["outcome"], "printed_card");
    let summary = view["behaviorSummary"].as_str().unwrap();
    assert!(summary.ends_with("and successfully printed a greeting card."));

    let response = server
        .post("/sessions/events")
        .json(&fixtures::batch(
            &session_id,
            fixtures::clicks(&session_id, "/templates", 1),
        ))
        .await;
    let body: Value = response.json();
    assert_eq!(body["code"], "SESSION_002");
}
