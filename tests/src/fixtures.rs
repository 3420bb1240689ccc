//! Request payload builders.

use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};

pub const KIOSK_ID: &str = "kiosk-test-01";

pub fn start_body(kiosk_id: &str) -> Value {
    json!({ "kioskId": kiosk_id })
}

pub fn end_body(session_id: &str, outcome: &str) -> Value {
    json!({ "sessionId": session_id, "outcome": outcome })
}

/// One event on the wire.
pub fn event(session_id: &str, event_type: &str, page: &str, at: DateTime<Utc>) -> Value {
    json!({
        "sessionId": session_id,
        "eventType": event_type,
        "page": page,
        "timestamp": at.to_rfc3339(),
    })
}

/// One event with a details map.
pub fn event_with(
    session_id: &str,
    event_type: &str,
    page: &str,
    at: DateTime<Utc>,
    details: Value,
) -> Value {
    let mut event = event(session_id, event_type, page, at);
    event["details"] = details;
    event
}

pub fn batch(session_id: &str, events: Vec<Value>) -> Value {
    json!({ "sessionId": session_id, "events": events })
}

/// `n` clicks one second apart on `page`.
pub fn clicks(session_id: &str, page: &str, n: usize) -> Vec<Value> {
    let base = Utc::now();
    (0..n)
        .map(|i| event(session_id, "click", page, base + Duration::seconds(i as i64)))
        .collect()
}

/// The printed-card visit: home, then a template picked, paid and printed.
pub fn printed_card_journey(session_id: &str, start: DateTime<Utc>) -> Vec<Value> {
    let at = |secs: i64| start + Duration::seconds(secs);
    vec![
        event(session_id, "page_view", "/kiosk/home", at(0)),
        event(session_id, "tile_select", "/kiosk/home", at(5)),
        event(session_id, "page_view", "/templates", at(10)),
        event(session_id, "card_select", "/templates", at(30)),
        event(session_id, "checkout_start", "/templates", at(60)),
        event(session_id, "payment_success", "/templates", at(90)),
        event_with(
            session_id,
            "print_complete",
            "/templates",
            at(120),
            json!({ "productType": "card" }),
        ),
    ]
}
