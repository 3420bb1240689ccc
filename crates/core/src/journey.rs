//! Journey reconstruction.
//!
//! Groups a session's event log into page-visit segments. A segment opens
//! on every `page_view` and absorbs everything until the next one. Events
//! seen before the first `page_view` belong to no segment and are dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::{Event, EventType};

/// Fixed highlight markers, in output priority order.
const MARKERS: [(EventType, &str); 8] = [
    (EventType::CardSelect, "Selected a greeting card"),
    (EventType::StickerSelect, "Selected a sticker"),
    (EventType::EditorOpen, "Opened the editor"),
    (EventType::StickerUploadComplete, "Uploaded an image"),
    (EventType::CheckoutStart, "Started checkout"),
    (EventType::PaymentSuccess, "Completed payment"),
    (EventType::PrintComplete, "Printed successfully"),
    (EventType::DigitalSend, "Sent digitally"),
];

/// One contiguous visit to a page. Derived on every read, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyStep {
    pub page: String,
    pub entered_at: DateTime<Utc>,
    pub exited_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub event_count: usize,
    pub highlights: Vec<String>,
}

struct OpenSegment<'a> {
    page: &'a str,
    entered_at: DateTime<Utc>,
    events: Vec<&'a Event>,
}

impl<'a> OpenSegment<'a> {
    fn open(event: &'a Event) -> Self {
        Self {
            page: &event.page,
            entered_at: event.timestamp,
            events: vec![event],
        }
    }

    fn close(self, exited_at: DateTime<Utc>) -> JourneyStep {
        let duration_ms = (exited_at - self.entered_at).num_milliseconds().max(0);
        JourneyStep {
            page: self.page.to_string(),
            entered_at: self.entered_at,
            exited_at,
            duration_ms,
            event_count: self.events.len(),
            highlights: highlights(&self.events),
        }
    }
}

/// Reconstructs the journey for one session's event log.
///
/// Events are ordered by client timestamp (stable for ties), so arrival
/// order does not matter. An empty log, or one without any `page_view`,
/// yields an empty journey.
pub fn reconstruct(events: &[Event]) -> Vec<JourneyStep> {
    let mut ordered: Vec<&Event> = events.iter().collect();
    ordered.sort_by_key(|e| e.timestamp);

    let mut steps = Vec::new();
    let mut current: Option<OpenSegment<'_>> = None;

    for &event in &ordered {
        if event.event_type == EventType::PageView {
            if let Some(segment) = current.take() {
                steps.push(segment.close(event.timestamp));
            }
            current = Some(OpenSegment::open(event));
        } else if let Some(segment) = current.as_mut() {
            segment.events.push(event);
        }
    }

    if let Some(segment) = current {
        // Non-empty: a segment only opens on an event.
        let exited_at = ordered
            .last()
            .map(|e| e.timestamp)
            .unwrap_or(segment.entered_at);
        steps.push(segment.close(exited_at));
    }

    steps
}

/// Derives the highlight strings for one segment.
fn highlights(events: &[&Event]) -> Vec<String> {
    let mut out = Vec::new();

    let mut queries: Vec<&str> = Vec::new();
    for query in events.iter().filter_map(|e| e.search_query()) {
        if !queries.contains(&query) {
            queries.push(query);
        }
    }
    out.extend(queries.iter().map(|q| format!("Searched: \"{}\"", q)));

    for (marker, text) in MARKERS {
        if events.iter().any(|e| e.event_type == marker) {
            out.push(text.to_string());
        }
    }

    let clicks = events.iter().filter(|e| e.event_type.is_click()).count();
    if clicks > 0 {
        out.push(format!("{} clicks", clicks));
    }

    out
}
