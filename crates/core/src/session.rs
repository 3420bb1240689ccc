//! Session record and its aggregate counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::{Event, EventType};
use crate::outcome::Outcome;

/// Boolean feature-usage flags, OR-ed in as events arrive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlags {
    pub browsed_cards: bool,
    pub browsed_stickers: bool,
    pub used_search: bool,
    pub uploaded_image: bool,
    pub used_editor: bool,
    pub reached_checkout: bool,
    pub completed_payment: bool,
    pub has_recording: bool,
}

impl FeatureFlags {
    /// Flags implied by a single event type.
    pub fn from_event_type(event_type: EventType) -> Self {
        use EventType::*;

        let mut flags = Self::default();
        match event_type {
            CardBrowse | CardSearch | CardSelect => flags.browsed_cards = true,
            StickerBrowse | StickerSearch | StickerSelect => flags.browsed_stickers = true,
            StickerUploadComplete => flags.uploaded_image = true,
            EditorOpen | EditorSave => flags.used_editor = true,
            CheckoutStart => flags.reached_checkout = true,
            PaymentSuccess => flags.completed_payment = true,
            _ => {}
        }
        if event_type.is_search() {
            flags.used_search = true;
        }
        flags
    }

    /// Bitwise OR of two flag sets.
    pub fn union(self, other: Self) -> Self {
        Self {
            browsed_cards: self.browsed_cards || other.browsed_cards,
            browsed_stickers: self.browsed_stickers || other.browsed_stickers,
            used_search: self.used_search || other.used_search,
            uploaded_image: self.uploaded_image || other.uploaded_image,
            used_editor: self.used_editor || other.used_editor,
            reached_checkout: self.reached_checkout || other.reached_checkout,
            completed_payment: self.completed_payment || other.completed_payment,
            has_recording: self.has_recording || other.has_recording,
        }
    }
}

/// Additive update produced by one ingested batch.
///
/// Applying deltas is commutative for counters and flags, so concurrent
/// batches for the same session can be applied in any order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateDelta {
    pub total_events: u64,
    pub total_clicks: u64,
    /// Pages from `page_view` events, first occurrence order
    pub pages: Vec<String>,
    pub flags: FeatureFlags,
}

impl AggregateDelta {
    /// Computes the delta for a batch in the order received.
    pub fn from_events(events: &[Event]) -> Self {
        let mut delta = Self {
            total_events: events.len() as u64,
            ..Default::default()
        };

        for event in events {
            if event.event_type.is_click() {
                delta.total_clicks += 1;
            }
            if event.event_type == EventType::PageView && !delta.pages.contains(&event.page) {
                delta.pages.push(event.page.clone());
            }
            delta.flags = delta.flags.union(FeatureFlags::from_event_type(event.event_type));
        }

        delta
    }
}

/// One kiosk visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub kiosk_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub total_events: u64,
    pub total_clicks: u64,
    /// Distinct page identifiers in first-visit order
    pub pages_visited: Vec<String>,
    #[serde(flatten)]
    pub flags: FeatureFlags,
    pub outcome: Outcome,
}

impl Session {
    /// Creates a new active session with a server-issued id.
    pub fn new(kiosk_id: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), kiosk_id, Utc::now())
    }

    pub fn with_id(
        session_id: impl Into<String>,
        kiosk_id: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            kiosk_id: kiosk_id.into(),
            started_at,
            ended_at: None,
            duration_seconds: None,
            total_events: 0,
            total_clicks: 0,
            pages_visited: Vec::new(),
            flags: FeatureFlags::default(),
            outcome: Outcome::InProgress,
        }
    }

    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Folds a batch delta into the aggregates.
    pub fn apply(&mut self, delta: &AggregateDelta) {
        self.total_events += delta.total_events;
        self.total_clicks += delta.total_clicks;
        for page in &delta.pages {
            if !self.pages_visited.contains(page) {
                self.pages_visited.push(page.clone());
            }
        }
        self.flags = self.flags.union(delta.flags);
    }

    /// Ends the session.
    ///
    /// Duration is floored to whole seconds and never negative.
    pub fn end(&mut self, outcome: Outcome, ended_at: DateTime<Utc>) {
        let seconds = (ended_at - self.started_at).num_seconds().max(0);
        self.ended_at = Some(ended_at);
        self.duration_seconds = Some(seconds);
        self.outcome = outcome.terminal();
    }

    /// Outcome as seen by readers: `in_progress` until ended.
    pub fn effective_outcome(&self) -> Outcome {
        if self.ended_at.is_none() {
            Outcome::InProgress
        } else {
            self.outcome
        }
    }
}
