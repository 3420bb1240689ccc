//! Row types and conversions to and from the domain model.

use chrono::{DateTime, Utc};
use clickhouse::Row;
use journey_core::{
    AggregateDelta, Coordinates, Details, Error, Event, EventType, FeatureFlags, Outcome, Result,
    Session, StoreErrorCode, Zone,
};
use serde::{Deserialize, Serialize};

pub(crate) fn millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms).ok_or_else(|| {
        Error::store(
            StoreErrorCode::StoreFailed,
            format!("timestamp out of range: {}", ms),
        )
    })
}

fn corrupt(what: &str, value: &str) -> Error {
    Error::store(
        StoreErrorCode::StoreFailed,
        format!("unreadable {} in store: {}", what, value),
    )
}

#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct SessionRow {
    pub session_id: String,
    pub kiosk_id: String,
    pub started_at: i64,
    pub ended_at: Option<i64>,
    pub duration_seconds: Option<i64>,
    pub outcome: String,
    pub has_recording: u8,
    pub version: u64,
}

impl SessionRow {
    pub const STARTED: u64 = 1;
    pub const ENDED: u64 = 2;

    pub fn from_session(session: &Session) -> Self {
        Self {
            session_id: session.session_id.clone(),
            kiosk_id: session.kiosk_id.clone(),
            started_at: millis(session.started_at),
            ended_at: session.ended_at.map(millis),
            duration_seconds: session.duration_seconds,
            outcome: session.outcome.as_str().to_string(),
            has_recording: session.flags.has_recording as u8,
            version: if session.is_active() {
                Self::STARTED
            } else {
                Self::ENDED
            },
        }
    }

    /// Session without aggregates; fold counter rows in afterwards.
    pub fn into_session(self) -> Result<Session> {
        let mut session = Session::with_id(
            self.session_id,
            self.kiosk_id,
            from_millis(self.started_at)?,
        );
        session.ended_at = self.ended_at.map(from_millis).transpose()?;
        session.duration_seconds = self.duration_seconds;
        session.outcome = Outcome::parse(&self.outcome).ok_or_else(|| corrupt("outcome", &self.outcome))?;
        session.flags.has_recording = self.has_recording != 0;
        Ok(session)
    }
}

#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct EventRow {
    pub event_id: String,
    pub batch_id: String,
    pub seq: u32,
    pub session_id: String,
    pub event_type: String,
    pub page: String,
    pub zone: Option<String>,
    pub details: String,
    pub coordinates: Option<String>,
    pub timestamp: i64,
    pub received_at: i64,
}

impl EventRow {
    pub fn from_event(
        event: &Event,
        batch_id: &str,
        seq: u32,
        received_at: DateTime<Utc>,
    ) -> Result<Self> {
        Ok(Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            batch_id: batch_id.to_string(),
            seq,
            session_id: event.session_id.clone(),
            event_type: event.event_type.as_str().to_string(),
            page: event.page.clone(),
            zone: event.zone.map(|z| z.as_str().to_string()),
            details: serde_json::to_string(&event.details)?,
            coordinates: event
                .coordinates
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
            timestamp: millis(event.timestamp),
            received_at: millis(received_at),
        })
    }

    pub fn into_event(self) -> Result<Event> {
        let event_type =
            EventType::parse(&self.event_type).ok_or_else(|| corrupt("event type", &self.event_type))?;
        let zone = match self.zone {
            Some(z) => Some(Zone::parse(&z).ok_or_else(|| corrupt("zone", &z))?),
            None => None,
        };
        let details: Details = serde_json::from_str(&self.details)?;
        let coordinates: Option<Coordinates> = self
            .coordinates
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        Ok(Event::new(self.session_id, event_type, self.page)
            .with_zone(zone)
            .with_details(details)
            .with_coordinates(coordinates)
            .at(from_millis(self.timestamp)?))
    }
}

#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct CounterRow {
    pub session_id: String,
    pub batch_id: String,
    pub recorded_at: i64,
    pub total_events: u64,
    pub total_clicks: u64,
    pub pages: Vec<String>,
    pub flags: u16,
}

impl CounterRow {
    pub fn from_delta(
        session_id: &str,
        batch_id: &str,
        recorded_at: DateTime<Utc>,
        delta: &AggregateDelta,
    ) -> Self {
        Self {
            session_id: session_id.to_string(),
            batch_id: batch_id.to_string(),
            recorded_at: millis(recorded_at),
            total_events: delta.total_events,
            total_clicks: delta.total_clicks,
            pages: delta.pages.clone(),
            flags: flags_to_bits(&delta.flags),
        }
    }

    pub fn into_delta(self) -> AggregateDelta {
        AggregateDelta {
            total_events: self.total_events,
            total_clicks: self.total_clicks,
            pages: self.pages,
            flags: flags_from_bits(self.flags),
        }
    }
}

const BROWSED_CARDS: u16 = 1;
const BROWSED_STICKERS: u16 = 1 << 1;
const USED_SEARCH: u16 = 1 << 2;
const UPLOADED_IMAGE: u16 = 1 << 3;
const USED_EDITOR: u16 = 1 << 4;
const REACHED_CHECKOUT: u16 = 1 << 5;
const COMPLETED_PAYMENT: u16 = 1 << 6;
const HAS_RECORDING: u16 = 1 << 7;

pub fn flags_to_bits(flags: &FeatureFlags) -> u16 {
    [
        (flags.browsed_cards, BROWSED_CARDS),
        (flags.browsed_stickers, BROWSED_STICKERS),
        (flags.used_search, USED_SEARCH),
        (flags.uploaded_image, UPLOADED_IMAGE),
        (flags.used_editor, USED_EDITOR),
        (flags.reached_checkout, REACHED_CHECKOUT),
        (flags.completed_payment, COMPLETED_PAYMENT),
        (flags.has_recording, HAS_RECORDING),
    ]
    .iter()
    .filter(|(set, _)| *set)
    .fold(0, |bits, (_, bit)| bits | bit)
}

pub fn flags_from_bits(bits: u16) -> FeatureFlags {
    FeatureFlags {
        browsed_cards: bits & BROWSED_CARDS != 0,
        browsed_stickers: bits & BROWSED_STICKERS != 0,
        used_search: bits & USED_SEARCH != 0,
        uploaded_image: bits & UPLOADED_IMAGE != 0,
        used_editor: bits & USED_EDITOR != 0,
        reached_checkout: bits & REACHED_CHECKOUT != 0,
        completed_payment: bits & COMPLETED_PAYMENT != 0,
        has_recording: bits & HAS_RECORDING != 0,
    }
}
