//! Event vocabulary shared by the collector, the ingestion endpoint and
//! the journey read path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use validator::{Validate, ValidationError};

use crate::error::{Error, Result, ValidationErrorCode};
use crate::limits::{MAX_BATCH_EVENTS, MAX_DETAIL_TEXT_LEN};

/// All tracked event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SessionStart,
    SessionTimeout,
    SessionEnd,
    PageView,
    PageExit,
    Click,
    TileSelect,
    Search,
    CardBrowse,
    CardSearch,
    CardSelect,
    StickerBrowse,
    StickerSearch,
    StickerSelect,
    StickerUploadStart,
    StickerUploadComplete,
    EditorOpen,
    EditorSave,
    EditorClose,
    CheckoutStart,
    CheckoutCancel,
    PaymentStart,
    PaymentSuccess,
    PaymentFailed,
    PrintStart,
    PrintComplete,
    PrintFailed,
    DigitalSend,
    Error,
}

impl EventType {
    pub const ALL: [EventType; 29] = [
        Self::SessionStart,
        Self::SessionTimeout,
        Self::SessionEnd,
        Self::PageView,
        Self::PageExit,
        Self::Click,
        Self::TileSelect,
        Self::Search,
        Self::CardBrowse,
        Self::CardSearch,
        Self::CardSelect,
        Self::StickerBrowse,
        Self::StickerSearch,
        Self::StickerSelect,
        Self::StickerUploadStart,
        Self::StickerUploadComplete,
        Self::EditorOpen,
        Self::EditorSave,
        Self::EditorClose,
        Self::CheckoutStart,
        Self::CheckoutCancel,
        Self::PaymentStart,
        Self::PaymentSuccess,
        Self::PaymentFailed,
        Self::PrintStart,
        Self::PrintComplete,
        Self::PrintFailed,
        Self::DigitalSend,
        Self::Error,
    ];

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionStart => "session_start",
            Self::SessionTimeout => "session_timeout",
            Self::SessionEnd => "session_end",
            Self::PageView => "page_view",
            Self::PageExit => "page_exit",
            Self::Click => "click",
            Self::TileSelect => "tile_select",
            Self::Search => "search",
            Self::CardBrowse => "card_browse",
            Self::CardSearch => "card_search",
            Self::CardSelect => "card_select",
            Self::StickerBrowse => "sticker_browse",
            Self::StickerSearch => "sticker_search",
            Self::StickerSelect => "sticker_select",
            Self::StickerUploadStart => "sticker_upload_start",
            Self::StickerUploadComplete => "sticker_upload_complete",
            Self::EditorOpen => "editor_open",
            Self::EditorSave => "editor_save",
            Self::EditorClose => "editor_close",
            Self::CheckoutStart => "checkout_start",
            Self::CheckoutCancel => "checkout_cancel",
            Self::PaymentStart => "payment_start",
            Self::PaymentSuccess => "payment_success",
            Self::PaymentFailed => "payment_failed",
            Self::PrintStart => "print_start",
            Self::PrintComplete => "print_complete",
            Self::PrintFailed => "print_failed",
            Self::DigitalSend => "digital_send",
            Self::Error => "error",
        }
    }

    /// Parses the wire name back into a type.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == s)
    }

    pub fn is_search(&self) -> bool {
        matches!(self, Self::Search | Self::CardSearch | Self::StickerSearch)
    }

    /// Counted towards `totalClicks`.
    pub fn is_click(&self) -> bool {
        matches!(self, Self::Click)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse semantic region of the kiosk UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Zone {
    Header,
    Navigation,
    Gallery,
    SearchBar,
    Editor,
    CheckoutForm,
    Output,
    Modal,
}

impl Zone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Navigation => "navigation",
            Self::Gallery => "gallery",
            Self::SearchBar => "search-bar",
            Self::Editor => "editor",
            Self::CheckoutForm => "checkout-form",
            Self::Output => "output",
            Self::Modal => "modal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [
            Self::Header,
            Self::Navigation,
            Self::Gallery,
            Self::SearchBar,
            Self::Editor,
            Self::CheckoutForm,
            Self::Output,
            Self::Modal,
        ]
        .into_iter()
        .find(|z| z.as_str() == s)
    }

    /// Infers the zone for an event whose caller did not name one.
    ///
    /// Typed events map directly; bare clicks fall back to the page.
    pub fn infer(event_type: EventType, page: &str) -> Option<Self> {
        use EventType::*;

        match event_type {
            Search | CardSearch | StickerSearch => Some(Self::SearchBar),
            CheckoutStart | CheckoutCancel | PaymentStart | PaymentSuccess | PaymentFailed => {
                Some(Self::CheckoutForm)
            }
            EditorOpen | EditorSave | EditorClose => Some(Self::Editor),
            CardBrowse | CardSelect | StickerBrowse | StickerSelect | TileSelect => {
                Some(Self::Gallery)
            }
            StickerUploadStart | StickerUploadComplete => Some(Self::Modal),
            PrintStart | PrintComplete | PrintFailed | DigitalSend => Some(Self::Output),
            Click => Self::infer_from_page(page),
            SessionStart | SessionTimeout | SessionEnd | PageView | PageExit | Error => None,
        }
    }

    fn infer_from_page(page: &str) -> Option<Self> {
        let page = page.to_ascii_lowercase();
        if page.contains("checkout") || page.contains("payment") {
            Some(Self::CheckoutForm)
        } else if page.contains("editor") || page.contains("customize") {
            Some(Self::Editor)
        } else if page.contains("search") {
            Some(Self::SearchBar)
        } else if page.contains("templates") || page.contains("stickers") || page.contains("gallery")
        {
            Some(Self::Gallery)
        } else {
            None
        }
    }
}

/// Pointer position plus the viewport it was measured in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

/// A scalar detail value. Nested objects and arrays are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetailValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl DetailValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Float(f) if f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }
}

impl From<&str> for DetailValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for DetailValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for DetailValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<u32> for DetailValue {
    fn from(n: u32) -> Self {
        Self::Integer(n as i64)
    }
}

impl From<usize> for DetailValue {
    fn from(n: usize) -> Self {
        Self::Integer(n as i64)
    }
}

impl From<f64> for DetailValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for DetailValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Well-known detail keys (camelCase on the wire).
pub mod keys {
    pub const SEARCH_QUERY: &str = "searchQuery";
    pub const RESULT_COUNT: &str = "resultCount";
    pub const TIME_ON_PAGE: &str = "timeOnPage";
    pub const EDIT_DURATION_MS: &str = "editDurationMs";
    pub const TOOL_NAME: &str = "toolName";
    pub const PRODUCT_TYPE: &str = "productType";
    pub const ITEM_NAME: &str = "itemName";
    pub const MESSAGE: &str = "message";
    pub const PREVIOUS_PAGE: &str = "previousPage";
    pub const OUTCOME: &str = "outcome";
    pub const KIOSK_ID: &str = "kioskId";
}

/// Open key-value payload attached to an event.
///
/// A `null` value on the wire is read as an absent key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Details(BTreeMap<String, DetailValue>);

impl<'de> Deserialize<'de> for Details {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = BTreeMap::<String, Option<DetailValue>>::deserialize(deserializer)?;
        Ok(Self(
            raw.into_iter()
                .filter_map(|(key, value)| Some((key, value?)))
                .collect(),
        ))
    }
}

impl Details {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<DetailValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<DetailValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&DetailValue> {
        self.0.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(DetailValue::as_text)
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(DetailValue::as_integer)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DetailValue)> {
        self.0.iter()
    }
}

fn validate_details(details: &Details) -> std::result::Result<(), ValidationError> {
    for (key, value) in details.iter() {
        let ok = match value {
            DetailValue::Text(s) => s.len() <= MAX_DETAIL_TEXT_LEN,
            DetailValue::Float(f) => f.is_finite(),
            _ => true,
        };
        if !ok || key.is_empty() {
            let mut err = ValidationError::new("invalid_detail");
            err.message = Some(format!("detail '{}' is empty, too long or not finite", key).into());
            return Err(err);
        }
    }
    Ok(())
}

/// Printed product kind carried by output events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Card,
    Sticker,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Sticker => "sticker",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "card" => Some(Self::Card),
            "sticker" => Some(Self::Sticker),
            _ => None,
        }
    }
}

/// Typed view over an event's details, keyed by event type.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload<'a> {
    Search {
        query: Option<&'a str>,
        result_count: Option<i64>,
    },
    PageExit {
        time_on_page_ms: Option<i64>,
    },
    EditorSave {
        edit_duration_ms: Option<i64>,
        tool: Option<&'a str>,
    },
    Output {
        product: Option<ProductType>,
    },
    Other(&'a Details),
}

/// A single tracked interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Owning session
    #[validate(length(min = 1, max = 128))]
    pub session_id: String,
    pub event_type: EventType,
    /// Logical page identifier
    #[validate(length(min = 1, max = 512))]
    pub page: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<Zone>,
    #[serde(default, skip_serializing_if = "Details::is_empty")]
    #[validate(custom(function = "validate_details"))]
    pub details: Details,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    /// Client-generated instant; reconstruction orders by this.
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Creates an event stamped with the current time.
    pub fn new(session_id: impl Into<String>, event_type: EventType, page: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            event_type,
            page: page.into(),
            zone: None,
            details: Details::new(),
            coordinates: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_zone(mut self, zone: Option<Zone>) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_details(mut self, details: Details) -> Self {
        self.details = details;
        self
    }

    pub fn with_coordinates(mut self, coordinates: Option<Coordinates>) -> Self {
        self.coordinates = coordinates;
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Explicit zone, or the inferred one.
    pub fn resolved_zone(&self) -> Option<Zone> {
        self.zone.or_else(|| Zone::infer(self.event_type, &self.page))
    }

    /// Returns the typed payload view for this event.
    pub fn payload(&self) -> EventPayload<'_> {
        match self.event_type {
            t if t.is_search() => EventPayload::Search {
                query: self
                    .details
                    .text(keys::SEARCH_QUERY)
                    .filter(|q| !q.trim().is_empty()),
                result_count: self.details.integer(keys::RESULT_COUNT),
            },
            EventType::PageExit => EventPayload::PageExit {
                time_on_page_ms: self.details.integer(keys::TIME_ON_PAGE),
            },
            EventType::EditorSave => EventPayload::EditorSave {
                edit_duration_ms: self.details.integer(keys::EDIT_DURATION_MS),
                tool: self.details.text(keys::TOOL_NAME),
            },
            EventType::PrintComplete | EventType::PrintStart | EventType::PrintFailed => {
                EventPayload::Output {
                    product: self.details.text(keys::PRODUCT_TYPE).and_then(ProductType::parse),
                }
            }
            _ => EventPayload::Other(&self.details),
        }
    }

    /// Search query carried by a search-type event.
    pub fn search_query(&self) -> Option<&str> {
        match self.payload() {
            EventPayload::Search { query, .. } => query,
            _ => None,
        }
    }
}

/// Batch of events submitted by a collector.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EventBatch {
    #[validate(length(min = 1, max = 128))]
    pub session_id: String,
    pub events: Vec<Event>,
}

impl EventBatch {
    pub fn new(session_id: impl Into<String>, events: Vec<Event>) -> Self {
        Self {
            session_id: session_id.into(),
            events,
        }
    }

    /// Validates the batch as a unit.
    ///
    /// Any invalid event rejects the whole batch so that the log never
    /// holds a partial submission.
    pub fn check(&self) -> Result<()> {
        if let Err(e) = self.validate() {
            return Err(Error::validation_code(
                ValidationErrorCode::InvalidFormat,
                e.to_string(),
            ));
        }

        if self.events.is_empty() {
            return Err(Error::validation_code(
                ValidationErrorCode::InvalidFormat,
                "batch contains no events",
            ));
        }

        if self.events.len() > MAX_BATCH_EVENTS {
            return Err(Error::validation_code(
                ValidationErrorCode::BatchTooLarge,
                format!(
                    "batch has {} events, exceeds {} limit",
                    self.events.len(),
                    MAX_BATCH_EVENTS
                ),
            ));
        }

        for (index, event) in self.events.iter().enumerate() {
            if event.session_id != self.session_id {
                return Err(Error::validation_code(
                    ValidationErrorCode::SessionMismatch,
                    format!(
                        "event {} belongs to session {}, batch is for {}",
                        index, event.session_id, self.session_id
                    ),
                ));
            }

            if let Err(e) = event.validate() {
                return Err(Error::validation_code(
                    ValidationErrorCode::InvalidFormat,
                    format!("event {}: {}", index, e),
                ));
            }
        }

        Ok(())
    }
}
