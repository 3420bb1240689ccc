//! Session outcome and the client-side classification contract.
//!
//! The server never infers an outcome; it stores whatever the collector
//! passes at session end. [`Milestones`] is how the collector decides.

use serde::{Deserialize, Serialize};

use crate::events::{Event, EventPayload, EventType, ProductType};

/// Terminal classification of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    PrintedCard,
    PrintedSticker,
    SentDigital,
    Abandoned,
    /// Only valid while `endedAt` is null.
    #[default]
    InProgress,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrintedCard => "printed_card",
            Self::PrintedSticker => "printed_sticker",
            Self::SentDigital => "sent_digital",
            Self::Abandoned => "abandoned",
            Self::InProgress => "in_progress",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "printed_card" => Some(Self::PrintedCard),
            "printed_sticker" => Some(Self::PrintedSticker),
            "sent_digital" => Some(Self::SentDigital),
            "abandoned" => Some(Self::Abandoned),
            "in_progress" => Some(Self::InProgress),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }

    /// Coerces `in_progress` to `abandoned`; an ended session is never in progress.
    pub fn terminal(self) -> Self {
        match self {
            Self::InProgress => Self::Abandoned,
            other => other,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a session is ending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The visitor finished a flow.
    Completed,
    /// The idle detector fired.
    Timeout,
}

/// Completion milestones observed during a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Milestones {
    pub printed_card: bool,
    pub printed_sticker: bool,
    pub sent_digital: bool,
}

impl Milestones {
    /// Records any milestone carried by `event`.
    pub fn observe(&mut self, event: &Event) {
        match event.event_type {
            EventType::PrintComplete => match event.payload() {
                EventPayload::Output {
                    product: Some(ProductType::Sticker),
                } => self.printed_sticker = true,
                _ => self.printed_card = true,
            },
            EventType::DigitalSend => self.sent_digital = true,
            _ => {}
        }
    }

    /// Resolves the outcome to report at session end.
    ///
    /// Never returns `InProgress`.
    pub fn classify(&self, reason: EndReason) -> Outcome {
        match reason {
            EndReason::Timeout => Outcome::Abandoned,
            EndReason::Completed => {
                if self.printed_card {
                    Outcome::PrintedCard
                } else if self.printed_sticker {
                    Outcome::PrintedSticker
                } else if self.sent_digital {
                    Outcome::SentDigital
                } else {
                    Outcome::Abandoned
                }
            }
        }
    }
}
