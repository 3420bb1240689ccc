//! Session-scoped diagnostic capture.
//!
//! The host application records console output, errors, unhandled
//! rejections and socket failures into a [`DiagnosticCapture`] it owns.
//! [`DiagnosticLayer`] feeds `WARN` and `ERROR` tracing events into the
//! same sink. Entries are only kept while a session is active.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{field::Field, field::Visit, Event, Level, Subscriber};
use tracing_subscriber::{layer::Context, Layer};

/// Oldest entries are dropped beyond this.
pub const MAX_DIAGNOSTIC_ENTRIES: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    Console,
    Error,
    UnhandledRejection,
    SocketError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticEntry {
    pub kind: DiagnosticKind,
    pub level: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CaptureState {
    active: bool,
    entries: Vec<DiagnosticEntry>,
}

/// Shared capture sink.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticCapture {
    state: Arc<Mutex<CaptureState>>,
}

impl DiagnosticCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) {
        let mut state = self.state.lock();
        state.active = true;
        state.entries.clear();
    }

    pub fn stop(&self) {
        let mut state = self.state.lock();
        state.active = false;
        state.entries.clear();
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    /// Adds an entry; ignored while no session is active.
    pub fn record(&self, kind: DiagnosticKind, level: impl Into<String>, message: impl Into<String>) {
        let mut state = self.state.lock();
        if !state.active {
            return;
        }
        if state.entries.len() >= MAX_DIAGNOSTIC_ENTRIES {
            state.entries.remove(0);
        }
        state.entries.push(DiagnosticEntry {
            kind,
            level: level.into(),
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    /// Takes the captured entries, leaving capture running.
    pub fn drain(&self) -> Vec<DiagnosticEntry> {
        std::mem::take(&mut self.state.lock().entries)
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Forwards `WARN`/`ERROR` tracing events into a [`DiagnosticCapture`].
#[derive(Debug, Clone)]
pub struct DiagnosticLayer {
    capture: DiagnosticCapture,
}

impl DiagnosticLayer {
    pub fn new(capture: DiagnosticCapture) -> Self {
        Self { capture }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else {
            format!("{} {}", self.message, self.fields.join(" "))
        }
    }
}

impl<S: Subscriber> Layer<S> for DiagnosticLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level > Level::WARN || !self.capture.is_active() {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let kind = if level == Level::ERROR {
            DiagnosticKind::Error
        } else {
            DiagnosticKind::Console
        };
        self.capture.record(kind, level.as_str(), visitor.finish());
    }
}
