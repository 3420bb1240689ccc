//! Collector service and session lifecycle.
//!
//! Lifecycle is `Idle -> Active -> Ending -> Idle`. The flush ticker only
//! runs while a session is active. Every session identity change bumps a
//! generation counter; results of sends that outlive their session are
//! dropped instead of leaking into the next one.

use chrono::{DateTime, Utc};
use journey_core::{
    keys, Coordinates, Details, EndReason, Event, EventBatch, EventType, Milestones, Outcome,
    ProductType, RecordingConfig, Zone,
};
use parking_lot::{Mutex, MutexGuard};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant as StdInstant;
use telemetry::metrics;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::buffer::EventBuffer;
use crate::config::CollectorConfig;
use crate::diagnostics::{DiagnosticCapture, DiagnosticKind};
use crate::error::{CollectorError, SendError};
use crate::recording::{HttpRecordingAgent, NoopRecordingAgent, RecordingAgent};
use crate::recovery::{FileRecoveryStore, MemoryRecoveryStore, RecoveryRecord, RecoveryStore};
use crate::transport::{HttpTransport, IngestTransport};

/// Page attached to lifecycle events raised before any navigation.
const ROOT_PAGE: &str = "/";

const CARD_EVENTS: [EventType; 3] = [
    EventType::CardBrowse,
    EventType::CardSearch,
    EventType::CardSelect,
];

const STICKER_EVENTS: [EventType; 5] = [
    EventType::StickerBrowse,
    EventType::StickerSearch,
    EventType::StickerSelect,
    EventType::StickerUploadStart,
    EventType::StickerUploadComplete,
];

const EDITOR_EVENTS: [EventType; 3] = [
    EventType::EditorOpen,
    EventType::EditorSave,
    EventType::EditorClose,
];

const CHECKOUT_EVENTS: [EventType; 5] = [
    EventType::CheckoutStart,
    EventType::CheckoutCancel,
    EventType::PaymentStart,
    EventType::PaymentSuccess,
    EventType::PaymentFailed,
];

const OUTPUT_EVENTS: [EventType; 4] = [
    EventType::PrintStart,
    EventType::PrintComplete,
    EventType::PrintFailed,
    EventType::DigitalSend,
];

/// Client-side session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
    Ending,
}

struct Tracking {
    state: SessionState,
    session_id: Option<String>,
    current_page: Option<String>,
    page_entered_at: Option<DateTime<Utc>>,
    buffer: EventBuffer,
    milestones: Milestones,
    recording: bool,
    online: bool,
    ticker: Option<JoinHandle<()>>,
    generation: u64,
}

impl Tracking {
    fn new() -> Self {
        Self {
            state: SessionState::Idle,
            session_id: None,
            current_page: None,
            page_entered_at: None,
            buffer: EventBuffer::new(),
            milestones: Milestones::default(),
            recording: false,
            online: true,
            ticker: None,
            generation: 0,
        }
    }

    /// Returns to `Idle`, dropping any buffered events.
    fn reset(&mut self) -> usize {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        self.state = SessionState::Idle;
        self.session_id = None;
        self.current_page = None;
        self.page_entered_at = None;
        self.milestones = Milestones::default();
        self.recording = false;
        self.generation += 1;
        let dropped = self.buffer.clear();
        metrics().buffered_events.set(0);
        dropped
    }

    fn recovery_record(&self, kiosk_id: &str) -> Option<RecoveryRecord> {
        Some(RecoveryRecord {
            session_id: self.session_id.clone()?,
            kiosk_id: kiosk_id.to_string(),
            current_page: self.current_page.clone(),
            page_entered_at: self.page_entered_at,
            persisted_at: Utc::now(),
        })
    }

    fn page_or_root(&self) -> String {
        self.current_page
            .clone()
            .unwrap_or_else(|| ROOT_PAGE.to_string())
    }
}

enum SendOutcome {
    Sent,
    Rejected,
    InvalidSession,
    Exhausted(Vec<Event>),
}

struct Inner {
    config: CollectorConfig,
    transport: Arc<dyn IngestTransport>,
    agent: Arc<dyn RecordingAgent>,
    recovery: Arc<dyn RecoveryStore>,
    diagnostics: DiagnosticCapture,
    tracking: Mutex<Tracking>,
    /// Sends started by `flush` or a size trigger that have not finished.
    in_flight: watch::Sender<usize>,
}

/// Marks one background send as finished when dropped.
struct SendGuard(Arc<Inner>);

impl Drop for SendGuard {
    fn drop(&mut self) {
        self.0.in_flight.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Builder for [`Collector`].
pub struct CollectorBuilder {
    config: CollectorConfig,
    transport: Arc<dyn IngestTransport>,
    agent: Arc<dyn RecordingAgent>,
    recovery: Arc<dyn RecoveryStore>,
    diagnostics: DiagnosticCapture,
}

impl CollectorBuilder {
    pub fn recording_agent(mut self, agent: Arc<dyn RecordingAgent>) -> Self {
        self.agent = agent;
        self
    }

    pub fn recovery_store(mut self, recovery: Arc<dyn RecoveryStore>) -> Self {
        self.recovery = recovery;
        self
    }

    /// Shares a capture sink the host also feeds (e.g. via `DiagnosticLayer`).
    pub fn diagnostics(mut self, diagnostics: DiagnosticCapture) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn build(self) -> Collector {
        let (in_flight, _) = watch::channel(0);
        Collector {
            inner: Arc::new(Inner {
                config: self.config,
                transport: self.transport,
                agent: self.agent,
                recovery: self.recovery,
                diagnostics: self.diagnostics,
                tracking: Mutex::new(Tracking::new()),
                in_flight,
            }),
        }
    }
}

/// Event collector for one kiosk process.
///
/// Cheap to clone; clones share the same session and buffer.
#[derive(Clone)]
pub struct Collector {
    inner: Arc<Inner>,
}

impl Collector {
    pub fn builder(config: CollectorConfig, transport: Arc<dyn IngestTransport>) -> CollectorBuilder {
        CollectorBuilder {
            config,
            transport,
            agent: Arc::new(NoopRecordingAgent),
            recovery: Arc::new(MemoryRecoveryStore::new()),
            diagnostics: DiagnosticCapture::new(),
        }
    }

    /// Collector wired to the HTTP server, the loopback recording agent
    /// and a file-backed recovery record.
    pub fn http(config: CollectorConfig) -> Result<Self, CollectorError> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        let agent = Arc::new(HttpRecordingAgent::new(&config.recording_agent_url)?);
        let recovery = Arc::new(FileRecoveryStore::new(config.recovery_path.clone()));

        Ok(Self::builder(config, transport)
            .recording_agent(agent)
            .recovery_store(recovery)
            .build())
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.inner.config
    }

    pub fn diagnostics(&self) -> &DiagnosticCapture {
        &self.inner.diagnostics
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn session_id(&self) -> Option<String> {
        self.lock().session_id.clone()
    }

    pub fn current_page(&self) -> Option<String> {
        self.lock().current_page.clone()
    }

    pub fn is_online(&self) -> bool {
        self.lock().online
    }

    /// Events waiting to be sent, offline queue included.
    pub fn buffered(&self) -> usize {
        self.lock().buffer.total_len()
    }

    fn lock(&self) -> MutexGuard<'_, Tracking> {
        self.inner.tracking.lock()
    }

    // ---- tracking ----

    /// Buffers one event for the active session.
    ///
    /// Returns `false` (and logs) when there is no active session; only
    /// `session_start` is accepted while a session is ending.
    pub fn track_event(
        &self,
        event_type: EventType,
        page: &str,
        zone: Option<Zone>,
        details: Details,
        coordinates: Option<Coordinates>,
    ) -> bool {
        let mut tracking = self.lock();
        let Some(session_id) = tracking.session_id.clone() else {
            warn!(event_type = %event_type, "No active session; event not tracked");
            return false;
        };
        if tracking.state != SessionState::Active && event_type != EventType::SessionStart {
            warn!(event_type = %event_type, state = ?tracking.state, "Session not active; event not tracked");
            return false;
        }

        let event = Event::new(session_id, event_type, page)
            .with_zone(zone.or_else(|| Zone::infer(event_type, page)))
            .with_details(details)
            .with_coordinates(coordinates);
        self.enqueue(&mut tracking, event);
        true
    }

    /// Closes the current page with a `page_exit` and opens `page`.
    pub fn track_page_view(&self, page: &str) -> bool {
        let record = {
            let mut tracking = self.lock();
            let Some(session_id) = tracking.session_id.clone() else {
                warn!(page = %page, "No active session; page view not tracked");
                return false;
            };
            if tracking.state != SessionState::Active {
                warn!(page = %page, "Session not active; page view not tracked");
                return false;
            }

            let now = Utc::now();
            let previous = tracking.current_page.take();
            if let (Some(prev), Some(entered)) = (previous.as_deref(), tracking.page_entered_at) {
                let time_on_page = (now - entered).num_milliseconds().max(0);
                let exit = Event::new(&session_id, EventType::PageExit, prev)
                    .with_details(Details::new().with(keys::TIME_ON_PAGE, time_on_page))
                    .at(now);
                self.enqueue(&mut tracking, exit);
            }

            let mut details = Details::new();
            if let Some(prev) = previous {
                details.insert(keys::PREVIOUS_PAGE, prev);
            }
            let view = Event::new(&session_id, EventType::PageView, page)
                .with_details(details)
                .at(now);
            self.enqueue(&mut tracking, view);

            tracking.current_page = Some(page.to_string());
            tracking.page_entered_at = Some(now);
            tracking.recovery_record(&self.inner.config.kiosk_id)
        };

        self.save_recovery(record);
        true
    }

    /// Click on the current page.
    pub fn track_click(&self, target: &str, coordinates: Option<Coordinates>) -> bool {
        let page = self.lock().page_or_root();
        let details = Details::new().with(keys::ITEM_NAME, target);
        self.track_event(EventType::Click, &page, None, details, coordinates)
    }

    /// Search on the current page. `event_type` picks the catalog searched;
    /// anything but a search type is recorded as a plain `search`.
    pub fn track_search(&self, event_type: EventType, query: &str, result_count: usize) -> bool {
        let event_type = if event_type.is_search() {
            event_type
        } else {
            EventType::Search
        };
        let page = self.lock().page_or_root();
        let details = Details::new()
            .with(keys::SEARCH_QUERY, query)
            .with(keys::RESULT_COUNT, result_count);
        self.track_event(event_type, &page, None, details, None)
    }

    pub fn track_card_event(&self, event_type: EventType, details: Details) -> bool {
        self.track_family("card", &CARD_EVENTS, event_type, details)
    }

    pub fn track_sticker_event(&self, event_type: EventType, details: Details) -> bool {
        self.track_family("sticker", &STICKER_EVENTS, event_type, details)
    }

    pub fn track_editor_event(&self, event_type: EventType, details: Details) -> bool {
        self.track_family("editor", &EDITOR_EVENTS, event_type, details)
    }

    pub fn track_checkout_event(&self, event_type: EventType, details: Details) -> bool {
        self.track_family("checkout", &CHECKOUT_EVENTS, event_type, details)
    }

    /// Print or digital delivery; `product` drives outcome classification.
    pub fn track_output_event(
        &self,
        event_type: EventType,
        product: ProductType,
        mut details: Details,
    ) -> bool {
        details.insert(keys::PRODUCT_TYPE, product.as_str());
        self.track_family("output", &OUTPUT_EVENTS, event_type, details)
    }

    /// Application error, tracked as an event and kept in the diagnostic log.
    pub fn track_error(&self, message: &str) -> bool {
        self.inner
            .diagnostics
            .record(DiagnosticKind::Error, "ERROR", message);
        let page = self.lock().page_or_root();
        let details = Details::new().with(keys::MESSAGE, message);
        self.track_event(EventType::Error, &page, None, details, None)
    }

    fn track_family(
        &self,
        family: &str,
        allowed: &[EventType],
        event_type: EventType,
        details: Details,
    ) -> bool {
        if !allowed.contains(&event_type) {
            warn!(event_type = %event_type, family = family, "Event type outside helper family");
            return false;
        }
        let page = self.lock().page_or_root();
        self.track_event(event_type, &page, None, details, None)
    }

    fn enqueue(&self, tracking: &mut Tracking, event: Event) {
        tracking.milestones.observe(&event);

        if !tracking.online {
            tracking.buffer.push_offline(event);
        } else {
            tracking.buffer.push(event);
            if tracking.buffer.len() >= self.inner.config.max_batch_size {
                self.spawn_size_flush(tracking);
            }
        }
        metrics()
            .buffered_events
            .set(tracking.buffer.total_len() as u64);
    }

    fn spawn_size_flush(&self, tracking: &mut Tracking) {
        let Some(session_id) = tracking.session_id.clone() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("No runtime for size-triggered flush; leaving events for the ticker");
            return;
        };

        let events = tracking.buffer.take_batch(self.inner.config.max_batch_size);
        let generation = tracking.generation;
        let guard = self.track_send();
        debug!(session_id = %session_id, count = events.len(), "Size-triggered flush");

        let collector = self.clone();
        handle.spawn(async move {
            let _guard = guard;
            collector.send_chunks(&session_id, generation, events).await;
        });
    }

    fn track_send(&self) -> SendGuard {
        self.inner.in_flight.send_modify(|n| *n += 1);
        SendGuard(self.inner.clone())
    }

    /// Waits until every background send has delivered, requeued or
    /// abandoned its batch.
    async fn sends_settled(&self) {
        let mut in_flight = self.inner.in_flight.subscribe();
        let _ = in_flight.wait_for(|n| *n == 0).await;
    }

    // ---- flushing ----

    /// Sends everything buffered in batches of at most `max_batch_size`.
    ///
    /// Returns the number of events the server accepted. Does nothing
    /// while offline or once the session is ending; `end_session` drains
    /// the buffer itself.
    pub async fn flush(&self) -> usize {
        let (session_id, generation, events, _guard) = {
            let mut tracking = self.lock();
            if !tracking.online || tracking.state != SessionState::Active {
                return 0;
            }
            let Some(session_id) = tracking.session_id.clone() else {
                return 0;
            };
            let events = tracking.buffer.take_all();
            metrics()
                .buffered_events
                .set(tracking.buffer.total_len() as u64);
            (session_id, tracking.generation, events, self.track_send())
        };

        self.send_chunks(&session_id, generation, events).await
    }

    async fn send_chunks(&self, session_id: &str, generation: u64, events: Vec<Event>) -> usize {
        let max = self.inner.config.max_batch_size.max(1);
        let mut sent = 0;
        let mut pending = events;

        while !pending.is_empty() {
            let rest = if pending.len() > max {
                pending.split_off(max)
            } else {
                Vec::new()
            };
            let chunk = std::mem::replace(&mut pending, rest);
            let count = chunk.len();

            match self.send_with_retry(session_id, chunk).await {
                SendOutcome::Sent => sent += count,
                SendOutcome::Rejected => {}
                SendOutcome::InvalidSession => {
                    self.abandon(generation);
                    return sent;
                }
                SendOutcome::Exhausted(mut chunk) => {
                    chunk.append(&mut pending);
                    self.requeue(generation, chunk);
                    return sent;
                }
            }
        }

        sent
    }

    async fn send_with_retry(&self, session_id: &str, events: Vec<Event>) -> SendOutcome {
        let config = &self.inner.config;
        let batch = EventBatch::new(session_id, events);
        let attempts = config.max_retries.max(1);
        let start = StdInstant::now();

        for attempt in 1..=attempts {
            let result = with_timeout(config, self.inner.transport.send_batch(&batch)).await;

            match result {
                Ok(()) => {
                    metrics().batches_sent.inc();
                    metrics()
                        .flush_latency_ms
                        .observe(start.elapsed().as_millis() as u64);
                    debug!(
                        session_id = %session_id,
                        count = batch.events.len(),
                        attempt = attempt,
                        "Batch sent"
                    );
                    return SendOutcome::Sent;
                }
                Err(SendError::InvalidSession(reason)) => {
                    warn!(session_id = %session_id, reason = %reason, "Server rejected session");
                    return SendOutcome::InvalidSession;
                }
                Err(SendError::Rejected(reason)) => {
                    warn!(
                        session_id = %session_id,
                        count = batch.events.len(),
                        reason = %reason,
                        "Server refused batch; dropping it"
                    );
                    return SendOutcome::Rejected;
                }
                Err(SendError::Transient(reason)) => {
                    warn!(
                        session_id = %session_id,
                        attempt = attempt,
                        max_attempts = attempts,
                        reason = %reason,
                        "Batch send failed"
                    );
                    if attempt < attempts {
                        metrics().send_retries.inc();
                        tokio::time::sleep(config.retry_delay(attempt)).await;
                    }
                }
            }
        }

        SendOutcome::Exhausted(batch.events)
    }

    fn requeue(&self, generation: u64, events: Vec<Event>) {
        let mut tracking = self.lock();
        if tracking.generation != generation || tracking.session_id.is_none() {
            warn!(count = events.len(), "Session gone; dropping unsent batch");
            return;
        }

        let count = events.len();
        tracking.buffer.push_front(events);
        metrics().batches_requeued.inc();
        metrics()
            .buffered_events
            .set(tracking.buffer.total_len() as u64);
        warn!(count = count, "Retries exhausted; batch requeued");
    }

    /// Stops tracking a session the server no longer accepts.
    fn abandon(&self, generation: u64) {
        let (session_id, recording, dropped) = {
            let mut tracking = self.lock();
            if tracking.generation != generation {
                return;
            }
            let Some(session_id) = tracking.session_id.clone() else {
                return;
            };
            let recording = tracking.recording;
            (session_id, recording, tracking.reset())
        };

        self.inner.recovery.clear();
        self.inner.diagnostics.stop();
        if recording {
            let agent = self.inner.agent.clone();
            let id = session_id.clone();
            self.fire_and_forget("stop recording", async move { agent.stop(&id).await });
        }

        warn!(
            session_id = %session_id,
            dropped = dropped,
            "Session invalid; tracking stopped"
        );
    }

    fn start_ticker(&self, tracking: &mut Tracking) {
        if let Some(old) = tracking.ticker.take() {
            old.abort();
        }

        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.config.flush_interval();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let collector = Collector { inner };
                if !collector.is_online() {
                    continue;
                }
                // Detached so stopping the ticker never cancels a send.
                tokio::spawn(async move {
                    collector.flush().await;
                });
            }
        });
        tracking.ticker = Some(handle);
    }

    /// Switches between online and offline mode.
    ///
    /// Going back online moves the offline queue ahead of the live buffer
    /// and flushes immediately.
    pub async fn set_online(&self, online: bool) {
        {
            let mut tracking = self.lock();
            if tracking.online == online {
                return;
            }
            tracking.online = online;
            if !online {
                info!("Collector offline; queueing events locally");
                return;
            }
            let merged = tracking.buffer.merge_offline();
            info!(merged = merged, "Collector back online");
        }

        self.flush().await;
    }

    // ---- lifecycle ----

    /// Starts a new session, ending any active one as `abandoned` first.
    pub async fn start_session(&self) -> Result<String, CollectorError> {
        match self.state() {
            SessionState::Ending => return Err(CollectorError::Busy),
            SessionState::Active => {
                metrics().sessions_replaced.inc();
                info!("Replacing active session");
                if let Err(e) = self.end_session(Outcome::Abandoned).await {
                    warn!(error = %e, "Failed to end replaced session");
                }
            }
            SessionState::Idle => {}
        }

        let kiosk_id = self.inner.config.kiosk_id.clone();
        let response = with_timeout(&self.inner.config, self.inner.transport.start_session(&kiosk_id))
            .await
            .map_err(CollectorError::Start)?;
        let session_id = response.session_id.clone();
        let recording = response.recording_config().cloned();

        let record = {
            let mut tracking = self.lock();
            if tracking.state != SessionState::Idle {
                return Err(CollectorError::Busy);
            }
            tracking.reset();
            tracking.state = SessionState::Active;
            tracking.session_id = Some(session_id.clone());
            tracking.recording = recording.is_some();
            self.start_ticker(&mut tracking);
            tracking.recovery_record(&kiosk_id)
        };

        self.inner.diagnostics.start();
        self.save_recovery(record);
        self.track_event(
            EventType::SessionStart,
            ROOT_PAGE,
            None,
            Details::new().with(keys::KIOSK_ID, kiosk_id.as_str()),
            None,
        );

        if let Some(config) = recording {
            self.start_recording(&session_id, config);
        }

        info!(session_id = %session_id, kiosk_id = %kiosk_id, "Session started");
        Ok(session_id)
    }

    /// Flushes, notifies the server and returns to `Idle`.
    ///
    /// Sends already in flight finish (or requeue) before the final drain,
    /// so the server sees every batch ahead of the end call. `in_progress`
    /// is recorded as `abandoned`. A failed end call is logged; local state
    /// is reset regardless. Events the final drain could not deliver are
    /// reported as [`CollectorError::Unflushed`].
    pub async fn end_session(&self, outcome: Outcome) -> Result<(), CollectorError> {
        let outcome = outcome.terminal();

        let (session_id, generation) = {
            let mut tracking = self.lock();
            match tracking.state {
                SessionState::Idle => return Err(CollectorError::NoSession),
                SessionState::Ending => return Err(CollectorError::Busy),
                SessionState::Active => {}
            }
            let Some(session_id) = tracking.session_id.clone() else {
                return Err(CollectorError::NoSession);
            };

            tracking.state = SessionState::Ending;
            if let Some(ticker) = tracking.ticker.take() {
                ticker.abort();
            }
            (session_id, tracking.generation)
        };

        self.sends_settled().await;

        let events = {
            let mut tracking = self.lock();
            if tracking.generation != generation {
                // Abandoned by an in-flight send; already reset.
                return Ok(());
            }
            let end = Event::new(&session_id, EventType::SessionEnd, tracking.page_or_root())
                .with_details(Details::new().with(keys::OUTCOME, outcome.as_str()));
            tracking.buffer.merge_offline();
            tracking.buffer.push(end);
            tracking.buffer.take_all()
        };

        self.send_chunks(&session_id, generation, events).await;

        match with_timeout(
            &self.inner.config,
            self.inner.transport.end_session(&session_id, outcome),
        )
        .await
        {
            Ok(()) => debug!(session_id = %session_id, "Server acknowledged session end"),
            Err(e) => warn!(session_id = %session_id, error = %e, "Session end call failed"),
        }

        let (recording, dropped) = {
            let mut tracking = self.lock();
            if tracking.generation != generation {
                // Abandoned while flushing; already reset.
                return Ok(());
            }
            (tracking.recording, tracking.reset())
        };

        let entries = self.inner.diagnostics.drain();
        self.inner.diagnostics.stop();
        self.inner.recovery.clear();

        if recording {
            let agent = self.inner.agent.clone();
            let id = session_id.clone();
            self.fire_and_forget("stop recording", async move { agent.stop(&id).await });
        }
        if !entries.is_empty() {
            let agent = self.inner.agent.clone();
            let id = session_id.clone();
            self.fire_and_forget("upload diagnostics", async move {
                agent.upload_logs(&id, &entries).await
            });
        }

        if dropped > 0 {
            warn!(session_id = %session_id, dropped = dropped, "Unsent events dropped at session end");
            return Err(CollectorError::Unflushed(dropped));
        }
        info!(session_id = %session_id, outcome = %outcome, "Session ended");
        Ok(())
    }

    /// Called by the idle detector. Ends the session as `abandoned`.
    pub async fn handle_timeout(&self) -> Result<(), CollectorError> {
        let page = self.lock().page_or_root();
        if !self.track_event(EventType::SessionTimeout, &page, None, Details::new(), None) {
            return Err(CollectorError::NoSession);
        }
        info!("Inactivity timeout");
        let outcome = self.lock().milestones.classify(EndReason::Timeout);
        self.end_session(outcome).await
    }

    /// Ends the session with the outcome implied by what the visitor completed.
    pub async fn complete_session(&self) -> Result<Outcome, CollectorError> {
        let outcome = self.lock().milestones.classify(EndReason::Completed);
        self.end_session(outcome).await?;
        Ok(outcome)
    }

    /// Resumes the session described by a fresh recovery record.
    ///
    /// Stale, foreign or unreadable records are discarded and the
    /// collector stays `Idle`.
    pub async fn recover(&self) -> bool {
        let Some(record) = self.inner.recovery.load() else {
            return false;
        };

        let config = &self.inner.config;
        if record.kiosk_id != config.kiosk_id {
            warn!(kiosk_id = %record.kiosk_id, "Recovery record belongs to another kiosk; discarding");
            self.inner.recovery.clear();
            return false;
        }
        let now = Utc::now();
        if record.is_stale(now, config.recovery_max_age()) {
            warn!(
                session_id = %record.session_id,
                age_secs = record.age(now).num_seconds(),
                "Recovery record is stale; discarding"
            );
            self.inner.recovery.clear();
            return false;
        }

        {
            let mut tracking = self.lock();
            if tracking.state != SessionState::Idle {
                return false;
            }
            tracking.reset();
            tracking.state = SessionState::Active;
            tracking.session_id = Some(record.session_id.clone());
            tracking.current_page = record.current_page.clone();
            tracking.page_entered_at = record.page_entered_at;
            self.start_ticker(&mut tracking);
        }
        self.inner.diagnostics.start();

        info!(session_id = %record.session_id, "Resumed session from recovery record");
        true
    }

    // ---- collaborators ----

    fn save_recovery(&self, record: Option<RecoveryRecord>) {
        if let Some(record) = record {
            if let Err(e) = self.inner.recovery.save(&record) {
                warn!(error = %e, "Failed to persist recovery record");
            }
        }
    }

    fn start_recording(&self, session_id: &str, config: RecordingConfig) {
        let agent = self.inner.agent.clone();
        let id = session_id.to_string();
        self.fire_and_forget("start recording", async move {
            agent.start(&id, &config).await
        });
    }

    fn fire_and_forget<F>(&self, what: &'static str, call: F)
    where
        F: Future<Output = Result<(), CollectorError>> + Send + 'static,
    {
        tokio::spawn(async move {
            if let Err(e) = call.await {
                warn!(error = %e, "Recording agent unreachable; {} skipped", what);
            }
        });
    }
}

async fn with_timeout<T, F>(config: &CollectorConfig, call: F) -> Result<T, SendError>
where
    F: Future<Output = Result<T, SendError>>,
{
    match timeout(config.request_timeout(), call).await {
        Ok(result) => result,
        Err(_) => Err(SendError::Transient("request timed out".to_string())),
    }
}
