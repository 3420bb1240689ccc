//! Journey read path.

use axum::{
    extract::{Path, State},
    Json,
};
use journey_core::{reconstruct, summarize, Error};
use std::time::Instant;
use telemetry::metrics;
use tracing::debug;

use crate::response::{ApiError, SessionView};
use crate::state::AppState;

/// GET /kiosks/:kiosk_id/sessions/:session_id
///
/// Loads the full event log, rebuilds the journey and the behavior summary.
/// A session belonging to another kiosk is reported as not found.
pub async fn session_view_handler(
    State(state): State<AppState>,
    Path((kiosk_id, session_id)): Path<(String, String)>,
) -> Result<Json<SessionView>, ApiError> {
    let start = Instant::now();

    let mut session = state
        .store
        .get_session(&session_id)
        .await?
        .filter(|s| s.kiosk_id == kiosk_id)
        .ok_or_else(|| Error::session_not_found(&session_id))?;
    session.outcome = session.effective_outcome();

    let events = state.store.list_events(&session_id).await?;
    let journey = reconstruct(&events);
    let behavior_summary = summarize(&session, &events);

    metrics().journeys_built.inc();
    let latency_ms = start.elapsed().as_millis() as u64;
    metrics().journey_latency_ms.observe(latency_ms);
    debug!(
        session_id = %session_id,
        events = events.len(),
        steps = journey.len(),
        latency_ms = latency_ms,
        "Journey built"
    );

    Ok(Json(SessionView {
        session,
        events,
        journey,
        behavior_summary,
    }))
}
