//! Event batch ingestion.

use axum::{extract::State, Json};
use journey_core::EventBatch;
use std::time::Instant;
use telemetry::metrics;
use tracing::{debug, info, warn};

use crate::extractors::JsonBody;
use crate::response::{ApiError, IngestResponse};
use crate::state::AppState;

/// POST /sessions/events - Append a batch to a session's log.
///
/// The batch is validated as a unit; one bad event rejects all of it.
/// Unknown or ended sessions answer with a non-retryable `SESSION_00x`.
pub async fn ingest_handler(
    State(state): State<AppState>,
    JsonBody(batch): JsonBody<EventBatch>,
) -> Result<Json<IngestResponse>, ApiError> {
    let start = Instant::now();
    metrics().batches_received.inc();

    debug!(
        session_id = %batch.session_id,
        count = batch.events.len(),
        "Received event batch"
    );

    if let Err(e) = batch.check() {
        metrics().events_failed_validation.inc_by(batch.events.len() as u64);
        warn!(session_id = %batch.session_id, error = %e, "Rejected event batch");
        return Err(e.into());
    }

    let EventBatch { session_id, events } = batch;
    let accepted = state
        .store
        .append_events(&session_id, events)
        .await
        .map_err(|e| {
            if e.is_invalid_session() {
                metrics().invalid_session_rejections.inc();
                warn!(session_id = %session_id, error = %e, "Batch for inactive session");
            }
            ApiError::from(e)
        })?;

    metrics().events_appended.inc_by(accepted as u64);
    let latency_ms = start.elapsed().as_millis() as u64;
    metrics().ingest_latency_ms.observe(latency_ms);

    info!(
        session_id = %session_id,
        accepted = accepted,
        latency_ms = latency_ms,
        "Batch processed"
    );

    Ok(Json(IngestResponse::success(accepted)))
}
