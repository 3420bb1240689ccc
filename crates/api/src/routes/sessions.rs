//! Session start and end.

use axum::{extract::State, Json};
use chrono::Utc;
use journey_core::{
    EndSessionRequest, Error, Session, StartSessionRequest, StartSessionResponse,
    ValidationErrorCode,
};
use telemetry::metrics;
use tracing::info;
use validator::Validate;

use crate::extractors::JsonBody;
use crate::response::{ApiError, EndSessionResponse};
use crate::state::AppState;

fn check<T: Validate>(req: &T) -> Result<(), ApiError> {
    req.validate().map_err(|e| {
        Error::validation_code(ValidationErrorCode::InvalidFormat, e.to_string()).into()
    })
}

/// POST /sessions/start - Issue a new session id for a kiosk.
pub async fn start_handler(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<StartSessionRequest>,
) -> Result<Json<StartSessionResponse>, ApiError> {
    check(&req)?;

    let recording = state.recording.for_kiosk(&req.kiosk_id);
    let mut session = Session::new(&req.kiosk_id);
    session.flags.has_recording = recording.enabled;

    state.store.create_session(&session).await?;

    metrics().sessions_started.inc();
    metrics().active_sessions.inc();
    info!(
        session_id = %session.session_id,
        kiosk_id = %session.kiosk_id,
        recording = recording.enabled,
        "Session started"
    );

    Ok(Json(StartSessionResponse {
        session_id: session.session_id,
        recording: Some(recording),
    }))
}

/// POST /sessions/end - Close a session with its outcome.
///
/// `in_progress` is not a valid final outcome and is recorded as `abandoned`.
pub async fn end_handler(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<EndSessionRequest>,
) -> Result<Json<EndSessionResponse>, ApiError> {
    check(&req)?;

    let session = state
        .store
        .end_session(&req.session_id, req.outcome.terminal(), Utc::now())
        .await?;

    metrics().sessions_ended.inc();
    metrics().active_sessions.dec();
    info!(
        session_id = %session.session_id,
        outcome = %session.outcome,
        duration_seconds = ?session.duration_seconds,
        "Session ended"
    );

    Ok(Json(EndSessionResponse {
        success: true,
        session,
    }))
}
