//! Request extractors.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
};
use journey_core::{limits::MAX_BATCH_SIZE_BYTES, ValidationErrorCode};
use serde::de::DeserializeOwned;
use telemetry::metrics;
use tracing::warn;

use crate::response::ApiError;

/// JSON body bounded by the batch payload limit.
///
/// Oversized bodies map to `VALID_002`, unparsable ones to `VALID_001`,
/// so every rejection carries the coded error body.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                too_large(None)
            } else {
                ApiError::bad_request(rejection.body_text())
            }
        })?;

        if body.len() > MAX_BATCH_SIZE_BYTES {
            return Err(too_large(Some(body.len())));
        }

        serde_json::from_slice(&body).map(JsonBody).map_err(|e| {
            metrics().events_failed_validation.inc();
            warn!("Failed to parse request body: {}", e);
            ApiError::bad_request(e.to_string())
        })
    }
}

fn too_large(size: Option<usize>) -> ApiError {
    let detail = match size {
        Some(size) => format!(
            "Payload size {}KB exceeds {}KB limit",
            size / 1024,
            MAX_BATCH_SIZE_BYTES / 1024
        ),
        None => format!("Payload exceeds {}KB limit", MAX_BATCH_SIZE_BYTES / 1024),
    };
    ApiError::validation(ValidationErrorCode::BatchTooLarge, vec![detail])
}
