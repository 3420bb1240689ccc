//! API responses and error mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use journey_core::{ErrorBody, Event, JourneyStep, Session, StoreErrorCode, ValidationErrorCode};
use serde::{Deserialize, Serialize};
use telemetry::HealthStatus;

/// Accepted batch.
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub success: bool,
    pub received: usize,
    pub timestamp: i64,
}

impl IngestResponse {
    pub fn success(received: usize) -> Self {
        Self {
            success: true,
            received,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EndSessionResponse {
    pub success: bool,
    pub session: Session,
}

/// Composed read view of one session.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session: Session,
    pub events: Vec<Event>,
    pub journey: Vec<JourneyStep>,
    pub behavior_summary: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub store_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_message: Option<String>,
    pub active_sessions: u64,
}

/// API error carrying a coded JSON body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn with_code(
        status: StatusCode,
        code: impl Into<String>,
        msg: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: msg.into(),
                code: code.into(),
                retryable,
                details: None,
            },
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_code(
            StatusCode::BAD_REQUEST,
            ValidationErrorCode::InvalidFormat.code(),
            msg,
            false,
        )
    }

    pub fn validation(code: ValidationErrorCode, errors: Vec<String>) -> Self {
        let mut err = Self::with_code(StatusCode::BAD_REQUEST, code.code(), "Validation failed", false);
        err.body.details = Some(errors);
        err
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_code(
            StatusCode::INTERNAL_SERVER_ERROR,
            StoreErrorCode::StoreFailed.code(),
            msg,
            true,
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<journey_core::Error> for ApiError {
    fn from(err: journey_core::Error) -> Self {
        use journey_core::Error;

        match &err {
            Error::Session { code, message, http_status } => {
                let status = StatusCode::from_u16(*http_status).unwrap_or(StatusCode::NOT_FOUND);
                ApiError::with_code(status, *code, message, false)
            }
            Error::ValidationWithCode { code, message, .. } => {
                let mut api = ApiError::with_code(StatusCode::BAD_REQUEST, *code, "Validation failed", false);
                api.body.details = Some(vec![message.clone()]);
                api
            }
            Error::Store { code, message, .. } => {
                ApiError::with_code(StatusCode::INTERNAL_SERVER_ERROR, *code, message, true)
            }
            Error::Validation(msg) => ApiError::bad_request(msg),
            Error::Serialization(e) => ApiError::bad_request(e.to_string()),
            Error::Internal(msg) => ApiError::internal(msg),
        }
    }
}
