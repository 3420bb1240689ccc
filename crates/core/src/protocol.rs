//! Request and response bodies exchanged between the kiosk collector
//! and the ingestion server.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::outcome::Outcome;

/// `POST /sessions/start`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    #[validate(length(min = 1, max = 128))]
    pub kiosk_id: String,
}

/// Recording parameters handed to the kiosk's local recording agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingConfig {
    pub frame_rate: u32,
    pub max_duration_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingInfo {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<RecordingConfig>,
}

impl RecordingInfo {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            config: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResponse {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording: Option<RecordingInfo>,
}

impl StartSessionResponse {
    /// Whether the server asked the kiosk to record this session.
    pub fn recording_config(&self) -> Option<&RecordingConfig> {
        self.recording
            .as_ref()
            .filter(|r| r.enabled)
            .and_then(|r| r.config.as_ref())
    }
}

/// `POST /sessions/end`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EndSessionRequest {
    #[validate(length(min = 1, max = 128))]
    pub session_id: String,
    pub outcome: Outcome,
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    /// `false` tells the collector not to resend the request
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}
