//! Application state shared across handlers.

use journey_core::{RecordingConfig, RecordingInfo};
use serde::{Deserialize, Serialize};
use session_store::SharedStore;
use std::sync::Arc;

/// Server-side recording switch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Kiosks allowed to record; empty means every kiosk
    #[serde(default)]
    pub kiosks: Vec<String>,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,
}

fn default_frame_rate() -> u32 {
    1
}

fn default_max_duration_secs() -> u64 {
    1800
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            kiosks: Vec::new(),
            frame_rate: default_frame_rate(),
            max_duration_secs: default_max_duration_secs(),
        }
    }
}

impl RecordingSettings {
    /// Recording instructions for a session starting on `kiosk_id`.
    pub fn for_kiosk(&self, kiosk_id: &str) -> RecordingInfo {
        let allowed = self.kiosks.is_empty() || self.kiosks.iter().any(|k| k == kiosk_id);
        if !self.enabled || !allowed {
            return RecordingInfo::disabled();
        }

        RecordingInfo {
            enabled: true,
            config: Some(RecordingConfig {
                frame_rate: self.frame_rate,
                max_duration_secs: self.max_duration_secs,
            }),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Durable session store (ClickHouse in production, memory in tests)
    pub store: SharedStore,
    pub recording: Arc<RecordingSettings>,
}

impl AppState {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            recording: Arc::new(RecordingSettings::default()),
        }
    }

    pub fn with_recording(mut self, recording: RecordingSettings) -> Self {
        self.recording = Arc::new(recording);
        self
    }
}
