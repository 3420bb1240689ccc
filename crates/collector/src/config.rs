//! Collector configuration.

use journey_core::limits::{
    DEFAULT_FLUSH_INTERVAL_MS, DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_RETRIES,
    DEFAULT_RETRY_DELAY_MS, RECOVERY_MAX_AGE_SECS,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Kiosk collector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Base URL of the ingestion server
    pub server_url: String,
    pub kiosk_id: String,
    /// Timer flush period
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    /// Buffer size that triggers an immediate flush
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Send attempts per batch before it is requeued
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base retry delay, multiplied by the attempt number
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Recovery records older than this are discarded
    #[serde(default = "default_recovery_max_age_secs")]
    pub recovery_max_age_secs: u64,
    #[serde(default = "default_recovery_path")]
    pub recovery_path: PathBuf,
    /// Local recording agent
    #[serde(default = "default_recording_agent_url")]
    pub recording_agent_url: String,
}

fn default_flush_interval_ms() -> u64 {
    DEFAULT_FLUSH_INTERVAL_MS
}

fn default_max_batch_size() -> usize {
    DEFAULT_MAX_BATCH_SIZE
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_recovery_max_age_secs() -> u64 {
    RECOVERY_MAX_AGE_SECS
}

fn default_recovery_path() -> PathBuf {
    PathBuf::from("kiosk-session.json")
}

fn default_recording_agent_url() -> String {
    "http://127.0.0.1:8766".to_string()
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_string(),
            kiosk_id: "kiosk".to_string(),
            flush_interval_ms: default_flush_interval_ms(),
            max_batch_size: default_max_batch_size(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            recovery_max_age_secs: default_recovery_max_age_secs(),
            recovery_path: default_recovery_path(),
            recording_agent_url: default_recording_agent_url(),
        }
    }
}

impl CollectorConfig {
    pub fn new(server_url: impl Into<String>, kiosk_id: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            kiosk_id: kiosk_id.into(),
            ..Default::default()
        }
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Delay before retrying after failed `attempt` (1-based).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_delay_ms.saturating_mul(attempt as u64))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn recovery_max_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.recovery_max_age_secs as i64)
    }
}
