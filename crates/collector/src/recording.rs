//! Local recording agent.
//!
//! The agent runs on the kiosk itself. Every call is best effort: the
//! collector spawns it, logs a failure and moves on.

use async_trait::async_trait;
use journey_core::RecordingConfig;
use serde::Serialize;
use std::time::Duration;

use crate::diagnostics::DiagnosticEntry;
use crate::error::CollectorError;

#[async_trait]
pub trait RecordingAgent: Send + Sync {
    async fn start(&self, session_id: &str, config: &RecordingConfig) -> Result<(), CollectorError>;

    async fn stop(&self, session_id: &str) -> Result<(), CollectorError>;

    /// Uploads the session's captured diagnostic log.
    async fn upload_logs(
        &self,
        session_id: &str,
        entries: &[DiagnosticEntry],
    ) -> Result<(), CollectorError>;
}

/// Agent that accepts everything and does nothing.
#[derive(Debug, Default, Clone)]
pub struct NoopRecordingAgent;

#[async_trait]
impl RecordingAgent for NoopRecordingAgent {
    async fn start(&self, _session_id: &str, _config: &RecordingConfig) -> Result<(), CollectorError> {
        Ok(())
    }

    async fn stop(&self, _session_id: &str) -> Result<(), CollectorError> {
        Ok(())
    }

    async fn upload_logs(
        &self,
        _session_id: &str,
        _entries: &[DiagnosticEntry],
    ) -> Result<(), CollectorError> {
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartRecording<'a> {
    session_id: &'a str,
    #[serde(flatten)]
    config: &'a RecordingConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StopRecording<'a> {
    session_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LogUpload<'a> {
    session_id: &'a str,
    entries: &'a [DiagnosticEntry],
}

/// Agent reached over loopback HTTP.
#[derive(Clone)]
pub struct HttpRecordingAgent {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRecordingAgent {
    pub fn new(base_url: impl Into<String>) -> Result<Self, CollectorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<(), CollectorError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CollectorError::Agent(format!(
                "{} returned {}",
                path,
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordingAgent for HttpRecordingAgent {
    async fn start(&self, session_id: &str, config: &RecordingConfig) -> Result<(), CollectorError> {
        self.post("/recording/start", &StartRecording { session_id, config })
            .await
    }

    async fn stop(&self, session_id: &str) -> Result<(), CollectorError> {
        self.post("/recording/stop", &StopRecording { session_id }).await
    }

    async fn upload_logs(
        &self,
        session_id: &str,
        entries: &[DiagnosticEntry],
    ) -> Result<(), CollectorError> {
        self.post("/logs", &LogUpload { session_id, entries }).await
    }
}
