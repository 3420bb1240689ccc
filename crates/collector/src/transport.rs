//! Transport to the ingestion server.

use async_trait::async_trait;
use journey_core::{
    EndSessionRequest, ErrorBody, EventBatch, Outcome, StartSessionRequest, StartSessionResponse,
};
use reqwest::{Response, StatusCode};
use tracing::debug;

use crate::config::CollectorConfig;
use crate::error::{CollectorError, SendError};

/// Requests the collector makes to the server.
#[async_trait]
pub trait IngestTransport: Send + Sync {
    async fn start_session(&self, kiosk_id: &str) -> Result<StartSessionResponse, SendError>;

    async fn send_batch(&self, batch: &EventBatch) -> Result<(), SendError>;

    async fn end_session(&self, session_id: &str, outcome: Outcome) -> Result<(), SendError>;
}

/// JSON over HTTP with `reqwest`.
#[derive(Clone)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &CollectorConfig) -> Result<Self, CollectorError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            base_url: config.server_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response, SendError> {
        let url = self.url(path);
        debug!(url = %url, "POST");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| SendError::Transient(e.to_string()))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(classify_failure(response).await)
        }
    }
}

/// Maps a non-success response onto the send error taxonomy.
async fn classify_failure(response: Response) -> SendError {
    let status = response.status();
    let body = response.json::<ErrorBody>().await.ok();
    classify(status, body)
}

fn classify(status: StatusCode, body: Option<ErrorBody>) -> SendError {
    match body {
        Some(body) if body.code.starts_with("SESSION_") => {
            SendError::InvalidSession(format!("{} {}", body.code, body.error))
        }
        Some(body) if !body.retryable => {
            SendError::Rejected(format!("{} {}", body.code, body.error))
        }
        Some(body) => SendError::Transient(format!("{} {}", body.code, body.error)),
        None if matches!(status, StatusCode::NOT_FOUND | StatusCode::CONFLICT) => {
            SendError::InvalidSession(format!("HTTP {}", status))
        }
        None if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS => {
            SendError::Rejected(format!("HTTP {}", status))
        }
        None => SendError::Transient(format!("HTTP {}", status)),
    }
}

#[async_trait]
impl IngestTransport for HttpTransport {
    async fn start_session(&self, kiosk_id: &str) -> Result<StartSessionResponse, SendError> {
        let request = StartSessionRequest {
            kiosk_id: kiosk_id.to_string(),
        };
        self.post("/sessions/start", &request)
            .await?
            .json()
            .await
            .map_err(|e| SendError::Transient(format!("invalid start response: {}", e)))
    }

    async fn send_batch(&self, batch: &EventBatch) -> Result<(), SendError> {
        self.post("/sessions/events", batch).await.map(|_| ())
    }

    async fn end_session(&self, session_id: &str, outcome: Outcome) -> Result<(), SendError> {
        let request = EndSessionRequest {
            session_id: session_id.to_string(),
            outcome,
        };
        self.post("/sessions/end", &request).await.map(|_| ())
    }
}
