//! Collector error types.

use thiserror::Error;

/// Result of one failed request to the ingestion server.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SendError {
    /// Network failure, timeout or retryable server error.
    #[error("transient failure: {0}")]
    Transient(String),
    /// The session is unknown or already ended; stop tracking it.
    #[error("invalid session: {0}")]
    InvalidSession(String),
    /// The server refused the payload itself; resending cannot succeed.
    #[error("rejected: {0}")]
    Rejected(String),
}

impl SendError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("no active session")]
    NoSession,

    #[error("a session is already ending")]
    Busy,

    #[error("{0} events could not be delivered before the session ended")]
    Unflushed(usize),

    #[error("session start failed: {0}")]
    Start(#[source] SendError),

    #[error("recording agent: {0}")]
    Agent(String),

    #[error("recovery record: {0}")]
    Recovery(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("http client: {0}")]
    Http(#[from] reqwest::Error),
}
