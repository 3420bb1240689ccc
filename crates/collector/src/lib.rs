//! Kiosk-side event collector.
//!
//! [`Collector`] is constructed once per kiosk client process and handed
//! to call sites. It buffers events, flushes them on a timer or when the
//! buffer fills, retries transient failures, parks events while offline,
//! and keeps a small recovery record so a restarted process can resume
//! the active session.

pub mod buffer;
pub mod collector;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod recording;
pub mod recovery;
pub mod transport;

pub use buffer::EventBuffer;
pub use collector::{Collector, CollectorBuilder, SessionState};
pub use config::CollectorConfig;
pub use diagnostics::{DiagnosticCapture, DiagnosticEntry, DiagnosticKind, DiagnosticLayer};
pub use error::{CollectorError, SendError};
pub use recording::{HttpRecordingAgent, NoopRecordingAgent, RecordingAgent};
pub use recovery::{FileRecoveryStore, MemoryRecoveryStore, RecoveryRecord, RecoveryStore};
pub use transport::{HttpTransport, IngestTransport};
