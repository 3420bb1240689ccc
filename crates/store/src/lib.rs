//! Durable session store.
//!
//! The [`SessionStore`] trait is the storage boundary for the ingestion
//! endpoint and the journey read path: an append-only event log per
//! session plus additive aggregate updates. Two backends are provided:
//! an in-process [`MemoryStore`] and a ClickHouse-backed [`ClickHouseStore`].

pub mod ch;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use journey_core::{Event, Outcome, Result, Session};
use std::sync::Arc;

pub use ch::{ClickHouseClient, ClickHouseConfig, ClickHouseStore};
pub use memory::MemoryStore;

/// Storage operations used by the API.
///
/// Implementations must make aggregate updates safe under concurrent
/// batches for the same session: counters are applied as additive deltas,
/// never by overwriting a previously read session document.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persists a newly started session.
    async fn create_session(&self, session: &Session) -> Result<()>;

    /// Loads a session with its aggregates folded in.
    async fn get_session(&self, session_id: &str) -> Result<Option<Session>>;

    /// Appends a validated batch in the order received and applies its
    /// aggregate delta.
    ///
    /// Fails with `SESSION_001` if the session does not exist and with
    /// `SESSION_002` if it has already ended.
    async fn append_events(&self, session_id: &str, events: Vec<Event>) -> Result<usize>;

    /// Ends an active session and returns the final record.
    async fn end_session(
        &self,
        session_id: &str,
        outcome: Outcome,
        ended_at: DateTime<Utc>,
    ) -> Result<Session>;

    /// Returns the session's event log ordered by client timestamp.
    async fn list_events(&self, session_id: &str) -> Result<Vec<Event>>;

    /// Checks whether the backend is reachable.
    async fn is_healthy(&self) -> bool;
}

/// Shared handle to a store backend.
pub type SharedStore = Arc<dyn SessionStore>;
