//! Mock implementations for testing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use journey_core::{Error, Event, Outcome, Result, Session, StoreErrorCode};
use parking_lot::Mutex;
use session_store::{MemoryStore, SessionStore};
use std::sync::Arc;

/// Store that can be switched into failing mode.
///
/// Wraps a [`MemoryStore`]; while failing, every call returns `STORE_001`
/// and the health probe reports the store as down.
#[derive(Clone, Default)]
pub struct FlakyStore {
    inner: Arc<MemoryStore>,
    should_fail: Arc<Mutex<bool>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set failure mode for testing error handling.
    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }

    fn check(&self) -> Result<()> {
        if *self.should_fail.lock() {
            return Err(Error::store(StoreErrorCode::StoreFailed, "mock store failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn create_session(&self, session: &Session) -> Result<()> {
        self.check()?;
        self.inner.create_session(session).await
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        self.check()?;
        self.inner.get_session(session_id).await
    }

    async fn append_events(&self, session_id: &str, events: Vec<Event>) -> Result<usize> {
        self.check()?;
        self.inner.append_events(session_id, events).await
    }

    async fn end_session(
        &self,
        session_id: &str,
        outcome: Outcome,
        ended_at: DateTime<Utc>,
    ) -> Result<Session> {
        self.check()?;
        self.inner.end_session(session_id, outcome, ended_at).await
    }

    async fn list_events(&self, session_id: &str) -> Result<Vec<Event>> {
        self.check()?;
        self.inner.list_events(session_id).await
    }

    async fn is_healthy(&self) -> bool {
        !*self.should_fail.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_flaky_store_fails_on_demand() {
        let store = FlakyStore::new();
        let session = Session::new("kiosk-1");
        store.create_session(&session).await.unwrap();

        store.set_should_fail(true);
        let err = store.get_session(&session.session_id).await.unwrap_err();
        assert_eq!(err.error_code(), Some("STORE_001"));
        assert!(!store.is_healthy().await);

        store.set_should_fail(false);
        assert!(store.get_session(&session.session_id).await.unwrap().is_some());
    }
}
