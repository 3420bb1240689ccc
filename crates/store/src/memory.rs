//! In-process store.
//!
//! Every mutation of a session happens under one write lock, so the
//! append and the aggregate update are a single transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use journey_core::{AggregateDelta, Error, Event, Outcome, Result, Session};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

use crate::SessionStore;

#[derive(Debug)]
struct SessionLog {
    session: Session,
    events: Vec<Event>,
}

/// Store backed by a process-local map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, SessionLog>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions held.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, session: &Session) -> Result<()> {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(&session.session_id) {
            return Err(Error::internal(format!(
                "session {} already exists",
                session.session_id
            )));
        }
        sessions.insert(
            session.session_id.clone(),
            SessionLog {
                session: session.clone(),
                events: Vec::new(),
            },
        );
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self
            .sessions
            .read()
            .get(session_id)
            .map(|log| log.session.clone()))
    }

    async fn append_events(&self, session_id: &str, events: Vec<Event>) -> Result<usize> {
        let mut sessions = self.sessions.write();
        let log = sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::session_not_found(session_id))?;

        if !log.session.is_active() {
            return Err(Error::session_ended(session_id));
        }

        let count = events.len();
        let delta = AggregateDelta::from_events(&events);
        log.events.extend(events);
        log.session.apply(&delta);

        debug!(session_id = %session_id, count = count, "Appended events");
        Ok(count)
    }

    async fn end_session(
        &self,
        session_id: &str,
        outcome: Outcome,
        ended_at: DateTime<Utc>,
    ) -> Result<Session> {
        let mut sessions = self.sessions.write();
        let log = sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::session_not_found(session_id))?;

        if !log.session.is_active() {
            return Err(Error::session_ended(session_id));
        }

        log.session.end(outcome, ended_at);
        Ok(log.session.clone())
    }

    async fn list_events(&self, session_id: &str) -> Result<Vec<Event>> {
        let sessions = self.sessions.read();
        let log = sessions
            .get(session_id)
            .ok_or_else(|| Error::session_not_found(session_id))?;

        let mut events = log.events.clone();
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}
