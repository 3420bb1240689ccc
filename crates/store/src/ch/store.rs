//! `SessionStore` over ClickHouse.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use journey_core::{
    AggregateDelta, Error, Event, Outcome, Result, Session, StoreErrorCode,
};
use telemetry::metrics;
use tracing::{debug, error};
use uuid::Uuid;

use super::client::ClickHouseClient;
use super::health::check_connection;
use super::rows::{CounterRow, EventRow, SessionRow};
use crate::SessionStore;

pub(crate) fn store_error(context: &str, e: clickhouse::error::Error) -> Error {
    metrics().store_errors.inc();
    error!("{}: {}", context, e);
    Error::store(StoreErrorCode::StoreFailed, format!("{}: {}", context, e))
}

/// Store backed by ClickHouse tables.
///
/// Events are written before the batch's counter delta. The two inserts
/// are not atomic; a failure between them leaves the events logged and
/// the aggregates short by that batch.
#[derive(Clone)]
pub struct ClickHouseStore {
    client: ClickHouseClient,
}

impl ClickHouseStore {
    pub fn new(client: ClickHouseClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ClickHouseClient {
        &self.client
    }

    async fn load_session_row(&self, session_id: &str) -> Result<Option<SessionRow>> {
        self.client
            .inner()
            .query("SELECT ?fields FROM sessions FINAL WHERE session_id = ?")
            .bind(session_id)
            .fetch_optional::<SessionRow>()
            .await
            .map_err(|e| store_error("Session query error", e))
    }

    async fn load_counters(&self, session_id: &str) -> Result<Vec<CounterRow>> {
        self.client
            .inner()
            .query("SELECT ?fields FROM session_counters WHERE session_id = ? ORDER BY recorded_at, batch_id")
            .bind(session_id)
            .fetch_all::<CounterRow>()
            .await
            .map_err(|e| store_error("Counter query error", e))
    }

    async fn write_session(&self, session: &Session) -> Result<()> {
        let row = SessionRow::from_session(session);
        let mut insert = self
            .client
            .inner()
            .insert("sessions")
            .map_err(|e| store_error("Insert error", e))?;
        insert
            .write(&row)
            .await
            .map_err(|e| store_error("Write error", e))?;
        insert
            .end()
            .await
            .map_err(|e| store_error("End error", e))?;
        Ok(())
    }

    async fn write_events(&self, rows: &[EventRow]) -> Result<()> {
        let mut insert = self
            .client
            .inner()
            .insert("events")
            .map_err(|e| store_error("Insert error", e))?;
        for row in rows {
            insert
                .write(row)
                .await
                .map_err(|e| store_error("Write error", e))?;
        }
        insert
            .end()
            .await
            .map_err(|e| store_error("End error", e))?;
        Ok(())
    }

    async fn write_counter(&self, row: &CounterRow) -> Result<()> {
        let mut insert = self
            .client
            .inner()
            .insert("session_counters")
            .map_err(|e| store_error("Insert error", e))?;
        insert
            .write(row)
            .await
            .map_err(|e| store_error("Write error", e))?;
        insert
            .end()
            .await
            .map_err(|e| store_error("End error", e))?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for ClickHouseStore {
    async fn create_session(&self, session: &Session) -> Result<()> {
        self.write_session(session).await?;
        debug!(session_id = %session.session_id, "Session row written");
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let Some(row) = self.load_session_row(session_id).await? else {
            return Ok(None);
        };
        let mut session = row.into_session()?;
        for counter in self.load_counters(session_id).await? {
            session.apply(&counter.into_delta());
        }
        Ok(Some(session))
    }

    async fn append_events(&self, session_id: &str, events: Vec<Event>) -> Result<usize> {
        let row = self
            .load_session_row(session_id)
            .await?
            .ok_or_else(|| Error::session_not_found(session_id))?;
        if row.ended_at.is_some() {
            return Err(Error::session_ended(session_id));
        }

        let batch_id = Uuid::new_v4().to_string();
        let received_at = Utc::now();
        let rows = events
            .iter()
            .enumerate()
            .map(|(seq, event)| EventRow::from_event(event, &batch_id, seq as u32, received_at))
            .collect::<Result<Vec<_>>>()?;

        self.write_events(&rows).await?;

        let delta = AggregateDelta::from_events(&events);
        self.write_counter(&CounterRow::from_delta(session_id, &batch_id, received_at, &delta))
            .await?;

        debug!(session_id = %session_id, count = events.len(), "Appended events");
        Ok(events.len())
    }

    async fn end_session(
        &self,
        session_id: &str,
        outcome: Outcome,
        ended_at: DateTime<Utc>,
    ) -> Result<Session> {
        let mut session = self
            .get_session(session_id)
            .await?
            .ok_or_else(|| Error::session_not_found(session_id))?;
        if !session.is_active() {
            return Err(Error::session_ended(session_id));
        }

        session.end(outcome, ended_at);
        self.write_session(&session).await?;
        Ok(session)
    }

    async fn list_events(&self, session_id: &str) -> Result<Vec<Event>> {
        if self.load_session_row(session_id).await?.is_none() {
            return Err(Error::session_not_found(session_id));
        }

        let rows = self
            .client
            .inner()
            .query("SELECT ?fields FROM events WHERE session_id = ? ORDER BY timestamp, received_at, seq")
            .bind(session_id)
            .fetch_all::<EventRow>()
            .await
            .map_err(|e| store_error("Event query error", e))?;

        rows.into_iter().map(EventRow::into_event).collect()
    }

    async fn is_healthy(&self) -> bool {
        check_connection(&self.client).await
    }
}
