//! Read helpers for admin tooling and tests.

use super::client::ClickHouseClient;
use super::store::store_error;
use journey_core::Result;

/// Counts logged events for a session.
pub async fn count_events(client: &ClickHouseClient, session_id: &str) -> Result<u64> {
    client
        .inner()
        .query("SELECT count() FROM events WHERE session_id = ?")
        .bind(session_id)
        .fetch_one()
        .await
        .map_err(|e| store_error("Query error", e))
}

/// Empties every journey table.
pub async fn truncate_all(client: &ClickHouseClient) -> Result<()> {
    for table in ["sessions", "events", "session_counters"] {
        client
            .inner()
            .query(&format!("TRUNCATE TABLE IF EXISTS {}", table))
            .execute()
            .await
            .map_err(|e| store_error("Truncate error", e))?;
    }
    Ok(())
}
