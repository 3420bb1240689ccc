//! Connectivity checks and schema bootstrap.

use super::client::ClickHouseClient;
use super::schema::all_tables;
use super::store::store_error;
use journey_core::Result;
use tracing::{debug, error};

/// Runs `SELECT 1` against the server.
pub async fn check_connection(client: &ClickHouseClient) -> bool {
    match client.inner().query("SELECT 1").fetch_one::<u8>().await {
        Ok(_) => {
            debug!("ClickHouse connection healthy");
            true
        }
        Err(e) => {
            error!("ClickHouse health check failed: {}", e);
            false
        }
    }
}

/// Creates the journey tables if they do not exist.
pub async fn init_schema(client: &ClickHouseClient) -> Result<()> {
    for ddl in all_tables() {
        client
            .inner()
            .query(ddl)
            .execute()
            .await
            .map_err(|e| store_error("Failed to execute DDL", e))?;
    }

    debug!("ClickHouse schema initialized");
    Ok(())
}
