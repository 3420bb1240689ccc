//! Kiosk Journey Server
//!
//! Session tracking backend for self-service greeting-card kiosks:
//! - Session start/end and batched event ingestion
//! - Append-only event log with additive per-session aggregates
//! - Journey reconstruction and behavior summaries on read

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use api::{router, AppState, RecordingSettings};
use session_store::{ch, ClickHouseClient, ClickHouseConfig, ClickHouseStore, MemoryStore, SharedStore};
use telemetry::{health, init_tracing_from_env, metrics};

/// Which store backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
enum StoreKind {
    Memory,
    Clickhouse,
}

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    #[serde(default = "default_store")]
    store: StoreKind,

    #[serde(default)]
    clickhouse: ClickHouseConfig,

    #[serde(default)]
    recording: RecordingSettings,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_store() -> StoreKind {
    StoreKind::Clickhouse
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            store: default_store(),
            clickhouse: ClickHouseConfig::default(),
            recording: RecordingSettings::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Kiosk Journey Server v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;

    let store = build_store(&config).await?;

    let state = AppState::new(store).with_recording(config.recording.clone());
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    let snapshot = metrics().snapshot();
    info!(
        sessions_started = snapshot.sessions_started,
        sessions_ended = snapshot.sessions_ended,
        batches_received = snapshot.batches_received,
        events_appended = snapshot.events_appended,
        events_failed_validation = snapshot.events_failed_validation,
        invalid_session_rejections = snapshot.invalid_session_rejections,
        store_errors = snapshot.store_errors,
        journeys_built = snapshot.journeys_built,
        ingest_latency_mean_ms = snapshot.ingest_latency_mean_ms,
        "Shutdown complete"
    );
    Ok(())
}

/// Load configuration from files and environment.
///
/// Nested keys use a double underscore, e.g. `JOURNEY__CLICKHOUSE__URL`.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        .add_source(config::Config::try_from(&Config::default())?)
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        .add_source(
            config::Environment::with_prefix("JOURNEY")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("recording.kiosks"),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

/// Connects the configured store and records its health.
async fn build_store(config: &Config) -> Result<SharedStore> {
    match config.store {
        StoreKind::Memory => {
            warn!("Using in-memory store; sessions are lost on restart");
            health().store.set_healthy();
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreKind::Clickhouse => {
            let client = ClickHouseClient::new(config.clickhouse.clone());

            if let Err(e) = ch::init_schema(&client).await {
                // Tables may already exist under a restricted user.
                error!("Failed to initialize ClickHouse schema: {}", e);
            }

            if ch::check_connection(&client).await {
                health().store.set_healthy();
                info!(
                    url = %config.clickhouse.url,
                    database = %config.clickhouse.database,
                    "ClickHouse connection: healthy"
                );
            } else {
                health().store.set_unhealthy("Connection failed");
                error!(url = %config.clickhouse.url, "ClickHouse connection: unhealthy");
            }

            Ok(Arc::new(ClickHouseStore::new(client)))
        }
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
