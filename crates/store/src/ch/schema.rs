//! Table definitions.
//!
//! Tables are unqualified and resolve against the client's database.
//! Instants are `DateTime64(3)` and travel as epoch milliseconds.

/// One row per session version; the end record supersedes the start record.
pub const CREATE_SESSIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    session_id String,
    kiosk_id LowCardinality(String),
    started_at DateTime64(3),
    ended_at Nullable(DateTime64(3)),
    duration_seconds Nullable(Int64),
    outcome LowCardinality(String),
    has_recording UInt8,
    version UInt64
)
ENGINE = ReplacingMergeTree(version)
ORDER BY session_id
"#;

/// Append-only event log.
pub const CREATE_EVENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    event_id String,
    batch_id String,
    seq UInt32,
    session_id String,
    event_type LowCardinality(String),
    page String,
    zone Nullable(String),
    details String,
    coordinates Nullable(String),
    timestamp DateTime64(3),
    received_at DateTime64(3)
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(timestamp)
ORDER BY (session_id, timestamp, received_at, seq)
"#;

/// One aggregate delta per accepted batch.
pub const CREATE_SESSION_COUNTERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS session_counters (
    session_id String,
    batch_id String,
    recorded_at DateTime64(3),
    total_events UInt64,
    total_clicks UInt64,
    pages Array(String),
    flags UInt16
)
ENGINE = MergeTree()
ORDER BY (session_id, recorded_at, batch_id)
"#;

pub fn all_tables() -> Vec<&'static str> {
    vec![
        CREATE_SESSIONS_TABLE,
        CREATE_EVENTS_TABLE,
        CREATE_SESSION_COUNTERS_TABLE,
    ]
}
