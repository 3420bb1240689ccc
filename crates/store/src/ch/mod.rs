//! ClickHouse backend.
//!
//! Sessions live in a `ReplacingMergeTree` keyed by id and read with
//! `FINAL`. Events are an append-only `MergeTree` log. Aggregates are
//! stored as one delta row per accepted batch and folded on read, so
//! concurrent batches never overwrite each other.

mod client;
mod config;
mod health;
mod query;
mod rows;
mod schema;
mod store;

pub use client::ClickHouseClient;
pub use config::ClickHouseConfig;
pub use health::{check_connection, init_schema};
pub use query::{count_events, truncate_all};
pub use schema::all_tables;
pub use store::ClickHouseStore;
