//! Size limits and timing defaults shared by the collector and the server.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so the batch and page limits are duplicated there. Keep both in sync.

// === Batch Limits ===

/// Maximum batch payload size in bytes (1MB).
pub const MAX_BATCH_SIZE_BYTES: usize = 1024 * 1024;

/// Maximum events per ingested batch.
///
/// Well above the collector's default flush size so that a requeued
/// batch merged with fresh events is still accepted.
pub const MAX_BATCH_EVENTS: usize = 500;

/// Page identifier max length.
pub const MAX_PAGE_LEN: usize = 512;

/// Maximum length of a single textual detail value.
pub const MAX_DETAIL_TEXT_LEN: usize = 2048;

// === Collector Defaults ===

/// Default interval between timer-driven flushes (ms).
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 15_000;

/// Default buffer size that triggers an immediate flush.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

/// Default attempts per batch before it is requeued.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default linear backoff step between attempts (ms).
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2_000;

/// Maximum age of a recovery record before it is discarded (30 minutes).
pub const RECOVERY_MAX_AGE_SECS: u64 = 30 * 60;

// === Summary Limits ===

/// Search queries quoted in the behavior summary.
pub const SUMMARY_MAX_QUERIES: usize = 2;
