//! Recovery record for resuming a session after a process restart.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::CollectorError;

/// Minimal state needed to resume tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryRecord {
    pub session_id: String,
    pub kiosk_id: String,
    pub current_page: Option<String>,
    pub page_entered_at: Option<DateTime<Utc>>,
    pub persisted_at: DateTime<Utc>,
}

impl RecoveryRecord {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.persisted_at
    }

    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.age(now) > max_age
    }
}

/// Persistence for the recovery record.
///
/// A record that cannot be read is reported as absent.
pub trait RecoveryStore: Send + Sync {
    fn save(&self, record: &RecoveryRecord) -> Result<(), CollectorError>;

    fn load(&self) -> Option<RecoveryRecord>;

    fn clear(&self);
}

/// JSON file written through a temp file and rename.
#[derive(Debug, Clone)]
pub struct FileRecoveryStore {
    path: PathBuf,
}

impl FileRecoveryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl RecoveryStore for FileRecoveryStore {
    fn save(&self, record: &RecoveryRecord) -> Result<(), CollectorError> {
        let tmp = self.tmp_path();
        fs::write(&tmp, serde_json::to_vec(record)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn load(&self) -> Option<RecoveryRecord> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Unreadable recovery record");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Discarding corrupt recovery record");
                self.clear();
                None
            }
        }
    }

    fn clear(&self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove recovery record");
            }
        }
    }
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryRecoveryStore {
    record: Mutex<Option<RecoveryRecord>>,
}

impl MemoryRecoveryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecoveryStore for MemoryRecoveryStore {
    fn save(&self, record: &RecoveryRecord) -> Result<(), CollectorError> {
        *self.record.lock() = Some(record.clone());
        Ok(())
    }

    fn load(&self) -> Option<RecoveryRecord> {
        self.record.lock().clone()
    }

    fn clear(&self) {
        *self.record.lock() = None;
    }
}
