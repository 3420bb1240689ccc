//! Store health as seen by the probes.
//!
//! The server has one dependency worth probing, the session store. Its
//! last known state lives in a process-wide registry so startup and the
//! probe handlers agree.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Last known state of one dependency.
#[derive(Debug)]
pub struct ComponentHealth {
    healthy: AtomicBool,
    message: parking_lot::RwLock<Option<String>>,
}

impl ComponentHealth {
    pub const fn new() -> Self {
        Self {
            healthy: AtomicBool::new(false),
            message: parking_lot::RwLock::new(None),
        }
    }

    pub fn set_healthy(&self) {
        self.healthy.store(true, Ordering::Relaxed);
        *self.message.write() = None;
    }

    pub fn set_unhealthy(&self, msg: impl Into<String>) {
        self.healthy.store(false, Ordering::Relaxed);
        *self.message.write() = Some(msg.into());
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn message(&self) -> Option<String> {
        self.message.read().clone()
    }
}

impl Default for ComponentHealth {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    /// Why the store is unhealthy, when known
    pub store_message: Option<String>,
}

pub struct HealthRegistry {
    /// Durable session/event store
    pub store: ComponentHealth,
}

impl HealthRegistry {
    pub const fn new() -> Self {
        Self {
            store: ComponentHealth::new(),
        }
    }

    pub fn report(&self) -> HealthReport {
        let status = if self.store.is_healthy() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };
        HealthReport {
            status,
            store_message: self.store.message(),
        }
    }

    /// Whether the service can accept traffic.
    pub fn is_ready(&self) -> bool {
        self.store.is_healthy()
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub static HEALTH: HealthRegistry = HealthRegistry::new();

pub fn health() -> &'static HealthRegistry {
    &HEALTH
}
