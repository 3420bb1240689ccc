//! Telemetry for the kiosk journey services.
//!
//! Structured logging via `tracing`, in-process counters and latency
//! histograms, and a component health registry for the probes.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
