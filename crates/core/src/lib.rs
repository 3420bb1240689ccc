//! Core types for kiosk session tracking: the shared event vocabulary,
//! the session record, outcome classification, journey reconstruction
//! and the behavior summarizer.

pub mod error;
pub mod events;
pub mod journey;
pub mod limits;
pub mod outcome;
pub mod protocol;
pub mod session;
pub mod summary;

pub use error::{Error, Result, SessionErrorCode, StoreErrorCode, ValidationErrorCode};
pub use events::*;
pub use journey::{reconstruct, JourneyStep};
pub use outcome::*;
pub use protocol::*;
pub use session::*;
pub use summary::summarize;
