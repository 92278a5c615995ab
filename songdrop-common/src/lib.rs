//! # songdrop Common Library
//!
//! Shared code for the songdrop service:
//! - Error and result types
//! - Configuration loading (TOML + environment)
//! - Event types (SongdropEvent enum) and the EventBus
//! - SSE stream helpers

pub mod config;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
pub use events::{EventBus, FileSlot, SongdropEvent, SubmissionPhase};
