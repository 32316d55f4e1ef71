//! Speech capture session management
//!
//! This module provides the `CaptureService` / session state machine that
//! sequences:
//! - Microphone authorization (one-shot, cached)
//! - Audio capture and frame forwarding into the recognition channel
//! - Partial-result delivery merged with the caller's baseline text
//! - Deterministic stop, cancellation and resource teardown

mod config;
mod merge;
mod session;

pub use config::SessionConfig;
pub use merge::merge_transcript;
pub use session::{CaptureError, CaptureService, SessionState, SessionUpdate};
