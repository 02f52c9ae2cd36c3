//! HTTP API server for driving the voice session
//!
//! This module provides a REST API for controlling the session controller:
//! - POST /voice/session/start - Start a voice session
//! - POST /voice/session/end - End the active session
//! - POST /voice/session/mute - Toggle the microphone mute flag
//! - GET /voice/session/status - Controller snapshot
//! - GET /voice/session/transcript - Accumulated transcript
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
