use serde::{Deserialize, Serialize};

use super::SessionKind;

/// Connection lifecycle of the active session.
///
/// `idle -> connecting -> connected -> idle` on the happy path; any failure
/// or abnormal close lands in `error`, which only a manual `start` leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Error,
}

/// Snapshot of the controller for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub state: ConnectionState,
    pub session_id: Option<String>,
    pub session_type: Option<SessionKind>,
    pub topic: Option<String>,
    pub duration_seconds: u64,
    pub muted: bool,
    /// Whether synthesized speech is playing or queued
    pub speaking: bool,
    /// Microphone level meter, 0-100
    pub mic_level: u32,
    pub last_error: Option<String>,
}

/// Returned by `end()` when a session was actually finalized.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub duration_seconds: u64,
    pub transcript_entries: usize,
}
