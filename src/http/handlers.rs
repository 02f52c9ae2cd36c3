use super::state::AppState;
use crate::session::{ConnectionState, SessionRequest, SessionStatus, SessionSummary};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct EndSessionResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionSummary>,
}

#[derive(Debug, Serialize)]
pub struct MuteResponse {
    pub muted: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /voice/session/start
/// Start a voice session (one at a time)
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<SessionRequest>,
) -> impl IntoResponse {
    let current = state.controller.connection_state();
    if matches!(
        current,
        ConnectionState::Connecting | ConnectionState::Connected
    ) {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "a session is already active".to_string(),
            }),
        )
            .into_response();
    }

    info!("starting {} session over HTTP", req.session_type.as_str());

    match state.controller.start(req).await {
        Ok(session_id) => (
            StatusCode::OK,
            Json(StartSessionResponse {
                session_id,
                status: "connected".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("failed to start session: {e:#}");
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: format!("{e:#}"),
                }),
            )
                .into_response()
        }
    }
}

/// POST /voice/session/end
/// End the active session; always succeeds
pub async fn end_session(State(state): State<AppState>) -> impl IntoResponse {
    let summary = state.controller.end().await;

    (
        StatusCode::OK,
        Json(EndSessionResponse {
            status: "idle".to_string(),
            session: summary,
        }),
    )
        .into_response()
}

/// POST /voice/session/mute
/// Toggle the microphone mute flag
pub async fn toggle_mute(State(state): State<AppState>) -> impl IntoResponse {
    let muted = state.controller.toggle_mute().await;
    (StatusCode::OK, Json(MuteResponse { muted })).into_response()
}

/// GET /voice/session/status
/// Current controller snapshot
pub async fn get_status(State(state): State<AppState>) -> Json<SessionStatus> {
    Json(state.controller.status())
}

/// GET /voice/session/transcript
/// Transcript accumulated so far (live sessions included)
pub async fn get_transcript(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.controller.transcript_snapshot())).into_response()
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
