use super::state::AppState;
use crate::call::{CallHandle, Command};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::info;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub status: String,
    pub command: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn no_session() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse {
            error: "No active session".to_string(),
        }),
    )
        .into_response()
}

async fn with_call(state: &AppState, f: impl FnOnce(&CallHandle) -> Response) -> Response {
    match state.current().await {
        Some(call) => f(&call),
        None => no_session(),
    }
}

async fn dispatch(state: &AppState, command: Command, name: &str) -> Response {
    info!("Call command: {}", name);
    with_call(state, |call| {
        call.dispatch(command);
        (
            StatusCode::ACCEPTED,
            Json(AcceptedResponse {
                status: "accepted".to_string(),
                command: name.to_string(),
            }),
        )
            .into_response()
    })
    .await
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /call
/// Current call screen state
pub async fn get_call(State(state): State<AppState>) -> impl IntoResponse {
    with_call(&state, |call| (StatusCode::OK, Json(call.view())).into_response()).await
}

/// POST /call/audio/toggle
pub async fn toggle_audio(State(state): State<AppState>) -> impl IntoResponse {
    dispatch(&state, Command::ToggleAudio, "toggle_audio").await
}

/// POST /call/video/toggle
pub async fn toggle_video(State(state): State<AppState>) -> impl IntoResponse {
    dispatch(&state, Command::ToggleVideo, "toggle_video").await
}

/// POST /call/captions/toggle
pub async fn toggle_captions(State(state): State<AppState>) -> impl IntoResponse {
    dispatch(&state, Command::ToggleCaptions, "toggle_captions").await
}

/// POST /call/chat
/// Type a message into the chat input and send it
pub async fn send_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> impl IntoResponse {
    with_call(&state, |call| {
        call.send_message(req.text);
        (
            StatusCode::ACCEPTED,
            Json(AcceptedResponse {
                status: "accepted".to_string(),
                command: "send_message".to_string(),
            }),
        )
            .into_response()
    })
    .await
}

/// POST /call/end
pub async fn end_call(State(state): State<AppState>) -> impl IntoResponse {
    dispatch(&state, Command::EndSession, "end_session").await
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
