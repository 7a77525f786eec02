use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Call screen
        .route("/call", get(handlers::get_call))
        .route("/call/audio/toggle", post(handlers::toggle_audio))
        .route("/call/video/toggle", post(handlers::toggle_video))
        .route("/call/captions/toggle", post(handlers::toggle_captions))
        .route("/call/chat", post(handlers::send_chat))
        .route("/call/end", post(handlers::end_call))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
