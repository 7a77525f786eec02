//! HTTP API standing in for the call screen's controls
//!
//! - GET /call - Current call state (flags, caption, chat panels, remote surfaces)
//! - POST /call/audio/toggle - Mute or unmute audio
//! - POST /call/video/toggle - Enable or disable video
//! - POST /call/captions/toggle - Start or stop live captions
//! - POST /call/chat - Send a chat message
//! - POST /call/end - End the call
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
