use super::chat::ChatMessage;
use super::event::Notice;
use super::remote::RemoteView;
use serde::Serialize;

/// Local preview state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Preview {
    /// Publisher created, publish in flight
    Pending,
    Live,
    /// Publish failed; the local surface stays empty
    Failed,
    /// No publisher exists
    Absent,
}

/// Snapshot of everything the call screen renders
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallView {
    pub connection_id: String,
    pub audio_enabled: bool,
    pub video_enabled: bool,
    pub captions_enabled: bool,
    pub listening: bool,
    pub caption: Option<String>,
    pub preview: Preview,
    pub publisher_chat: Vec<ChatMessage>,
    pub subscriber_chat: Vec<ChatMessage>,
    pub draft: String,
    pub remote: Vec<RemoteView>,
    pub notices: Vec<Notice>,
    pub ended: bool,
}
