use crate::session::{ConnectionId, StreamInfo};
use serde::{Deserialize, Serialize};

/// Application signal published on `call.<session>.signal.<type>`
#[derive(Debug, Serialize, Deserialize)]
pub struct SignalEnvelope {
    pub data: String,
    /// Sending connection
    pub from: String,
    pub timestamp: String, // RFC3339 timestamp
}

/// Stream lifecycle announcement on `call.<session>.stream.{created,destroyed}`
#[derive(Debug, Serialize, Deserialize)]
pub struct StreamAnnouncement {
    pub stream_id: String,
    pub connection_id: String,
    pub has_audio: bool,
    pub has_video: bool,
    pub timestamp: String,
}

impl StreamAnnouncement {
    pub fn new(stream: &StreamInfo) -> Self {
        Self {
            stream_id: stream.stream_id.to_string(),
            connection_id: stream.connection_id.to_string(),
            has_audio: stream.has_audio,
            has_video: stream.has_video,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn stream(&self) -> StreamInfo {
        StreamInfo {
            stream_id: self.stream_id.as_str().into(),
            connection_id: ConnectionId::new(self.connection_id.as_str()),
            has_audio: self.has_audio,
            has_video: self.has_video,
        }
    }
}

/// Join announcement on `call.<session>.presence.join`
#[derive(Debug, Serialize, Deserialize)]
pub struct PresenceMessage {
    pub connection_id: String,
    pub timestamp: String,
}

/// Transcript message received from the STT service
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub session_id: String,
    /// Connection whose audio was transcribed
    #[serde(default)]
    pub source: Option<String>,
    pub text: String,
    pub partial: bool,
    pub timestamp: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// Subjects used by one call session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallSubject {
    Signal(String),
    StreamCreated,
    StreamDestroyed,
    PresenceJoin,
}

impl CallSubject {
    /// Subject prefix for a session
    pub fn prefix(session_id: &str) -> String {
        format!("call.{}", session_id)
    }

    pub fn wildcard(session_id: &str) -> String {
        format!("{}.>", Self::prefix(session_id))
    }

    pub fn to_subject(&self, session_id: &str) -> String {
        let prefix = Self::prefix(session_id);
        match self {
            CallSubject::Signal(signal_type) => format!("{}.signal.{}", prefix, signal_type),
            CallSubject::StreamCreated => format!("{}.stream.created", prefix),
            CallSubject::StreamDestroyed => format!("{}.stream.destroyed", prefix),
            CallSubject::PresenceJoin => format!("{}.presence.join", prefix),
        }
    }

    /// Parse a subject belonging to `session_id`
    pub fn parse(session_id: &str, subject: &str) -> Option<Self> {
        let rest = subject
            .strip_prefix(&Self::prefix(session_id))?
            .strip_prefix('.')?;

        match rest {
            "stream.created" => Some(CallSubject::StreamCreated),
            "stream.destroyed" => Some(CallSubject::StreamDestroyed),
            "presence.join" => Some(CallSubject::PresenceJoin),
            _ => {
                let signal_type = rest.strip_prefix("signal.")?;
                if signal_type.is_empty() || signal_type.contains('.') {
                    None
                } else {
                    Some(CallSubject::Signal(signal_type.to_string()))
                }
            }
        }
    }
}
