use crate::signal::{SignalEvent, SignalKind};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// Identity of one participant's connection to the session
    ConnectionId
);

string_id!(
    /// Identity of one published media stream
    StreamId
);

string_id!(
    /// Name of the rendering surface a video is attached to
    SurfaceId
);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl StreamId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl SurfaceId {
    /// Surface holding the local camera preview
    pub fn publisher() -> Self {
        Self("publisher".to_string())
    }

    /// Surface holding the remote video for `stream_id`
    pub fn for_stream(stream_id: &StreamId) -> Self {
        Self(format!("subscriber-{}", stream_id))
    }
}

/// Handle returned by `Session::on`, used to unregister that one listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Connecting,
    Connected,
    Disconnected,
}

/// A media stream announced on the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub stream_id: StreamId,
    /// Connection that publishes this stream
    pub connection_id: ConnectionId,
    pub has_audio: bool,
    pub has_video: bool,
}

/// How a video element is inserted into its surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertMode {
    Append,
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherOptions {
    pub insert_mode: InsertMode,
    pub width: String,
    pub height: String,
    pub publish_audio: bool,
    pub publish_video: bool,
}

impl Default for PublisherOptions {
    fn default() -> Self {
        Self {
            insert_mode: InsertMode::Append,
            width: "100%".to_string(),
            height: "100%".to_string(),
            publish_audio: true,
            publish_video: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberOptions {
    pub insert_mode: InsertMode,
    pub width: String,
    pub height: String,
}

impl Default for SubscriberOptions {
    fn default() -> Self {
        Self {
            insert_mode: InsertMode::Append,
            width: "100%".to_string(),
            height: "100%".to_string(),
        }
    }
}

/// Events a session delivers to registered listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StreamCreated(StreamInfo),
    StreamDestroyed(StreamInfo),
    Signal(SignalEvent),
}

/// Event names a listener can register for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    StreamCreated,
    StreamDestroyed,
    Signal(SignalKind),
}

impl SessionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SessionEvent::StreamCreated(_) => EventKind::StreamCreated,
            SessionEvent::StreamDestroyed(_) => EventKind::StreamDestroyed,
            SessionEvent::Signal(event) => EventKind::Signal(event.signal.kind()),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::StreamCreated => f.write_str("streamCreated"),
            EventKind::StreamDestroyed => f.write_str("streamDestroyed"),
            EventKind::Signal(kind) => write!(f, "signal:{}", kind),
        }
    }
}
