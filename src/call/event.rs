use crate::error::CallError;
use crate::session::{StreamId, StreamInfo};
use crate::signal::SignalEvent;
use crate::speech::RecognitionEvent;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// User actions on the call screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ToggleAudio,
    ToggleVideo,
    ToggleCaptions,
    /// Replace the chat input
    SetDraft(String),
    /// Send this text as one chat message
    SendMessage(String),
    EndSession,
}

/// Everything that can change call state, in queue order
#[derive(Debug, Clone, PartialEq)]
pub enum CallEvent {
    Command(Command),
    PublisherReady,
    PublisherInitFailed(CallError),
    PublishCompleted(Result<(), CallError>),
    StreamCreated(StreamInfo),
    StreamDestroyed(StreamId),
    SubscribeCompleted {
        stream_id: StreamId,
        result: Result<(), CallError>,
    },
    SignalReceived(SignalEvent),
    ChatDelivered {
        text: String,
        result: Result<(), CallError>,
    },
    Recognition(RecognitionEvent),
    RecognitionFailed(String),
    RecognizerStartFailed(CallError),
    CaptionExpired {
        generation: u64,
    },
    Teardown,
}

impl From<Command> for CallEvent {
    fn from(command: Command) -> Self {
        CallEvent::Command(command)
    }
}

/// Side effects requested by the reducer, run by the call runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Publish,
    SetAudio(bool),
    SetVideo(bool),
    SetCaptions(bool),
    StartRecognizer,
    StopRecognizer,
    /// Fire-and-forget caption signal
    BroadcastCaption(String),
    /// Chat signal; completion comes back as `CallEvent::ChatDelivered`
    SendChat(String),
    ScheduleCaptionClear {
        generation: u64,
        after: Duration,
    },
    Subscribe(StreamInfo),
    Unsubscribe(StreamId),
    Notify(Notice),
    Disconnect,
    NotifyEnded,
    RemoveListeners,
    DestroyPublisher,
}

/// User-visible notices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    SpeechUnsupported,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::SpeechUnsupported => {
                f.write_str("Speech Recognition not supported in this environment.")
            }
        }
    }
}
