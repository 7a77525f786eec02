use thiserror::Error;

/// Failures surfaced by the call layer.
///
/// Every variant degrades the call instead of ending it: callers log and
/// carry on with reduced functionality.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("subscribe failed: {0}")]
    Subscribe(String),

    #[error("signal delivery failed: {0}")]
    SignalDelivery(String),

    #[error("speech recognition is not supported in this environment")]
    RecognitionUnavailable,

    #[error("speech recognition error: {0}")]
    Recognition(String),

    #[error("session is not connected")]
    NotConnected,

    #[error("stream {0} not found")]
    StreamNotFound(String),

    #[error("publisher does not support {0}")]
    Unsupported(&'static str),

    #[error("invalid signal payload: {0}")]
    InvalidSignal(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CallError {
    fn from(e: serde_json::Error) -> Self {
        CallError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CallError>;
