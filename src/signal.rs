//! Typed application signals carried over the session's generic signal channel.
//!
//! The transport only knows `{type, data}` pairs. Everything past the session
//! boundary works with [`Signal`] instead of raw type strings.

use crate::error::{CallError, Result};
use crate::session::ConnectionId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The signal types this application understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Caption,
    Chat,
}

impl SignalKind {
    pub const ALL: [SignalKind; 2] = [SignalKind::Caption, SignalKind::Chat];

    /// Wire name used as the signal `type`
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Caption => "caption",
            SignalKind::Chat => "chat",
        }
    }

    pub fn from_type(signal_type: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == signal_type)
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Untyped signal as the transport sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSignal {
    #[serde(rename = "type")]
    pub signal_type: String,
    pub data: String,
}

/// A decoded application signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Transcript text from the sender's speech recognizer
    Caption(String),
    /// Chat message text
    Chat(String),
}

impl Signal {
    pub fn kind(&self) -> SignalKind {
        match self {
            Signal::Caption(_) => SignalKind::Caption,
            Signal::Chat(_) => SignalKind::Chat,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Signal::Caption(text) | Signal::Chat(text) => text,
        }
    }

    /// Decode a raw transport signal. Unknown types are rejected.
    pub fn decode(raw: RawSignal) -> Result<Self> {
        match SignalKind::from_type(&raw.signal_type) {
            Some(SignalKind::Caption) => Ok(Signal::Caption(raw.data)),
            Some(SignalKind::Chat) => Ok(Signal::Chat(raw.data)),
            None => Err(CallError::InvalidSignal(format!(
                "unknown signal type '{}'",
                raw.signal_type
            ))),
        }
    }

    pub fn encode(&self) -> RawSignal {
        RawSignal {
            signal_type: self.kind().as_str().to_string(),
            data: self.text().to_string(),
        }
    }
}

/// A signal received on the session, with the connection that sent it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalEvent {
    pub signal: Signal,
    pub from: ConnectionId,
}
