use crate::session::ConnectionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who sent a chat message, from the local participant's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    Me,
    Other,
}

impl Sender {
    pub fn attribute(from: &ConnectionId, local: &ConnectionId) -> Self {
        if from == local {
            Sender::Me
        } else {
            Sender::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    pub sender: Sender,
    pub at: DateTime<Utc>,
}

/// Append-only, in-memory list of chat messages for one panel
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
}

impl ChatLog {
    pub fn push(&mut self, text: impl Into<String>, sender: Sender) {
        self.messages.push(ChatMessage {
            text: text.into(),
            sender,
            at: Utc::now(),
        });
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Text a draft would send, or `None` for empty and whitespace-only input
pub fn outgoing_text(draft: &str) -> Option<&str> {
    let text = draft.trim();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
