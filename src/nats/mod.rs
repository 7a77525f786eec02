pub mod client;
pub mod messages;
pub mod recognizer;
pub mod routing;

pub use client::{NatsPublisher, NatsSession, NatsSessionFactory};
pub use messages::{CallSubject, PresenceMessage, SignalEnvelope, StreamAnnouncement, TranscriptMessage};
pub use recognizer::{NatsRecognizerProvider, NatsSpeechRecognizer, TranscriptFilter};
pub use routing::{Route, StreamRegistry};
