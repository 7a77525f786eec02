use super::messages::{CallSubject, PresenceMessage, SignalEnvelope, StreamAnnouncement};
use crate::session::{ConnectionId, SessionEvent, StreamId, StreamInfo};
use crate::signal::{RawSignal, Signal, SignalEvent};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// What to do with one message from the session subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Hand the event to registered listeners
    Dispatch(SessionEvent),
    /// Another connection joined; announce these streams again
    Reannounce(Vec<StreamInfo>),
    Ignore,
}

/// Per-connection stream bookkeeping of a NATS session.
///
/// Holds no client, so every routing decision can be made (and tested)
/// without a server.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    own: Option<ConnectionId>,
    published: HashMap<StreamId, StreamInfo>,
    remote: HashMap<StreamId, StreamInfo>,
    subscriptions: HashSet<StreamId>,
}

impl StreamRegistry {
    pub fn connection_id(&self) -> Option<&ConnectionId> {
        self.own.as_ref()
    }

    pub fn attach(&mut self, connection_id: ConnectionId) {
        self.own = Some(connection_id);
    }

    /// Forget the connection and everything it saw. Returns the streams
    /// that were still published.
    pub fn detach(&mut self) -> Vec<StreamInfo> {
        self.own = None;
        self.remote.clear();
        self.subscriptions.clear();
        self.published.drain().map(|(_, stream)| stream).collect()
    }

    pub fn add_published(&mut self, stream: StreamInfo) {
        self.published.insert(stream.stream_id.clone(), stream);
    }

    pub fn remove_published(&mut self, stream_id: &StreamId) -> bool {
        self.published.remove(stream_id).is_some()
    }

    pub fn published(&self) -> Vec<StreamInfo> {
        self.published.values().cloned().collect()
    }

    pub fn has_remote(&self, stream_id: &StreamId) -> bool {
        self.remote.contains_key(stream_id)
    }

    pub fn subscribe(&mut self, stream_id: &StreamId) {
        self.subscriptions.insert(stream_id.clone());
    }

    pub fn unsubscribe(&mut self, stream_id: &StreamId) -> bool {
        self.subscriptions.remove(stream_id)
    }

    pub fn is_subscribed(&self, stream_id: &StreamId) -> bool {
        self.subscriptions.contains(stream_id)
    }

    /// Decide what one message on `subject` means for this connection
    pub fn route(&mut self, session_id: &str, subject: &str, payload: &[u8]) -> Route {
        let Some(subject) = CallSubject::parse(session_id, subject) else {
            debug!("Ignoring message on {}", subject);
            return Route::Ignore;
        };

        match subject {
            CallSubject::Signal(signal_type) => self.signal(signal_type, payload),
            CallSubject::StreamCreated => match self.announcement(payload) {
                Some(stream) => {
                    if self.remote.contains_key(&stream.stream_id) {
                        debug!("Stream {} already announced", stream.stream_id);
                        return Route::Ignore;
                    }
                    self.remote.insert(stream.stream_id.clone(), stream.clone());
                    Route::Dispatch(SessionEvent::StreamCreated(stream))
                }
                None => Route::Ignore,
            },
            CallSubject::StreamDestroyed => match self.announcement(payload) {
                Some(stream) => {
                    self.subscriptions.remove(&stream.stream_id);
                    match self.remote.remove(&stream.stream_id) {
                        Some(known) => Route::Dispatch(SessionEvent::StreamDestroyed(known)),
                        None => Route::Ignore,
                    }
                }
                None => Route::Ignore,
            },
            CallSubject::PresenceJoin => {
                let presence = match serde_json::from_slice::<PresenceMessage>(payload) {
                    Ok(presence) => presence,
                    Err(e) => {
                        warn!("Failed to parse presence message: {}", e);
                        return Route::Ignore;
                    }
                };
                if self.is_own(&presence.connection_id) || self.published.is_empty() {
                    return Route::Ignore;
                }
                info!("Connection {} joined, announcing our streams", presence.connection_id);
                Route::Reannounce(self.published())
            }
        }
    }

    fn signal(&self, signal_type: String, payload: &[u8]) -> Route {
        let envelope = match serde_json::from_slice::<SignalEnvelope>(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Failed to parse signal message: {}", e);
                return Route::Ignore;
            }
        };
        let raw = RawSignal {
            signal_type,
            data: envelope.data,
        };
        match Signal::decode(raw) {
            Ok(signal) => Route::Dispatch(SessionEvent::Signal(SignalEvent {
                signal,
                from: ConnectionId::new(envelope.from),
            })),
            Err(e) => {
                debug!("Dropping signal: {}", e);
                Route::Ignore
            }
        }
    }

    /// Parse a stream announcement, skipping our own streams
    fn announcement(&self, payload: &[u8]) -> Option<StreamInfo> {
        let announcement = match serde_json::from_slice::<StreamAnnouncement>(payload) {
            Ok(announcement) => announcement,
            Err(e) => {
                warn!("Failed to parse stream announcement: {}", e);
                return None;
            }
        };
        if self.is_own(&announcement.connection_id) {
            return None;
        }
        Some(announcement.stream())
    }

    fn is_own(&self, connection_id: &str) -> bool {
        self.own.as_ref().map(ConnectionId::as_str) == Some(connection_id)
    }
}
