use super::bus::EventHandler;
use super::types::{
    ConnectionId, EventKind, ListenerId, PublisherOptions, SessionState, StreamId, StreamInfo,
    SubscriberOptions, SurfaceId,
};
use crate::error::{CallError, Result};
use crate::signal::Signal;
use async_trait::async_trait;
use std::sync::Arc;

/// Real-time session service
///
/// Implementations:
/// - NATS: signaling and stream announcements over a NATS server
/// - Test doubles: in-memory sessions for exercising the call layer
///
/// Media transport and negotiation stay behind this trait.
#[async_trait]
pub trait Session: Send + Sync {
    /// Session identifier this handle was initialised with
    fn session_id(&self) -> &str;

    /// Local connection identity, once connected
    fn connection_id(&self) -> Option<ConnectionId>;

    fn state(&self) -> SessionState;

    /// Connect using an access token
    async fn connect(&self, token: &str) -> Result<ConnectionId>;

    /// Leave the session. Calling this on a disconnected session does nothing.
    async fn disconnect(&self);

    /// Create the local publisher bound to `surface`
    fn init_publisher(
        &self,
        surface: &SurfaceId,
        options: &PublisherOptions,
    ) -> Result<Box<dyn PublisherHandle>>;

    /// Start sending the publisher's stream into the session
    async fn publish(&self, stream: &StreamInfo) -> Result<()>;

    /// Render a remote stream into `surface`
    async fn subscribe(
        &self,
        stream: &StreamInfo,
        surface: &SurfaceId,
        options: &SubscriberOptions,
    ) -> Result<()>;

    /// Stop rendering a remote stream. Unknown streams are not an error.
    async fn unsubscribe(&self, stream_id: &StreamId) -> Result<()>;

    /// Send an application signal to every connection, including this one
    async fn signal(&self, signal: &Signal) -> Result<()>;

    fn on(&self, kind: EventKind, handler: EventHandler) -> ListenerId;

    fn off(&self, listener: ListenerId);
}

/// The local outgoing audio/video stream
pub trait PublisherHandle: Send {
    fn stream(&self) -> &StreamInfo;

    fn publish_audio(&mut self, enabled: bool);

    fn publish_video(&mut self, enabled: bool);

    /// Optional capability. Publishers without caption support return
    /// `CallError::Unsupported`.
    fn publish_captions(&mut self, _enabled: bool) -> Result<()> {
        Err(CallError::Unsupported("captions"))
    }

    /// Release capture and stop publishing. Safe to call more than once.
    fn destroy(&mut self) -> Result<()>;
}

/// Creates session handles from an API key and session id
pub trait SessionFactory: Send + Sync {
    fn init_session(&self, api_key: &str, session_id: &str) -> Arc<dyn Session>;
}
