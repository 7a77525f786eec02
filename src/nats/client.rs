use super::messages::{CallSubject, PresenceMessage, SignalEnvelope, StreamAnnouncement};
use super::routing::{Route, StreamRegistry};
use crate::error::{CallError, Result};
use crate::session::{
    ConnectionId, EventBus, EventHandler, EventKind, ListenerId, PublisherHandle,
    PublisherOptions, Session, SessionFactory, SessionState, StreamId, StreamInfo,
    SubscriberOptions, SurfaceId,
};
use crate::signal::Signal;
use async_nats::Client;
use async_trait::async_trait;
use futures::stream::StreamExt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Connect to NATS with the session token. Every duocall connection to the
/// server authenticates the same way.
pub(crate) async fn connect_client(url: &str, token: &str, name: &str) -> Result<Client> {
    async_nats::ConnectOptions::with_token(token.to_string())
        .name(name)
        .connect(url)
        .await
        .map_err(|e| CallError::Connect(e.to_string()))
}

#[derive(Default)]
struct Shared {
    client: Option<Client>,
    state: Option<SessionState>,
    streams: StreamRegistry,
    router: Option<JoinHandle<()>>,
}

struct Inner {
    session_id: String,
    bus: EventBus,
    shared: Mutex<Shared>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn client(&self) -> Result<Client> {
        self.lock().client.clone().ok_or(CallError::NotConnected)
    }

    async fn announce(&self, client: &Client, subject: CallSubject, stream: &StreamInfo) -> Result<()> {
        let payload = serde_json::to_vec(&StreamAnnouncement::new(stream))?;
        client
            .publish(subject.to_subject(&self.session_id), payload.into())
            .await
            .map_err(|e| CallError::Publish(e.to_string()))
    }

    /// Route one message from the session wildcard subscription
    async fn route(&self, subject: &str, payload: &[u8]) {
        let route = self
            .lock()
            .streams
            .route(&self.session_id, subject, payload);

        match route {
            Route::Dispatch(event) => {
                self.bus.dispatch(event);
            }
            Route::Reannounce(streams) => {
                let Ok(client) = self.client() else {
                    return;
                };
                for stream in streams {
                    if let Err(e) = self.announce(&client, CallSubject::StreamCreated, &stream).await {
                        error!("Failed to re-announce stream {}: {}", stream.stream_id, e);
                    }
                }
            }
            Route::Ignore => {}
        }
    }
}

/// Session backed by a NATS server.
///
/// Signals, stream announcements and presence travel as JSON on
/// `call.<session_id>.*`. Every connection receives its own signals back,
/// so chat and captions echo to the sender.
pub struct NatsSession {
    url: String,
    inner: Arc<Inner>,
}

impl NatsSession {
    pub fn new(url: &str, session_id: &str) -> Self {
        Self {
            url: url.to_string(),
            inner: Arc::new(Inner {
                session_id: session_id.to_string(),
                bus: EventBus::new(),
                shared: Mutex::new(Shared::default()),
            }),
        }
    }

    fn set_state(&self, state: SessionState) {
        self.inner.lock().state = Some(state);
    }
}

#[async_trait]
impl Session for NatsSession {
    fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    fn connection_id(&self) -> Option<ConnectionId> {
        self.inner.lock().streams.connection_id().cloned()
    }

    fn state(&self) -> SessionState {
        self.inner.lock().state.unwrap_or(SessionState::Disconnected)
    }

    async fn connect(&self, token: &str) -> Result<ConnectionId> {
        {
            let shared = self.inner.lock();
            if let (Some(_), Some(connection_id)) = (&shared.client, shared.streams.connection_id()) {
                return Ok(connection_id.clone());
            }
        }

        info!("Connecting to NATS at {}", self.url);
        self.set_state(SessionState::Connecting);

        let connect = async {
            let name = format!("duocall-{}", self.inner.session_id);
            let client = connect_client(&self.url, token, &name).await?;

            let subscriber = client
                .subscribe(CallSubject::wildcard(&self.inner.session_id))
                .await
                .map_err(|e| CallError::Connect(e.to_string()))?;

            Ok::<_, CallError>((client, subscriber))
        };

        let (client, mut subscriber) = match connect.await {
            Ok(connected) => connected,
            Err(e) => {
                self.set_state(SessionState::Disconnected);
                return Err(e);
            }
        };

        let connection_id = ConnectionId::generate();

        let inner = Arc::clone(&self.inner);
        let router = tokio::spawn(async move {
            debug!("Session router started");
            while let Some(msg) = subscriber.next().await {
                inner.route(&msg.subject.to_string(), &msg.payload).await;
            }
            debug!("Session router stopped");
        });

        {
            let mut shared = self.inner.lock();
            shared.client = Some(client.clone());
            shared.streams.attach(connection_id.clone());
            shared.state = Some(SessionState::Connected);
            shared.router = Some(router);
        }

        let presence = PresenceMessage {
            connection_id: connection_id.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        match serde_json::to_vec(&presence) {
            Ok(payload) => {
                if let Err(e) = client
                    .publish(
                        CallSubject::PresenceJoin.to_subject(&self.inner.session_id),
                        payload.into(),
                    )
                    .await
                {
                    warn!("Failed to announce presence: {}", e);
                }
            }
            Err(e) => warn!("Failed to encode presence: {}", e),
        }

        info!("Connected to NATS session {} as {}", self.inner.session_id, connection_id);

        Ok(connection_id)
    }

    async fn disconnect(&self) {
        let (client, published, router) = {
            let mut shared = self.inner.lock();
            let Some(client) = shared.client.take() else {
                return;
            };
            shared.state = Some(SessionState::Disconnected);
            let published = shared.streams.detach();
            (client, published, shared.router.take())
        };

        info!("Disconnecting from session {}", self.inner.session_id);

        for stream in &published {
            if let Err(e) = self
                .inner
                .announce(&client, CallSubject::StreamDestroyed, stream)
                .await
            {
                warn!("Failed to announce stream {} destroyed: {}", stream.stream_id, e);
            }
        }
        if let Err(e) = client.flush().await {
            warn!("Failed to flush NATS connection: {}", e);
        }

        if let Some(router) = router {
            router.abort();
        }
    }

    fn init_publisher(
        &self,
        surface: &SurfaceId,
        options: &PublisherOptions,
    ) -> Result<Box<dyn PublisherHandle>> {
        let connection_id = self.connection_id().ok_or(CallError::NotConnected)?;
        let stream = StreamInfo {
            stream_id: StreamId::generate(),
            connection_id,
            has_audio: options.publish_audio,
            has_video: options.publish_video,
        };

        info!("Publisher {} bound to surface {}", stream.stream_id, surface);

        Ok(Box::new(NatsPublisher {
            stream,
            inner: Arc::clone(&self.inner),
            audio: options.publish_audio,
            video: options.publish_video,
            captions: false,
            destroyed: false,
        }))
    }

    async fn publish(&self, stream: &StreamInfo) -> Result<()> {
        let client = self
            .inner
            .client()
            .map_err(|e| CallError::Publish(e.to_string()))?;

        self.inner
            .announce(&client, CallSubject::StreamCreated, stream)
            .await?;
        self.inner.lock().streams.add_published(stream.clone());

        info!("Published stream {}", stream.stream_id);
        Ok(())
    }

    async fn subscribe(
        &self,
        stream: &StreamInfo,
        surface: &SurfaceId,
        _options: &SubscriberOptions,
    ) -> Result<()> {
        let mut shared = self.inner.lock();
        if shared.client.is_none() {
            return Err(CallError::Subscribe(CallError::NotConnected.to_string()));
        }
        if !shared.streams.has_remote(&stream.stream_id) {
            return Err(CallError::StreamNotFound(stream.stream_id.to_string()));
        }
        shared.streams.subscribe(&stream.stream_id);

        info!("Subscribed to stream {} on surface {}", stream.stream_id, surface);
        Ok(())
    }

    async fn unsubscribe(&self, stream_id: &StreamId) -> Result<()> {
        if !self.inner.lock().streams.unsubscribe(stream_id) {
            debug!("Stream {} had no subscription", stream_id);
        }
        Ok(())
    }

    async fn signal(&self, signal: &Signal) -> Result<()> {
        let client = self
            .inner
            .client()
            .map_err(|e| CallError::SignalDelivery(e.to_string()))?;
        let from = self.connection_id().ok_or(CallError::NotConnected)?;

        let raw = signal.encode();
        let envelope = SignalEnvelope {
            data: raw.data,
            from: from.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let payload = serde_json::to_vec(&envelope)?;
        let subject = CallSubject::Signal(raw.signal_type).to_subject(&self.inner.session_id);

        client
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|e| CallError::SignalDelivery(e.to_string()))?;
        client
            .flush()
            .await
            .map_err(|e| CallError::SignalDelivery(e.to_string()))?;

        debug!("Sent {} signal on {}", signal.kind(), subject);
        Ok(())
    }

    fn on(&self, kind: EventKind, handler: EventHandler) -> ListenerId {
        self.inner.bus.on(kind, handler)
    }

    fn off(&self, listener: ListenerId) {
        if !self.inner.bus.off(listener) {
            debug!("Listener {:?} was not registered", listener);
        }
    }
}

/// Local publisher of a NATS session.
///
/// Capture itself belongs to the media layer; this handle tracks the
/// published flags and announces the stream's end.
pub struct NatsPublisher {
    stream: StreamInfo,
    inner: Arc<Inner>,
    audio: bool,
    video: bool,
    captions: bool,
    destroyed: bool,
}

impl NatsPublisher {
    pub fn audio_enabled(&self) -> bool {
        self.audio
    }

    pub fn video_enabled(&self) -> bool {
        self.video
    }

    pub fn captions_enabled(&self) -> bool {
        self.captions
    }
}

impl PublisherHandle for NatsPublisher {
    fn stream(&self) -> &StreamInfo {
        &self.stream
    }

    fn publish_audio(&mut self, enabled: bool) {
        self.audio = enabled;
        info!("Publisher {} audio {}", self.stream.stream_id, on_off(enabled));
    }

    fn publish_video(&mut self, enabled: bool) {
        self.video = enabled;
        info!("Publisher {} video {}", self.stream.stream_id, on_off(enabled));
    }

    fn publish_captions(&mut self, enabled: bool) -> Result<()> {
        self.captions = enabled;
        info!("Publisher {} captions {}", self.stream.stream_id, on_off(enabled));
        Ok(())
    }

    fn destroy(&mut self) -> Result<()> {
        if self.destroyed {
            return Ok(());
        }
        self.destroyed = true;

        let (was_published, client) = {
            let mut shared = self.inner.lock();
            (
                shared.streams.remove_published(&self.stream.stream_id),
                shared.client.clone(),
            )
        };

        info!("Publisher {} destroyed", self.stream.stream_id);

        if let (true, Some(client)) = (was_published, client) {
            let inner = Arc::clone(&self.inner);
            let stream = self.stream.clone();
            tokio::spawn(async move {
                if let Err(e) = inner
                    .announce(&client, CallSubject::StreamDestroyed, &stream)
                    .await
                {
                    warn!("Failed to announce stream {} destroyed: {}", stream.stream_id, e);
                }
            });
        }

        Ok(())
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

/// Creates `NatsSession`s against one NATS server
pub struct NatsSessionFactory {
    url: String,
}

impl NatsSessionFactory {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }
}

impl SessionFactory for NatsSessionFactory {
    // NATS authenticates with the session token alone
    fn init_session(&self, _api_key: &str, session_id: &str) -> Arc<dyn Session> {
        Arc::new(NatsSession::new(&self.url, session_id))
    }
}
