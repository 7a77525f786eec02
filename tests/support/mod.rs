// In-memory doubles for the session service and speech recognition.

#![allow(dead_code)]

use async_trait::async_trait;
use duocall::call::{CallHandle, Notice};
use duocall::error::{CallError, Result};
use duocall::session::{
    ConnectionId, EventBus, EventHandler, EventKind, ListenerId, PublisherHandle,
    PublisherOptions, Session, SessionEvent, SessionFactory, SessionState, StreamId, StreamInfo,
    SubscriberOptions, SurfaceId,
};
use duocall::signal::{Signal, SignalEvent};
use duocall::speech::{
    RecognitionEvent, RecognitionListener, RecognitionResult, RecognizerProvider,
    RecognizerSettings, SpeechRecognizer,
};
use duocall::CallObserver;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Calls made on the local publisher
#[derive(Default)]
pub struct PublisherLog {
    pub created: AtomicUsize,
    pub audio: Mutex<Vec<bool>>,
    pub video: Mutex<Vec<bool>>,
    pub captions: Mutex<Vec<bool>>,
    pub destroys: AtomicUsize,
}

pub struct FakePublisher {
    stream: StreamInfo,
    log: Arc<PublisherLog>,
    supports_captions: bool,
}

impl PublisherHandle for FakePublisher {
    fn stream(&self) -> &StreamInfo {
        &self.stream
    }

    fn publish_audio(&mut self, enabled: bool) {
        self.log.audio.lock().unwrap().push(enabled);
    }

    fn publish_video(&mut self, enabled: bool) {
        self.log.video.lock().unwrap().push(enabled);
    }

    fn publish_captions(&mut self, enabled: bool) -> Result<()> {
        if !self.supports_captions {
            return Err(CallError::Unsupported("captions"));
        }
        self.log.captions.lock().unwrap().push(enabled);
        Ok(())
    }

    fn destroy(&mut self) -> Result<()> {
        self.log.destroys.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Session double. Signals are delivered to linked peers and, when echo is
/// on, back to the sender.
pub struct FakeSession {
    pub bus: Arc<EventBus>,
    pub connection: ConnectionId,
    connected: AtomicBool,
    peers: Mutex<Vec<Arc<EventBus>>>,
    pub echo: AtomicBool,
    pub fail_connect: AtomicBool,
    pub fail_init_publisher: AtomicBool,
    pub fail_publish: AtomicBool,
    pub fail_subscribe: AtomicBool,
    pub fail_signal: AtomicBool,
    pub captions_supported: AtomicBool,
    pub connects: AtomicUsize,
    pub disconnect_calls: AtomicUsize,
    pub published: Mutex<Vec<StreamId>>,
    pub subscribed: Mutex<Vec<(StreamId, SurfaceId)>>,
    pub unsubscribed: Mutex<Vec<StreamId>>,
    pub signals: Mutex<Vec<Signal>>,
    pub publisher: Arc<PublisherLog>,
}

impl FakeSession {
    pub fn new(connection: &str) -> Arc<Self> {
        Arc::new(Self {
            bus: Arc::new(EventBus::new()),
            connection: ConnectionId::new(connection),
            connected: AtomicBool::new(false),
            peers: Mutex::new(Vec::new()),
            echo: AtomicBool::new(true),
            fail_connect: AtomicBool::new(false),
            fail_init_publisher: AtomicBool::new(false),
            fail_publish: AtomicBool::new(false),
            fail_subscribe: AtomicBool::new(false),
            fail_signal: AtomicBool::new(false),
            captions_supported: AtomicBool::new(true),
            connects: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
            published: Mutex::new(Vec::new()),
            subscribed: Mutex::new(Vec::new()),
            unsubscribed: Mutex::new(Vec::new()),
            signals: Mutex::new(Vec::new()),
            publisher: Arc::new(PublisherLog::default()),
        })
    }

    /// A session that is already connected
    pub fn connected(connection: &str) -> Arc<Self> {
        let session = Self::new(connection);
        session.connected.store(true, Ordering::SeqCst);
        session
    }

    /// Deliver each session's signals to the other
    pub fn link(a: &Arc<Self>, b: &Arc<Self>) {
        a.peers.lock().unwrap().push(Arc::clone(&b.bus));
        b.peers.lock().unwrap().push(Arc::clone(&a.bus));
    }

    pub fn remote_stream(id: &str) -> StreamInfo {
        StreamInfo {
            stream_id: StreamId::new(id),
            connection_id: ConnectionId::new("remote"),
            has_audio: true,
            has_video: true,
        }
    }

    pub fn emit_stream_created(&self, id: &str) {
        self.bus
            .dispatch(SessionEvent::StreamCreated(Self::remote_stream(id)));
    }

    pub fn emit_stream_destroyed(&self, id: &str) {
        self.bus
            .dispatch(SessionEvent::StreamDestroyed(Self::remote_stream(id)));
    }

    pub fn emit_signal(&self, signal: Signal, from: &str) {
        self.bus.dispatch(SessionEvent::Signal(SignalEvent {
            signal,
            from: ConnectionId::new(from),
        }));
    }

    pub fn signals(&self) -> Vec<Signal> {
        self.signals.lock().unwrap().clone()
    }

    pub fn chat_signals(&self) -> usize {
        self.signals()
            .iter()
            .filter(|s| matches!(s, Signal::Chat(_)))
            .count()
    }
}

#[async_trait]
impl Session for FakeSession {
    fn session_id(&self) -> &str {
        "fake-session"
    }

    fn connection_id(&self) -> Option<ConnectionId> {
        self.connected
            .load(Ordering::SeqCst)
            .then(|| self.connection.clone())
    }

    fn state(&self) -> SessionState {
        if self.connected.load(Ordering::SeqCst) {
            SessionState::Connected
        } else {
            SessionState::Disconnected
        }
    }

    async fn connect(&self, _token: &str) -> Result<ConnectionId> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(CallError::Connect("invalid token".to_string()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(self.connection.clone())
    }

    async fn disconnect(&self) {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
    }

    fn init_publisher(
        &self,
        _surface: &SurfaceId,
        options: &PublisherOptions,
    ) -> Result<Box<dyn PublisherHandle>> {
        if self.fail_init_publisher.load(Ordering::SeqCst) {
            return Err(CallError::Publish("no camera".to_string()));
        }
        self.publisher.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePublisher {
            stream: StreamInfo {
                stream_id: StreamId::new("local-stream"),
                connection_id: self.connection.clone(),
                has_audio: options.publish_audio,
                has_video: options.publish_video,
            },
            log: Arc::clone(&self.publisher),
            supports_captions: self.captions_supported.load(Ordering::SeqCst),
        }))
    }

    async fn publish(&self, stream: &StreamInfo) -> Result<()> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(CallError::Publish("permission denied".to_string()));
        }
        self.published.lock().unwrap().push(stream.stream_id.clone());
        Ok(())
    }

    async fn subscribe(
        &self,
        stream: &StreamInfo,
        surface: &SurfaceId,
        _options: &SubscriberOptions,
    ) -> Result<()> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(CallError::Subscribe("stream gone".to_string()));
        }
        self.subscribed
            .lock()
            .unwrap()
            .push((stream.stream_id.clone(), surface.clone()));
        Ok(())
    }

    async fn unsubscribe(&self, stream_id: &StreamId) -> Result<()> {
        self.unsubscribed.lock().unwrap().push(stream_id.clone());
        Ok(())
    }

    async fn signal(&self, signal: &Signal) -> Result<()> {
        if self.fail_signal.load(Ordering::SeqCst) {
            return Err(CallError::SignalDelivery("rate limited".to_string()));
        }
        self.signals.lock().unwrap().push(signal.clone());

        let event = SessionEvent::Signal(SignalEvent {
            signal: signal.clone(),
            from: self.connection.clone(),
        });
        let peers = self.peers.lock().unwrap().clone();
        for peer in peers {
            peer.dispatch(event.clone());
        }
        if self.echo.load(Ordering::SeqCst) {
            self.bus.dispatch(event);
        }
        Ok(())
    }

    fn on(&self, kind: EventKind, handler: EventHandler) -> ListenerId {
        self.bus.on(kind, handler)
    }

    fn off(&self, listener: ListenerId) {
        self.bus.off(listener);
    }
}

/// Hands out the same `FakeSession` for every init
pub struct FakeFactory {
    pub session: Arc<FakeSession>,
    pub inits: Mutex<Vec<(String, String)>>,
}

impl FakeFactory {
    pub fn new(session: Arc<FakeSession>) -> Arc<Self> {
        Arc::new(Self {
            session,
            inits: Mutex::new(Vec::new()),
        })
    }
}

impl SessionFactory for FakeFactory {
    fn init_session(&self, api_key: &str, session_id: &str) -> Arc<dyn Session> {
        self.inits
            .lock()
            .unwrap()
            .push((api_key.to_string(), session_id.to_string()));
        self.session.clone()
    }
}

#[derive(Default)]
pub struct SpeechLog {
    pub created: AtomicUsize,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    listener: Mutex<Option<Arc<dyn RecognitionListener>>>,
}

/// Recognizer provider driven by the test
pub struct FakeSpeech {
    available: bool,
    pub log: Arc<SpeechLog>,
}

impl FakeSpeech {
    pub fn available() -> Arc<Self> {
        Arc::new(Self {
            available: true,
            log: Arc::new(SpeechLog::default()),
        })
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            available: false,
            log: Arc::new(SpeechLog::default()),
        })
    }

    pub fn is_listening(&self) -> bool {
        self.log.listener.lock().unwrap().is_some()
    }

    /// Produce a final transcript. Returns false if no recognizer is running.
    pub fn say(&self, text: &str) -> bool {
        let listener = self.log.listener.lock().unwrap().clone();
        match listener {
            Some(listener) => {
                listener.on_result(RecognitionEvent {
                    result_index: 0,
                    results: vec![RecognitionResult::final_text(text)],
                });
                true
            }
            None => false,
        }
    }

    pub fn fail(&self, error: &str) {
        let listener = self.log.listener.lock().unwrap().clone();
        if let Some(listener) = listener {
            listener.on_error(error.to_string());
        }
    }
}

impl RecognizerProvider for FakeSpeech {
    fn is_available(&self) -> bool {
        self.available
    }

    fn create(&self, _settings: &RecognizerSettings) -> Option<Box<dyn SpeechRecognizer>> {
        if !self.available {
            return None;
        }
        self.log.created.fetch_add(1, Ordering::SeqCst);
        Some(Box::new(FakeRecognizer {
            log: Arc::clone(&self.log),
        }))
    }
}

pub struct FakeRecognizer {
    log: Arc<SpeechLog>,
}

impl SpeechRecognizer for FakeRecognizer {
    fn start(&mut self, listener: Arc<dyn RecognitionListener>) -> Result<()> {
        self.log.starts.fetch_add(1, Ordering::SeqCst);
        *self.log.listener.lock().unwrap() = Some(listener);
        Ok(())
    }

    fn stop(&mut self) {
        self.log.stops.fetch_add(1, Ordering::SeqCst);
        *self.log.listener.lock().unwrap() = None;
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    pub ended: AtomicUsize,
    pub notices: Mutex<Vec<Notice>>,
}

impl CallObserver for RecordingObserver {
    fn call_ended(&self) {
        self.ended.fetch_add(1, Ordering::SeqCst);
    }

    fn notice(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

/// Let spawned completions run and drain everything they queued
pub async fn settle(call: &CallHandle) {
    for _ in 0..4 {
        tokio::task::yield_now().await;
        call.flush().await;
    }
}
