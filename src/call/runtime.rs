use super::event::{CallEvent, Command, Effect, Notice};
use super::state::CallState;
use super::view::CallView;
use crate::error::{CallError, Result};
use crate::session::{
    EventHandler, EventKind, ListenerId, PublisherHandle, PublisherOptions, Session,
    SessionEvent, SubscriberOptions, SurfaceId,
};
use crate::signal::{Signal, SignalKind};
use crate::speech::{
    RecognitionEvent, RecognitionListener, RecognizerProvider, RecognizerSettings,
    SpeechRecognizer,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Receives call-level notifications for the surrounding application
pub trait CallObserver: Send + Sync {
    /// The user ended the call
    fn call_ended(&self) {}

    /// A notice the user should see
    fn notice(&self, _notice: Notice) {}
}

/// Observer that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl CallObserver for LoggingObserver {
    fn call_ended(&self) {
        info!("Call ended");
    }

    fn notice(&self, notice: Notice) {
        warn!("{}", notice);
    }
}

/// Options for mounting a call screen
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub publisher: PublisherOptions,
    pub subscriber: SubscriberOptions,
    pub recognizer: RecognizerSettings,
    /// How long a caption stays visible
    pub caption_ttl: Duration,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            publisher: PublisherOptions::default(),
            subscriber: SubscriberOptions::default(),
            recognizer: RecognizerSettings::default(),
            caption_ttl: super::captions::CAPTION_DISPLAY,
        }
    }
}

enum Message {
    Event(CallEvent),
    Flush(oneshot::Sender<()>),
}

type Queue = mpsc::UnboundedSender<Message>;

fn post(queue: &Queue, event: CallEvent) {
    // The loop is gone after teardown; late completions are dropped
    let _ = queue.send(Message::Event(event));
}

/// Forwards recognizer output onto the call queue
struct QueueListener {
    queue: Queue,
}

impl RecognitionListener for QueueListener {
    fn on_result(&self, event: RecognitionEvent) {
        post(&self.queue, CallEvent::Recognition(event));
    }

    fn on_error(&self, error: String) {
        post(&self.queue, CallEvent::RecognitionFailed(error));
    }
}

/// Runs one participant's call screen against a connected session.
///
/// The call session exclusively owns the local publisher, the active
/// recognizer and the listeners it registered. All state changes happen on
/// one task draining one queue.
pub struct CallSession {
    session: Arc<dyn Session>,
    state: CallState,
    options: CallOptions,
    publisher: Option<Box<dyn PublisherHandle>>,
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    listeners: Vec<ListenerId>,
    provider: Arc<dyn RecognizerProvider>,
    observer: Arc<dyn CallObserver>,
    queue: Queue,
    view: watch::Sender<CallView>,
}

impl CallSession {
    /// Attach to a connected session: register listeners, create the local
    /// publisher and start processing events.
    pub fn mount(
        session: Arc<dyn Session>,
        options: CallOptions,
        provider: Arc<dyn RecognizerProvider>,
        observer: Arc<dyn CallObserver>,
    ) -> Result<CallHandle> {
        let local = session.connection_id().ok_or(CallError::NotConnected)?;
        let state = CallState::new(local, provider.is_available())
            .with_caption_ttl(options.caption_ttl);

        let (queue, rx) = mpsc::unbounded_channel();
        let (view, view_rx) = watch::channel(state.view());

        let mut call = Self {
            session,
            state,
            options,
            publisher: None,
            recognizer: None,
            listeners: Vec::new(),
            provider,
            observer,
            queue: queue.clone(),
            view,
        };

        call.register_listeners();
        call.init_publisher();

        info!(
            "Call screen mounted on session {} ({} listeners)",
            call.session.session_id(),
            call.listeners.len()
        );

        let task = tokio::spawn(call.run(rx));

        Ok(CallHandle {
            queue,
            view: view_rx,
            task: Arc::new(Mutex::new(Some(task))),
        })
    }

    fn register_listeners(&mut self) {
        let kinds = [
            EventKind::StreamCreated,
            EventKind::StreamDestroyed,
            EventKind::Signal(SignalKind::Chat),
            EventKind::Signal(SignalKind::Caption),
        ];

        for kind in kinds {
            let queue = self.queue.clone();
            let handler: EventHandler = Arc::new(move |event| {
                let event = match event {
                    SessionEvent::StreamCreated(stream) => CallEvent::StreamCreated(stream),
                    SessionEvent::StreamDestroyed(stream) => {
                        CallEvent::StreamDestroyed(stream.stream_id)
                    }
                    SessionEvent::Signal(signal) => CallEvent::SignalReceived(signal),
                };
                post(&queue, event);
            });
            self.listeners.push(self.session.on(kind, handler));
        }
    }

    fn init_publisher(&mut self) {
        match self
            .session
            .init_publisher(&SurfaceId::publisher(), &self.options.publisher)
        {
            Ok(publisher) => {
                self.publisher = Some(publisher);
                post(&self.queue, CallEvent::PublisherReady);
            }
            Err(e) => post(&self.queue, CallEvent::PublisherInitFailed(e)),
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Message>) {
        while let Some(message) = rx.recv().await {
            let event = match message {
                Message::Event(event) => event,
                Message::Flush(done) => {
                    let _ = done.send(());
                    continue;
                }
            };

            for effect in self.state.reduce(event) {
                self.apply(effect).await;
            }
            self.view.send_replace(self.state.view());

            if self.state.is_torn_down() {
                break;
            }
        }

        // Answer flushes that raced with teardown
        rx.close();
        while let Ok(message) = rx.try_recv() {
            if let Message::Flush(done) = message {
                let _ = done.send(());
            }
        }

        debug!("Call event loop stopped");
    }

    async fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Publish => {
                let Some(publisher) = &self.publisher else {
                    return;
                };
                let stream = publisher.stream().clone();
                let session = Arc::clone(&self.session);
                let queue = self.queue.clone();
                tokio::spawn(async move {
                    let result = session.publish(&stream).await;
                    post(&queue, CallEvent::PublishCompleted(result));
                });
            }
            Effect::SetAudio(enabled) => {
                if let Some(publisher) = self.publisher.as_mut() {
                    publisher.publish_audio(enabled);
                }
            }
            Effect::SetVideo(enabled) => {
                if let Some(publisher) = self.publisher.as_mut() {
                    publisher.publish_video(enabled);
                }
            }
            Effect::SetCaptions(enabled) => {
                if let Some(publisher) = self.publisher.as_mut() {
                    if let Err(e) = publisher.publish_captions(enabled) {
                        debug!("Captions flag not sent: {}", e);
                    }
                }
            }
            Effect::StartRecognizer => self.start_recognizer(),
            Effect::StopRecognizer => self.stop_recognizer(),
            Effect::BroadcastCaption(text) => {
                let session = Arc::clone(&self.session);
                tokio::spawn(async move {
                    if let Err(e) = session.signal(&Signal::Caption(text)).await {
                        warn!("Caption signal failed: {}", e);
                    }
                });
            }
            Effect::SendChat(text) => {
                let session = Arc::clone(&self.session);
                let queue = self.queue.clone();
                tokio::spawn(async move {
                    let result = session.signal(&Signal::Chat(text.clone())).await;
                    post(&queue, CallEvent::ChatDelivered { text, result });
                });
            }
            Effect::ScheduleCaptionClear { generation, after } => {
                let queue = self.queue.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    post(&queue, CallEvent::CaptionExpired { generation });
                });
            }
            Effect::Subscribe(stream) => {
                let session = Arc::clone(&self.session);
                let queue = self.queue.clone();
                let options = self.options.subscriber.clone();
                tokio::spawn(async move {
                    let surface = SurfaceId::for_stream(&stream.stream_id);
                    let result = session.subscribe(&stream, &surface, &options).await;
                    post(
                        &queue,
                        CallEvent::SubscribeCompleted {
                            stream_id: stream.stream_id,
                            result,
                        },
                    );
                });
            }
            Effect::Unsubscribe(stream_id) => {
                let session = Arc::clone(&self.session);
                tokio::spawn(async move {
                    if let Err(e) = session.unsubscribe(&stream_id).await {
                        debug!("Unsubscribe from {} failed: {}", stream_id, e);
                    }
                });
            }
            Effect::Notify(notice) => self.observer.notice(notice),
            Effect::Disconnect => self.session.disconnect().await,
            Effect::NotifyEnded => self.observer.call_ended(),
            Effect::RemoveListeners => {
                for listener in self.listeners.drain(..) {
                    self.session.off(listener);
                }
            }
            Effect::DestroyPublisher => {
                if let Some(mut publisher) = self.publisher.take() {
                    if let Err(e) = publisher.destroy() {
                        error!("Failed to destroy publisher: {}", e);
                    }
                }
            }
        }
    }

    fn start_recognizer(&mut self) {
        // At most one recognizer per call screen
        self.stop_recognizer();

        let Some(mut recognizer) = self.provider.create(&self.options.recognizer) else {
            post(
                &self.queue,
                CallEvent::RecognizerStartFailed(CallError::RecognitionUnavailable),
            );
            return;
        };

        let listener = Arc::new(QueueListener {
            queue: self.queue.clone(),
        });
        match recognizer.start(listener) {
            Ok(()) => {
                info!(
                    "Speech recognition started ({})",
                    self.options.recognizer.language
                );
                self.recognizer = Some(recognizer);
            }
            Err(e) => post(&self.queue, CallEvent::RecognizerStartFailed(e)),
        }
    }

    fn stop_recognizer(&mut self) {
        if let Some(mut recognizer) = self.recognizer.take() {
            recognizer.stop();
            info!("Speech recognition stopped");
        }
    }
}

/// Cloneable handle to a mounted call screen
#[derive(Clone)]
pub struct CallHandle {
    queue: Queue,
    view: watch::Receiver<CallView>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl CallHandle {
    pub fn dispatch(&self, command: Command) {
        post(&self.queue, CallEvent::Command(command));
    }

    pub fn toggle_audio(&self) {
        self.dispatch(Command::ToggleAudio);
    }

    pub fn toggle_video(&self) {
        self.dispatch(Command::ToggleVideo);
    }

    pub fn toggle_captions(&self) {
        self.dispatch(Command::ToggleCaptions);
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        self.dispatch(Command::SetDraft(text.into()));
    }

    /// Send `text` as one chat message. The draft is left alone unless it
    /// holds the same text when delivery succeeds.
    pub fn send_message(&self, text: impl Into<String>) {
        self.dispatch(Command::SendMessage(text.into()));
    }

    pub fn end_session(&self) {
        self.dispatch(Command::EndSession);
    }

    /// Latest rendered state
    pub fn view(&self) -> CallView {
        self.view.borrow().clone()
    }

    /// Receiver that sees every state change
    pub fn watch(&self) -> watch::Receiver<CallView> {
        self.view.clone()
    }

    /// Wait until every event queued before this call has been processed
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.queue.send(Message::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// Tear the call screen down and wait for the event loop to finish.
    /// Safe to call more than once.
    pub async fn unmount(&self) {
        let mut task = self.task.lock().await;
        let Some(handle) = task.take() else {
            return;
        };

        post(&self.queue, CallEvent::Teardown);
        if let Err(e) = handle.await {
            error!("Call event loop panicked: {}", e);
        }
    }
}
