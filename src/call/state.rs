use super::captions::{CaptionDisplay, CaptionPhase, CAPTION_DISPLAY};
use super::chat::{outgoing_text, ChatLog, Sender};
use super::event::{CallEvent, Command, Effect, Notice};
use super::remote::RemoteStreams;
use super::view::{CallView, Preview};
use crate::session::ConnectionId;
use crate::signal::{Signal, SignalEvent};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Publisher flags shown on the controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaFlags {
    pub audio: bool,
    pub video: bool,
    pub captions: bool,
}

impl Default for MediaFlags {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
            captions: false,
        }
    }
}

/// State of one participant's call screen.
///
/// `reduce` is the only way state changes. It performs no I/O: anything that
/// touches the session, the publisher or the recognizer comes back as an
/// [`Effect`] for the runtime to carry out.
#[derive(Debug, Clone)]
pub struct CallState {
    local: ConnectionId,
    speech_available: bool,
    caption_ttl: Duration,
    flags: MediaFlags,
    has_publisher: bool,
    preview: Preview,
    phase: CaptionPhase,
    caption: CaptionDisplay,
    publisher_chat: ChatLog,
    subscriber_chat: ChatLog,
    draft: String,
    remote: RemoteStreams,
    notices: Vec<Notice>,
    ended: bool,
    torn_down: bool,
}

impl CallState {
    pub fn new(local: ConnectionId, speech_available: bool) -> Self {
        Self {
            local,
            speech_available,
            caption_ttl: CAPTION_DISPLAY,
            flags: MediaFlags::default(),
            has_publisher: false,
            preview: Preview::Absent,
            phase: CaptionPhase::Idle,
            caption: CaptionDisplay::default(),
            publisher_chat: ChatLog::default(),
            subscriber_chat: ChatLog::default(),
            draft: String::new(),
            remote: RemoteStreams::default(),
            notices: Vec::new(),
            ended: false,
            torn_down: false,
        }
    }

    pub fn with_caption_ttl(mut self, ttl: Duration) -> Self {
        self.caption_ttl = ttl;
        self
    }

    pub fn flags(&self) -> MediaFlags {
        self.flags
    }

    pub fn phase(&self) -> CaptionPhase {
        self.phase
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.text()
    }

    pub fn publisher_chat(&self) -> &ChatLog {
        &self.publisher_chat
    }

    pub fn subscriber_chat(&self) -> &ChatLog {
        &self.subscriber_chat
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn remote(&self) -> &RemoteStreams {
        &self.remote
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Apply one event and return the effects it requires, in order
    pub fn reduce(&mut self, event: CallEvent) -> Vec<Effect> {
        if self.torn_down {
            debug!("Ignoring event after teardown: {:?}", event);
            return Vec::new();
        }

        match event {
            CallEvent::Teardown => self.teardown(),
            _ if self.ended => {
                debug!("Ignoring event after call ended: {:?}", event);
                Vec::new()
            }
            CallEvent::Command(command) => self.command(command),
            CallEvent::PublisherReady => {
                self.has_publisher = true;
                self.preview = Preview::Pending;
                vec![Effect::Publish]
            }
            CallEvent::PublisherInitFailed(e) => {
                error!("Publisher error: {}", e);
                self.has_publisher = false;
                self.preview = Preview::Absent;
                Vec::new()
            }
            CallEvent::PublishCompleted(Ok(())) => {
                if self.has_publisher {
                    self.preview = Preview::Live;
                }
                Vec::new()
            }
            CallEvent::PublishCompleted(Err(e)) => {
                error!("Publisher error: {}", e);
                self.preview = Preview::Failed;
                Vec::new()
            }
            CallEvent::StreamCreated(stream) => {
                if stream.connection_id == self.local {
                    debug!("Ignoring own stream {}", stream.stream_id);
                    return Vec::new();
                }
                if !self.remote.insert(stream.clone()) {
                    warn!("Stream {} already has a subscriber", stream.stream_id);
                    return Vec::new();
                }
                info!("Remote stream created: {}", stream.stream_id);
                vec![Effect::Subscribe(stream)]
            }
            CallEvent::SubscribeCompleted { stream_id, result } => match result {
                Ok(()) => {
                    if self.remote.mark_live(&stream_id) {
                        return Vec::new();
                    }
                    debug!("Subscribed to stream {} after it was destroyed", stream_id);
                    vec![Effect::Unsubscribe(stream_id)]
                }
                Err(e) => {
                    error!("Subscriber error for stream {}: {}", stream_id, e);
                    self.remote.remove(&stream_id);
                    Vec::new()
                }
            },
            CallEvent::StreamDestroyed(stream_id) => match self.remote.remove(&stream_id) {
                Some(view) => {
                    info!("Removed surface {}", view.surface);
                    vec![Effect::Unsubscribe(stream_id)]
                }
                None => {
                    debug!("No surface for destroyed stream {}", stream_id);
                    Vec::new()
                }
            },
            CallEvent::SignalReceived(event) => self.signal(event),
            CallEvent::ChatDelivered { text, result } => {
                match result {
                    Ok(()) => {
                        self.publisher_chat.push(text.as_str(), Sender::Me);
                        if outgoing_text(&self.draft) == Some(text.as_str()) {
                            self.draft.clear();
                        }
                    }
                    Err(e) => warn!("Chat message not delivered: {}", e),
                }
                Vec::new()
            }
            CallEvent::Recognition(event) => {
                if self.phase != CaptionPhase::Listening {
                    debug!("Ignoring recognition result while idle");
                    return Vec::new();
                }
                match event.latest_final_transcript() {
                    Some(text) => {
                        let mut effects = self.show_caption(text.clone());
                        effects.push(Effect::BroadcastCaption(text));
                        effects
                    }
                    None => Vec::new(),
                }
            }
            CallEvent::RecognitionFailed(e) => {
                error!("SpeechRecognition error: {}", e);
                Vec::new()
            }
            CallEvent::RecognizerStartFailed(e) => {
                error!("Could not start speech recognition: {}", e);
                if self.phase != CaptionPhase::Listening {
                    return Vec::new();
                }
                self.phase = CaptionPhase::Idle;
                self.flags.captions = false;
                if self.has_publisher {
                    vec![Effect::SetCaptions(false)]
                } else {
                    Vec::new()
                }
            }
            CallEvent::CaptionExpired { generation } => {
                self.caption.expire(generation);
                Vec::new()
            }
        }
    }

    fn command(&mut self, command: Command) -> Vec<Effect> {
        match command {
            Command::ToggleAudio => {
                if !self.has_publisher {
                    debug!("No publisher, ignoring audio toggle");
                    return Vec::new();
                }
                self.flags.audio = !self.flags.audio;
                vec![Effect::SetAudio(self.flags.audio)]
            }
            Command::ToggleVideo => {
                if !self.has_publisher {
                    debug!("No publisher, ignoring video toggle");
                    return Vec::new();
                }
                self.flags.video = !self.flags.video;
                vec![Effect::SetVideo(self.flags.video)]
            }
            Command::ToggleCaptions => self.toggle_captions(),
            Command::SetDraft(text) => {
                self.draft = text;
                Vec::new()
            }
            Command::SendMessage(text) => match outgoing_text(&text) {
                Some(text) => vec![Effect::SendChat(text.to_string())],
                None => Vec::new(),
            },
            Command::EndSession => {
                info!("Ending call");
                self.ended = true;
                vec![Effect::Disconnect, Effect::NotifyEnded]
            }
        }
    }

    fn toggle_captions(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();

        if !self.flags.captions {
            if !self.speech_available {
                warn!("{}", Notice::SpeechUnsupported);
                self.notices.push(Notice::SpeechUnsupported);
                return vec![Effect::Notify(Notice::SpeechUnsupported)];
            }
            self.flags.captions = true;
            if self.has_publisher {
                effects.push(Effect::SetCaptions(true));
            }
            self.phase = CaptionPhase::Listening;
            effects.push(Effect::StartRecognizer);
        } else {
            self.flags.captions = false;
            if self.has_publisher {
                effects.push(Effect::SetCaptions(false));
            }
            if self.phase == CaptionPhase::Listening {
                self.phase = CaptionPhase::Idle;
                effects.push(Effect::StopRecognizer);
            }
        }

        effects
    }

    fn signal(&mut self, event: SignalEvent) -> Vec<Effect> {
        match event.signal {
            Signal::Caption(text) => self.show_caption(text),
            Signal::Chat(text) => {
                let sender = Sender::attribute(&event.from, &self.local);
                // The publisher panel already holds its own copy from the
                // delivery callback, so only remote messages land there.
                if sender == Sender::Other {
                    self.publisher_chat.push(text.as_str(), Sender::Other);
                }
                self.subscriber_chat.push(text, sender);
                Vec::new()
            }
        }
    }

    fn show_caption(&mut self, text: String) -> Vec<Effect> {
        let generation = self.caption.show(text);
        vec![Effect::ScheduleCaptionClear {
            generation,
            after: self.caption_ttl,
        }]
    }

    fn teardown(&mut self) -> Vec<Effect> {
        info!("Tearing down call screen");
        self.torn_down = true;
        self.has_publisher = false;
        self.preview = Preview::Absent;
        self.phase = CaptionPhase::Idle;
        vec![
            Effect::RemoveListeners,
            Effect::DestroyPublisher,
            Effect::StopRecognizer,
        ]
    }

    pub fn view(&self) -> CallView {
        CallView {
            connection_id: self.local.to_string(),
            audio_enabled: self.flags.audio,
            video_enabled: self.flags.video,
            captions_enabled: self.flags.captions,
            listening: self.phase == CaptionPhase::Listening,
            caption: self.caption.text().map(str::to_string),
            preview: self.preview,
            publisher_chat: self.publisher_chat.messages().to_vec(),
            subscriber_chat: self.subscriber_chat.messages().to_vec(),
            draft: self.draft.clone(),
            remote: self.remote.views().cloned().collect(),
            notices: self.notices.clone(),
            ended: self.ended,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallError;
    use crate::session::{StreamId, StreamInfo};
    use crate::speech::{RecognitionEvent, RecognitionResult};

    fn state() -> CallState {
        let mut state = CallState::new(ConnectionId::new("local"), true);
        state.reduce(CallEvent::PublisherReady);
        state.reduce(CallEvent::PublishCompleted(Ok(())));
        state
    }

    fn chat_from(text: &str, from: &str) -> CallEvent {
        CallEvent::SignalReceived(SignalEvent {
            signal: Signal::Chat(text.to_string()),
            from: ConnectionId::new(from),
        })
    }

    fn heard(text: &str) -> CallEvent {
        CallEvent::Recognition(RecognitionEvent {
            result_index: 0,
            results: vec![RecognitionResult::final_text(text)],
        })
    }

    fn stream(id: &str) -> StreamInfo {
        StreamInfo {
            stream_id: StreamId::new(id),
            connection_id: ConnectionId::new("remote"),
            has_audio: true,
            has_video: true,
        }
    }

    #[test]
    fn test_publisher_ready_requests_publish() {
        let mut state = CallState::new(ConnectionId::new("local"), true);
        assert_eq!(state.reduce(CallEvent::PublisherReady), vec![Effect::Publish]);
        assert_eq!(state.view().preview, Preview::Pending);

        state.reduce(CallEvent::PublishCompleted(Err(CallError::Publish(
            "camera busy".to_string(),
        ))));
        assert_eq!(state.view().preview, Preview::Failed);
    }

    #[test]
    fn test_toggles_follow_parity_one_effect_each() {
        let mut state = state();
        let mut audio_calls = Vec::new();
        for _ in 0..5 {
            for effect in state.reduce(Command::ToggleAudio.into()) {
                match effect {
                    Effect::SetAudio(enabled) => audio_calls.push(enabled),
                    other => panic!("unexpected effect {:?}", other),
                }
            }
        }
        assert_eq!(audio_calls, vec![false, true, false, true, false]);
        assert!(!state.flags().audio);

        assert_eq!(
            state.reduce(Command::ToggleVideo.into()),
            vec![Effect::SetVideo(false)]
        );
        assert_eq!(
            state.reduce(Command::ToggleVideo.into()),
            vec![Effect::SetVideo(true)]
        );
        assert!(state.flags().video);
    }

    #[test]
    fn test_toggles_without_publisher_are_noops() {
        let mut state = CallState::new(ConnectionId::new("local"), true);
        assert!(state.reduce(Command::ToggleAudio.into()).is_empty());
        assert!(state.reduce(Command::ToggleVideo.into()).is_empty());
        assert!(state.flags().audio);
        assert!(state.flags().video);
    }

    #[test]
    fn test_captions_start_and_stop_recognizer() {
        let mut state = state();
        assert_eq!(
            state.reduce(Command::ToggleCaptions.into()),
            vec![Effect::SetCaptions(true), Effect::StartRecognizer]
        );
        assert_eq!(state.phase(), CaptionPhase::Listening);

        assert_eq!(
            state.reduce(Command::ToggleCaptions.into()),
            vec![Effect::SetCaptions(false), Effect::StopRecognizer]
        );
        assert_eq!(state.phase(), CaptionPhase::Idle);
        assert!(!state.flags().captions);
    }

    #[test]
    fn test_captions_rejected_without_speech_support() {
        let mut state = CallState::new(ConnectionId::new("local"), false);
        state.reduce(CallEvent::PublisherReady);

        for _ in 0..2 {
            assert_eq!(
                state.reduce(Command::ToggleCaptions.into()),
                vec![Effect::Notify(Notice::SpeechUnsupported)]
            );
            assert!(!state.flags().captions);
            assert_eq!(state.phase(), CaptionPhase::Idle);
        }
        assert_eq!(state.view().notices.len(), 2);
    }

    #[test]
    fn test_recognizer_start_failure_reverts_captions() {
        let mut state = state();
        state.reduce(Command::ToggleCaptions.into());
        let effects = state.reduce(CallEvent::RecognizerStartFailed(
            CallError::RecognitionUnavailable,
        ));
        assert_eq!(effects, vec![Effect::SetCaptions(false)]);
        assert!(!state.flags().captions);
        assert_eq!(state.phase(), CaptionPhase::Idle);
    }

    #[test]
    fn test_recognition_shows_and_broadcasts_caption() {
        let mut state = state();
        state.reduce(Command::ToggleCaptions.into());

        let effects = state.reduce(heard("  hello  "));
        assert_eq!(
            effects,
            vec![
                Effect::ScheduleCaptionClear {
                    generation: 0,
                    after: CAPTION_DISPLAY
                },
                Effect::BroadcastCaption("hello".to_string()),
            ]
        );
        assert_eq!(state.caption(), Some("hello"));
    }

    #[test]
    fn test_recognition_ignored_while_idle() {
        let mut state = state();
        assert!(state.reduce(heard("hello")).is_empty());
        assert_eq!(state.caption(), None);
    }

    #[test]
    fn test_recognition_error_keeps_listening() {
        let mut state = state();
        state.reduce(Command::ToggleCaptions.into());
        assert!(state
            .reduce(CallEvent::RecognitionFailed("no-speech".to_string()))
            .is_empty());
        assert_eq!(state.phase(), CaptionPhase::Listening);
    }

    #[test]
    fn test_stale_caption_timer_does_not_clear_newer_caption() {
        let mut state = state();
        let caption = |text: &str| {
            CallEvent::SignalReceived(SignalEvent {
                signal: Signal::Caption(text.to_string()),
                from: ConnectionId::new("remote"),
            })
        };

        state.reduce(caption("hello"));
        state.reduce(caption("world"));
        state.reduce(CallEvent::CaptionExpired { generation: 0 });
        assert_eq!(state.caption(), Some("world"));

        state.reduce(CallEvent::CaptionExpired { generation: 1 });
        assert_eq!(state.caption(), None);
    }

    #[test]
    fn test_send_message_requires_text() {
        let mut state = state();
        assert!(state.reduce(Command::SendMessage(String::new()).into()).is_empty());
        assert!(state
            .reduce(Command::SendMessage("   \t".to_string()).into())
            .is_empty());
        assert!(state.publisher_chat().is_empty());

        assert_eq!(
            state.reduce(Command::SendMessage("  hi ".to_string()).into()),
            vec![Effect::SendChat("hi".to_string())]
        );
        // Nothing is shown until delivery succeeds
        assert!(state.publisher_chat().is_empty());
    }

    #[test]
    fn test_send_message_ignores_draft() {
        let mut state = state();
        state.reduce(Command::SetDraft("draft".to_string()).into());
        let effects = [
            state.reduce(Command::SendMessage("a".to_string()).into()),
            state.reduce(Command::SetDraft("other".to_string()).into()),
            state.reduce(Command::SendMessage("b".to_string()).into()),
        ];
        assert_eq!(
            effects.concat(),
            vec![
                Effect::SendChat("a".to_string()),
                Effect::SendChat("b".to_string())
            ]
        );
        assert_eq!(state.draft(), "other");
    }

    #[test]
    fn test_chat_delivery_appends_and_clears_draft() {
        let mut state = state();
        state.reduce(Command::SetDraft("hi".to_string()).into());
        state.reduce(CallEvent::ChatDelivered {
            text: "hi".to_string(),
            result: Ok(()),
        });

        let messages = state.publisher_chat().messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "hi");
        assert_eq!(messages[0].sender, Sender::Me);
        assert_eq!(state.draft(), "");
    }

    #[test]
    fn test_chat_delivery_failure_changes_nothing() {
        let mut state = state();
        state.reduce(Command::SetDraft("hi".to_string()).into());
        state.reduce(CallEvent::ChatDelivered {
            text: "hi".to_string(),
            result: Err(CallError::SignalDelivery("timeout".to_string())),
        });
        assert!(state.publisher_chat().is_empty());
        assert_eq!(state.draft(), "hi");
    }

    #[test]
    fn test_own_chat_echo_not_duplicated_on_publisher_panel() {
        let mut state = state();
        state.reduce(CallEvent::ChatDelivered {
            text: "hi".to_string(),
            result: Ok(()),
        });
        state.reduce(chat_from("hi", "local"));

        assert_eq!(state.publisher_chat().len(), 1);
        let subscriber = state.subscriber_chat().messages();
        assert_eq!(subscriber.len(), 1);
        assert_eq!(subscriber[0].sender, Sender::Me);
    }

    #[test]
    fn test_remote_chat_lands_in_both_panels() {
        let mut state = state();
        state.reduce(chat_from("hey", "remote"));

        assert_eq!(state.publisher_chat().messages()[0].sender, Sender::Other);
        assert_eq!(state.subscriber_chat().messages()[0].sender, Sender::Other);
    }

    #[test]
    fn test_stream_lifecycle() {
        let mut state = state();
        assert_eq!(
            state.reduce(CallEvent::StreamCreated(stream("S1"))),
            vec![Effect::Subscribe(stream("S1"))]
        );
        // At most one subscriber per stream id
        assert!(state.reduce(CallEvent::StreamCreated(stream("S1"))).is_empty());
        assert_eq!(state.remote().len(), 1);

        assert_eq!(
            state.reduce(CallEvent::StreamDestroyed(StreamId::new("S1"))),
            vec![Effect::Unsubscribe(StreamId::new("S1"))]
        );
        assert!(state.remote().get(&StreamId::new("S1")).is_none());

        // Unknown id is a no-op
        assert!(state
            .reduce(CallEvent::StreamDestroyed(StreamId::new("S2")))
            .is_empty());
    }

    #[test]
    fn test_late_subscription_is_torn_down() {
        let mut state = state();
        state.reduce(CallEvent::StreamCreated(stream("S1")));
        state.reduce(CallEvent::StreamDestroyed(StreamId::new("S1")));

        assert_eq!(
            state.reduce(CallEvent::SubscribeCompleted {
                stream_id: StreamId::new("S1"),
                result: Ok(()),
            }),
            vec![Effect::Unsubscribe(StreamId::new("S1"))]
        );
        assert!(state.remote().is_empty());
    }

    #[test]
    fn test_subscribe_failure_removes_surface() {
        let mut state = state();
        state.reduce(CallEvent::StreamCreated(stream("S1")));
        state.reduce(CallEvent::SubscribeCompleted {
            stream_id: StreamId::new("S1"),
            result: Err(CallError::Subscribe("denied".to_string())),
        });
        assert!(state.remote().is_empty());
    }

    #[test]
    fn test_end_session_fires_once() {
        let mut state = state();
        assert_eq!(
            state.reduce(Command::EndSession.into()),
            vec![Effect::Disconnect, Effect::NotifyEnded]
        );
        assert!(state.reduce(Command::EndSession.into()).is_empty());
        assert!(state.is_ended());
    }

    #[test]
    fn test_teardown_releases_everything_once() {
        let mut state = state();
        state.reduce(Command::ToggleCaptions.into());
        assert_eq!(
            state.reduce(CallEvent::Teardown),
            vec![
                Effect::RemoveListeners,
                Effect::DestroyPublisher,
                Effect::StopRecognizer
            ]
        );
        assert!(state.reduce(CallEvent::Teardown).is_empty());
        assert!(state.reduce(Command::ToggleAudio.into()).is_empty());
    }
}
