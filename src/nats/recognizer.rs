use super::client::connect_client;
use super::messages::TranscriptMessage;
use crate::error::{CallError, Result};
use crate::session::ConnectionId;
use crate::speech::{
    RecognitionEvent, RecognitionListener, RecognitionResult, RecognizerProvider,
    RecognizerSettings, SpeechRecognizer, TranscriptAlternative,
};
use async_nats::Client;
use futures::stream::StreamExt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

// The STT service publishes to stt.text.partial and stt.text.final
const TRANSCRIPT_SUBJECT: &str = "stt.text.>";

/// Selects the transcripts of one participant's own speech
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptFilter {
    pub session_id: String,
    pub source: ConnectionId,
}

impl TranscriptFilter {
    /// Transcripts without a source cannot be attributed and are skipped
    pub fn accepts(&self, transcript: &TranscriptMessage, settings: &RecognizerSettings) -> bool {
        if transcript.session_id != self.session_id {
            return false;
        }
        if transcript.source.as_deref() != Some(self.source.as_str()) {
            return false;
        }
        settings.interim_results || !transcript.partial
    }
}

/// Supplies recognizers reading transcripts from an STT service over NATS.
///
/// If the NATS server cannot be reached, speech recognition is reported as
/// unavailable.
pub struct NatsRecognizerProvider {
    client: Option<Client>,
    filter: TranscriptFilter,
}

impl NatsRecognizerProvider {
    pub async fn connect(url: &str, token: &str, filter: TranscriptFilter) -> Self {
        let name = format!("duocall-stt-{}", filter.source);
        let client = match connect_client(url, token, &name).await {
            Ok(client) => {
                info!("Speech recognition available via {}", url);
                Some(client)
            }
            Err(e) => {
                warn!("Speech recognition unavailable: {}", e);
                None
            }
        };

        Self { client, filter }
    }
}

impl RecognizerProvider for NatsRecognizerProvider {
    fn is_available(&self) -> bool {
        self.client.is_some()
    }

    fn create(&self, settings: &RecognizerSettings) -> Option<Box<dyn SpeechRecognizer>> {
        let client = self.client.clone()?;
        Some(Box::new(NatsSpeechRecognizer {
            client,
            filter: self.filter.clone(),
            settings: settings.clone(),
            task: None,
        }))
    }
}

/// Recognizer fed by transcript messages of one connection's speech
pub struct NatsSpeechRecognizer {
    client: Client,
    filter: TranscriptFilter,
    settings: RecognizerSettings,
    task: Option<JoinHandle<()>>,
}

impl NatsSpeechRecognizer {
    /// Convert a transcript message into a recognition result
    pub fn to_result(message: &TranscriptMessage) -> RecognitionResult {
        RecognitionResult {
            alternatives: vec![TranscriptAlternative {
                transcript: message.text.clone(),
                confidence: message.confidence,
            }],
            is_final: !message.partial,
        }
    }
}

impl SpeechRecognizer for NatsSpeechRecognizer {
    fn start(&mut self, listener: Arc<dyn RecognitionListener>) -> Result<()> {
        if self.task.is_some() {
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CallError::Recognition(e.to_string()))?;

        let client = self.client.clone();
        let filter = self.filter.clone();
        let settings = self.settings.clone();

        let task = runtime.spawn(async move {
            let mut transcripts = match client.subscribe(TRANSCRIPT_SUBJECT).await {
                Ok(subscriber) => subscriber,
                Err(e) => {
                    listener.on_error(format!("failed to subscribe to transcripts: {}", e));
                    return;
                }
            };

            info!(
                "Listening for {} transcripts on {}",
                settings.language, TRANSCRIPT_SUBJECT
            );

            let mut result_index = 0;
            while let Some(msg) = transcripts.next().await {
                let transcript = match serde_json::from_slice::<TranscriptMessage>(&msg.payload) {
                    Ok(transcript) => transcript,
                    Err(e) => {
                        listener.on_error(format!("invalid transcript message: {}", e));
                        continue;
                    }
                };

                if !filter.accepts(&transcript, &settings) {
                    continue;
                }

                let result = Self::to_result(&transcript);
                let is_final = result.is_final;
                listener.on_result(RecognitionEvent {
                    result_index,
                    results: vec![result],
                });
                if is_final {
                    result_index += 1;
                    if !settings.continuous {
                        break;
                    }
                }
            }

            info!("Transcript listener stopped");
        });

        self.task = Some(task);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for NatsSpeechRecognizer {
    fn drop(&mut self) {
        self.stop();
    }
}
