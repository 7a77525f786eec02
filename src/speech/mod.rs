//! Speech-to-text capability
//!
//! The call layer never looks for a recognizer itself: it is handed a
//! `RecognizerProvider`, which may report that recognition is unavailable.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Recognizer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognizerSettings {
    /// BCP-47 language tag
    pub language: String,

    /// Keep listening after each final result
    pub continuous: bool,

    /// Deliver partial (interim) results
    pub interim_results: bool,
}

impl Default for RecognizerSettings {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            continuous: true,
            interim_results: false,
        }
    }
}

/// One ranked transcript alternative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptAlternative {
    pub transcript: String,

    /// Confidence score (0.0 to 1.0), if available
    pub confidence: Option<f32>,
}

/// One recognized segment with its alternatives, best first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub alternatives: Vec<TranscriptAlternative>,
    pub is_final: bool,
}

impl RecognitionResult {
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            alternatives: vec![TranscriptAlternative {
                transcript: text.into(),
                confidence: None,
            }],
            is_final: true,
        }
    }
}

/// Results delivered by a recognizer.
///
/// `results` holds the changed results; `result_index` is the index of the
/// first of them within the recognition run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionEvent {
    pub result_index: usize,
    pub results: Vec<RecognitionResult>,
}

impl RecognitionEvent {
    /// Best alternative of the most recent final result, trimmed.
    /// Interim results and blank transcripts yield `None`.
    pub fn latest_final_transcript(&self) -> Option<String> {
        let result = self.results.iter().rev().find(|r| r.is_final)?;
        let text = result.alternatives.first()?.transcript.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}

/// Receives recognizer output
pub trait RecognitionListener: Send + Sync {
    fn on_result(&self, event: RecognitionEvent);

    /// Runtime error. Continuous recognizers keep running afterwards.
    fn on_error(&self, error: String);
}

/// An active speech recognizer
pub trait SpeechRecognizer: Send {
    fn start(&mut self, listener: Arc<dyn RecognitionListener>) -> Result<()>;

    /// Stop listening. Stopping a stopped recognizer does nothing.
    fn stop(&mut self);
}

/// Supplies recognizers, or reports that the runtime has none
pub trait RecognizerProvider: Send + Sync {
    fn is_available(&self) -> bool;

    fn create(&self, settings: &RecognizerSettings) -> Option<Box<dyn SpeechRecognizer>>;
}

/// Provider for environments without speech recognition
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSpeechRecognition;

impl RecognizerProvider for NoSpeechRecognition {
    fn is_available(&self) -> bool {
        false
    }

    fn create(&self, _settings: &RecognizerSettings) -> Option<Box<dyn SpeechRecognizer>> {
        None
    }
}
