use std::time::Duration;

/// How long a caption stays on screen
pub const CAPTION_DISPLAY: Duration = Duration::from_secs(5);

/// Whether a speech recognizer is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionPhase {
    Idle,
    Listening,
}

#[derive(Debug, Clone)]
struct Shown {
    text: String,
    generation: u64,
}

/// The single visible caption.
///
/// Each shown caption gets a new generation. An expiry only clears the
/// caption it was scheduled for, so a stale timer cannot clear a newer one.
#[derive(Debug, Clone, Default)]
pub struct CaptionDisplay {
    current: Option<Shown>,
    next_generation: u64,
}

impl CaptionDisplay {
    /// Replace the visible caption and return its generation
    pub fn show(&mut self, text: impl Into<String>) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.current = Some(Shown {
            text: text.into(),
            generation,
        });
        generation
    }

    /// Clear the caption if it is still the one shown as `generation`
    pub fn expire(&mut self, generation: u64) -> bool {
        match &self.current {
            Some(shown) if shown.generation == generation => {
                self.current = None;
                true
            }
            _ => false,
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.current.as_ref().map(|shown| shown.text.as_str())
    }
}
