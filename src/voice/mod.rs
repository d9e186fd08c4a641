//! Utterance transport
//!
//! Wraps speech capture and speech playback behind one start/stop/speak
//! contract. Lifecycle callbacks are queued as [`TransportEvent`]s and pulled
//! by the daemon with [`UtteranceTransport::next_event`].

mod capture;
mod console;
mod microphone;
mod playback;
mod segmenter;
mod stt;
mod tts;

use async_trait::async_trait;

pub use capture::{AudioCapture, SAMPLE_RATE, rms, samples_to_wav};
pub use console::ConsoleTransport;
pub use microphone::MicrophoneTransport;
pub use playback::AudioPlayback;
pub use segmenter::{Segment, SegmenterState, UtteranceSegmenter};
pub use stt::SpeechToText;
pub use tts::{OPENAI_VOICES, TextToSpeech};

use crate::Result;

/// Lifecycle notification from a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    CaptureStarted,
    FinalTranscript(String),
    /// Short machine-readable code such as `no-speech` or `network`
    CaptureError(String),
    SpeechStarted,
    SpeechEnded,
    SpeechError(String),
}

/// A selectable synthesis voice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    /// Identifier passed to the synthesizer
    pub name: String,
    /// BCP 47 language tag
    pub lang: String,
}

impl Voice {
    #[must_use]
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }
}

/// Pick the voice to speak with
///
/// Preference: the configured name, then the first `en-US` voice, then any
/// English voice, then whatever comes first.
#[must_use]
pub fn select_voice(voices: &[Voice], preferred: Option<&str>) -> Option<Voice> {
    preferred
        .and_then(|name| voices.iter().find(|v| v.name.eq_ignore_ascii_case(name)))
        .or_else(|| voices.iter().find(|v| v.lang.starts_with("en-US")))
        .or_else(|| voices.iter().find(|v| v.lang.starts_with("en")))
        .or_else(|| voices.first())
        .cloned()
}

/// Speech capture and playback
///
/// Implementations are driven from a single task and need not be `Send`.
#[async_trait(?Send)]
pub trait UtteranceTransport {
    /// Begin capturing one utterance
    ///
    /// # Errors
    ///
    /// Returns error if capture cannot start
    async fn start_capture(&mut self) -> Result<()>;

    /// Stop capturing; any partial utterance is discarded
    fn stop_capture(&mut self);

    /// Speak `text`; start/end are reported as events
    async fn speak(&mut self, text: &str, voice: Option<&Voice>);

    /// Advance pending work and return the next queued event, if any
    async fn next_event(&mut self) -> Option<TransportEvent>;

    /// Voices this transport can speak with
    fn list_voices(&self) -> Vec<Voice>;

    /// No further input will ever arrive
    fn is_closed(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voices() -> Vec<Voice> {
        vec![
            Voice::new("Amelie", "fr-FR"),
            Voice::new("Daniel", "en-GB"),
            Voice::new("Samantha", "en-US"),
        ]
    }

    #[test]
    fn configured_voice_wins() {
        let v = select_voice(&voices(), Some("daniel")).unwrap();
        assert_eq!(v.name, "Daniel");
    }

    #[test]
    fn falls_back_to_en_us() {
        let v = select_voice(&voices(), Some("missing")).unwrap();
        assert_eq!(v.name, "Samantha");
        let v = select_voice(&voices(), None).unwrap();
        assert_eq!(v.name, "Samantha");
    }

    #[test]
    fn falls_back_to_any_english_then_first() {
        let v = select_voice(&voices()[..2], None).unwrap();
        assert_eq!(v.name, "Daniel");
        let v = select_voice(&voices()[..1], None).unwrap();
        assert_eq!(v.name, "Amelie");
        assert!(select_voice(&[], None).is_none());
    }
}
