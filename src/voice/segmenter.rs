//! Energy-based utterance endpointing
//!
//! Decides when the user has started and finished speaking so one utterance
//! can be sent to speech-to-text. Capture only runs while the assistant is
//! listening, so the first onset starts the utterance.

use super::capture::{SAMPLE_RATE, rms};

/// RMS level above which a block counts as speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Shortest utterance worth transcribing (0.3s)
const MIN_SPEECH_SAMPLES: usize = 4800;

/// Trailing silence must exceed this to end an utterance (0.8s)
const END_SILENCE_SAMPLES: usize = 12800;

/// Give up when nobody speaks for this long (8s)
const NO_SPEECH_SAMPLES: usize = SAMPLE_RATE as usize * 8;

/// Hard cap on one utterance (30s)
const MAX_UTTERANCE_SAMPLES: usize = SAMPLE_RATE as usize * 30;

/// Segmenter state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    /// No speech heard yet
    Waiting,
    /// Accumulating an utterance
    Speaking,
}

/// Result of feeding one block
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Keep feeding
    Pending,
    /// An utterance finished; samples include the trailing silence
    Complete(Vec<f32>),
    /// Nothing was said before the timeout
    NoSpeech,
}

/// Splits a sample stream into one utterance
#[derive(Debug)]
pub struct UtteranceSegmenter {
    state: SegmenterState,
    utterance: Vec<f32>,
    voiced: usize,
    silence: usize,
    waited: usize,
}

impl Default for UtteranceSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl UtteranceSegmenter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SegmenterState::Waiting,
            utterance: Vec::new(),
            voiced: 0,
            silence: 0,
            waited: 0,
        }
    }

    /// Feed one block of samples
    pub fn feed(&mut self, samples: &[f32]) -> Segment {
        let is_speech = rms(samples) > ENERGY_THRESHOLD;

        match self.state {
            SegmenterState::Waiting => {
                if is_speech {
                    self.state = SegmenterState::Speaking;
                    self.utterance.extend_from_slice(samples);
                    self.voiced = samples.len();
                    self.silence = 0;
                    tracing::trace!("speech onset");
                } else {
                    self.waited += samples.len();
                    if self.waited > NO_SPEECH_SAMPLES {
                        tracing::debug!("no speech before timeout");
                        self.reset();
                        return Segment::NoSpeech;
                    }
                }
            }
            SegmenterState::Speaking => {
                self.utterance.extend_from_slice(samples);
                if is_speech {
                    self.voiced += samples.len();
                    self.silence = 0;
                } else {
                    self.silence += samples.len();
                }

                let ended = self.silence > END_SILENCE_SAMPLES;
                if ended && self.voiced < MIN_SPEECH_SAMPLES {
                    tracing::trace!(voiced = self.voiced, "blip discarded");
                    let waited = self.waited + self.utterance.len();
                    self.reset();
                    self.waited = waited;
                } else if ended || self.utterance.len() > MAX_UTTERANCE_SAMPLES {
                    tracing::debug!(samples = self.utterance.len(), "utterance complete");
                    let utterance = std::mem::take(&mut self.utterance);
                    self.reset();
                    return Segment::Complete(utterance);
                }
            }
        }

        Segment::Pending
    }

    #[must_use]
    pub const fn state(&self) -> SegmenterState {
        self.state
    }

    /// Samples of the utterance in progress
    #[must_use]
    pub fn buffered(&self) -> &[f32] {
        &self.utterance
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
