//! Microphone + speaker transport backed by cloud STT/TTS

use std::collections::VecDeque;

use async_trait::async_trait;

use super::capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
use super::playback::AudioPlayback;
use super::segmenter::{Segment, UtteranceSegmenter};
use super::stt::SpeechToText;
use super::tts::TextToSpeech;
use super::{TransportEvent, UtteranceTransport, Voice};
use crate::Result;

/// Minimum block handed to the segmenter (100ms at 16kHz)
const CHUNK_SIZE: usize = 1600;

/// Captures one utterance per `start_capture`, transcribes it, and speaks replies
pub struct MicrophoneTransport {
    capture: AudioCapture,
    playback: AudioPlayback,
    stt: SpeechToText,
    tts: TextToSpeech,
    segmenter: UtteranceSegmenter,
    pending: VecDeque<TransportEvent>,
}

impl MicrophoneTransport {
    /// Open the default audio devices
    ///
    /// # Errors
    ///
    /// Returns error if either audio device cannot be opened
    pub fn open(stt: SpeechToText, tts: TextToSpeech) -> Result<Self> {
        Ok(Self {
            capture: AudioCapture::open()?,
            playback: AudioPlayback::open()?,
            stt,
            tts,
            segmenter: UtteranceSegmenter::new(),
            pending: VecDeque::new(),
        })
    }

    fn end_capture(&mut self) {
        self.capture.stop();
        self.segmenter.reset();
    }

    /// Run the captured block through the segmenter and STT
    async fn process_audio(&mut self) -> Option<TransportEvent> {
        if self.capture.buffered_len() < CHUNK_SIZE {
            return None;
        }

        match self.segmenter.feed(&self.capture.take_buffer()) {
            Segment::Pending => None,
            Segment::NoSpeech => {
                self.end_capture();
                Some(TransportEvent::CaptureError("no-speech".to_string()))
            }
            Segment::Complete(samples) => {
                self.end_capture();
                let wav = match samples_to_wav(&samples, SAMPLE_RATE) {
                    Ok(wav) => wav,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to encode utterance");
                        return Some(TransportEvent::CaptureError("audio-capture".to_string()));
                    }
                };
                match self.stt.transcribe(&wav).await {
                    Ok(text) => Some(TransportEvent::FinalTranscript(text)),
                    Err(e) => {
                        tracing::warn!(error = %e, "STT failed");
                        Some(TransportEvent::CaptureError("network".to_string()))
                    }
                }
            }
        }
    }
}

#[async_trait(?Send)]
impl UtteranceTransport for MicrophoneTransport {
    async fn start_capture(&mut self) -> Result<()> {
        self.segmenter.reset();
        self.capture.start()?;
        self.pending.push_back(TransportEvent::CaptureStarted);
        tracing::info!(device = self.capture.device_name(), "listening");
        Ok(())
    }

    fn stop_capture(&mut self) {
        self.end_capture();
    }

    async fn speak(&mut self, text: &str, voice: Option<&Voice>) {
        let audio = match self.tts.synthesize(text, voice).await {
            Ok(audio) => audio,
            Err(e) => {
                self.pending.push_back(TransportEvent::SpeechError(e.to_string()));
                return;
            }
        };

        self.pending.push_back(TransportEvent::SpeechStarted);
        let event = match self.playback.play_mp3(&audio) {
            Ok(()) => TransportEvent::SpeechEnded,
            Err(e) => TransportEvent::SpeechError(e.to_string()),
        };
        self.pending.push_back(event);
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }
        if self.capture.is_capturing() {
            return self.process_audio().await;
        }
        None
    }

    fn list_voices(&self) -> Vec<Voice> {
        self.tts.voices()
    }
}
