//! Text-to-speech via the `OpenAI` speech API

use serde::Serialize;

use super::Voice;
use crate::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Voices offered by the `OpenAI` speech API
pub const OPENAI_VOICES: &[&str] = &["alloy", "echo", "fable", "onyx", "nova", "shimmer"];

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
    response_format: &'a str,
}

/// Synthesizes speech as MP3
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: String,
    model: String,
    default_voice: String,
    speed: f32,
    base_url: String,
}

impl TextToSpeech {
    /// Create a synthesizer
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(api_key: String, model: String, default_voice: String, speed: f32) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            default_voice,
            speed: speed.clamp(0.25, 4.0),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Voices this synthesizer accepts
    #[must_use]
    pub fn voices(&self) -> Vec<Voice> {
        OPENAI_VOICES
            .iter()
            .map(|name| Voice::new(*name, "en-US"))
            .collect()
    }

    /// Synthesize `text`, returning MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the API rejects it
    pub async fn synthesize(&self, text: &str, voice: Option<&Voice>) -> Result<Vec<u8>> {
        let voice = voice.map_or(self.default_voice.as_str(), |v| v.name.as_str());
        tracing::debug!(voice, chars = text.len(), "synthesizing");

        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice,
            speed: self.speed,
            response_format: "mp3",
        };

        let response = self
            .client
            .post(format!("{}/v1/audio/speech", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("speech API error {status}: {body}")));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
