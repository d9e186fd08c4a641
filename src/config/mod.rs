//! Configuration management for Herald
//!
//! Every setting resolves as env > TOML file > default.

pub mod file;

use std::path::Path;

use crate::assistant::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_SYSTEM_INSTRUCTION, GeminiConfig};
use crate::interpreter::LocaleFormat;
use crate::voice::{SpeechToText, TextToSpeech};
use crate::{Error, Result};

use self::file::HeraldConfigFile;

/// Herald configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote assistant configuration
    pub assistant: AssistantConfig,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// Spoken time/date formats
    pub locale: LocaleFormat,
}

/// Remote assistant configuration
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Gemini API key
    pub api_key: Option<String>,

    /// Model identifier
    pub model: String,

    /// API root
    pub base_url: String,

    /// Offer Google Search grounding
    pub grounding: bool,

    /// Instruction sent with every request
    pub system_instruction: String,
}

/// Voice configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Whether to use the microphone transport
    pub enabled: bool,

    /// STT model
    pub stt_model: String,

    /// TTS model
    pub tts_model: String,

    /// Preferred TTS voice
    pub tts_voice: String,

    /// TTS speed multiplier
    pub tts_speed: f32,

    /// `OpenAI` key for STT and TTS
    pub openai_api_key: Option<String>,
}

impl Config {
    /// Load configuration from the environment and the config file
    ///
    /// # Errors
    ///
    /// Returns error if an explicit config file cannot be read or parsed, or
    /// if a locale pattern is invalid
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let fc = file::load_config_file(path)?;
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Layer `env` over a parsed config file
    ///
    /// Empty environment values count as unset.
    ///
    /// # Errors
    ///
    /// Returns error if a `[locale]` pattern is not valid `strftime`
    pub fn from_sources(
        fc: HeraldConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let assistant = AssistantConfig {
            api_key: var("GEMINI_API_KEY")
                .or_else(|| var("API_KEY"))
                .or(fc.assistant.api_key),
            model: var("HERALD_MODEL")
                .or(fc.assistant.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: var("HERALD_BASE_URL")
                .or(fc.assistant.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            grounding: fc.assistant.grounding.unwrap_or(true),
            system_instruction: fc
                .assistant
                .system_instruction
                .unwrap_or_else(|| DEFAULT_SYSTEM_INSTRUCTION.to_string()),
        };

        let voice = VoiceConfig {
            enabled: fc.voice.enabled.unwrap_or(true),
            stt_model: var("HERALD_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or_else(|| "whisper-1".to_string()),
            tts_model: var("HERALD_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or_else(|| "tts-1".to_string()),
            tts_voice: var("HERALD_TTS_VOICE")
                .or(fc.voice.tts_voice)
                .unwrap_or_else(|| "alloy".to_string()),
            tts_speed: fc.voice.tts_speed.unwrap_or(1.0),
            openai_api_key: var("OPENAI_API_KEY").or(fc.voice.openai_api_key),
        };

        let defaults = LocaleFormat::default();
        let locale = LocaleFormat {
            time: fc.locale.time_format.unwrap_or(defaults.time),
            date: fc.locale.date_format.unwrap_or(defaults.date),
            datetime: fc.locale.datetime_format.unwrap_or(defaults.datetime),
        };
        locale.validate()?;

        Ok(Self {
            assistant,
            voice,
            locale,
        })
    }

    /// Settings for the Gemini client
    ///
    /// # Errors
    ///
    /// Returns error if no Gemini API key is configured
    pub fn gemini_config(&self) -> Result<GeminiConfig> {
        let api_key = self.assistant.api_key.clone().ok_or_else(|| {
            Error::Config(
                "Gemini API key required: set GEMINI_API_KEY or [assistant] api_key".to_string(),
            )
        })?;

        Ok(GeminiConfig::new(api_key)
            .with_model(self.assistant.model.clone())
            .with_base_url(self.assistant.base_url.clone())
            .with_grounding(self.assistant.grounding)
            .with_system_instruction(self.assistant.system_instruction.clone()))
    }

    /// Build the speech recognizer
    ///
    /// # Errors
    ///
    /// Returns error if no `OpenAI` API key is configured
    pub fn speech_to_text(&self) -> Result<SpeechToText> {
        SpeechToText::new(self.openai_key()?, self.voice.stt_model.clone())
            .map(|stt| stt.with_language("en"))
    }

    /// Build the speech synthesizer
    ///
    /// # Errors
    ///
    /// Returns error if no `OpenAI` API key is configured
    pub fn text_to_speech(&self) -> Result<TextToSpeech> {
        TextToSpeech::new(
            self.openai_key()?,
            self.voice.tts_model.clone(),
            self.voice.tts_voice.clone(),
            self.voice.tts_speed,
        )
    }

    fn openai_key(&self) -> Result<String> {
        self.voice.openai_api_key.clone().ok_or_else(|| {
            Error::Config(
                "OpenAI API key required for voice: set OPENAI_API_KEY or [voice] openai_api_key"
                    .to_string(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_file_or_env() {
        let config = Config::from_sources(HeraldConfigFile::default(), env(&[])).unwrap();
        assert_eq!(config.assistant.model, DEFAULT_MODEL);
        assert_eq!(config.assistant.base_url, DEFAULT_BASE_URL);
        assert!(config.assistant.grounding);
        assert!(config.assistant.api_key.is_none());
        assert!(config.voice.enabled);
        assert_eq!(config.voice.stt_model, "whisper-1");
        assert_eq!(config.voice.tts_model, "tts-1");
        assert_eq!(config.locale, LocaleFormat::default());
    }

    #[test]
    fn env_overrides_file() {
        let fc: HeraldConfigFile = toml::from_str(
            r#"
            [assistant]
            model = "from-file"
            api_key = "file-key"

            [voice]
            tts_voice = "nova"
            "#,
        )
        .unwrap();

        let config = Config::from_sources(
            fc,
            env(&[("HERALD_MODEL", "from-env"), ("GEMINI_API_KEY", "")]),
        )
        .unwrap();
        assert_eq!(config.assistant.model, "from-env");
        // Empty env value falls through to the file
        assert_eq!(config.assistant.api_key.as_deref(), Some("file-key"));
        assert_eq!(config.voice.tts_voice, "nova");
    }

    #[test]
    fn api_key_alias() {
        let config =
            Config::from_sources(HeraldConfigFile::default(), env(&[("API_KEY", "k")])).unwrap();
        assert_eq!(config.assistant.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn missing_gemini_key_is_config_error() {
        let config = Config::from_sources(HeraldConfigFile::default(), env(&[])).unwrap();
        assert!(matches!(config.gemini_config(), Err(Error::Config(_))));
        assert!(matches!(config.text_to_speech(), Err(Error::Config(_))));
    }

    #[test]
    fn gemini_config_carries_settings() {
        let fc: HeraldConfigFile = toml::from_str(
            r#"
            [assistant]
            grounding = false
            system_instruction = "Be brief."
            "#,
        )
        .unwrap();
        let config = Config::from_sources(fc, env(&[("GEMINI_API_KEY", "secret")])).unwrap();
        let gemini = config.gemini_config().unwrap();
        assert_eq!(gemini.api_key, "secret");
        assert!(!gemini.grounding);
        assert_eq!(gemini.system_instruction, "Be brief.");
    }

    #[test]
    fn locale_overrides() {
        let fc: HeraldConfigFile = toml::from_str(
            r#"
            [locale]
            time_format = "%H:%M"
            "#,
        )
        .unwrap();
        let config = Config::from_sources(fc, env(&[])).unwrap();
        assert_eq!(config.locale.time, "%H:%M");
        assert_eq!(config.locale.date, LocaleFormat::default().date);
    }

    #[test]
    fn invalid_locale_pattern_is_config_error() {
        let fc: HeraldConfigFile = toml::from_str(
            r#"
            [locale]
            datetime_format = "%Y %Q"
            "#,
        )
        .unwrap();
        let err = Config::from_sources(fc, env(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("datetime_format")));
    }

    #[test]
    fn invalid_locale_pattern_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[locale]\ntime_format = \"%Q\"\n").unwrap();
        assert!(matches!(Config::load(Some(&path)), Err(Error::Config(_))));
    }

    #[test]
    fn loads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[voice]\nenabled = false\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert!(!config.voice.enabled);
    }
}
