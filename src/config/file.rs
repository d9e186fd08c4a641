//! TOML configuration file loading
//!
//! Supports `~/.config/herald/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct HeraldConfigFile {
    /// Remote assistant configuration
    #[serde(default)]
    pub assistant: AssistantFileConfig,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// How times and dates are spoken
    #[serde(default)]
    pub locale: LocaleFileConfig,
}

/// Remote assistant configuration
#[derive(Debug, Default, Deserialize)]
pub struct AssistantFileConfig {
    /// Model identifier (e.g. "gemini-2.5-flash")
    pub model: Option<String>,

    pub api_key: Option<String>,

    /// API root, overridable for proxies and tests
    pub base_url: Option<String>,

    /// Offer Google Search grounding
    pub grounding: Option<bool>,

    pub system_instruction: Option<String>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Enable microphone input and spoken output
    pub enabled: Option<bool>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f32>,

    pub openai_api_key: Option<String>,
}

/// `strftime` overrides for spoken times and dates
#[derive(Debug, Default, Deserialize)]
pub struct LocaleFileConfig {
    pub time_format: Option<String>,
    pub date_format: Option<String>,
    pub datetime_format: Option<String>,
}

/// Load the TOML config file
///
/// An explicit `path` must exist and parse. Without one, the standard path
/// is tried and `HeraldConfigFile::default()` is returned if it is missing
/// or unreadable.
///
/// # Errors
///
/// Returns error if an explicit path cannot be read or parsed
pub fn load_config_file(path: Option<&Path>) -> Result<HeraldConfigFile> {
    if let Some(path) = path {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "loaded config file");
        return Ok(config);
    }

    let Some(path) = config_file_path() else {
        return Ok(HeraldConfigFile::default());
    };

    if !path.exists() {
        return Ok(HeraldConfigFile::default());
    }

    let config = match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                HeraldConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            HeraldConfigFile::default()
        }
    };

    Ok(config)
}

/// Return the config file path: `~/.config/herald/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("herald").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_leaves_other_sections_empty() {
        let config: HeraldConfigFile = toml::from_str(
            r#"
            [assistant]
            model = "gemini-2.0-flash"
            grounding = false
            "#,
        )
        .unwrap();

        assert_eq!(config.assistant.model.as_deref(), Some("gemini-2.0-flash"));
        assert_eq!(config.assistant.grounding, Some(false));
        assert!(config.voice.enabled.is_none());
        assert!(config.locale.time_format.is_none());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config_file(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn explicit_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[voice\nenabled = ").unwrap();
        assert!(matches!(load_config_file(Some(&path)), Err(Error::Toml(_))));
    }

    #[test]
    fn config_path_ends_with_herald() {
        if let Some(path) = config_file_path() {
            assert!(path.ends_with("herald/config.toml"));
        }
    }
}
