//! Error types for herald

use thiserror::Error;

/// Result type alias for herald operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in herald
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Communication with the remote assistant failed
    #[error("failed to communicate with the AI assistant: {0}")]
    Assistant(String),

    /// Host action (open URL, mail composer) could not be launched
    #[error("action error: {0}")]
    Action(String),

    /// Transcript invariant violated
    #[error("transcript error: {0}")]
    Transcript(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
