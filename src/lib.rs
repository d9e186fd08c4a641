//! Herald - a voice-driven conversational assistant
//!
//! This library provides the core functionality for Herald:
//! - Turn-taking state machine with a continuous-conversation toggle
//! - Command interpretation (local time/date, remote assistant with tools)
//! - Voice transport (microphone capture, STT, TTS, playback)
//! - Append-only conversation transcript
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Utterance Transport                 │
//! │      Microphone + STT/TTS      │      Console        │
//! └────────────────────┬────────────────────────────────┘
//!                      │ events          ▲ effects
//! ┌────────────────────▼─────────────────┴──────────────┐
//! │                      Daemon                          │
//! │   Turn Controller  │  Transcript  │  Host Actions    │
//! └────────────────────┬────────────────────────────────┘
//!                      │ resolve
//! ┌────────────────────▼────────────────────────────────┐
//! │                Command Interpreter                   │
//! │   Time/Date  │  Gemini (tools + search grounding)    │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod actions;
pub mod assistant;
pub mod config;
pub mod daemon;
pub mod error;
pub mod interpreter;
pub mod transcript;
pub mod turn;
pub mod voice;

pub use actions::{HostAction, HostActions, RecordingActions, SystemOpener};
pub use assistant::{AssistantClient, AssistantReply, GeminiClient, GeminiConfig};
pub use config::Config;
pub use daemon::{Control, Daemon, DaemonHandle};
pub use error::{Error, Result};
pub use interpreter::{Clock, CommandInterpreter, FixedClock, LocaleFormat, Resolution, SystemClock};
pub use transcript::{Citation, Speaker, TranscriptEntry, TranscriptLog};
pub use turn::{AssistantState, Effect, SessionState, TurnController, TurnEvent};
pub use voice::{TransportEvent, UtteranceTransport, Voice};
