//! Turn controller
//!
//! Owns the conversation state machine and the activation flag. The
//! controller never talks to a transport directly: [`TurnController::handle`]
//! consumes one [`TurnEvent`] and returns the [`Effect`]s the host loop must
//! carry out, in order.
//!
//! ```text
//!            toggle                 final transcript           resolved
//!   Idle ───────────▶ Listening ─────────────────▶ Thinking ───────────▶ Speaking
//!    ▲                    │ capture error                                  │
//!    └────────────────────┘                    speech ended (active) ◀─────┤
//!    ▲                                           → Listening               │
//!    └──────────────────────── speech ended (inactive) ────────────────────┘
//! ```

use std::fmt;

use crate::actions::HostAction;
use crate::interpreter::Resolution;
use crate::transcript::{Speaker, TranscriptLog};
use crate::voice::TransportEvent;

/// Conversation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssistantState {
    #[default]
    Idle,
    Listening,
    Thinking,
    Speaking,
}

impl fmt::Display for AssistantState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Thinking => "thinking",
            Self::Speaking => "speaking",
        };
        f.write_str(name)
    }
}

/// Everything the controller mutates, in one record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Current status
    pub status: AssistantState,
    /// Continuous-conversation mode requested by the user
    pub active: bool,
    /// Last user-visible error
    pub error: Option<String>,
    /// A resolution has been requested and not yet delivered
    pub in_flight: bool,
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// User pressed the activation toggle
    Toggle,
    /// Capture actually began
    CaptureStarted,
    /// Capture produced a final transcript
    FinalTranscript(String),
    /// Capture failed
    CaptureError(String),
    /// The interpreter finished
    Resolved(Resolution),
    /// Playback began
    SpeechStarted,
    /// Playback finished
    SpeechEnded,
    /// Playback failed; treated as the end of the utterance
    SpeechError(String),
}

impl From<TransportEvent> for TurnEvent {
    fn from(event: TransportEvent) -> Self {
        match event {
            TransportEvent::CaptureStarted => Self::CaptureStarted,
            TransportEvent::FinalTranscript(text) => Self::FinalTranscript(text),
            TransportEvent::CaptureError(code) => Self::CaptureError(code),
            TransportEvent::SpeechStarted => Self::SpeechStarted,
            TransportEvent::SpeechEnded => Self::SpeechEnded,
            TransportEvent::SpeechError(message) => Self::SpeechError(message),
        }
    }
}

/// Work the host loop must perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartCapture,
    StopCapture,
    /// Run the interpreter on this transcript
    Resolve(String),
    /// Fire a host action
    Perform(HostAction),
    /// Speak this text
    Speak(String),
}

/// The conversation state machine
#[derive(Debug, Default)]
pub struct TurnController {
    session: SessionState,
    transcript: TranscriptLog,
}

impl TurnController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn session(&self) -> &SessionState {
        &self.session
    }

    #[must_use]
    pub const fn state(&self) -> AssistantState {
        self.session.status
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.session.active
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.session.error.as_deref()
    }

    #[must_use]
    pub const fn transcript(&self) -> &TranscriptLog {
        &self.transcript
    }

    /// Consume the controller, keeping the conversation
    #[must_use]
    pub fn into_transcript(self) -> TranscriptLog {
        self.transcript
    }

    /// Apply one event and return the effects to execute
    pub fn handle(&mut self, event: TurnEvent) -> Vec<Effect> {
        let before = self.session.status;

        let effects = match event {
            TurnEvent::Toggle => self.toggle(),
            TurnEvent::CaptureStarted => {
                if before != AssistantState::Listening {
                    tracing::debug!(state = %before, "capture started outside listening");
                }
                Vec::new()
            }
            TurnEvent::FinalTranscript(text) => self.final_transcript(text),
            TurnEvent::CaptureError(code) => self.capture_error(&code),
            TurnEvent::Resolved(resolution) => self.resolved(resolution),
            TurnEvent::SpeechStarted => Vec::new(),
            TurnEvent::SpeechEnded => self.speech_finished(),
            TurnEvent::SpeechError(message) => {
                tracing::warn!(error = %message, "speech playback failed");
                self.speech_finished()
            }
        };

        if before != self.session.status {
            tracing::info!(
                from = %before,
                to = %self.session.status,
                active = self.session.active,
                "assistant state changed"
            );
        }

        effects
    }

    fn toggle(&mut self) -> Vec<Effect> {
        self.session.error = None;

        if self.session.active || self.session.status == AssistantState::Listening {
            let was_listening = self.session.status == AssistantState::Listening;
            self.session.active = false;
            self.session.status = AssistantState::Idle;
            tracing::info!("assistant deactivated");
            return if was_listening {
                vec![Effect::StopCapture]
            } else {
                Vec::new()
            };
        }

        self.session.active = true;
        tracing::info!("assistant activated");

        if self.session.in_flight {
            // Re-attach to the pending resolution; listening resumes after it is spoken
            self.session.status = AssistantState::Thinking;
            return Vec::new();
        }

        if self.session.status == AssistantState::Speaking {
            // Playback still running; its end event restarts listening
            return Vec::new();
        }

        self.session.status = AssistantState::Listening;
        vec![Effect::StartCapture]
    }

    fn final_transcript(&mut self, text: String) -> Vec<Effect> {
        if self.session.status != AssistantState::Listening {
            tracing::debug!(state = %self.session.status, "transcript ignored outside listening");
            return Vec::new();
        }

        if text.trim().is_empty() {
            tracing::debug!("empty transcript");
            return self.resume_or_idle();
        }

        self.session.error = None;
        if let Err(e) = self.transcript.append(Speaker::User, text.clone(), Vec::new()) {
            tracing::warn!(error = %e, "user entry not logged");
        }
        self.session.status = AssistantState::Thinking;
        self.session.in_flight = true;
        vec![Effect::Resolve(text)]
    }

    fn capture_error(&mut self, code: &str) -> Vec<Effect> {
        if self.session.status != AssistantState::Listening {
            tracing::debug!(state = %self.session.status, code, "capture error ignored");
            return Vec::new();
        }

        let message = format!("Speech recognition error: {code}");
        tracing::warn!(code, "capture failed");
        if let Err(e) = self.transcript.append(Speaker::Assistant, message.clone(), Vec::new()) {
            tracing::warn!(error = %e, "error entry not logged");
        }
        self.session.error = Some(message);
        self.session.active = false;
        self.session.status = AssistantState::Idle;
        Vec::new()
    }

    fn resolved(&mut self, resolution: Resolution) -> Vec<Effect> {
        if !self.session.in_flight {
            tracing::warn!("resolution delivered with nothing in flight");
            return Vec::new();
        }
        self.session.in_flight = false;

        if self.session.status != AssistantState::Thinking {
            // User deactivated mid-flight: speak once, then settle in Idle
            tracing::info!(state = %self.session.status, "late resolution after deactivation");
        }

        let Resolution {
            response_text,
            citations,
            action,
            unrecoverable,
        } = resolution;

        if let Err(e) = self
            .transcript
            .append(Speaker::Assistant, response_text.clone(), citations)
        {
            tracing::warn!(error = %e, "assistant entry not logged");
        }

        if unrecoverable {
            self.session.error = Some(response_text.clone());
            self.session.active = false;
        }

        let mut effects = Vec::with_capacity(2);
        if let Some(action) = action {
            effects.push(Effect::Perform(action));
        }
        self.session.status = AssistantState::Speaking;
        effects.push(Effect::Speak(response_text));
        effects
    }

    fn speech_finished(&mut self) -> Vec<Effect> {
        if self.session.status != AssistantState::Speaking {
            tracing::debug!(state = %self.session.status, "speech end ignored");
            return Vec::new();
        }
        self.resume_or_idle()
    }

    fn resume_or_idle(&mut self) -> Vec<Effect> {
        if self.session.active {
            self.session.status = AssistantState::Listening;
            vec![Effect::StartCapture]
        } else {
            self.session.status = AssistantState::Idle;
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spoken(text: &str) -> Resolution {
        Resolution {
            response_text: text.to_string(),
            citations: Vec::new(),
            action: None,
            unrecoverable: false,
        }
    }

    #[test]
    fn starts_idle_and_inactive() {
        let controller = TurnController::new();
        assert_eq!(controller.state(), AssistantState::Idle);
        assert!(!controller.is_active());
        assert!(controller.error().is_none());
        assert!(controller.transcript().is_empty());
    }

    #[test]
    fn full_turn_relistens_while_active() {
        let mut c = TurnController::new();
        assert_eq!(c.handle(TurnEvent::Toggle), vec![Effect::StartCapture]);
        assert!(c.handle(TurnEvent::CaptureStarted).is_empty());

        let effects = c.handle(TurnEvent::FinalTranscript("tell me a joke".into()));
        assert_eq!(effects, vec![Effect::Resolve("tell me a joke".into())]);
        assert_eq!(c.state(), AssistantState::Thinking);

        let effects = c.handle(TurnEvent::Resolved(spoken("Why not.")));
        assert_eq!(effects, vec![Effect::Speak("Why not.".into())]);
        assert_eq!(c.state(), AssistantState::Speaking);

        c.handle(TurnEvent::SpeechStarted);
        assert_eq!(c.handle(TurnEvent::SpeechEnded), vec![Effect::StartCapture]);
        assert_eq!(c.state(), AssistantState::Listening);
        assert_eq!(c.transcript().len(), 2);
    }

    #[test]
    fn empty_transcript_restarts_capture() {
        let mut c = TurnController::new();
        c.handle(TurnEvent::Toggle);
        assert_eq!(
            c.handle(TurnEvent::FinalTranscript("  ".into())),
            vec![Effect::StartCapture]
        );
        assert_eq!(c.state(), AssistantState::Listening);
        assert!(c.transcript().is_empty());
    }

    #[test]
    fn toggle_while_speaking_finishes_into_idle() {
        let mut c = TurnController::new();
        c.handle(TurnEvent::Toggle);
        c.handle(TurnEvent::FinalTranscript("hi".into()));
        c.handle(TurnEvent::Resolved(spoken("Hello.")));

        assert!(c.handle(TurnEvent::Toggle).is_empty());
        assert_eq!(c.state(), AssistantState::Idle);
        assert!(c.handle(TurnEvent::SpeechEnded).is_empty());
        assert_eq!(c.state(), AssistantState::Idle);
    }

    #[test]
    fn stray_resolution_is_ignored() {
        let mut c = TurnController::new();
        assert!(c.handle(TurnEvent::Resolved(spoken("Hello."))).is_empty());
        assert!(c.transcript().is_empty());
    }

    #[test]
    fn state_names() {
        assert_eq!(AssistantState::Thinking.to_string(), "thinking");
        assert_eq!(AssistantState::default(), AssistantState::Idle);
    }
}
