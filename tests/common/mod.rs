//! Shared test utilities
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;

use herald::voice::{TransportEvent, UtteranceTransport, Voice};
use herald::{AssistantClient, AssistantReply, Error, FixedClock, Result};

/// Assistant that replays queued replies and records every prompt
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<AssistantReply>>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
    panics: bool,
}

impl ScriptedClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply
    #[must_use]
    pub fn reply(self, reply: AssistantReply) -> Self {
        self.replies.lock().unwrap().push_back(Ok(reply));
        self
    }

    /// Queue a communication failure
    #[must_use]
    pub fn fail(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(Error::Assistant(message.to_string())));
        self
    }

    /// Wait this long before answering
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Panic inside `send` instead of answering
    #[must_use]
    pub const fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssistantClient for ScriptedClient {
    async fn send(&self, prompt: &str) -> Result<AssistantReply> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.panics {
            panic!("scripted client panicked on {prompt:?}");
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(Error::Assistant("no scripted reply".to_string())))
    }
}

/// What a [`ScriptedTransport`] was asked to do
#[derive(Debug, Default)]
pub struct TransportLog {
    pub spoken: Vec<String>,
    pub voices: Vec<Option<String>>,
    pub captures: usize,
    pub stops: usize,
}

/// Transport that answers each capture with the next scripted outcome
///
/// A `None` outcome keeps the capture open forever. When the script runs out
/// the transport reports itself closed.
pub struct ScriptedTransport {
    outcomes: VecDeque<Option<TransportEvent>>,
    pending: VecDeque<TransportEvent>,
    capturing: bool,
    closed: bool,
    log: Arc<Mutex<TransportLog>>,
}

impl ScriptedTransport {
    pub fn new(outcomes: Vec<Option<TransportEvent>>) -> (Self, Arc<Mutex<TransportLog>>) {
        let log = Arc::new(Mutex::new(TransportLog::default()));
        let transport = Self {
            outcomes: outcomes.into(),
            pending: VecDeque::new(),
            capturing: false,
            closed: false,
            log: Arc::clone(&log),
        };
        (transport, log)
    }

    /// One final transcript per line
    pub fn saying(lines: &[&str]) -> (Self, Arc<Mutex<TransportLog>>) {
        Self::new(
            lines
                .iter()
                .map(|line| Some(TransportEvent::FinalTranscript((*line).to_string())))
                .collect(),
        )
    }
}

#[async_trait(?Send)]
impl UtteranceTransport for ScriptedTransport {
    async fn start_capture(&mut self) -> Result<()> {
        self.capturing = true;
        self.log.lock().unwrap().captures += 1;
        self.pending.push_back(TransportEvent::CaptureStarted);
        Ok(())
    }

    fn stop_capture(&mut self) {
        self.capturing = false;
        self.log.lock().unwrap().stops += 1;
    }

    async fn speak(&mut self, text: &str, voice: Option<&Voice>) {
        {
            let mut log = self.log.lock().unwrap();
            log.spoken.push(text.to_string());
            log.voices.push(voice.map(|v| v.name.clone()));
        }
        self.pending.push_back(TransportEvent::SpeechStarted);
        self.pending.push_back(TransportEvent::SpeechEnded);
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }
        if !self.capturing {
            return None;
        }

        match self.outcomes.front() {
            Some(None) => None,
            Some(Some(_)) => {
                self.capturing = false;
                self.outcomes.pop_front().flatten()
            }
            None => {
                self.capturing = false;
                self.closed = true;
                None
            }
        }
    }

    fn list_voices(&self) -> Vec<Voice> {
        vec![
            Voice::new("Thomas", "fr-FR"),
            Voice::new("Samantha", "en-US"),
            Voice::new("Daniel", "en-GB"),
        ]
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Clock frozen at an RFC 3339 instant
pub fn clock_at(rfc3339: &str) -> Arc<FixedClock> {
    Arc::new(FixedClock(
        DateTime::parse_from_rfc3339(rfc3339).expect("valid test timestamp"),
    ))
}
