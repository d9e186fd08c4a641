//! Text console transport
//!
//! Each input line is one final transcript. Nothing is synthesized: speech
//! completes immediately and the daemon renders the transcript instead.

use std::collections::VecDeque;
use std::io::BufRead;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, error::TryRecvError};

use super::{TransportEvent, UtteranceTransport, Voice};
use crate::Result;

pub struct ConsoleTransport {
    lines: UnboundedReceiver<String>,
    pending: VecDeque<TransportEvent>,
    capturing: bool,
    closed: bool,
}

impl ConsoleTransport {
    /// Transport fed by an arbitrary line source
    #[must_use]
    pub fn new(lines: UnboundedReceiver<String>) -> Self {
        Self {
            lines,
            pending: VecDeque::new(),
            capturing: false,
            closed: false,
        }
    }

    /// Transport reading lines from stdin
    ///
    /// Lines are read on a detached thread that never holds up exit.
    #[must_use]
    pub fn stdin() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "stdin read failed");
                        break;
                    }
                }
            }
            tracing::debug!("stdin closed");
        });
        Self::new(rx)
    }

    /// The single voice the console offers
    #[must_use]
    pub fn voices() -> Vec<Voice> {
        vec![Voice::new("console", "en-US")]
    }
}

#[async_trait(?Send)]
impl UtteranceTransport for ConsoleTransport {
    async fn start_capture(&mut self) -> Result<()> {
        self.capturing = true;
        self.pending.push_back(TransportEvent::CaptureStarted);
        Ok(())
    }

    fn stop_capture(&mut self) {
        self.capturing = false;
    }

    async fn speak(&mut self, text: &str, _voice: Option<&Voice>) {
        tracing::trace!(text, "console speech");
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

        match self.lines.try_recv() {
            Ok(line) => {
                self.capturing = false;
                Some(TransportEvent::FinalTranscript(line.trim().to_string()))
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.capturing = false;
                self.closed = true;
                None
            }
        }
    }

    fn list_voices(&self) -> Vec<Voice> {
        Self::voices()
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
