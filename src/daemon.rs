//! Daemon - the conversation host loop
//!
//! Feeds transport events and user controls into the [`TurnController`] and
//! carries out the effects it returns. Resolution runs on a spawned task so
//! the loop keeps reacting to toggles while the assistant is thinking.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::Result;
use crate::actions::HostActions;
use crate::interpreter::{CommandInterpreter, Resolution};
use crate::transcript::TranscriptLog;
use crate::turn::{AssistantState, Effect, TurnController, TurnEvent};
use crate::voice::{UtteranceTransport, Voice, select_voice};

/// How often the transport is polled for audio and events
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Out-of-band requests from the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Flip the activation flag
    Toggle,
    /// Deactivate if active, otherwise shut down
    Interrupt,
    /// Stop the loop
    Shutdown,
}

/// Cloneable sender for [`Control`] requests
#[derive(Debug, Clone)]
pub struct DaemonHandle {
    tx: mpsc::UnboundedSender<Control>,
}

impl DaemonHandle {
    pub fn toggle(&self) {
        self.send(Control::Toggle);
    }

    pub fn interrupt(&self) {
        self.send(Control::Interrupt);
    }

    pub fn shutdown(&self) {
        self.send(Control::Shutdown);
    }

    fn send(&self, control: Control) {
        if self.tx.send(control).is_err() {
            tracing::debug!(?control, "daemon already stopped");
        }
    }
}

/// The Herald daemon
pub struct Daemon<T> {
    controller: TurnController,
    interpreter: Arc<CommandInterpreter>,
    transport: T,
    actions: Arc<dyn HostActions>,
    voice: Option<Voice>,
    control_tx: mpsc::UnboundedSender<Control>,
    control_rx: mpsc::UnboundedReceiver<Control>,
    resolved_tx: mpsc::UnboundedSender<Resolution>,
    resolved_rx: mpsc::UnboundedReceiver<Resolution>,
    once: bool,
    render_transcript: bool,
    rendered: usize,
    poll_interval: Duration,
}

impl<T: UtteranceTransport> Daemon<T> {
    /// Create a daemon speaking with the transport's preferred voice
    pub fn new(
        interpreter: Arc<CommandInterpreter>,
        transport: T,
        actions: Arc<dyn HostActions>,
    ) -> Self {
        let voice = select_voice(&transport.list_voices(), None);
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (resolved_tx, resolved_rx) = mpsc::unbounded_channel();

        Self {
            controller: TurnController::new(),
            interpreter,
            transport,
            actions,
            voice,
            control_tx,
            control_rx,
            resolved_tx,
            resolved_rx,
            once: false,
            render_transcript: false,
            rendered: 0,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Prefer the named voice when the transport offers it
    #[must_use]
    pub fn with_preferred_voice(mut self, name: Option<&str>) -> Self {
        self.voice = select_voice(&self.transport.list_voices(), name);
        self
    }

    /// Exit after the first completed turn
    #[must_use]
    pub const fn once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    /// Print transcript entries to stdout as they are appended
    #[must_use]
    pub const fn render_transcript(mut self, render: bool) -> Self {
        self.render_transcript = render;
        self
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn handle(&self) -> DaemonHandle {
        DaemonHandle {
            tx: self.control_tx.clone(),
        }
    }

    #[must_use]
    pub const fn voice(&self) -> Option<&Voice> {
        self.voice.as_ref()
    }

    /// Run until shut down, the input closes, or (with `once`) a turn completes
    ///
    /// Returns the conversation transcript.
    ///
    /// # Errors
    ///
    /// Does not currently fail; transport and assistant errors are handled as turn events
    #[allow(clippy::future_not_send)]
    pub async fn run(mut self, activate: bool) -> Result<TranscriptLog> {
        tracing::info!(
            voice = self.voice.as_ref().map_or("default", |v| v.name.as_str()),
            "daemon running"
        );

        if activate {
            self.dispatch(TurnEvent::Toggle).await;
        }

        loop {
            self.drain_transport().await;
            self.render_new_entries();

            if self.finished() {
                break;
            }

            tokio::select! {
                Some(control) = self.control_rx.recv() => {
                    if !self.apply_control(control).await {
                        tracing::info!("shutdown requested");
                        break;
                    }
                }
                Some(resolution) = self.resolved_rx.recv() => {
                    self.dispatch(TurnEvent::Resolved(resolution)).await;
                }
                () = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        self.render_new_entries();
        if self.transport.is_closed() {
            tracing::info!("input closed");
        }
        if self.controller.state() == AssistantState::Listening {
            self.transport.stop_capture();
        }

        tracing::info!(entries = self.controller.transcript().len(), "daemon stopped");
        Ok(self.controller.into_transcript())
    }

    /// Returns false when the loop should stop
    async fn apply_control(&mut self, control: Control) -> bool {
        match control {
            Control::Toggle => {
                self.dispatch(TurnEvent::Toggle).await;
                true
            }
            Control::Interrupt => {
                if self.controller.is_active()
                    || self.controller.state() == AssistantState::Listening
                {
                    self.dispatch(TurnEvent::Toggle).await;
                    true
                } else {
                    false
                }
            }
            Control::Shutdown => false,
        }
    }

    /// Handle queued transport events until none are left or the run is over
    async fn drain_transport(&mut self) {
        while !self.finished() {
            let Some(event) = self.transport.next_event().await else {
                break;
            };
            tracing::trace!(?event, "transport event");
            self.dispatch(event.into()).await;
        }
    }

    /// Feed one event to the controller and execute the resulting effects
    async fn dispatch(&mut self, event: TurnEvent) {
        let mut effects: VecDeque<Effect> = self.controller.handle(event).into();

        while let Some(effect) = effects.pop_front() {
            match effect {
                Effect::StartCapture => {
                    if let Err(e) = self.transport.start_capture().await {
                        tracing::error!(error = %e, "failed to start capture");
                        effects.extend(
                            self.controller
                                .handle(TurnEvent::CaptureError("audio-capture".to_string())),
                        );
                    }
                }
                Effect::StopCapture => self.transport.stop_capture(),
                Effect::Resolve(text) => self.spawn_resolution(text),
                Effect::Perform(action) => {
                    tracing::info!(url = %action.target(), "performing host action");
                    if let Err(e) = self.actions.perform(&action) {
                        tracing::warn!(error = %e, "host action failed");
                    }
                }
                Effect::Speak(text) => {
                    self.transport.speak(&text, self.voice.as_ref()).await;
                }
            }
        }
    }

    fn spawn_resolution(&self, transcript: String) {
        let interpreter = Arc::clone(&self.interpreter);
        let tx = self.resolved_tx.clone();
        tokio::spawn(async move {
            let task = tokio::spawn(async move { interpreter.resolve(&transcript).await });
            let resolution = match task.await {
                Ok(resolution) => resolution,
                Err(e) => {
                    tracing::error!(error = %e, "resolution task failed");
                    Resolution::failure()
                }
            };
            if tx.send(resolution).is_err() {
                tracing::debug!("resolution dropped after shutdown");
            }
        });
    }

    fn finished(&self) -> bool {
        let session = self.controller.session();
        let settled = !session.in_flight
            && matches!(
                session.status,
                AssistantState::Idle | AssistantState::Listening
            );
        if !settled {
            return false;
        }

        self.transport.is_closed() || (self.once && !self.controller.transcript().is_empty())
    }

    fn render_new_entries(&mut self) {
        let entries = self.controller.transcript().all();
        if self.render_transcript {
            for entry in &entries[self.rendered.min(entries.len())..] {
                println!("{entry}");
            }
        }
        self.rendered = entries.len();
    }
}
