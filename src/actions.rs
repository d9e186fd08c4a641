//! Side effects surfaced to the host environment
//!
//! The interpreter never opens anything itself; it returns a [`HostAction`]
//! and the daemon hands it to a [`HostActions`] implementation.

use std::process::Stdio;
use std::sync::Mutex;

use crate::{Error, Result};

/// A fire-and-forget request to the host environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostAction {
    /// Open the user's mail composer with the fields pre-filled
    ComposeMail {
        /// Recipient address
        recipient: String,
        /// Subject line
        subject: String,
        /// Message body
        body: String,
    },
    /// Open a URL in a new browser context
    OpenUrl(String),
}

impl HostAction {
    /// Target URL handed to the platform opener
    ///
    /// Subject and body of a mail are percent-encoded.
    #[must_use]
    pub fn target(&self) -> String {
        match self {
            Self::ComposeMail {
                recipient,
                subject,
                body,
            } => format!(
                "mailto:{recipient}?subject={}&body={}",
                urlencoding::encode(subject),
                urlencoding::encode(body)
            ),
            Self::OpenUrl(url) => url.clone(),
        }
    }
}

/// Executes host actions
pub trait HostActions: Send + Sync {
    /// Launch the action; nothing is returned to the conversation
    ///
    /// # Errors
    ///
    /// Returns error if the action could not be launched
    fn perform(&self, action: &HostAction) -> Result<()>;
}

/// Candidate opener commands, tried in order
#[cfg(target_os = "macos")]
const OPENERS: &[&str] = &["open"];
#[cfg(target_os = "windows")]
const OPENERS: &[&str] = &["explorer"];
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const OPENERS: &[&str] = &["xdg-open", "gio", "wslview"];

/// Opens targets with the platform's default handler (`xdg-open`, `open`, …)
#[derive(Debug, Default)]
pub struct SystemOpener;

impl SystemOpener {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn find_opener() -> Result<std::path::PathBuf> {
        OPENERS
            .iter()
            .find_map(|name| which::which(name).ok())
            .ok_or_else(|| Error::Action(format!("no URL opener found (tried {OPENERS:?})")))
    }
}

impl HostActions for SystemOpener {
    fn perform(&self, action: &HostAction) -> Result<()> {
        let opener = Self::find_opener()?;
        let target = action.target();

        let mut cmd = std::process::Command::new(&opener);
        if opener.file_stem().is_some_and(|s| s == "gio") {
            cmd.arg("open");
        }
        cmd.arg(&target)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // Detached: the child is not waited on
        cmd.spawn().map_err(|e| {
            Error::Action(format!("failed to spawn {}: {e}", opener.display()))
        })?;

        tracing::info!(opener = %opener.display(), url = %target, "host action launched");
        Ok(())
    }
}

/// Records actions instead of launching them (`--dry-run` and tests)
#[derive(Debug, Default)]
pub struct RecordingActions {
    performed: Mutex<Vec<HostAction>>,
}

impl RecordingActions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Actions performed so far, in order
    #[must_use]
    pub fn performed(&self) -> Vec<HostAction> {
        self.performed
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl HostActions for RecordingActions {
    fn perform(&self, action: &HostAction) -> Result<()> {
        tracing::info!(url = %action.target(), "host action recorded");
        if let Ok(mut performed) = self.performed.lock() {
            performed.push(action.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mailto_encodes_subject_and_body() {
        let action = HostAction::ComposeMail {
            recipient: "a@b.com".to_string(),
            subject: "Lunch plans?".to_string(),
            body: "See you at 12 & bring snacks".to_string(),
        };
        assert_eq!(
            action.target(),
            "mailto:a@b.com?subject=Lunch%20plans%3F&body=See%20you%20at%2012%20%26%20bring%20snacks"
        );
    }

    #[test]
    fn open_url_target_is_verbatim() {
        let action = HostAction::OpenUrl("https://example.com/a?b=c".to_string());
        assert_eq!(action.target(), "https://example.com/a?b=c");
    }

    #[test]
    fn recording_keeps_order() {
        let recorder = RecordingActions::new();
        recorder
            .perform(&HostAction::OpenUrl("https://one.example".into()))
            .unwrap();
        recorder
            .perform(&HostAction::OpenUrl("https://two.example".into()))
            .unwrap();

        let performed = recorder.performed();
        assert_eq!(performed.len(), 2);
        assert_eq!(performed[0], HostAction::OpenUrl("https://one.example".into()));
    }
}
