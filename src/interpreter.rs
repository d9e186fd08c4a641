//! Command interpreter
//!
//! Turns a final transcript into exactly one spoken response. Two intents
//! (time and date) are answered locally without touching the network;
//! everything else goes to the remote assistant and its reply is mapped into
//! user-facing phrasing here.

use std::sync::{Arc, LazyLock};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime};
use regex::Regex;
use serde_json::{Map, Value};

use crate::actions::HostAction;
use crate::assistant::{AssistantClient, AssistantReply, tools};
use crate::transcript::Citation;
use crate::{Error, Result};

/// Spoken when the remote assistant cannot be reached or returns nothing usable
pub const ERROR_RESPONSE: &str = "I'm sorry, I encountered an error. Please try again.";

/// Spoken when the assistant calls a tool we do not implement
pub const UNKNOWN_FUNCTION_RESPONSE: &str = "I'm sorry, I don't know how to do that.";

/// A reply consisting of only a URL is a request to open it
static URL_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://[^\s]+$").expect("valid regex"));

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock in the system's local time zone
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// `strftime` patterns used when speaking times and dates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleFormat {
    pub time: String,
    pub date: String,
    pub datetime: String,
}

impl Default for LocaleFormat {
    fn default() -> Self {
        Self {
            time: "%-I:%M:%S %p".to_string(),
            date: "%-m/%-d/%Y".to_string(),
            datetime: "%-m/%-d/%Y, %-I:%M:%S %p".to_string(),
        }
    }
}

impl LocaleFormat {
    /// Check every pattern parses as `strftime`
    ///
    /// chrono reports a bad specifier only when formatting, which would panic
    /// inside `format!`.
    ///
    /// # Errors
    ///
    /// Returns error naming the first pattern with an unknown specifier
    pub fn validate(&self) -> Result<()> {
        for (field, pattern) in [
            ("time_format", &self.time),
            ("date_format", &self.date),
            ("datetime_format", &self.datetime),
        ] {
            if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
                return Err(Error::Config(format!(
                    "invalid [locale] {field} pattern: {pattern:?}"
                )));
            }
        }
        Ok(())
    }
}

/// Outcome of interpreting one transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Text to log and speak; never empty
    pub response_text: String,
    /// Grounding sources for the response
    pub citations: Vec<Citation>,
    /// Host side effect to fire before speaking
    pub action: Option<HostAction>,
    /// The failure cannot be recovered within the conversation; deactivate
    pub unrecoverable: bool,
}

impl Resolution {
    fn spoken(text: impl Into<String>) -> Self {
        Self {
            response_text: text.into(),
            citations: Vec::new(),
            action: None,
            unrecoverable: false,
        }
    }

    fn with_action(mut self, action: HostAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Apology for a failed remote round-trip
    #[must_use]
    pub fn failure() -> Self {
        Self {
            unrecoverable: true,
            ..Self::spoken(ERROR_RESPONSE)
        }
    }
}

/// Intents answered without the remote assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocalIntent {
    Time,
    Date,
}

impl LocalIntent {
    /// Match against a lower-cased transcript; first pattern wins
    fn detect(lower: &str) -> Option<Self> {
        if lower.contains("what time is it") {
            Some(Self::Time)
        } else if lower.contains("what's the date") {
            Some(Self::Date)
        } else {
            None
        }
    }
}

/// Resolves transcripts into responses
pub struct CommandInterpreter {
    client: Arc<dyn AssistantClient>,
    clock: Arc<dyn Clock>,
    locale: LocaleFormat,
}

impl CommandInterpreter {
    /// Create an interpreter using the system clock and default locale
    #[must_use]
    pub fn new(client: Arc<dyn AssistantClient>) -> Self {
        Self {
            client,
            clock: Arc::new(SystemClock),
            locale: LocaleFormat::default(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_locale(mut self, locale: LocaleFormat) -> Self {
        self.locale = locale;
        self
    }

    /// Resolve a final transcript
    ///
    /// Never fails: remote errors become an apology marked unrecoverable.
    pub async fn resolve(&self, transcript: &str) -> Resolution {
        tracing::info!(transcript, "resolving command");

        if let Some(intent) = LocalIntent::detect(&transcript.to_lowercase()) {
            tracing::debug!(?intent, "handled locally");
            return self.answer_locally(intent);
        }

        let reply = match self.client.send(transcript).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(error = %e, "assistant request failed");
                return Resolution::failure();
            }
        };

        match self.interpret(reply) {
            Ok(resolution) => resolution,
            Err(e) => {
                tracing::error!(error = %e, "assistant reply unusable");
                Resolution::failure()
            }
        }
    }

    fn answer_locally(&self, intent: LocalIntent) -> Resolution {
        let now = self.clock.now();
        match intent {
            LocalIntent::Time => Resolution::spoken(format!(
                "The current time is {}.",
                now.format(&self.locale.time)
            )),
            LocalIntent::Date => Resolution::spoken(format!(
                "Today's date is {}.",
                now.format(&self.locale.date)
            )),
        }
    }

    /// Map a remote reply into a resolution
    ///
    /// # Errors
    ///
    /// Returns error if a plain-text reply is empty
    pub fn interpret(&self, reply: AssistantReply) -> Result<Resolution> {
        match reply {
            AssistantReply::FunctionCall { name, args } => Ok(self.function_call(&name, &args)),
            AssistantReply::PlainText { text, citations } => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Err(Error::Assistant("no response from assistant".to_string()));
                }

                if URL_ONLY.is_match(trimmed) {
                    tracing::info!(url = trimmed, "assistant asked to open URL");
                    return Ok(Resolution::spoken(format!("Opening {trimmed}."))
                        .with_action(HostAction::OpenUrl(trimmed.to_string())));
                }

                Ok(Resolution {
                    citations,
                    ..Resolution::spoken(text)
                })
            }
        }
    }

    fn function_call(&self, name: &str, args: &Map<String, Value>) -> Resolution {
        tracing::info!(name, ?args, "mapping function call");

        let resolution = match name {
            tools::GET_WEATHER => string_arg(args, "location").map(|location| {
                Resolution::spoken(format!(
                    "The weather in {location} is currently sunny with a high of 75 degrees."
                ))
            }),
            tools::SEND_EMAIL => compose_mail(args),
            tools::CREATE_CALENDAR_EVENT => self.calendar_event(args),
            _ => {
                tracing::warn!(name, "unknown function call");
                None
            }
        };

        resolution.unwrap_or_else(|| {
            tracing::warn!(name, "function call could not be mapped");
            Resolution::spoken(UNKNOWN_FUNCTION_RESPONSE)
        })
    }

    fn calendar_event(&self, args: &Map<String, Value>) -> Option<Resolution> {
        let title = string_arg(args, "title")?;
        let start = self.render_timestamp(&string_arg(args, "start_time")?);
        let end = self.render_timestamp(&string_arg(args, "end_time")?);

        let mut text = format!("I've scheduled \"{title}\" for you from {start} to {end}.");
        if let Some(description) = string_arg(args, "description").filter(|d| !d.is_empty()) {
            text = format!("{text} I've added the note: \"{description}\".");
        }
        Some(Resolution::spoken(text))
    }

    /// Render an ISO 8601 timestamp in the clock's offset; unparseable input is kept verbatim
    fn render_timestamp(&self, raw: &str) -> String {
        let offset = *self.clock.now().offset();
        parse_timestamp(raw, offset).map_or_else(
            || {
                tracing::warn!(raw, "unparseable timestamp");
                raw.to_string()
            },
            |dt| dt.format(&self.locale.datetime).to_string(),
        )
    }
}

fn compose_mail(args: &Map<String, Value>) -> Option<Resolution> {
    let recipient = string_arg(args, "recipient")?;
    let subject = string_arg(args, "subject").unwrap_or_default();
    let body = string_arg(args, "body").unwrap_or_default();

    let text = format!("I'm opening your email client to send a message to {recipient}.");
    Some(Resolution::spoken(text).with_action(HostAction::ComposeMail {
        recipient,
        subject,
        body,
    }))
}

fn parse_timestamp(raw: &str, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&offset));
    }

    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| naive.and_local_timezone(offset).single())
}

/// String argument; non-string scalars are stringified, null counts as missing
fn string_arg(args: &Map<String, Value>, key: &str) -> Option<String> {
    match args.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
