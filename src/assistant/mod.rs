//! Remote assistant service
//!
//! The assistant receives a free-text prompt and answers either with plain
//! text (optionally grounded by web search) or with a structured call to one
//! of the tools declared in [`tools`].

mod gemini;
pub mod tools;

use async_trait::async_trait;
use serde_json::{Map, Value};

pub use gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiClient, GeminiConfig};

use crate::Result;
use crate::transcript::Citation;

/// Default steering for the remote model
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a sophisticated AI personal assistant. \
Your responses should be concise, helpful, and slightly formal, with a touch of wit. \
You have access to tools for getting the weather, sending emails, and creating calendar events. \
When asked for information you don't know, use your search tool to find the most up-to-date answers. \
If you open a URL, just say you've opened it. Don't describe the content. \
Analyze user commands. If a command is to open a website (e.g., 'open google.com'), your response should be ONLY the full URL (e.g., 'https://www.google.com'). \
Do not add any other words, markdown, or explanation. \
When asked to perform an action like sending an email or creating an event, if any information is missing \
(e.g., recipient, subject, body for email; title, start time, end time for calendar), ask the user for the missing details before calling the tool. \
For weather, you only need a location.";

/// One reply from the remote assistant
#[derive(Debug, Clone, PartialEq)]
pub enum AssistantReply {
    /// Free text with optional grounding sources
    PlainText {
        /// Answer text
        text: String,
        /// Grounding citations, in the order returned
        citations: Vec<Citation>,
    },
    /// Structured tool invocation
    FunctionCall {
        /// Tool name
        name: String,
        /// Tool arguments
        args: Map<String, Value>,
    },
}

impl AssistantReply {
    /// Plain text reply without citations
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::PlainText {
            text: text.into(),
            citations: Vec::new(),
        }
    }

    /// Function call reply from a JSON object; non-object args become empty
    #[must_use]
    pub fn call(name: impl Into<String>, args: Value) -> Self {
        let args = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::FunctionCall {
            name: name.into(),
            args,
        }
    }
}

/// Sends prompts to a remote language model
#[async_trait]
pub trait AssistantClient: Send + Sync {
    /// Send one prompt and return the normalized reply
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Assistant`] on any transport or parse problem
    async fn send(&self, prompt: &str) -> Result<AssistantReply>;
}
