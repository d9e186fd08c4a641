//! Append-only conversation transcript

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Who produced a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The person talking to the assistant
    User,
    /// The assistant
    Assistant,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "you"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A grounding source attached to a remote answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Source URI
    pub uri: String,
    /// Human-readable title
    pub title: String,
}

impl Citation {
    /// Create a citation, falling back to the URI when the title is missing
    #[must_use]
    pub fn new(uri: impl Into<String>, title: Option<String>) -> Self {
        let uri = uri.into();
        let title = title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| uri.clone());
        Self { uri, title }
    }
}

/// One line of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    speaker: Speaker,
    text: String,
    citations: Vec<Citation>,
}

impl TranscriptEntry {
    #[must_use]
    pub const fn speaker(&self) -> Speaker {
        self.speaker
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn citations(&self) -> &[Citation] {
        &self.citations
    }
}

impl fmt::Display for TranscriptEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.speaker, self.text)?;
        if !self.citations.is_empty() {
            write!(f, "\n  Sources:")?;
            for citation in &self.citations {
                write!(f, "\n  - {} <{}>", citation.title, citation.uri)?;
            }
        }
        Ok(())
    }
}

/// Ordered record of the session's conversation
///
/// Entries are kept in the order they were appended and are never mutated or
/// removed afterwards.
#[derive(Debug, Clone, Default)]
pub struct TranscriptLog {
    entries: Vec<TranscriptEntry>,
}

impl TranscriptLog {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an entry
    ///
    /// # Errors
    ///
    /// Returns error if `text` is empty or whitespace
    pub fn append(
        &mut self,
        speaker: Speaker,
        text: impl Into<String>,
        citations: Vec<Citation>,
    ) -> Result<&TranscriptEntry> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::Transcript(format!(
                "refusing to append empty {speaker} entry"
            )));
        }

        tracing::debug!(%speaker, citations = citations.len(), "transcript entry appended");

        self.entries.push(TranscriptEntry {
            speaker,
            text,
            citations,
        });
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// All entries in conversation order
    #[must_use]
    pub fn all(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Iterate entries in conversation order
    pub fn entries(&self) -> impl Iterator<Item = &TranscriptEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
