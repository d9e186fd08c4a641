//! Gemini `generateContent` client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{AssistantClient, AssistantReply, DEFAULT_SYSTEM_INSTRUCTION, tools};
use crate::transcript::Citation;
use crate::{Error, Result};

/// Default model identifier
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default Generative Language API endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini client settings
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key sent as `x-goog-api-key`
    pub api_key: String,
    /// Model identifier
    pub model: String,
    /// API base URL (overridable for proxies and tests)
    pub base_url: String,
    /// Offer Google Search grounding alongside the function tools
    pub grounding: bool,
    /// System instruction
    pub system_instruction: String,
}

impl GeminiConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            grounding: true,
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub const fn with_grounding(mut self, grounding: bool) -> Self {
        self.grounding = grounding;
        self
    }

    #[must_use]
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }
}

/// Talks to the Gemini API
pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: Content<'a>,
    tools: Vec<Value>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    function_call: Option<FunctionCallPart>,
}

#[derive(Debug, Deserialize)]
struct FunctionCallPart {
    name: String,
    #[serde(default)]
    args: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    uri: String,
    title: Option<String>,
}

impl GeminiClient {
    /// Create a new Gemini client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::Config(
                "Gemini API key required (set GEMINI_API_KEY)".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            config,
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn build_request<'a>(&'a self, prompt: &'a str) -> GenerateRequest<'a> {
        let mut offered = Vec::with_capacity(2);
        if self.config.grounding {
            offered.push(json!({ "googleSearch": {} }));
        }
        offered.push(json!({ "functionDeclarations": tools::function_declarations() }));

        GenerateRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![TextPart { text: prompt }],
            }],
            system_instruction: Content {
                role: None,
                parts: vec![TextPart {
                    text: &self.config.system_instruction,
                }],
            },
            tools: offered,
        }
    }
}

/// Normalize a raw response into a reply
///
/// The first function call wins over any text; text parts are concatenated.
fn into_reply(response: GenerateResponse) -> Result<AssistantReply> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::Assistant("response contained no candidates".to_string()))?;

    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();

    let mut text = String::new();
    for part in parts {
        if let Some(call) = part.function_call {
            tracing::debug!(name = %call.name, "assistant requested function call");
            return Ok(AssistantReply::FunctionCall {
                name: call.name,
                args: call.args,
            });
        }
        if let Some(t) = part.text {
            text.push_str(&t);
        }
    }

    let citations = candidate
        .grounding_metadata
        .map(|g| g.grounding_chunks)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|chunk| chunk.web)
        .map(|web| Citation::new(web.uri, web.title))
        .collect();

    Ok(AssistantReply::PlainText { text, citations })
}

#[async_trait]
impl AssistantClient for GeminiClient {
    async fn send(&self, prompt: &str) -> Result<AssistantReply> {
        tracing::debug!(model = %self.config.model, prompt_len = prompt.len(), "sending prompt");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Gemini request failed");
                Error::Assistant(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Gemini API error");
            return Err(Error::Assistant(format!("Gemini API error {status}: {body}")));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse Gemini response");
            Error::Assistant(e.to_string())
        })?;

        into_reply(parsed)
    }
}
