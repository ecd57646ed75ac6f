//! Claude API adapter
//!
//! Anthropic Messages API with a fixed assistant system prompt.

use super::traits::*;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const PROVIDER: &str = "claude";
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const MAX_TOKENS: usize = 2048;

const SYSTEM_PROMPT: &str = "You are an AI executive assistant. Follow the output format \
requested in each message exactly.";

/// Message in conversation
#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

/// API request
#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    system: &'static str,
    messages: Vec<Message<'a>>,
}

/// API response
#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    r#type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: usize,
    output_tokens: usize,
}

impl MessageResponse {
    fn text(self) -> String {
        self.content
            .into_iter()
            .filter_map(|b| if b.r#type == "text" { b.text } else { None })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Claude API client
#[derive(Clone)]
pub struct ClaudeClient {
    client: Client,
    api_key: String,
    model: String,
}

impl ClaudeClient {
    pub fn new(client: Client, api_key: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }
}

#[async_trait]
impl LanguageModelCapability for ClaudeClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn complete(&self, prompt: &str) -> Result<String, UpstreamError> {
        let request = MessageRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system: SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        debug!("Calling Claude API: model={}, prompt_len={}", self.model, prompt.len());

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| UpstreamError::request(PROVIDER, e))?;

        if !response.status().is_success() {
            let err = UpstreamError::from_response(PROVIDER, response).await;
            warn!("Claude API error: {}", err);
            return Err(err);
        }

        let result: MessageResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::body(PROVIDER, e))?;

        if let Some(usage) = &result.usage {
            info!(
                "Claude response: model={}, in={}, out={}",
                self.model, usage.input_tokens, usage.output_tokens
            );
        }

        let text = result.text();
        if text.trim().is_empty() {
            return Err(UpstreamError::Empty { provider: PROVIDER });
        }
        Ok(text)
    }
}
