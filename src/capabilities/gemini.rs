//! Gemini adapter
//!
//! `generateContent` with a single user turn; the first part of the first
//! candidate is the completion.

use super::traits::*;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const PROVIDER: &str = "gemini";
const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<ContentRequest<'a>>,
}

#[derive(Debug, Serialize)]
struct ContentRequest<'a> {
    parts: Vec<PartRequest<'a>>,
}

#[derive(Debug, Serialize)]
struct PartRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

/// Gemini client
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(client: Client, api_key: &str, model: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    /// The key travels in a header so it never appears in a URL
    fn generate_request(&self, request: &GenerateRequest<'_>) -> RequestBuilder {
        self.client
            .post(format!("{}/{}:generateContent", GEMINI_API_URL, self.model))
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
    }
}

#[async_trait]
impl LanguageModelCapability for GeminiClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn complete(&self, prompt: &str) -> Result<String, UpstreamError> {
        let request = GenerateRequest {
            contents: vec![ContentRequest {
                parts: vec![PartRequest { text: prompt }],
            }],
        };

        debug!("Calling Gemini: model={}, prompt_len={}", self.model, prompt.len());

        let response = self
            .generate_request(&request)
            .send()
            .await
            .map_err(|e| UpstreamError::request(PROVIDER, e))?;

        if !response.status().is_success() {
            let err = UpstreamError::from_response(PROVIDER, response).await;
            warn!("Gemini call failed: {}", err);
            return Err(err);
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::body(PROVIDER, e))?;

        let text = result
            .into_text()
            .ok_or(UpstreamError::Empty { provider: PROVIDER })?;

        info!("Gemini response: model={}, len={}", self.model, text.len());
        Ok(text)
    }
}
