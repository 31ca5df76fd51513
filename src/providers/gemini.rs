//! Google Gemini provider implementation using the `generateContent` API.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::GeminiConfig;

use super::{check_http_response, ProviderError, TextGenerator};

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// Gemini `generateContent` request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    /// Conversation contents; a single user turn here.
    pub contents: Vec<GeminiContent>,
    /// Sampling parameters.
    pub generation_config: GeminiGenerationConfig,
}

/// A content turn in Gemini format.
#[doc(hidden)]
#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiContent {
    /// Role: "user" or "model". Omitted in some responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content parts.
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

/// A single content part.
#[doc(hidden)]
#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiPart {
    /// Text of the part; non-text parts deserialize with `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Sampling parameters sent with each request.
#[doc(hidden)]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling threshold.
    pub top_p: f32,
}

/// Gemini `generateContent` response body.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct GeminiResponse {
    /// Candidate completions; may be absent when the prompt was blocked.
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

/// A candidate completion.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    /// Generated content.
    #[serde(default)]
    pub content: Option<GeminiContent>,
    /// Why generation stopped.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Request / Response builders (pub for integration testing)
// ---------------------------------------------------------------------------

/// Build a Gemini API request for a single prompt.
#[doc(hidden)]
pub fn build_request(prompt: &str, temperature: f32, top_p: f32) -> GeminiRequest {
    GeminiRequest {
        contents: vec![GeminiContent {
            role: Some("user".to_owned()),
            parts: vec![GeminiPart {
                text: Some(prompt.to_owned()),
            }],
        }],
        generation_config: GeminiGenerationConfig { temperature, top_p },
    }
}

/// Parse a Gemini API response into its text.
///
/// Joins the text parts of the first candidate. A response without
/// candidates or text parts yields an empty string.
///
/// # Errors
///
/// Returns `ProviderError::Parse` if the response cannot be deserialized.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<String, ProviderError> {
    let resp: GeminiResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let text = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    Ok(text)
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Gemini `generateContent` provider.
#[derive(Clone)]
pub struct GeminiProvider {
    model: String,
    endpoint: url::Url,
    api_key: String,
    temperature: f32,
    top_p: f32,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl GeminiProvider {
    /// Create a provider from configuration and an explicit API key.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Unavailable` if the key is empty or the
    /// configured base URL is invalid, and `ProviderError::Request` if the
    /// HTTP client cannot be built.
    pub fn new(config: &GeminiConfig, api_key: String) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::Unavailable(
                "Gemini API key is empty".to_owned(),
            ));
        }

        let endpoint = generate_content_url(&config.base_url, &config.model)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model: config.model.clone(),
            endpoint,
            api_key,
            temperature: config.temperature,
            top_p: config.top_p,
            client,
        })
    }

    /// The fully resolved `generateContent` endpoint.
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }
}

/// Resolve `{base_url}/models/{model}:generateContent`.
///
/// # Errors
///
/// Returns `ProviderError::Unavailable` if the base URL does not parse.
pub fn generate_content_url(base_url: &str, model: &str) -> Result<url::Url, ProviderError> {
    let trimmed = base_url.trim_end_matches('/');
    url::Url::parse(&format!("{trimmed}/models/{model}:generateContent"))
        .map_err(|e| ProviderError::Unavailable(format!("invalid Gemini base URL {base_url:?}: {e}")))
}

// ---------------------------------------------------------------------------
// Trait impl
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
impl TextGenerator for GeminiProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let api_request = build_request(prompt, self.temperature, self.top_p);

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&api_request)
            .send()
            .await?;

        let payload = check_http_response(response).await?;
        parse_response(&payload)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
