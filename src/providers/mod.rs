//! Text-generation provider abstraction.
//!
//! Defines the [`TextGenerator`] trait the pipeline drives, the shared
//! [`ProviderError`] type, and the rate-limit classification used by the
//! retry controller.
//!
//! One provider is implemented:
//! - [`gemini::GeminiProvider`]: Google Gemini `generateContent` API

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

pub mod gemini;

/// Substrings in an error's text that indicate throttling.
const RATE_LIMIT_MARKERS: [&str; 4] = ["429", "RESOURCE_EXHAUSTED", "quota", "Too Many Requests"];

/// HTTP status code for "Too Many Requests".
const TOO_MANY_REQUESTS: u16 = 429;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Structured error object returned by Google APIs.
///
/// Wire shape: `{"error": {"code": 429, "status": "RESOURCE_EXHAUSTED", "message": "..."}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiErrorDetail {
    /// Numeric error code (usually mirrors the HTTP status).
    #[serde(default)]
    pub code: Option<i64>,
    /// Canonical status string, e.g. `RESOURCE_EXHAUSTED`.
    #[serde(default)]
    pub status: Option<String>,
    /// Human-readable description.
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorDetail,
}

impl ApiErrorDetail {
    /// Parse the structured error object out of a raw response body.
    ///
    /// Returns `None` if the body is not a Google-style error envelope.
    pub fn from_body(body: &str) -> Option<Self> {
        serde_json::from_str::<ApiErrorEnvelope>(body)
            .ok()
            .map(|envelope| envelope.error)
    }
}

/// Why a generation call failed.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The request never produced a response (connect, TLS, timeout).
    #[error("generation request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// A success response whose body is not the expected JSON.
    #[error("unexpected generation response: {0}")]
    Parse(String),
    /// The service answered with a non-2xx status.
    #[error("generation service returned {status}: {body}")]
    HttpStatus {
        /// Status code of the response.
        status: u16,
        /// Structured error object, when the body carried one.
        detail: Option<ApiErrorDetail>,
        /// Response body, with secrets redacted and length capped.
        body: String,
    },
    /// The generator is misconfigured and cannot be called.
    #[error("generator unavailable: {0}")]
    Unavailable(String),
}

/// Outcome class of a failed generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The service rejected the call because of request volume or quota.
    RateLimited,
    /// Anything else: auth, network, malformed response.
    Other,
}

impl ProviderError {
    /// Explicit HTTP status carried by the error, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::Request(err) => err.status().map(|s| s.as_u16()),
            Self::Parse(_) | Self::Unavailable(_) => None,
        }
    }

    /// Structured error object carried by the error, if any.
    pub fn detail(&self) -> Option<&ApiErrorDetail> {
        match self {
            Self::HttpStatus { detail, .. } => detail.as_ref(),
            Self::Request(_) | Self::Parse(_) | Self::Unavailable(_) => None,
        }
    }

    /// Classify this error as throttling or a generic failure.
    ///
    /// Checks, in order: the explicit HTTP status, the structured error
    /// code/status, then rate-limit markers in text the service or the
    /// transport reported (response body, `detail.message`, transport error).
    /// The first positive check wins; if none match the failure is
    /// [`FailureKind::Other`]. `Parse` and `Unavailable` carry only text this
    /// crate produced and never match a marker.
    pub fn failure_kind(&self) -> FailureKind {
        if self.http_status() == Some(TOO_MANY_REQUESTS) {
            return FailureKind::RateLimited;
        }

        if let Some(detail) = self.detail() {
            if detail.code == Some(i64::from(TOO_MANY_REQUESTS))
                || detail.status.as_deref() == Some("RESOURCE_EXHAUSTED")
            {
                return FailureKind::RateLimited;
            }
        }

        let has_marker = |text: &str| RATE_LIMIT_MARKERS.iter().any(|marker| text.contains(marker));
        let reported = match self {
            Self::HttpStatus { body, detail, .. } => {
                has_marker(body)
                    || detail
                        .as_ref()
                        .and_then(|d| d.message.as_deref())
                        .is_some_and(has_marker)
            }
            Self::Request(err) => has_marker(&err.to_string()),
            // Locally generated text (serde positions, config messages).
            Self::Parse(_) | Self::Unavailable(_) => false,
        };
        if reported {
            FailureKind::RateLimited
        } else {
            FailureKind::Other
        }
    }

    /// Whether the retry controller should back off and try again.
    pub fn is_rate_limited(&self) -> bool {
        self.failure_kind() == FailureKind::RateLimited
    }
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// Longest error body kept in a [`ProviderError::HttpStatus`].
const MAX_ERROR_BODY_CHARS: usize = 256;

/// Google API keys (`AIza...`) and OAuth access tokens (`ya29.`...).
static SECRET_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"AIza[A-Za-z0-9_\-]{20,}|ya29\.[A-Za-z0-9_\-\.]{20,}").ok());

/// Read a response body, turning non-2xx statuses into
/// [`ProviderError::HttpStatus`].
///
/// The structured error object is parsed from the raw body, before
/// redaction and truncation, so a long body never hides the error code.
///
/// # Errors
///
/// `Request` if the body cannot be read, `HttpStatus` on a non-2xx status.
pub async fn check_http_response(response: reqwest::Response) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        return Ok(body);
    }
    Err(ProviderError::HttpStatus {
        status: status.as_u16(),
        detail: ApiErrorDetail::from_body(&body),
        body: redact_error_body(&body),
    })
}

fn redact_error_body(raw: &str) -> String {
    let single_line = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let redacted = match SECRET_PATTERN.as_ref() {
        Some(pattern) => pattern.replace_all(&single_line, "[REDACTED]").into_owned(),
        None => single_line,
    };

    match redacted.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((cut, _)) => format!("{}...[truncated]", &redacted[..cut]),
        None => redacted,
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A single-shot text generation service.
///
/// Implementations must be `Send + Sync` so the pipeline can hold them
/// behind an `Arc` across await points.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for a fully rendered prompt.
    ///
    /// An empty string is a valid (if unhelpful) success.
    ///
    /// # Errors
    ///
    /// Any failure; callers classify it with [`ProviderError::failure_kind`].
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;

    /// The model identifier string this generator is instantiated for.
    fn model_id(&self) -> &str;
}
