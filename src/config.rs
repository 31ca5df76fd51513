//! Configuration loading and defaults.
//!
//! Everything has a default, so running without a config file is fine.
//! The file lives at `~/.dunning/config.toml` unless `--config` says otherwise.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Gemini API settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Retry/backoff policy for throttled calls.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Pacing between consecutive records.
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Spreadsheet import settings.
    #[serde(default)]
    pub import: ImportConfig,
}

/// Gemini API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    /// Model name (e.g. "gemini-3-flash-preview").
    #[serde(default = "default_model")]
    pub model: String,

    /// API base URL, without the `/models/...` suffix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable (or `.env` key) holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Nucleus sampling threshold.
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Retry/backoff policy for throttled calls.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Retries after the initial attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff in milliseconds, doubled on each retry.
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    /// Upper bound of the uniform random jitter added to each wait.
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_backoff_ms: default_base_backoff_ms(),
            jitter_ms: default_jitter_ms(),
        }
    }
}

/// Pacing between consecutive records.
#[derive(Debug, Clone, Deserialize)]
pub struct PacingConfig {
    /// Fixed delay between finishing one record and starting the next.
    #[serde(default = "default_inter_request_delay_ms")]
    pub inter_request_delay_ms: u64,
}

impl PacingConfig {
    /// The pacing delay as a [`Duration`].
    pub fn inter_request_delay(&self) -> Duration {
        Duration::from_millis(self.inter_request_delay_ms)
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            inter_request_delay_ms: default_inter_request_delay_ms(),
        }
    }
}

/// Spreadsheet import settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    /// Margin applied to the sheet total before quoting (0.05 = 5%).
    #[serde(default = "default_margin_rate")]
    pub margin_rate: f64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            margin_rate: default_margin_rate(),
        }
    }
}

// Default value functions for serde

fn default_model() -> String {
    "gemini-3-flash-preview".to_owned()
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_owned()
}
fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_owned()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_top_p() -> f32 {
    0.9
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    5
}
fn default_base_backoff_ms() -> u64 {
    4000
}
fn default_jitter_ms() -> u64 {
    1000
}
fn default_inter_request_delay_ms() -> u64 {
    2000
}
fn default_margin_rate() -> f64 {
    0.05
}

impl Config {
    /// Load configuration from `path`, or from the default location when
    /// `path` is `None`.
    ///
    /// A missing file at the default location yields defaults; a missing
    /// file that was asked for explicitly is an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = path {
            return load_config(path);
        }

        let default_path = config_dir()?.join("config.toml");
        if !default_path.exists() {
            tracing::debug!(path = %default_path.display(), "no config file found, using defaults");
            return Ok(Self::default());
        }
        load_config(&default_path)
    }
}

/// Load the configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config at {}: {e}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config at {}: {e}", path.display()))?;
    tracing::info!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Resolve the default config directory (`~/.dunning/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".dunning"))
}
