//! Gemini API key lookup.
//!
//! The key may live in `~/.dunning/.env` (owner-only) or in the process
//! environment. It is resolved once by the binary and handed to the
//! provider constructor; nothing below the CLI reads the environment.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::config::{config_dir, GeminiConfig};

/// Key-value pairs read from a `.env` file.
#[derive(Clone, Default)]
pub struct Credentials {
    entries: BTreeMap<String, String>,
    source: Option<PathBuf>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("source", &self.source)
            .field("names", &self.entries.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Credentials {
    /// Credentials backed by an in-memory map.
    pub fn from_map(entries: BTreeMap<String, String>) -> Self {
        Self {
            entries,
            source: None,
        }
    }

    /// Value for `name`, ignoring blank entries.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }
}

/// Read a `.env` file.
///
/// # Errors
///
/// Fails when the file is missing, readable by group or others, or not
/// valid dotenv syntax.
pub fn load_credentials(path: &Path) -> anyhow::Result<Credentials> {
    let metadata = fs::metadata(path)
        .with_context(|| format!("cannot open credentials file {}", path.display()))?;
    ensure_owner_only(path, &metadata)?;

    let entries = dotenvy::from_path_iter(path)
        .with_context(|| format!("cannot read credentials file {}", path.display()))?
        .collect::<Result<BTreeMap<_, _>, _>>()
        .with_context(|| format!("malformed line in credentials file {}", path.display()))?;

    debug!(path = %path.display(), entries = entries.len(), "credentials file loaded");
    Ok(Credentials {
        entries,
        source: Some(path.to_path_buf()),
    })
}

/// Read `~/.dunning/.env`; a missing file means no credentials.
///
/// # Errors
///
/// Fails when the home directory is unknown or the file exists but is
/// unusable.
pub fn load_default_credentials() -> anyhow::Result<Credentials> {
    let path = config_dir()?.join(".env");
    match fs::metadata(&path) {
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no credentials file, relying on environment");
            Ok(Credentials::default())
        }
        _ => load_credentials(&path),
    }
}

/// Resolve the Gemini API key named by `gemini.api_key_env`.
///
/// The `.env` file takes precedence over the environment, which is read
/// through `env` so callers (and tests) control the lookup.
///
/// # Errors
///
/// Fails, naming the variable, when neither source has a non-blank value.
pub fn resolve_api_key(
    gemini: &GeminiConfig,
    credentials: &Credentials,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<String> {
    let name = gemini.api_key_env.as_str();

    if let Some(value) = credentials.get(name) {
        debug!(var = name, "API key taken from credentials file");
        return Ok(value.to_owned());
    }

    let from_env = env(name).filter(|value| !value.trim().is_empty());
    if from_env.is_some() {
        debug!(var = name, "API key taken from environment");
    }
    from_env.ok_or_else(|| {
        anyhow::anyhow!("missing Gemini API key: set {name} in the environment or in ~/.dunning/.env")
    })
}

#[cfg(unix)]
fn ensure_owner_only(path: &Path, metadata: &fs::Metadata) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode() & 0o777;
    anyhow::ensure!(
        mode & 0o077 == 0,
        "credentials file {} must be 0600 (found {mode:o}); run `chmod 600` on it",
        path.display()
    );
    Ok(())
}

#[cfg(not(unix))]
fn ensure_owner_only(_path: &Path, _metadata: &fs::Metadata) -> anyhow::Result<()> {
    Ok(())
}
