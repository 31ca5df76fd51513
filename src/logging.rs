//! Tracing setup for the CLI.
//!
//! Logs always go to stderr so stdout carries only reports, prompts and
//! drafted messages. With `--log-dir`, a daily-rotated JSON file is added,
//! leaving an audit trail of every throttled call and retry.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// File name prefix of the rotated log files.
const LOG_FILE_PREFIX: &str = "dunning.log";

/// Keeps the background file writer alive; dropping it flushes the log.
pub struct LoggingGuard {
    _writer: WorkerGuard,
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn console_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
}

/// Console logging plus JSON lines in `{logs_dir}/dunning.log.YYYY-MM-DD`.
///
/// # Errors
///
/// Returns an error if `logs_dir` cannot be created.
pub fn init_file(logs_dir: &Path) -> anyhow::Result<LoggingGuard> {
    std::fs::create_dir_all(logs_dir)
        .map_err(|e| anyhow::anyhow!("cannot create log directory {}: {e}", logs_dir.display()))?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX));

    tracing_subscriber::registry()
        .with(filter())
        .with(console_layer())
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_writer(writer),
        )
        .init();

    Ok(LoggingGuard { _writer: guard })
}

/// Console logging only. `RUST_LOG` overrides the `info` default.
pub fn init_cli() {
    tracing_subscriber::registry()
        .with(filter())
        .with(console_layer())
        .init();
}
