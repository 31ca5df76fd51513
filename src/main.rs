//! Dunning CLI entry point.
//!
//! Provides `import`, `prompt`, and `generate` subcommands for reviewing a
//! delinquency report, previewing prompts, and drafting the messages.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use dunning::config::Config;
use dunning::credentials::{load_default_credentials, resolve_api_key};
use dunning::messaging::handoff::whatsapp_link;
use dunning::messaging::prompt::{self, format_amount};
use dunning::messaging::Tone;
use dunning::pipeline::{GenerationResult, GenerationStatus, Pipeline, PipelineEvent};
use dunning::providers::gemini::GeminiProvider;
use dunning::records::ingest::{import_csv, IngestOptions};
use dunning::records::{apply_edits, CustomerRecord, RecordEdit};

/// Dunning: drafts WhatsApp collection messages from a delinquency report.
#[derive(Parser)]
#[command(name = "dunning", version, about)]
struct Cli {
    /// Config file (default: ~/.dunning/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write JSON logs to this directory.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Parse a report and list the billable customers.
    Import {
        /// CSV export of the delinquency report.
        report: PathBuf,
        /// Print records as JSON.
        #[arg(long)]
        json: bool,
        /// Correct a record before use: KEY=NAME;AMOUNT, where KEY is the
        /// record id or its row index. Repeatable.
        #[arg(long = "edit", value_name = "KEY=NAME;AMOUNT")]
        edits: Vec<RecordEdit>,
    },
    /// Render the prompts without calling the API.
    Prompt {
        /// CSV export of the delinquency report.
        report: PathBuf,
        /// Message tone: friendly, standard, urgent, negotiation.
        #[arg(long, default_value = "standard")]
        tone: String,
        /// Correct a record before use: KEY=NAME;AMOUNT, where KEY is the
        /// record id or its row index. Repeatable.
        #[arg(long = "edit", value_name = "KEY=NAME;AMOUNT")]
        edits: Vec<RecordEdit>,
    },
    /// Draft one message per customer.
    Generate {
        /// CSV export of the delinquency report.
        report: PathBuf,
        /// Message tone: friendly, standard, urgent, negotiation.
        #[arg(long, default_value = "standard")]
        tone: String,
        /// Print events and results as JSON lines.
        #[arg(long)]
        json: bool,
        /// Correct a record before use: KEY=NAME;AMOUNT, where KEY is the
        /// record id or its row index. Repeatable.
        #[arg(long = "edit", value_name = "KEY=NAME;AMOUNT")]
        edits: Vec<RecordEdit>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _logging_guard = match &cli.log_dir {
        Some(dir) => Some(dunning::logging::init_file(dir)?),
        None => {
            dunning::logging::init_cli();
            None
        }
    };

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Command::Import {
            report,
            json,
            edits,
        } => {
            let records = load_records(&report, &config, &edits)?;
            handle_import(&records, json)
        }
        Command::Prompt {
            report,
            tone,
            edits,
        } => {
            let records = load_records(&report, &config, &edits)?;
            handle_prompt(&records, Tone::from(tone.as_str()));
            Ok(())
        }
        Command::Generate {
            report,
            tone,
            json,
            edits,
        } => {
            let records = load_records(&report, &config, &edits)?;
            if records.is_empty() {
                warn!(report = %report.display(), "no billable customers in report");
                return Ok(());
            }
            handle_generate(records, &config, Tone::from(tone.as_str()), json).await
        }
    }
}

/// Import the report and apply the operator's edits.
fn load_records(
    report: &Path,
    config: &Config,
    edits: &[RecordEdit],
) -> anyhow::Result<Vec<CustomerRecord>> {
    let mut records = import_csv(report, IngestOptions::now(config.import.margin_rate))
        .with_context(|| format!("failed to import {}", report.display()))?;
    apply_edits(&mut records, edits)?;
    Ok(records)
}

/// Print the parsed records.
fn handle_import(records: &[CustomerRecord], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    println!("{} inadimplentes", records.len());
    for record in records {
        println!(
            "{:<24} {:<32} {:>3} parc. {:>4}d  R$ {:>10}  {}",
            record.id,
            record.name,
            record.installments_pending,
            record.days_late,
            format_amount(record.total_due),
            record.phone,
        );
    }
    Ok(())
}

/// Print the rendered prompt for every record.
fn handle_prompt(records: &[CustomerRecord], tone: Tone) {
    for record in records {
        println!("=== {} ({}) [{}]", record.name, record.id, tone.label());
        println!("{}", prompt::render(record, tone));
    }
}

/// Final per-record output with the hand-off link.
#[derive(Serialize)]
struct Drafted<'a> {
    #[serde(flatten)]
    result: &'a GenerationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    whatsapp: Option<String>,
}

/// Run the pipeline and print progress as it happens.
async fn handle_generate(
    records: Vec<CustomerRecord>,
    config: &Config,
    tone: Tone,
    json: bool,
) -> anyhow::Result<()> {
    let credentials = load_default_credentials().context("failed to load credentials")?;
    let api_key = resolve_api_key(&config.gemini, &credentials, |key| std::env::var(key).ok())?;
    let provider =
        GeminiProvider::new(&config.gemini, api_key).context("failed to create Gemini provider")?;
    info!(endpoint = provider.endpoint(), "Gemini provider ready");

    let pipeline = Pipeline::from_config(Arc::new(provider), config);
    let (mut events, handle) = pipeline.spawn(records.clone(), tone);

    loop {
        tokio::select! {
            event = events.next() => {
                let Some(event) = event else { break };
                print_event(&event, &records, json)?;
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted, cancelling generation run");
                break;
            }
        }
    }
    drop(events);

    let report = handle.await.context("generation task panicked")?;

    for result in &report.results {
        let whatsapp = (result.status == GenerationStatus::Done)
            .then(|| phone_of(&records, &result.record_id))
            .flatten()
            .and_then(|phone| whatsapp_link(phone, &result.message));
        if json {
            println!("{}", serde_json::to_string(&Drafted { result, whatsapp: whatsapp.clone() })?);
        } else if let Some(link) = whatsapp {
            println!("{}: {link}", result.customer_name);
        }
    }

    if !json {
        println!(
            "{} mensagens geradas, {} com erro{}",
            report.count(GenerationStatus::Done),
            report.count(GenerationStatus::Error),
            if report.cancelled { " (interrompido)" } else { "" },
        );
    }
    Ok(())
}

fn print_event(event: &PipelineEvent, records: &[CustomerRecord], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }

    let name = records
        .get(event.index)
        .map(|r| r.name.as_str())
        .unwrap_or_default();
    match (&event.status, &event.message) {
        (GenerationStatus::Generating, _) => {
            println!("[{}/{}] {name}: gerando...", event.index.saturating_add(1), records.len());
        }
        (status, Some(message)) => println!("--- {name} ({status})\n{message}\n"),
        (status, None) => println!("--- {name} ({status})"),
    }
    Ok(())
}

fn phone_of<'a>(records: &'a [CustomerRecord], record_id: &str) -> Option<&'a str> {
    records
        .iter()
        .find(|r| r.id == record_id)
        .map(|r| r.phone.as_str())
}
