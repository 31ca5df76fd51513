//! Drives prompt rendering and retrying generation across a record list.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::messaging::prompt;
use crate::messaging::Tone;
use crate::providers::TextGenerator;
use crate::records::CustomerRecord;

use super::retry::{generate_with_retry, RetryPolicy};
use super::{GenerationResult, GenerationStatus, PipelineEvent};

/// Buffer between the pipeline task and a stream consumer.
///
/// Two events per record are emitted at most once every pacing interval, so
/// a small buffer never stalls the run.
const EVENT_BUFFER: usize = 16;

/// Final snapshot of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// One result per input record, in input order.
    pub results: Vec<GenerationResult>,
    /// Whether the consumer went away before the last record resolved.
    pub cancelled: bool,
}

impl RunReport {
    /// Number of results in the given state.
    pub fn count(&self, status: GenerationStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

/// Sequential generation pipeline.
#[derive(Clone)]
pub struct Pipeline {
    generator: Arc<dyn TextGenerator>,
    retry: RetryPolicy,
    pacing: Duration,
}

impl Pipeline {
    /// Create a pipeline with an explicit retry policy and pacing delay.
    pub fn new(generator: Arc<dyn TextGenerator>, retry: RetryPolicy, pacing: Duration) -> Self {
        Self {
            generator,
            retry,
            pacing,
        }
    }

    /// Create a pipeline with retry and pacing taken from configuration.
    pub fn from_config(generator: Arc<dyn TextGenerator>, config: &Config) -> Self {
        Self::new(
            generator,
            RetryPolicy::from(&config.retry),
            config.pacing.inter_request_delay(),
        )
    }

    /// Run the pipeline over `records`, emitting every state transition on
    /// `events` as it happens.
    ///
    /// Dropping the receiving side cancels the run: the record in flight is
    /// abandoned without a terminal event and left `Pending` in the report,
    /// as are all records after it.
    pub async fn run(
        &self,
        records: &[CustomerRecord],
        tone: Tone,
        events: mpsc::Sender<PipelineEvent>,
    ) -> RunReport {
        let mut results: Vec<GenerationResult> = records
            .iter()
            .map(|record| GenerationResult {
                record_id: record.id.clone(),
                customer_name: record.name.clone(),
                status: GenerationStatus::Pending,
                message: String::new(),
            })
            .collect();

        info!(
            records = records.len(),
            tone = %tone,
            model = self.generator.model_id(),
            "starting generation run"
        );

        let mut cancelled = false;
        for (index, (record, result)) in records.iter().zip(results.iter_mut()).enumerate() {
            if index > 0 && !self.pace(&events).await {
                cancelled = true;
                break;
            }

            if !record.is_billable() {
                warn!(record_id = %record.id, total_due = record.total_due, "record has no amount due");
            }

            result.status = GenerationStatus::Generating;
            if !emit(&events, index, result).await {
                result.status = GenerationStatus::Pending;
                cancelled = true;
                break;
            }

            let prompt_text = prompt::render(record, tone);
            let attempted = tokio::select! {
                attempted = generate_with_retry(
                    self.generator.as_ref(),
                    &prompt_text,
                    &self.retry,
                    &record.id,
                ) => attempted,
                () = events.closed() => {
                    result.status = GenerationStatus::Pending;
                    cancelled = true;
                    break;
                }
            };

            result.status = GenerationStatus::from_text(&attempted.text);
            result.message = attempted.text;
            debug!(
                record_id = %record.id,
                status = %result.status,
                attempts = attempted.attempts,
                "record resolved"
            );

            if !emit(&events, index, result).await {
                cancelled = true;
                break;
            }
        }

        let report = RunReport { results, cancelled };
        if report.cancelled {
            warn!(
                done = report.count(GenerationStatus::Done),
                error = report.count(GenerationStatus::Error),
                "generation run cancelled"
            );
        } else {
            info!(
                done = report.count(GenerationStatus::Done),
                error = report.count(GenerationStatus::Error),
                "generation run finished"
            );
        }
        report
    }

    /// Spawn a run and expose its events as a stream.
    ///
    /// The stream ends after the last event; the join handle yields the
    /// final report. Dropping the stream cancels the run.
    pub fn spawn(
        &self,
        records: Vec<CustomerRecord>,
        tone: Tone,
    ) -> (ReceiverStream<PipelineEvent>, JoinHandle<RunReport>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let pipeline = self.clone();
        let handle = tokio::spawn(async move { pipeline.run(&records, tone, tx).await });
        (ReceiverStream::new(rx), handle)
    }

    /// Wait out the pacing delay. Returns `false` if the consumer went away.
    async fn pace(&self, events: &mpsc::Sender<PipelineEvent>) -> bool {
        tokio::select! {
            () = tokio::time::sleep(self.pacing) => true,
            () = events.closed() => false,
        }
    }
}

/// Send the current state of `result`. Returns `false` if the receiver is gone.
async fn emit(
    events: &mpsc::Sender<PipelineEvent>,
    index: usize,
    result: &GenerationResult,
) -> bool {
    let event = PipelineEvent {
        index,
        record_id: result.record_id.clone(),
        status: result.status,
        message: result
            .status
            .is_terminal()
            .then(|| result.message.clone()),
    };
    events.send(event).await.is_ok()
}
