//! Sequential message-generation pipeline.
//!
//! For each record, in input order: render the prompt, call the generator
//! with rate-limit-aware retry ([`retry`]), classify the outcome and emit it
//! before moving on. Records are paced by a fixed delay and never overlap
//! ([`orchestrator`]).

use serde::Serialize;

pub mod orchestrator;
pub mod retry;

pub use orchestrator::{Pipeline, RunReport};
pub use retry::{Attempted, RetryPolicy};

/// Marker prefix of every terminal error message.
pub const ERROR_PREFIX: &str = "Erro:";

/// Message when throttling outlasted the retry budget.
pub const QUOTA_EXCEEDED_MESSAGE: &str =
    "Erro: Limite de cota da API excedido. Aguarde um minuto e tente novamente.";

/// Message for any non-throttling failure.
pub const GENERIC_FAILURE_MESSAGE: &str = "Erro: Falha na IA. Tente gerar novamente.";

/// Text used when the service succeeds but returns nothing.
///
/// Replaces both an empty reply and a whitespace-only one, so a `done`
/// result never carries a blank message. Lacks [`ERROR_PREFIX`]: an empty
/// answer is a success.
pub const EMPTY_RESPONSE_FALLBACK: &str = "Erro ao gerar mensagem de cobrança SUPERMODA.";

/// Lifecycle state of one record's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    /// Not started yet.
    Pending,
    /// Generation (including retries) in progress.
    Generating,
    /// Message drafted.
    Done,
    /// Terminal failure; the message explains why.
    Error,
}

impl GenerationStatus {
    /// Classify the text returned by the retry controller.
    pub fn from_text(text: &str) -> Self {
        if text.starts_with(ERROR_PREFIX) {
            Self::Error
        } else {
            Self::Done
        }
    }

    /// Whether no further transitions can happen.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

impl std::fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Generating => "generating",
            Self::Done => "done",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// Generated message for one customer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationResult {
    /// Id of the originating record.
    pub record_id: String,
    /// Customer display name.
    pub customer_name: String,
    /// Current lifecycle state.
    pub status: GenerationStatus,
    /// Message body when done, diagnostic when errored, empty otherwise.
    pub message: String,
}

/// A state transition of one record, emitted as it happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineEvent {
    /// Position of the record in the input list.
    pub index: usize,
    /// Id of the record.
    pub record_id: String,
    /// New state.
    pub status: GenerationStatus,
    /// Message for terminal states.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
