//! Customer records: the unit of work fed to the generation pipeline.
//!
//! Records come from the delinquency spreadsheet ([`ingest`]) and may be
//! corrected by the operator ([`RecordEdit`], [`apply_edits`]) before a run.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

pub mod ingest;

/// Identity and billing facts for one delinquent account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    /// Opaque identifier, unique for the session.
    pub id: String,
    /// Display name, cleaned of trailing qualifiers.
    pub name: String,
    /// Outstanding installments (always at least 1).
    pub installments_pending: u32,
    /// Days past due.
    pub days_late: u32,
    /// Margin-adjusted amount quoted to the customer.
    pub total_due: f64,
    /// Sheet total before the margin was applied.
    pub original_total: f64,
    /// Digits-only phone number; empty when unknown.
    pub phone: String,
}

impl CustomerRecord {
    /// Apply an operator correction of name and amount.
    ///
    /// The name is cleaned the same way as on import. An amount that does
    /// not parse becomes `0`, which keeps the record visible so the operator
    /// notices it.
    pub fn apply_edit(&mut self, name: &str, amount: &str) {
        self.name = clean_name(name);
        self.total_due = parse_number(amount).unwrap_or(0.0);
    }

    /// Whether the record may enter the pipeline.
    pub fn is_billable(&self) -> bool {
        self.total_due > 0.0
    }

    /// Whether `key` names this record: either its full id or its data-row
    /// index (the `N` in `CL-N-<stamp>`). Ids carry a per-import stamp, so the
    /// row index is the stable handle across invocations.
    pub fn matches_key(&self, key: &str) -> bool {
        self.id == key
            || self
                .id
                .strip_prefix("CL-")
                .and_then(|rest| rest.split_once('-'))
                .is_some_and(|(row, _)| row == key)
    }
}

/// Errors raised while parsing or applying operator edits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    /// The edit is not `KEY=NAME;AMOUNT`.
    #[error("edit {0:?} must look like KEY=NAME;AMOUNT")]
    Malformed(String),
    /// No record matches the key.
    #[error("no record matches edit key {0:?}")]
    UnknownKey(String),
}

/// An operator correction of one record's name and amount.
///
/// Parsed from `KEY=NAME;AMOUNT`, e.g. `3=MARIA SANTOS;150,50`. The amount
/// is split off at the last `;`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEdit {
    /// Record id or data-row index, see [`CustomerRecord::matches_key`].
    pub key: String,
    /// Replacement name, cleaned like an imported one.
    pub name: String,
    /// Replacement amount text; unparseable text becomes `0`.
    pub amount: String,
}

impl FromStr for RecordEdit {
    type Err = EditError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let malformed = || EditError::Malformed(raw.to_owned());
        let (key, rest) = raw.split_once('=').ok_or_else(malformed)?;
        let (name, amount) = rest.rsplit_once(';').ok_or_else(malformed)?;
        let key = key.trim();
        if key.is_empty() {
            return Err(malformed());
        }
        Ok(Self {
            key: key.to_owned(),
            name: name.to_owned(),
            amount: amount.to_owned(),
        })
    }
}

/// Apply `edits` in order to the first record each one matches.
///
/// # Errors
///
/// Returns [`EditError::UnknownKey`] for an edit that matches no record;
/// edits before it have already been applied.
pub fn apply_edits(records: &mut [CustomerRecord], edits: &[RecordEdit]) -> Result<(), EditError> {
    for edit in edits {
        let record = records
            .iter_mut()
            .find(|record| record.matches_key(&edit.key))
            .ok_or_else(|| EditError::UnknownKey(edit.key.clone()))?;
        record.apply_edit(&edit.name, &edit.amount);
        info!(
            record_id = %record.id,
            name = %record.name,
            total_due = record.total_due,
            "applied operator edit"
        );
    }
    Ok(())
}

/// Strip trailing qualifiers from a spreadsheet name.
///
/// The report appends contract or branch info after a dash
/// (`"MARIA SILVA - LOJA 2"`); only the part before the first `-` is kept.
pub fn clean_name(raw: &str) -> String {
    raw.split('-').next().unwrap_or_default().trim().to_owned()
}

/// Keep only ASCII digits of a phone number.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Parse a number written either with `.` or with Brazilian `,` decimals.
///
/// Accepts `1234.56`, `1234,56`, `1.234,56` and an optional `R$` prefix.
/// Returns `None` for blank or non-numeric input.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix("R$").unwrap_or(trimmed).trim();
    if trimmed.is_empty() {
        return None;
    }

    let normalized = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.to_owned()
    };

    normalized.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Parse a non-negative whole count such as installments or days late.
///
/// Spreadsheet exports sometimes render integers as `3.0`; those are
/// accepted. Negative, fractional or oversized values yield `None`.
pub fn parse_count(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if let Ok(count) = trimmed.parse::<u32>() {
        return Some(count);
    }

    let value = parse_number(trimmed)?;
    if value < 0.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = value as u32;
    Some(count)
}
