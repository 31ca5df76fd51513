//! Delinquency report import.
//!
//! The report is a CSV export of the store's spreadsheet. The first row is a
//! header; data rows use fixed column positions:
//!
//! | column | field                 | default              |
//! |--------|-----------------------|----------------------|
//! | 1      | customer name         | `"Cliente Sem Nome"` |
//! | 3      | phone                 | empty                |
//! | 4      | installments pending  | 1                    |
//! | 5      | days late             | 0                    |
//! | 8      | original total        | 0                    |
//!
//! Rows whose original total is not positive are dropped.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{clean_name, digits_only, parse_count, parse_number, CustomerRecord};

const COL_NAME: usize = 1;
const COL_PHONE: usize = 3;
const COL_INSTALLMENTS: usize = 4;
const COL_DAYS_LATE: usize = 5;
const COL_TOTAL: usize = 8;

const UNNAMED_CUSTOMER: &str = "Cliente Sem Nome";

/// Errors raised while importing a report.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The file could not be read.
    #[error("failed to read report {path}: {source}")]
    Io {
        /// Report path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The CSV structure is malformed.
    #[error("malformed report: {0}")]
    Csv(#[from] csv::Error),
}

/// Options controlling how rows become records.
#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    /// Margin applied to the original total (0.05 = 5%).
    pub margin_rate: f64,
    /// Batch stamp embedded in record ids (unix millis at import time).
    pub batch_stamp: i64,
}

impl IngestOptions {
    /// Options stamped with the current time.
    pub fn now(margin_rate: f64) -> Self {
        Self {
            margin_rate,
            batch_stamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Import a report file.
///
/// # Errors
///
/// Returns [`IngestError`] when the file cannot be read or is not valid CSV.
pub fn import_csv(path: &Path, options: IngestOptions) -> Result<Vec<CustomerRecord>, IngestError> {
    let contents = fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = parse_csv(&contents, options)?;
    info!(
        path = %path.display(),
        records = records.len(),
        "imported delinquency report"
    );
    Ok(records)
}

/// Parse report contents already in memory.
///
/// The delimiter is `;` when the header line has more semicolons than
/// commas (the default for spreadsheet exports in pt-BR locales), `,`
/// otherwise.
///
/// # Errors
///
/// Returns [`IngestError::Csv`] when a row cannot be decoded.
pub fn parse_csv(contents: &str, options: IngestOptions) -> Result<Vec<CustomerRecord>, IngestError> {
    let delimiter = detect_delimiter(contents.lines().next().unwrap_or_default());
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(contents.as_bytes());

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row?;
        let fields: Vec<&str> = row.iter().collect();
        match record_from_row(index, &fields, options) {
            Some(record) => records.push(record),
            None => debug!(row = index, "skipping row without a positive total"),
        }
    }
    Ok(records)
}

/// Map one data row to a record.
///
/// `index` is the zero-based data row index (header excluded) and is part of
/// the id, so ids stay stable regardless of which rows get filtered.
/// Returns `None` when the original total is not positive.
pub fn record_from_row(
    index: usize,
    fields: &[&str],
    options: IngestOptions,
) -> Option<CustomerRecord> {
    let cell = |col: usize| fields.get(col).map(|s| s.trim()).unwrap_or_default();

    let original_total = parse_number(cell(COL_TOTAL)).unwrap_or(0.0);
    if original_total <= 0.0 {
        return None;
    }

    let raw_name = cell(COL_NAME);
    let name = if raw_name.is_empty() {
        UNNAMED_CUSTOMER.to_owned()
    } else {
        clean_name(raw_name)
    };

    let installments_pending = count_or(cell(COL_INSTALLMENTS), 1, index, "installments").max(1);
    let days_late = count_or(cell(COL_DAYS_LATE), 0, index, "days_late");

    Some(CustomerRecord {
        id: format!("CL-{index}-{}", options.batch_stamp),
        name,
        installments_pending,
        days_late,
        total_due: apply_margin(original_total, options.margin_rate),
        original_total,
        phone: digits_only(cell(COL_PHONE)),
    })
}

/// Apply the margin and round up to a whole currency unit.
///
/// The product is rounded to cents first so binary noise
/// (`100 * 1.05 = 105.00000000000001`) does not push it up a whole unit.
/// A plain `ceil(total * 1.05)`, as the store's previous spreadsheet tool
/// computed it, quotes 106 for a total of 100; this quotes 105. Totals whose
/// margin-adjusted value has no such noise round identically either way.
pub fn apply_margin(original_total: f64, margin_rate: f64) -> f64 {
    let with_margin = original_total * (1.0 + margin_rate);
    ((with_margin * 100.0).round() / 100.0).ceil()
}

fn count_or(raw: &str, default: u32, row: usize, field: &str) -> u32 {
    if raw.is_empty() {
        return default;
    }
    parse_count(raw).unwrap_or_else(|| {
        warn!(row, field, value = raw, "unreadable count, using default");
        default
    })
}

fn detect_delimiter(header: &str) -> u8 {
    let semicolons = header.matches(';').count();
    let commas = header.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}
