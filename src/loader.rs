// 📥 Record Loader - CSV → typed records
//
// One generic reader loop, two schemas:
//   system: trx_id,amount,type,timestamp   (timestamp: YYYY-MM-DD HH:MM:SS)
//   bank:   unique_id,amount,date          (date: YYYY-MM-DD)
//
// Leniency policy: the header row is mandatory, everything after it is
// best-effort. A malformed row is skipped and counted, never fatal.

use crate::error::ReconError;
use crate::money::Money;
use crate::transaction::{BankTransaction, SystemTransaction, TransactionType};
use crate::window::{parse_date_exact, parse_datetime_exact, DateWindow};
use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const SYSTEM_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const BANK_DATE_FORMAT: &str = "%Y-%m-%d";

/// Prefix for labels derived from uploaded statement file names
pub const STATEMENT_LABEL_PREFIX: &str = "Stmt-";

// ============================================================================
// CORE TYPES
// ============================================================================

/// Records loaded from one source plus what was dropped on the way
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadOutcome<T> {
    pub records: Vec<T>,

    /// Rows that could not become a record (bad timestamp, too few columns, bad CSV)
    pub skipped_rows: usize,

    /// Well-formed rows outside the date window
    pub out_of_window: usize,
}

impl<T> Default for LoadOutcome<T> {
    fn default() -> Self {
        LoadOutcome {
            records: Vec::new(),
            skipped_rows: 0,
            out_of_window: 0,
        }
    }
}

/// What happened to a single data row
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome<T> {
    Keep(T),
    OutOfWindow,
    Malformed,
}

/// RecordSchema - maps one CSV row to one typed record
///
/// Implemented once per source layout. The reader loop, header handling and
/// skip accounting live in `load_with`.
pub trait RecordSchema {
    type Record;

    /// Human-readable source name used in error context
    fn source_name(&self) -> &str;

    fn parse_row(&self, row: &StringRecord) -> RowOutcome<Self::Record>;
}

// ============================================================================
// SCHEMAS
// ============================================================================

/// trx_id,amount,type,timestamp
pub struct SystemSchema {
    pub window: DateWindow,
}

impl RecordSchema for SystemSchema {
    type Record = SystemTransaction;

    fn source_name(&self) -> &str {
        "system ledger"
    }

    fn parse_row(&self, row: &StringRecord) -> RowOutcome<SystemTransaction> {
        let (Some(id), Some(amount), Some(kind), Some(timestamp)) =
            (row.get(0), row.get(1), row.get(2), row.get(3))
        else {
            return RowOutcome::Malformed;
        };

        let Some(timestamp) = parse_datetime_exact(timestamp, SYSTEM_TIME_FORMAT) else {
            return RowOutcome::Malformed;
        };

        if !self.window.contains(timestamp) {
            return RowOutcome::OutOfWindow;
        }

        RowOutcome::Keep(SystemTransaction {
            id: id.to_string(),
            amount: Money::parse(amount).unwrap_or(Money::ZERO),
            kind: TransactionType::parse_lenient(kind),
            timestamp,
        })
    }
}

/// unique_id,amount,date
pub struct BankSchema {
    pub bank_label: String,
    pub window: DateWindow,
}

impl RecordSchema for BankSchema {
    type Record = BankTransaction;

    fn source_name(&self) -> &str {
        &self.bank_label
    }

    fn parse_row(&self, row: &StringRecord) -> RowOutcome<BankTransaction> {
        let (Some(external_id), Some(amount), Some(date)) = (row.get(0), row.get(1), row.get(2)) else {
            return RowOutcome::Malformed;
        };

        let Some(date) = parse_date_exact(date, BANK_DATE_FORMAT) else {
            return RowOutcome::Malformed;
        };

        if !self.window.contains_date(date) {
            return RowOutcome::OutOfWindow;
        }

        RowOutcome::Keep(BankTransaction {
            bank_label: self.bank_label.clone(),
            external_id: external_id.to_string(),
            amount: Money::parse(amount).unwrap_or(Money::ZERO),
            date,
        })
    }
}

// ============================================================================
// LOADING
// ============================================================================

/// Read every row of `reader` through `schema`.
///
/// Fails only when the header cannot be read (empty source, IO error) or
/// when the underlying reader fails mid-stream.
pub fn load_with<S, R>(schema: &S, reader: R) -> Result<LoadOutcome<S::Record>>
where
    S: RecordSchema,
    R: Read,
{
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut rows = csv_reader.records();

    // The header fixes the column count for every row after it
    let header_len = match rows.next() {
        None => return Err(ReconError::EmptySource.into()),
        Some(Err(e)) => {
            return Err(e).with_context(|| format!("Failed to read header row of {}", schema.source_name()));
        }
        Some(Ok(header)) => header.len(),
    };

    let mut outcome = LoadOutcome::default();

    for (index, result) in rows.enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) if e.is_io_error() => {
                return Err(e).with_context(|| {
                    format!("Failed to read line {} of {}", index + 2, schema.source_name())
                });
            }
            Err(_) => {
                outcome.skipped_rows += 1;
                continue;
            }
        };

        if row.len() != header_len {
            outcome.skipped_rows += 1;
            continue;
        }

        match schema.parse_row(&row) {
            RowOutcome::Keep(record) => outcome.records.push(record),
            RowOutcome::OutOfWindow => outcome.out_of_window += 1,
            RowOutcome::Malformed => outcome.skipped_rows += 1,
        }
    }

    Ok(outcome)
}

/// Load the internal ledger export
pub fn load_system_transactions<R: Read>(reader: R, window: DateWindow) -> Result<LoadOutcome<SystemTransaction>> {
    load_with(&SystemSchema { window }, reader)
}

/// Load one bank statement export, tagging every record with `bank_label`
pub fn load_bank_statement<R: Read>(
    reader: R,
    bank_label: &str,
    window: DateWindow,
) -> Result<LoadOutcome<BankTransaction>> {
    let schema = BankSchema {
        bank_label: bank_label.to_string(),
        window,
    };
    load_with(&schema, reader)
}

/// "Stmt-<file name>" label for an uploaded statement
pub fn statement_label(file_name: &str) -> String {
    format!("{}{}", STATEMENT_LABEL_PREFIX, file_name)
}

/// Open a statement from disk; label is derived from the file name
pub fn load_bank_file(path: &Path, window: DateWindow) -> Result<LoadOutcome<BankTransaction>> {
    let file = File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown.csv");

    load_bank_statement(file, &statement_label(file_name), window)
}

// ============================================================================
// TESTS
// ============================================================================
