// 🧾 Transaction records - the two ledgers being reconciled
//
// SystemTransaction: one row of the internal ledger (id, amount, type, timestamp)
// BankTransaction:   one row of a bank statement export (id, amount, date)

use crate::money::Money;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// TRANSACTION TYPE
// ============================================================================

/// Direction of a system ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Debit,
    Credit,
}

impl TransactionType {
    /// Lenient parse used by the loader: trimmed, case-insensitive.
    /// Anything that is not DEBIT counts as CREDIT (positive).
    pub fn parse_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or(TransactionType::Credit)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Debit => "DEBIT",
            TransactionType::Credit => "CREDIT",
        }
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DEBIT" => Ok(TransactionType::Debit),
            "CREDIT" => Ok(TransactionType::Credit),
            other => Err(format!("unknown transaction type: {}", other)),
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SYSTEM TRANSACTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemTransaction {
    /// trx_id column (not guaranteed unique)
    pub id: String,

    /// Amount exactly as exported, sign not yet normalized
    pub amount: Money,

    #[serde(rename = "type")]
    pub kind: TransactionType,

    pub timestamp: NaiveDateTime,
}

impl SystemTransaction {
    pub fn new(id: impl Into<String>, amount: Money, kind: TransactionType, timestamp: NaiveDateTime) -> Self {
        SystemTransaction {
            id: id.into(),
            amount,
            kind,
            timestamp,
        }
    }

    /// Amount comparable with bank exports: |amount|, negated for DEBIT
    pub fn signed_amount(&self) -> Money {
        let magnitude = self.amount.abs();
        match self.kind {
            TransactionType::Debit => -magnitude,
            TransactionType::Credit => magnitude,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

// ============================================================================
// BANK TRANSACTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankTransaction {
    /// Source label, e.g. "Stmt-bca_january.csv"
    pub bank_label: String,

    /// unique_id column
    pub external_id: String,

    /// Already signed by the exporting bank
    pub amount: Money,

    pub date: NaiveDate,
}

impl BankTransaction {
    pub fn new(bank_label: impl Into<String>, external_id: impl Into<String>, amount: Money, date: NaiveDate) -> Self {
        BankTransaction {
            bank_label: bank_label.into(),
            external_id: external_id.into(),
            amount,
            date,
        }
    }
}
