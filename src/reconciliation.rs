// ⚖️ Reconciliation Engine - Pair system ledger entries with bank statement lines
//
// Two phases:
//   1. Exact match     - same calendar day + same signed amount (match key)
//   2. Same-day match  - leftovers paired by date only, |difference| recorded
//
// The engine is a pure function of its two input slices. Matched state is a
// local Vec<bool> owned by one call to `reconcile`.

use crate::key::day_key;
use crate::money::Money;
use crate::transaction::{BankTransaction, SystemTransaction};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

// ============================================================================
// RECONCILIATION RESULT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    /// |system| + |bank|, counted before matching
    pub total_processed: usize,

    /// Pairs from both phases
    pub total_matched: usize,

    /// |unmatched_system| + Σ |unmatched_bank[*]|
    pub total_unmatched: usize,

    /// Σ |system - bank| over same-day (phase 2) pairs
    pub total_discrepancy: Money,

    /// Input order preserved
    pub unmatched_system: Vec<SystemTransaction>,

    /// Keyed by bank label, input order preserved within each label
    pub unmatched_bank: BTreeMap<String, Vec<BankTransaction>>,

    /// One entry per same-day pair, in system input order
    pub discrepancies: Vec<Discrepancy>,

    /// Loader bookkeeping; never affects the totals above
    #[serde(default)]
    pub diagnostics: RunDiagnostics,
}

impl ReconciliationResult {
    pub fn unmatched_bank_count(&self) -> usize {
        self.unmatched_bank.values().map(Vec::len).sum()
    }

    /// Every record paired and no value differences
    pub fn is_fully_reconciled(&self) -> bool {
        self.total_unmatched == 0 && self.total_discrepancy == Money::ZERO
    }

    pub fn summary(&self) -> String {
        format!(
            "Reconciliation: {} processed, {} matched, {} unmatched ({} system / {} bank), discrepancy {}",
            self.total_processed,
            self.total_matched,
            self.total_unmatched,
            self.unmatched_system.len(),
            self.unmatched_bank_count(),
            self.total_discrepancy
        )
    }
}

/// A same-day pair whose amounts were compared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub date: NaiveDate,
    pub system_id: String,
    pub bank_label: String,
    pub bank_id: String,

    /// Sign-normalized system amount
    pub system_amount: Money,
    pub bank_amount: Money,

    /// |system_amount - bank_amount|
    pub difference: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    pub skipped_system_rows: usize,
    pub skipped_bank_rows: usize,
    pub out_of_window_rows: usize,

    /// Labels of bank sources that could not be opened or read
    pub failed_bank_sources: Vec<String>,
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconciliationEngine;

impl ReconciliationEngine {
    pub fn new() -> Self {
        ReconciliationEngine
    }

    /// Match every system transaction against the concatenated bank set.
    ///
    /// Tie-break in both phases is first-available by bank index, so records
    /// from earlier files (and earlier rows) are consumed first.
    pub fn reconcile(&self, system: &[SystemTransaction], bank: &[BankTransaction]) -> ReconciliationResult {
        let mut matched = vec![false; bank.len()];
        let mut total_matched = 0;

        // Phase 1: exact key
        let by_key = index_by(bank.iter().enumerate(), |b| day_key(b.date, b.amount));

        let mut pending: Vec<&SystemTransaction> = Vec::new();
        for sys in system {
            let key = system_key(sys);

            match claim_first(by_key.get(&key), &mut matched) {
                Some(_) => total_matched += 1,
                None => pending.push(sys),
            }
        }

        // Phase 2: same calendar day, amounts may differ
        let by_date = index_by(
            bank.iter().enumerate().filter(|(i, _)| !matched[*i]),
            |b| b.date,
        );

        let mut unmatched_system = Vec::new();
        let mut discrepancies = Vec::new();
        let mut total_discrepancy = Money::ZERO;

        for sys in pending {
            let Some(idx) = claim_first(by_date.get(&sys.date()), &mut matched) else {
                unmatched_system.push(sys.clone());
                continue;
            };

            let bank_tx = &bank[idx];
            let system_amount = sys.signed_amount();
            let difference = match system_amount.checked_sub(bank_tx.amount) {
                Some(diff) => diff.abs(),
                None => {
                    warn!(system_id = %sys.id, bank_id = %bank_tx.external_id, "Discrepancy overflows, clamped");
                    Money::MAX
                }
            };

            debug!(
                date = %sys.date(),
                system_id = %sys.id,
                bank_id = %bank_tx.external_id,
                diff = %difference,
                "Discrepancy"
            );

            total_discrepancy = total_discrepancy.checked_add(difference).unwrap_or_else(|| {
                warn!(system_id = %sys.id, "Total discrepancy overflows, clamped");
                Money::MAX
            });
            total_matched += 1;
            discrepancies.push(Discrepancy {
                date: sys.date(),
                system_id: sys.id.clone(),
                bank_label: bank_tx.bank_label.clone(),
                bank_id: bank_tx.external_id.clone(),
                system_amount,
                bank_amount: bank_tx.amount,
                difference,
            });
        }

        // Aggregation
        let mut unmatched_bank: BTreeMap<String, Vec<BankTransaction>> = BTreeMap::new();
        for (_, b) in bank.iter().enumerate().filter(|(i, _)| !matched[*i]) {
            unmatched_bank.entry(b.bank_label.clone()).or_default().push(b.clone());
        }

        let total_unmatched = unmatched_system.len() + unmatched_bank.values().map(Vec::len).sum::<usize>();

        ReconciliationResult {
            total_processed: system.len() + bank.len(),
            total_matched,
            total_unmatched,
            total_discrepancy,
            unmatched_system,
            unmatched_bank,
            discrepancies,
            diagnostics: RunDiagnostics::default(),
        }
    }
}

/// Exact-match key of a system entry: its calendar day and signed amount.
///
/// Keyed at midnight, not the minute of `timestamp`: bank rows carry only a
/// date, so a minute-level key would never pair with them.
pub fn system_key(sys: &SystemTransaction) -> String {
    day_key(sys.date(), sys.signed_amount())
}

fn index_by<'a, K, F, I>(items: I, key_fn: F) -> HashMap<K, Vec<usize>>
where
    K: std::hash::Hash + Eq,
    F: Fn(&BankTransaction) -> K,
    I: Iterator<Item = (usize, &'a BankTransaction)>,
{
    let mut index: HashMap<K, Vec<usize>> = HashMap::new();
    for (i, b) in items {
        index.entry(key_fn(b)).or_default().push(i);
    }
    index
}

/// Mark and return the first candidate not yet matched
fn claim_first(candidates: Option<&Vec<usize>>, matched: &mut [bool]) -> Option<usize> {
    let idx = candidates?.iter().copied().find(|&i| !matched[i])?;
    matched[idx] = true;
    Some(idx)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionType;
    use chrono::NaiveDateTime;

    fn sys(id: &str, minor: i64, kind: TransactionType, ts: &str) -> SystemTransaction {
        SystemTransaction::new(
            id,
            Money::from_minor(minor),
            kind,
            NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S").unwrap(),
        )
    }

    fn bank(label: &str, id: &str, minor: i64, date: &str) -> BankTransaction {
        BankTransaction::new(
            label,
            id,
            Money::from_minor(minor),
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        )
    }

    #[test]
    fn test_perfect_match() {
        let engine = ReconciliationEngine::new();

        let system = vec![
            sys("SYS001", 10050, TransactionType::Credit, "2025-01-15 10:30:00"),
            sys("SYS002", 5025, TransactionType::Debit, "2025-01-16 14:20:00"),
        ];
        let bank_txs = vec![
            bank("Bank A", "BANK001", 10050, "2025-01-15"),
            bank("Bank A", "BANK002", -5025, "2025-01-16"),
        ];

        let result = engine.reconcile(&system, &bank_txs);

        assert_eq!(result.total_processed, 4);
        assert_eq!(result.total_matched, 2);
        assert_eq!(result.total_unmatched, 0);
        assert_eq!(result.total_discrepancy, Money::ZERO);
        assert!(result.discrepancies.is_empty());
        assert!(result.is_fully_reconciled());

        println!("✅ Test passed: {}", result.summary());
    }

    #[test]
    fn test_partial_match() {
        let engine = ReconciliationEngine::new();

        let system = vec![
            sys("SYS001", 10050, TransactionType::Credit, "2025-01-15 10:30:00"),
            sys("SYS002", 5025, TransactionType::Debit, "2025-01-16 14:20:00"),
        ];
        let bank_txs = vec![bank("Bank A", "BANK001", 10050, "2025-01-15")];

        let result = engine.reconcile(&system, &bank_txs);

        assert_eq!(result.total_processed, 3);
        assert_eq!(result.total_matched, 1);
        assert_eq!(result.total_unmatched, 1);
        assert_eq!(result.unmatched_system.len(), 1);
        assert_eq!(result.unmatched_system[0].id, "SYS002");
        assert_eq!(result.unmatched_bank_count(), 0);
    }

    #[test]
    fn test_no_matches_on_different_days() {
        let engine = ReconciliationEngine::new();

        let system = vec![sys("SYS001", 10050, TransactionType::Credit, "2025-01-15 10:30:00")];
        let bank_txs = vec![bank("Bank A", "BANK001", 20000, "2025-01-16")];

        let result = engine.reconcile(&system, &bank_txs);

        assert_eq!(result.total_matched, 0);
        assert_eq!(result.total_unmatched, 2);
        assert_eq!(result.unmatched_system.len(), 1);
        assert_eq!(result.unmatched_bank["Bank A"].len(), 1);
    }

    #[test]
    fn test_empty_inputs() {
        let engine = ReconciliationEngine::new();

        let result = engine.reconcile(&[], &[]);

        assert_eq!(result, ReconciliationResult::default());
        assert!(result.unmatched_bank.is_empty());
    }

    #[test]
    fn test_same_day_discrepancy_counts_as_matched() {
        let engine = ReconciliationEngine::new();

        let system = vec![sys("SYS001", 10000, TransactionType::Credit, "2025-01-15 09:00:00")];
        let bank_txs = vec![bank("Bank A", "BANK001", 9500, "2025-01-15")];

        let result = engine.reconcile(&system, &bank_txs);

        assert_eq!(result.total_matched, 1);
        assert_eq!(result.total_unmatched, 0);
        assert_eq!(result.total_discrepancy, Money::from_minor(500));
        assert_eq!(result.discrepancies.len(), 1);
        assert_eq!(result.discrepancies[0].system_id, "SYS001");
        assert_eq!(result.discrepancies[0].bank_id, "BANK001");
        assert!(!result.is_fully_reconciled());
    }

    #[test]
    fn test_discrepancy_uses_normalized_sign() {
        let engine = ReconciliationEngine::new();

        // DEBIT 100.00 → -100.00 vs bank -90.00 → difference 10.00
        let system = vec![sys("SYS001", 10000, TransactionType::Debit, "2025-01-15 09:00:00")];
        let bank_txs = vec![bank("Bank A", "BANK001", -9000, "2025-01-15")];

        let result = engine.reconcile(&system, &bank_txs);

        assert_eq!(result.discrepancies[0].system_amount, Money::from_minor(-10000));
        assert_eq!(result.total_discrepancy, Money::from_minor(1000));
    }

    #[test]
    fn test_exact_match_preferred_over_same_day() {
        let engine = ReconciliationEngine::new();

        // SYS001 has an exact partner later in the bank list; SYS002 gets the leftover
        let system = vec![
            sys("SYS001", 5000, TransactionType::Credit, "2025-01-15 09:00:00"),
            sys("SYS002", 7000, TransactionType::Credit, "2025-01-15 11:00:00"),
        ];
        let bank_txs = vec![
            bank("Bank A", "BANK001", 6900, "2025-01-15"),
            bank("Bank A", "BANK002", 5000, "2025-01-15"),
        ];

        let result = engine.reconcile(&system, &bank_txs);

        assert_eq!(result.total_matched, 2);
        assert_eq!(result.discrepancies.len(), 1);
        assert_eq!(result.discrepancies[0].system_id, "SYS002");
        assert_eq!(result.discrepancies[0].bank_id, "BANK001");
        assert_eq!(result.total_discrepancy, Money::from_minor(100));
    }

    #[test]
    fn test_tie_break_first_available_index() {
        let engine = ReconciliationEngine::new();

        let system = vec![sys("SYS001", 10050, TransactionType::Credit, "2025-01-15 10:30:00")];
        let bank_txs = vec![
            bank("Stmt-a.csv", "FIRST", 10050, "2025-01-15"),
            bank("Stmt-b.csv", "SECOND", 10050, "2025-01-15"),
        ];

        let result = engine.reconcile(&system, &bank_txs);

        assert_eq!(result.total_matched, 1);
        assert_eq!(result.unmatched_bank.len(), 1);
        assert_eq!(result.unmatched_bank["Stmt-b.csv"][0].external_id, "SECOND");
    }

    #[test]
    fn test_bank_record_matched_at_most_once() {
        let engine = ReconciliationEngine::new();

        let system = vec![
            sys("SYS001", 10050, TransactionType::Credit, "2025-01-15 10:30:00"),
            sys("SYS002", 10050, TransactionType::Credit, "2025-01-15 10:30:00"),
        ];
        let bank_txs = vec![bank("Bank A", "BANK001", 10050, "2025-01-15")];

        let result = engine.reconcile(&system, &bank_txs);

        assert_eq!(result.total_matched, 1);
        assert_eq!(result.unmatched_system.len(), 1);
        assert_eq!(result.unmatched_system[0].id, "SYS002");
    }

    #[test]
    fn test_unmatched_bank_grouped_by_label_in_input_order() {
        let engine = ReconciliationEngine::new();

        let bank_txs = vec![
            bank("Stmt-a.csv", "A1", 100, "2025-01-15"),
            bank("Stmt-b.csv", "B1", 200, "2025-01-15"),
            bank("Stmt-a.csv", "A2", 300, "2025-01-16"),
        ];

        let result = engine.reconcile(&[], &bank_txs);

        assert_eq!(result.total_unmatched, 3);
        let a_ids: Vec<&str> = result.unmatched_bank["Stmt-a.csv"]
            .iter()
            .map(|b| b.external_id.as_str())
            .collect();
        assert_eq!(a_ids, vec!["A1", "A2"]);
        assert_eq!(result.unmatched_bank["Stmt-b.csv"].len(), 1);
    }

    #[test]
    fn test_reconcile_is_repeatable() {
        let engine = ReconciliationEngine::new();

        let system = vec![
            sys("SYS001", 10000, TransactionType::Credit, "2025-01-15 09:00:00"),
            sys("SYS002", 2500, TransactionType::Debit, "2025-01-16 09:00:00"),
        ];
        let bank_txs = vec![
            bank("Bank A", "BANK001", 9500, "2025-01-15"),
            bank("Bank A", "BANK002", 777, "2025-01-17"),
        ];

        let first = engine.reconcile(&system, &bank_txs);
        let second = engine.reconcile(&system, &bank_txs);

        assert_eq!(first, second);
    }

    #[test]
    fn test_system_key_uses_calendar_day() {
        let s = sys("SYS001", 5025, TransactionType::Debit, "2025-01-16 14:20:33");
        assert_eq!(system_key(&s), "2025-01-16 00:00--5025");
    }

    #[test]
    fn test_discrepancy_overflow_clamps_to_max() {
        let engine = ReconciliationEngine::new();

        let system = vec![
            sys("SYS001", i64::MAX, TransactionType::Credit, "2025-01-15 09:00:00"),
            sys("SYS002", i64::MAX, TransactionType::Credit, "2025-01-16 09:00:00"),
        ];
        let bank_txs = vec![
            bank("Bank A", "BANK001", -1, "2025-01-15"),
            bank("Bank A", "BANK002", -1, "2025-01-16"),
        ];

        let result = engine.reconcile(&system, &bank_txs);

        assert_eq!(result.total_matched, 2);
        assert_eq!(result.discrepancies[0].difference, Money::MAX);
        assert_eq!(result.total_discrepancy, Money::MAX);
    }
}
