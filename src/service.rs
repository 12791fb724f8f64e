// 🧭 Reconciliation Service - validate, load, match
//
// The one entry point callers (CLI, HTTP handler, tests) use. Built once at
// startup and passed down explicitly; holds no mutable state, so a single
// instance serves concurrent requests.

use crate::error::{ReconError, Result};
use crate::loader::{load_bank_statement, load_system_transactions, statement_label};
use crate::reconciliation::{ReconciliationEngine, ReconciliationResult, RunDiagnostics};
use crate::transaction::BankTransaction;
use crate::window::DateWindow;
use std::io::Read;
use tracing::{info, warn};

// ============================================================================
// INPUT TYPES
// ============================================================================

/// One uploaded bank statement: display name + byte stream
pub struct BankSource<'a> {
    pub file_name: String,
    pub reader: Box<dyn Read + Send + 'a>,
}

impl<'a> BankSource<'a> {
    pub fn new(file_name: impl Into<String>, reader: impl Read + Send + 'a) -> Self {
        BankSource {
            file_name: file_name.into(),
            reader: Box::new(reader),
        }
    }

    /// "Stmt-<file name>"
    pub fn label(&self) -> String {
        statement_label(&self.file_name)
    }
}

/// Everything one reconciliation run needs
pub struct ReconcileRequest<'a> {
    pub start_date: String,
    pub end_date: String,
    pub system: Box<dyn Read + Send + 'a>,

    /// Processed in order; a source that fails to load is skipped
    pub bank_sources: Vec<BankSource<'a>>,
}

impl<'a> ReconcileRequest<'a> {
    pub fn new(start_date: impl Into<String>, end_date: impl Into<String>, system: impl Read + Send + 'a) -> Self {
        ReconcileRequest {
            start_date: start_date.into(),
            end_date: end_date.into(),
            system: Box::new(system),
            bank_sources: Vec::new(),
        }
    }

    pub fn with_bank(mut self, source: BankSource<'a>) -> Self {
        self.bank_sources.push(source);
        self
    }
}

// ============================================================================
// SERVICE
// ============================================================================

/// Capability handed to the HTTP layer and the CLI
pub trait ReconciliationService: Send + Sync {
    fn reconcile(&self, request: ReconcileRequest<'_>) -> Result<ReconciliationResult>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultReconciliationService {
    engine: ReconciliationEngine,
}

impl DefaultReconciliationService {
    pub fn new() -> Self {
        DefaultReconciliationService {
            engine: ReconciliationEngine::new(),
        }
    }
}

impl ReconciliationService for DefaultReconciliationService {
    fn reconcile(&self, request: ReconcileRequest<'_>) -> Result<ReconciliationResult> {
        let window = DateWindow::parse(&request.start_date, &request.end_date)?;

        let system = load_system_transactions(request.system, window)
            .map_err(|e| ReconError::SystemLoad(format!("{:#}", e)))?;

        let mut diagnostics = RunDiagnostics {
            skipped_system_rows: system.skipped_rows,
            out_of_window_rows: system.out_of_window,
            ..RunDiagnostics::default()
        };

        let mut bank: Vec<BankTransaction> = Vec::new();
        for source in request.bank_sources {
            let label = source.label();

            match load_bank_statement(source.reader, &label, window) {
                Ok(outcome) => {
                    diagnostics.skipped_bank_rows += outcome.skipped_rows;
                    diagnostics.out_of_window_rows += outcome.out_of_window;
                    bank.extend(outcome.records);
                }
                Err(e) => {
                    warn!(bank = %label, error = %format!("{:#}", e), "Skipping bank statement");
                    diagnostics.failed_bank_sources.push(label);
                }
            }
        }

        let mut result = self.engine.reconcile(&system.records, &bank);
        result.diagnostics = diagnostics;

        info!(
            processed = result.total_processed,
            matched = result.total_matched,
            unmatched = result.total_unmatched,
            discrepancy = %result.total_discrepancy,
            "Reconciliation complete"
        );

        Ok(result)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use std::io;

    const SYSTEM_CSV: &str = "trx_id,amount,type,timestamp
SYS001,100.50,CREDIT,2025-01-15 10:30:00";

    const BANK_CSV: &str = "unique_id,amount,date
BANK001,100.50,2025-01-15";

    /// Reader that fails on first read, like an upload that cannot be opened
    struct BrokenReader;

    impl Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "connection reset"))
        }
    }

    fn request<'a>(start: &str, end: &str, system: &'a str) -> ReconcileRequest<'a> {
        ReconcileRequest::new(start, end, system.as_bytes())
    }

    #[test]
    fn test_valid_run() {
        let service = DefaultReconciliationService::new();

        let req = request("2025-01-15", "2025-01-17", SYSTEM_CSV)
            .with_bank(BankSource::new("bank.csv", BANK_CSV.as_bytes()));

        let result = service.reconcile(req).unwrap();

        assert_eq!(result.total_processed, 2);
        assert_eq!(result.total_matched, 1);
        assert_eq!(result.total_unmatched, 0);
    }

    #[test]
    fn test_invalid_start_date() {
        let service = DefaultReconciliationService::new();

        let err = service
            .reconcile(request("15-01-2025", "2025-01-17", "trx_id,amount,type,timestamp"))
            .unwrap_err();

        assert!(err.to_string().contains("invalid start_date"));
    }

    #[test]
    fn test_invalid_end_date() {
        let service = DefaultReconciliationService::new();

        let err = service
            .reconcile(request("2025-01-15", "17/01/2025", "trx_id,amount,type,timestamp"))
            .unwrap_err();

        assert!(err.to_string().contains("invalid end_date"));
    }

    #[test]
    fn test_empty_system_source_is_fatal() {
        let service = DefaultReconciliationService::new();

        let err = service.reconcile(request("2025-01-15", "2025-01-17", "")).unwrap_err();

        assert!(matches!(err, ReconError::SystemLoad(_)));
        assert_eq!(
            err.to_string(),
            "failed to load system transactions: failed to load: empty source"
        );
    }

    #[test]
    fn test_broken_bank_source_is_skipped() {
        let service = DefaultReconciliationService::new();

        let req = request("2025-01-15", "2025-01-17", SYSTEM_CSV)
            .with_bank(BankSource::new("broken.csv", BrokenReader))
            .with_bank(BankSource::new("empty.csv", "".as_bytes()))
            .with_bank(BankSource::new("bank.csv", BANK_CSV.as_bytes()));

        let result = service.reconcile(req).unwrap();

        assert_eq!(result.total_processed, 2);
        assert_eq!(result.total_matched, 1);
        assert_eq!(
            result.diagnostics.failed_bank_sources,
            vec!["Stmt-broken.csv".to_string(), "Stmt-empty.csv".to_string()]
        );
    }

    #[test]
    fn test_bank_files_concatenate_in_upload_order() {
        let service = DefaultReconciliationService::new();

        let req = request("2025-01-15", "2025-01-17", SYSTEM_CSV)
            .with_bank(BankSource::new("first.csv", BANK_CSV.as_bytes()))
            .with_bank(BankSource::new("second.csv", BANK_CSV.as_bytes()));

        let result = service.reconcile(req).unwrap();

        assert_eq!(result.total_processed, 3);
        assert_eq!(result.total_matched, 1);
        assert!(result.unmatched_bank.contains_key("Stmt-second.csv"));
        assert!(!result.unmatched_bank.contains_key("Stmt-first.csv"));
    }

    #[test]
    fn test_diagnostics_count_skipped_rows() {
        let service = DefaultReconciliationService::new();

        let system = "trx_id,amount,type,timestamp
SYS001,100.50,CREDIT,2025-01-15 10:30:00
SYS002,oops
SYS003,1.00,DEBIT,2025-02-01 00:00:00";
        let bank = "unique_id,amount,date
BANK001,100.50,2025-01-15
BANK002,5.00,yesterday";

        let req = request("2025-01-15", "2025-01-17", system).with_bank(BankSource::new("bank.csv", bank.as_bytes()));

        let result = service.reconcile(req).unwrap();

        assert_eq!(result.total_processed, 2);
        assert_eq!(result.diagnostics.skipped_system_rows, 1);
        assert_eq!(result.diagnostics.skipped_bank_rows, 1);
        assert_eq!(result.diagnostics.out_of_window_rows, 1);
        assert_eq!(result.total_discrepancy, Money::ZERO);
    }
}
