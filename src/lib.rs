// Ledger Reconciliation - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod money;
pub mod transaction;
pub mod window;
pub mod key;
pub mod loader;
pub mod reconciliation;
pub mod service;
pub mod error;
pub mod config;
pub mod logging;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use money::Money;
pub use transaction::{BankTransaction, SystemTransaction, TransactionType};
pub use window::DateWindow;
pub use key::match_key;
pub use loader::{
    LoadOutcome, RecordSchema, SystemSchema, BankSchema,
    load_system_transactions, load_bank_statement, load_bank_file, statement_label,
};
pub use reconciliation::{
    ReconciliationEngine, ReconciliationResult, Discrepancy, RunDiagnostics,
};
pub use service::{
    BankSource, ReconcileRequest, ReconciliationService, DefaultReconciliationService,
};
pub use error::ReconError;
pub use config::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
