//! Error types for reconciliation runs

use thiserror::Error;

/// Result type for reconciliation operations
pub type Result<T> = std::result::Result<T, ReconError>;

/// Errors that abort a reconciliation run.
///
/// Row-level and per-bank-file problems never surface here; they are
/// skipped and only show up in `RunDiagnostics`.
#[derive(Error, Debug)]
pub enum ReconError {
    /// start_date did not match YYYY-MM-DD
    #[error("invalid start_date (expected YYYY-MM-DD)")]
    InvalidStartDate,

    /// end_date did not match YYYY-MM-DD
    #[error("invalid end_date (expected YYYY-MM-DD)")]
    InvalidEndDate,

    /// Source had no rows at all, not even a header
    #[error("failed to load: empty source")]
    EmptySource,

    /// System ledger could not be loaded
    #[error("failed to load system transactions: {0}")]
    SystemLoad(String),
}

impl ReconError {
    /// Validation errors are caller mistakes (bad form values)
    pub fn is_validation(&self) -> bool {
        matches!(self, ReconError::InvalidStartDate | ReconError::InvalidEndDate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_field_specific() {
        assert_eq!(
            ReconError::InvalidStartDate.to_string(),
            "invalid start_date (expected YYYY-MM-DD)"
        );
        assert_eq!(
            ReconError::InvalidEndDate.to_string(),
            "invalid end_date (expected YYYY-MM-DD)"
        );
        assert!(ReconError::InvalidEndDate.is_validation());
    }

    #[test]
    fn test_system_load_wraps_cause() {
        let err = ReconError::SystemLoad(ReconError::EmptySource.to_string());
        assert_eq!(
            err.to_string(),
            "failed to load system transactions: failed to load: empty source"
        );
        assert!(!err.is_validation());
    }
}
