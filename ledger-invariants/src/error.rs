//! Error types for the invariant engine
//!
//! Two tiers:
//! - [`Error`]: malformed input (bad scenario, bad config). Surfaced to the
//!   caller before any operation runs.
//! - [`FailureKind`]: business-rule rejections. Recorded in an
//!   [`OperationOutcome`](crate::engine::OperationOutcome), never propagated.

use crate::types::{AccountId, Amount};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Engine errors
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed scenario input (checkpoint out of range, etc.)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Scenario document could not be interpreted
    #[error("Scenario error: {0}")]
    Scenario(String),

    /// Amount or mode could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why the engine rejected an operation
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Source balance smaller than the requested debit (checked arithmetic)
    #[error("insufficient balance")]
    InsufficientBalance,

    /// Addition or multiplication exceeded 2^256 - 1 (checked arithmetic)
    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    /// Subtraction went below zero (checked arithmetic)
    #[error("arithmetic underflow")]
    ArithmeticUnderflow,

    /// Recipient rejected by the recipient policy
    #[error("invalid recipient")]
    InvalidRecipient,
}

/// Errors from the direct mutation primitives on [`Ledger`](crate::Ledger)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Debit larger than the current balance
    #[error("Insufficient balance for {account}: balance {balance}, requested {requested}")]
    InsufficientBalance {
        /// Account being debited
        account: AccountId,
        /// Balance at the time of the debit
        balance: Amount,
        /// Requested debit
        requested: Amount,
    },

    /// Balance or aggregate would exceed 2^256 - 1
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    /// Aggregate would go below zero
    #[error("Arithmetic underflow: {0}")]
    Underflow(String),
}

impl From<LedgerError> for FailureKind {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientBalance { .. } => FailureKind::InsufficientBalance,
            LedgerError::Overflow(_) => FailureKind::ArithmeticOverflow,
            LedgerError::Underflow(_) => FailureKind::ArithmeticUnderflow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::InsufficientBalance.to_string(), "insufficient balance");
        assert_eq!(FailureKind::InvalidRecipient.to_string(), "invalid recipient");
    }

    #[test]
    fn test_ledger_error_maps_to_failure_kind() {
        let err = LedgerError::InsufficientBalance {
            account: AccountId::new("alice"),
            balance: Amount::from(1u64),
            requested: Amount::from(2u64),
        };
        assert!(err.to_string().contains("alice"));
        assert_eq!(FailureKind::from(err), FailureKind::InsufficientBalance);
        assert_eq!(
            FailureKind::from(LedgerError::Underflow("aggregate".into())),
            FailureKind::ArithmeticUnderflow
        );
    }
}
