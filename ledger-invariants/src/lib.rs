//! Ledger Invariants
//!
//! State-consistency verification engine for balance ledgers that carry an
//! aggregate counter (`totalDeposits`, `totalSupply`) alongside per-account
//! balances.
//!
//! # Architecture
//!
//! - **Ledger**: balances plus one aggregate; stores, never validates
//! - **Operation**: tagged action plus a consistent/drifting mode
//! - **Ledger Engine**: applies operations atomically under checked or wrapping arithmetic
//! - **Invariant Checker**: `drift = aggregate - Σ balances` over a participant list,
//!   and announced amounts reconciled against applied ones
//! - **Scenario Runner**: deterministic replay with checkpoints

#![forbid(unsafe_code)]
//!
//! # Invariants
//!
//! - Deterministic replay: same ledger + same operations → same result
//! - Atomic operations: a rejected operation leaves the ledger unchanged
//! - Business-rule failures are recorded, never raised
//! - Consistent-mode deposits, withdrawals and fee transfers preserve `drift == 0`
//!
//! # Example
//!
//! ```
//! use ledger_invariants::{AccountId, Amount, Drift, Ledger, Operation, ScenarioRunner};
//!
//! let initial = Ledger::seeded([(AccountId::new("owner"), Amount::from(1000u64))], Amount::from(1000u64));
//! let ops = vec![
//!     Operation::fee_transfer("owner", "userA", Amount::from(100u64), Amount::from(10u64)).drifting(),
//! ];
//!
//! let runner = ScenarioRunner::default();
//! let result = runner
//!     .run(initial, ops, &[0], vec![AccountId::new("owner"), AccountId::new("userA")])
//!     .unwrap();
//!
//! assert_eq!(result.checkpoints[0].report.drift, Drift::surplus(Amount::from(10u64)));
//! ```

#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod error;
pub mod config;
pub mod ledger;
pub mod operation;
pub mod engine;
pub mod checker;
pub mod scenario;
pub mod metrics;

// Re-exports
pub use error::{Error, FailureKind, LedgerError, Result};
pub use types::{AccountId, Amount, ArithmeticMode, Drift, SignedAmount};
pub use config::EngineConfig;
pub use ledger::Ledger;
pub use operation::{Action, Mode, Operation, OperationKind};
pub use engine::{DenyList, LedgerEngine, OperationOutcome, RecipientPolicy};
pub use checker::{check, reconcile, InvariantChecker, InvariantReport, ReportReconciliation};
pub use scenario::{Replay, RunnerState, Scenario, ScenarioResult, ScenarioRunner};
pub use metrics::Metrics;
