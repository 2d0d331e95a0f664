//! Invariant checker: `aggregate == Σ balances`
//!
//! The sum runs over a caller-supplied participant list, the way the
//! modeled contracts' `computeSum(addresses)` helpers do; the ledger has no
//! notion of "every account that ever existed". Duplicate participants are
//! counted once.
//!
//! Drift convention: `drift = aggregate - actual_sum`.
//! - positive: aggregate overstates balances (unburned fees, ghost deposits)
//! - negative: aggregate understates balances (phantom credits)
//!
//! [`reconcile`] applies the same comparison to announcements: Σ reported
//! against Σ applied over a run's outcomes.

use crate::{
    engine::OperationOutcome,
    ledger::Ledger,
    types::{amount_serde, AccountId, Amount, Drift},
};
use ruint::aliases::U512;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Outcome of one invariant check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantReport {
    /// Aggregate counter at check time
    #[serde(with = "amount_serde")]
    pub aggregate: Amount,

    /// Σ balances over the participants (512-bit, never wraps)
    #[serde(with = "amount_serde")]
    pub actual_sum: U512,

    /// `aggregate - actual_sum`
    pub drift: Drift,

    /// `drift == 0`
    pub holds: bool,
}

impl fmt::Display for InvariantReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "aggregate={} actual_sum={} drift={} {}",
            self.aggregate,
            self.actual_sum,
            self.drift,
            if self.holds { "HOLDS" } else { "VIOLATED" }
        )
    }
}

/// Check the invariant over `accounts`. Read-only.
pub fn check(ledger: &Ledger, accounts: &[AccountId]) -> InvariantReport {
    let unique: BTreeSet<&AccountId> = accounts.iter().collect();

    let mut actual_sum = U512::ZERO;
    for account in unique {
        actual_sum += U512::from(ledger.get_balance(account));
    }

    let aggregate = ledger.get_aggregate();
    let drift = Drift::measure(aggregate, actual_sum);

    InvariantReport {
        aggregate,
        actual_sum,
        drift,
        holds: drift.is_zero(),
    }
}

/// Checker bound to a fixed participant list
#[derive(Debug, Clone, Default)]
pub struct InvariantChecker {
    participants: Vec<AccountId>,
}

impl InvariantChecker {
    /// Create checker over `participants`
    pub fn new(participants: impl IntoIterator<Item = AccountId>) -> Self {
        Self {
            participants: participants.into_iter().collect(),
        }
    }

    /// Participants summed by [`check`](Self::check)
    pub fn participants(&self) -> &[AccountId] {
        &self.participants
    }

    /// Check `ledger` over the bound participants
    pub fn check(&self, ledger: &Ledger) -> InvariantReport {
        check(ledger, &self.participants)
    }
}

/// Announced versus applied amounts over a sequence of outcomes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportReconciliation {
    /// Σ announced amounts
    #[serde(with = "amount_serde")]
    pub reported_total: U512,

    /// Σ amounts actually moved
    #[serde(with = "amount_serde")]
    pub applied_total: U512,

    /// `reported_total - applied_total`
    pub discrepancy: Drift,

    /// Operations that announced anything
    pub reported_count: usize,

    /// Operations that committed
    pub succeeded_count: usize,

    /// Rejected operations that still announced
    pub false_reports: usize,

    /// Committed operations that announced a different amount
    pub misreported: usize,

    /// No false report and no misreport
    pub holds: bool,
}

impl fmt::Display for ReportReconciliation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reported={} ({} ops) applied={} ({} ops) discrepancy={} false_reports={} misreported={} {}",
            self.reported_total,
            self.reported_count,
            self.applied_total,
            self.succeeded_count,
            self.discrepancy,
            self.false_reports,
            self.misreported,
            if self.holds { "HOLDS" } else { "VIOLATED" }
        )
    }
}

/// Compare what `outcomes` announced with what they moved
pub fn reconcile(outcomes: &[OperationOutcome]) -> ReportReconciliation {
    let mut reported_total = U512::ZERO;
    let mut applied_total = U512::ZERO;
    let mut reported_count = 0;
    let mut succeeded_count = 0;
    let mut false_reports = 0;
    let mut misreported = 0;

    for outcome in outcomes {
        if let Some(reported) = outcome.reported {
            reported_total += U512::from(reported);
            reported_count += 1;
        }
        if outcome.succeeded {
            applied_total += U512::from(outcome.applied);
            succeeded_count += 1;
        }
        if outcome.is_false_report() {
            false_reports += 1;
        }
        if outcome.is_misreported() {
            misreported += 1;
        }
    }

    ReportReconciliation {
        reported_total,
        applied_total,
        discrepancy: Drift::between(applied_total, reported_total),
        reported_count,
        succeeded_count,
        false_reports,
        misreported,
        holds: false_reports == 0 && misreported == 0,
    }
}
