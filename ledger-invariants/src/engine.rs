//! Ledger engine: applies operations to a ledger
//!
//! # Update rules
//!
//! Balance effects come from the [`Action`]; the aggregate term is looked up
//! from `(OperationKind, Mode)`:
//!
//! ```text
//! kind               consistent            drifting
//! deposit            aggregate += amount   untouched
//! withdraw           aggregate -= amount   untouched
//! fee_transfer       aggregate -= fee      untouched
//! admin_credit       aggregate += amount   untouched
//! emergency_withdraw aggregate -= cleared  untouched
//! transfer           untouched             untouched
//! batch_transfer     untouched             untouched
//! ```
//!
//! # Atomicity
//!
//! Every write is staged in an overlay and committed only after the whole
//! operation validated. A rejected operation leaves the ledger unchanged.
//!
//! # Announcements
//!
//! Each operation announces an amount, the way a contract emits an event.
//! It announces [`Operation::reported`] if set, otherwise the amount it moves.
//! A consistent operation announces only once committed. A drifting one
//! announces before validating, so a rejection still leaves a report behind.

use crate::{
    config::EngineConfig,
    error::FailureKind,
    ledger::Ledger,
    operation::{Action, Mode, Operation, OperationKind},
    types::{amount_serde, AccountId, Amount, ArithmeticMode, SignedAmount},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, warn};

/// Decides which accounts may receive funds
pub trait RecipientPolicy: Send + Sync {
    /// True if `recipient` may be credited
    fn accepts(&self, recipient: &AccountId) -> bool;
}

impl<F> RecipientPolicy for F
where
    F: Fn(&AccountId) -> bool + Send + Sync,
{
    fn accepts(&self, recipient: &AccountId) -> bool {
        self(recipient)
    }
}

/// Rejects a fixed set of accounts
#[derive(Debug, Clone, Default)]
pub struct DenyList {
    denied: BTreeSet<AccountId>,
}

impl DenyList {
    /// Deny the given accounts
    pub fn new(denied: impl IntoIterator<Item = AccountId>) -> Self {
        Self {
            denied: denied.into_iter().collect(),
        }
    }
}

impl RecipientPolicy for DenyList {
    fn accepts(&self, recipient: &AccountId) -> bool {
        if recipient.is_zero() && self.denied.iter().any(AccountId::is_zero) {
            return false;
        }
        !self.denied.contains(recipient)
    }
}

/// Change to one balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDelta {
    /// Account
    pub account: AccountId,
    /// Observed change (`after - before`)
    pub delta: SignedAmount,
}

/// Result of applying one operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    /// Operation discriminant
    pub kind: OperationKind,
    /// Effective mode
    pub mode: Mode,
    /// Accounts the operation named
    pub accounts_touched: Vec<AccountId>,
    /// Per-account balance changes (empty on failure)
    pub balance_deltas: Vec<BalanceDelta>,
    /// Aggregate change (zero on failure)
    pub aggregate_delta: SignedAmount,
    /// True if the operation was committed
    pub succeeded: bool,
    /// Rejection reason
    pub failure_reason: Option<FailureKind>,
    /// Amount moved (zero on failure)
    #[serde(with = "amount_serde")]
    pub applied: Amount,
    /// Amount announced, `None` if nothing was announced
    #[serde(
        default,
        with = "amount_serde::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub reported: Option<Amount>,
}

impl OperationOutcome {
    /// Balance change of `account`, zero if it did not change
    pub fn delta_for(&self, account: &AccountId) -> SignedAmount {
        self.balance_deltas
            .iter()
            .find(|d| &d.account == account)
            .map(|d| d.delta)
            .unwrap_or(SignedAmount::ZERO)
    }

    /// Announced although rejected
    pub fn is_false_report(&self) -> bool {
        !self.succeeded && self.reported.is_some()
    }

    /// Committed, but announced a different amount than it moved
    pub fn is_misreported(&self) -> bool {
        self.succeeded && self.reported.is_some_and(|r| r != self.applied)
    }
}

/// Aggregate term of an update rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AggregateTerm {
    Untouched,
    RaiseByAmount,
    LowerByAmount,
    LowerByFee,
    LowerByCleared,
}

fn aggregate_term(kind: OperationKind, mode: Mode) -> AggregateTerm {
    use AggregateTerm::*;
    match (kind, mode) {
        (_, Mode::Drifting) => Untouched,
        (OperationKind::Deposit, Mode::Consistent) => RaiseByAmount,
        (OperationKind::Withdraw, Mode::Consistent) => LowerByAmount,
        (OperationKind::FeeTransfer, Mode::Consistent) => LowerByFee,
        (OperationKind::AdminCredit, Mode::Consistent) => RaiseByAmount,
        (OperationKind::EmergencyWithdraw, Mode::Consistent) => LowerByCleared,
        (OperationKind::Transfer, Mode::Consistent) => Untouched,
        (OperationKind::BatchTransfer, Mode::Consistent) => Untouched,
    }
}

/// Amount an action moves out of or into the ledger, from the pre-state
fn nominal_amount(ledger: &Ledger, action: &Action) -> Amount {
    match action {
        Action::Deposit { amount, .. }
        | Action::Withdraw { amount, .. }
        | Action::FeeTransfer { amount, .. }
        | Action::AdminCredit { amount, .. }
        | Action::Transfer { amount, .. } => *amount,
        Action::EmergencyWithdraw { account } => ledger.get_balance(account),
        Action::BatchTransfer {
            recipients, amount, ..
        } => amount.wrapping_mul(Amount::from(recipients.len() as u64)),
    }
}

/// Quantities an aggregate term can refer to
#[derive(Debug, Default)]
struct Basis {
    amount: Amount,
    fee: Amount,
    cleared: Amount,
}

impl ArithmeticMode {
    fn add(self, a: Amount, b: Amount) -> Result<Amount, FailureKind> {
        match self {
            ArithmeticMode::Checked => a.checked_add(b).ok_or(FailureKind::ArithmeticOverflow),
            ArithmeticMode::Wrapping => Ok(a.wrapping_add(b)),
        }
    }

    fn sub(self, a: Amount, b: Amount, failure: FailureKind) -> Result<Amount, FailureKind> {
        match self {
            ArithmeticMode::Checked => a.checked_sub(b).ok_or(failure),
            ArithmeticMode::Wrapping => Ok(a.wrapping_sub(b)),
        }
    }

    fn mul(self, a: Amount, b: Amount) -> Result<Amount, FailureKind> {
        match self {
            ArithmeticMode::Checked => a.checked_mul(b).ok_or(FailureKind::ArithmeticOverflow),
            ArithmeticMode::Wrapping => Ok(a.wrapping_mul(b)),
        }
    }
}

/// Pending writes over a borrowed ledger
struct Staged<'a> {
    ledger: &'a Ledger,
    arithmetic: ArithmeticMode,
    balances: BTreeMap<AccountId, Amount>,
    aggregate: Amount,
}

/// Staged writes detached from the ledger, ready to commit
struct Plan {
    balances: BTreeMap<AccountId, Amount>,
    aggregate: Amount,
}

impl<'a> Staged<'a> {
    fn new(ledger: &'a Ledger, arithmetic: ArithmeticMode) -> Self {
        Self {
            ledger,
            arithmetic,
            balances: BTreeMap::new(),
            aggregate: ledger.get_aggregate(),
        }
    }

    fn balance(&self, account: &AccountId) -> Amount {
        self.balances
            .get(account)
            .copied()
            .unwrap_or_else(|| self.ledger.get_balance(account))
    }

    fn credit(&mut self, account: &AccountId, amount: Amount) -> Result<(), FailureKind> {
        let updated = self.arithmetic.add(self.balance(account), amount)?;
        self.balances.insert(account.clone(), updated);
        Ok(())
    }

    fn debit(&mut self, account: &AccountId, amount: Amount) -> Result<(), FailureKind> {
        let updated = self.arithmetic.sub(
            self.balance(account),
            amount,
            FailureKind::InsufficientBalance,
        )?;
        self.balances.insert(account.clone(), updated);
        Ok(())
    }

    fn raise_aggregate(&mut self, amount: Amount) -> Result<(), FailureKind> {
        self.aggregate = self.arithmetic.add(self.aggregate, amount)?;
        Ok(())
    }

    fn lower_aggregate(&mut self, amount: Amount) -> Result<(), FailureKind> {
        self.aggregate =
            self.arithmetic
                .sub(self.aggregate, amount, FailureKind::ArithmeticUnderflow)?;
        Ok(())
    }

    fn into_plan(self) -> Plan {
        Plan {
            balances: self.balances,
            aggregate: self.aggregate,
        }
    }
}

/// Applies operations under one arithmetic discipline
pub struct LedgerEngine {
    arithmetic: ArithmeticMode,
    recipients: Box<dyn RecipientPolicy>,
}

impl fmt::Debug for LedgerEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerEngine")
            .field("arithmetic", &self.arithmetic)
            .finish_non_exhaustive()
    }
}

impl Default for LedgerEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl LedgerEngine {
    /// Create engine from configuration
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            arithmetic: config.arithmetic,
            recipients: Box::new(DenyList::new(
                config.denied_recipients.iter().map(AccountId::new),
            )),
        }
    }

    /// Checked arithmetic, zero address denied
    pub fn checked() -> Self {
        Self::new(&EngineConfig::checked())
    }

    /// Wrapping arithmetic, zero address denied
    pub fn wrapping() -> Self {
        Self::new(&EngineConfig::wrapping())
    }

    /// Replace the recipient policy
    pub fn with_recipient_policy(mut self, policy: impl RecipientPolicy + 'static) -> Self {
        self.recipients = Box::new(policy);
        self
    }

    /// Arithmetic discipline
    pub fn arithmetic(&self) -> ArithmeticMode {
        self.arithmetic
    }

    /// Apply one operation.
    ///
    /// Business-rule violations never panic or error; they come back as an
    /// outcome with `succeeded == false` and the ledger untouched.
    pub fn apply(&self, ledger: &mut Ledger, op: &Operation) -> OperationOutcome {
        let kind = op.kind();
        let mode = op.mode();
        let accounts_touched = op.action.accounts();
        let moved = nominal_amount(ledger, &op.action);
        let announced = op.reported.unwrap_or(moved);

        let staged = {
            let mut staged = Staged::new(ledger, self.arithmetic);
            self.stage(&mut staged, &op.action, aggregate_term(kind, mode))
                .map(|()| staged.into_plan())
        };

        match staged {
            Ok(plan) => {
                let aggregate_delta =
                    SignedAmount::between(ledger.get_aggregate(), plan.aggregate);
                let mut balance_deltas = Vec::with_capacity(plan.balances.len());
                for (account, after) in plan.balances {
                    let delta = SignedAmount::between(ledger.get_balance(&account), after);
                    if !delta.is_zero() {
                        balance_deltas.push(BalanceDelta {
                            account: account.clone(),
                            delta,
                        });
                    }
                    ledger.set_balance(account, after);
                }
                ledger.set_aggregate(plan.aggregate);

                debug!(
                    operation = %op,
                    aggregate_delta = %aggregate_delta,
                    "Applied operation"
                );
                if announced != moved {
                    warn!(operation = %op, moved = %moved, announced = %announced, "Misreported amount");
                }

                OperationOutcome {
                    kind,
                    mode,
                    accounts_touched,
                    balance_deltas,
                    aggregate_delta,
                    succeeded: true,
                    failure_reason: None,
                    applied: moved,
                    reported: Some(announced),
                }
            }
            Err(reason) => {
                warn!(operation = %op, reason = %reason, "Rejected operation");

                OperationOutcome {
                    kind,
                    mode,
                    accounts_touched,
                    balance_deltas: Vec::new(),
                    aggregate_delta: SignedAmount::ZERO,
                    succeeded: false,
                    failure_reason: Some(reason),
                    applied: Amount::ZERO,
                    reported: match mode {
                        Mode::Drifting => Some(announced),
                        Mode::Consistent => None,
                    },
                }
            }
        }
    }

    fn check_recipient(&self, recipient: &AccountId) -> Result<(), FailureKind> {
        if self.recipients.accepts(recipient) {
            Ok(())
        } else {
            Err(FailureKind::InvalidRecipient)
        }
    }

    fn stage(
        &self,
        staged: &mut Staged<'_>,
        action: &Action,
        term: AggregateTerm,
    ) -> Result<(), FailureKind> {
        let mut basis = Basis::default();

        match action {
            Action::Deposit { account, amount } => {
                staged.credit(account, *amount)?;
                basis.amount = *amount;
            }
            Action::Withdraw { account, amount } => {
                staged.debit(account, *amount)?;
                basis.amount = *amount;
            }
            Action::FeeTransfer {
                from,
                to,
                amount,
                fee,
            } => {
                self.check_recipient(to)?;
                let total = self.arithmetic.add(*amount, *fee)?;
                staged.debit(from, total)?;
                staged.credit(to, *amount)?;
                basis.amount = *amount;
                basis.fee = *fee;
            }
            Action::AdminCredit { account, amount } => {
                self.check_recipient(account)?;
                staged.credit(account, *amount)?;
                basis.amount = *amount;
            }
            Action::EmergencyWithdraw { account } => {
                let cleared = staged.balance(account);
                staged.debit(account, cleared)?;
                basis.cleared = cleared;
            }
            Action::Transfer { from, to, amount } => {
                self.check_recipient(to)?;
                staged.debit(from, *amount)?;
                staged.credit(to, *amount)?;
                basis.amount = *amount;
            }
            Action::BatchTransfer {
                from,
                recipients,
                amount,
            } => {
                for recipient in recipients {
                    self.check_recipient(recipient)?;
                }
                let count = Amount::from(recipients.len() as u64);
                let total = self.arithmetic.mul(*amount, count)?;
                staged.debit(from, total)?;
                for recipient in recipients {
                    staged.credit(recipient, *amount)?;
                }
                basis.amount = total;
            }
        }

        match term {
            AggregateTerm::Untouched => Ok(()),
            AggregateTerm::RaiseByAmount => staged.raise_aggregate(basis.amount),
            AggregateTerm::LowerByAmount => staged.lower_aggregate(basis.amount),
            AggregateTerm::LowerByFee => staged.lower_aggregate(basis.fee),
            AggregateTerm::LowerByCleared => staged.lower_aggregate(basis.cleared),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(v: u64) -> Amount {
        Amount::from(v)
    }

    fn id(s: &str) -> AccountId {
        AccountId::new(s)
    }

    fn owner_ledger() -> Ledger {
        Ledger::seeded([(id("owner"), amount(1000))], amount(1000))
    }

    #[test]
    fn test_aggregate_rule_table() {
        assert_eq!(
            aggregate_term(OperationKind::FeeTransfer, Mode::Consistent),
            AggregateTerm::LowerByFee
        );
        assert_eq!(
            aggregate_term(OperationKind::EmergencyWithdraw, Mode::Consistent),
            AggregateTerm::LowerByCleared
        );
        assert_eq!(
            aggregate_term(OperationKind::Deposit, Mode::Drifting),
            AggregateTerm::Untouched
        );
        assert_eq!(
            aggregate_term(OperationKind::Transfer, Mode::Consistent),
            AggregateTerm::Untouched
        );
    }

    #[test]
    fn test_consistent_deposit_and_withdraw() {
        let engine = LedgerEngine::checked();
        let mut ledger = Ledger::new();

        let outcome = engine.apply(&mut ledger, &Operation::deposit("user1", amount(100)));
        assert!(outcome.succeeded);
        assert_eq!(outcome.delta_for(&id("user1")), SignedAmount::positive(amount(100)));
        assert_eq!(outcome.aggregate_delta, SignedAmount::positive(amount(100)));

        let outcome = engine.apply(&mut ledger, &Operation::withdraw("user1", amount(40)));
        assert!(outcome.succeeded);
        assert_eq!(outcome.aggregate_delta, SignedAmount::negative(amount(40)));
        assert_eq!(ledger.get_balance(&id("user1")), amount(60));
        assert_eq!(ledger.get_aggregate(), amount(60));
    }

    #[test]
    fn test_withdraw_insufficient_balance_is_atomic() {
        let engine = LedgerEngine::checked();
        let mut ledger = owner_ledger();
        let before = ledger.clone();

        let outcome = engine.apply(&mut ledger, &Operation::withdraw("owner", amount(1001)));
        assert!(!outcome.succeeded);
        assert_eq!(outcome.failure_reason, Some(FailureKind::InsufficientBalance));
        assert!(outcome.balance_deltas.is_empty());
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_drifting_fee_transfer() {
        let engine = LedgerEngine::checked();
        let mut ledger = owner_ledger();

        let op = Operation::fee_transfer("owner", "userA", amount(100), amount(10)).drifting();
        let outcome = engine.apply(&mut ledger, &op);

        assert!(outcome.succeeded);
        assert_eq!(ledger.get_balance(&id("owner")), amount(890));
        assert_eq!(ledger.get_balance(&id("userA")), amount(100));
        assert_eq!(ledger.get_aggregate(), amount(1000));
        assert!(outcome.aggregate_delta.is_zero());
    }

    #[test]
    fn test_consistent_fee_transfer_burns_fee() {
        let engine = LedgerEngine::checked();
        let mut ledger = owner_ledger();

        let op = Operation::fee_transfer("owner", "userA", amount(100), amount(10));
        engine.apply(&mut ledger, &op);
        assert_eq!(ledger.get_aggregate(), amount(990));
    }

    #[test]
    fn test_fee_transfer_rejects_when_fee_exceeds_balance() {
        let engine = LedgerEngine::checked();
        let mut ledger = Ledger::seeded([(id("a"), amount(100))], amount(100));

        let op = Operation::fee_transfer("a", "b", amount(95), amount(10));
        let outcome = engine.apply(&mut ledger, &op);
        assert_eq!(outcome.failure_reason, Some(FailureKind::InsufficientBalance));
        assert_eq!(ledger.get_balance(&id("a")), amount(100));
        assert_eq!(ledger.get_balance(&id("b")), Amount::ZERO);
    }

    #[test]
    fn test_admin_credit_phantom_funds() {
        let engine = LedgerEngine::checked();
        let mut ledger = owner_ledger();

        engine.apply(&mut ledger, &Operation::admin_credit("attacker", amount(500)));
        assert_eq!(ledger.get_balance(&id("attacker")), amount(500));
        assert_eq!(ledger.get_aggregate(), amount(1000));

        engine.apply(
            &mut ledger,
            &Operation::admin_credit("user1", amount(50)).consistent(),
        );
        assert_eq!(ledger.get_aggregate(), amount(1050));
    }

    #[test]
    fn test_emergency_withdraw_ghost_deposit() {
        let engine = LedgerEngine::checked();
        let mut ledger = owner_ledger();

        let outcome = engine.apply(&mut ledger, &Operation::emergency_withdraw("owner"));
        assert!(outcome.succeeded);
        assert_eq!(outcome.delta_for(&id("owner")), SignedAmount::negative(amount(1000)));
        assert_eq!(ledger.get_balance(&id("owner")), Amount::ZERO);
        assert_eq!(ledger.get_aggregate(), amount(1000));

        let mut ledger = owner_ledger();
        engine.apply(&mut ledger, &Operation::emergency_withdraw("owner").consistent());
        assert_eq!(ledger.get_aggregate(), Amount::ZERO);
    }

    #[test]
    fn test_zero_address_recipient_rejected() {
        let engine = LedgerEngine::checked();
        let mut ledger = owner_ledger();

        let op = Operation::transfer("owner", AccountId::zero(), amount(1));
        let outcome = engine.apply(&mut ledger, &op);
        assert_eq!(outcome.failure_reason, Some(FailureKind::InvalidRecipient));
        assert_eq!(ledger.get_balance(&id("owner")), amount(1000));
    }

    #[test]
    fn test_custom_recipient_policy() {
        let engine = LedgerEngine::checked()
            .with_recipient_policy(|recipient: &AccountId| recipient.as_str() != "sanctioned");
        let mut ledger = owner_ledger();

        let outcome = engine.apply(
            &mut ledger,
            &Operation::admin_credit("sanctioned", amount(1)),
        );
        assert_eq!(outcome.failure_reason, Some(FailureKind::InvalidRecipient));

        let outcome = engine.apply(
            &mut ledger,
            &Operation::transfer("owner", AccountId::zero(), amount(1)),
        );
        assert!(outcome.succeeded);
    }

    #[test]
    fn test_checked_deposit_overflow() {
        let engine = LedgerEngine::checked();
        let mut ledger = Ledger::seeded([(id("a"), Amount::MAX)], Amount::MAX);
        let before = ledger.clone();

        let outcome = engine.apply(&mut ledger, &Operation::deposit("a", amount(1)));
        assert_eq!(outcome.failure_reason, Some(FailureKind::ArithmeticOverflow));
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_checked_aggregate_underflow() {
        let engine = LedgerEngine::checked();
        let mut ledger = Ledger::seeded([(id("a"), amount(10))], amount(5));

        let outcome = engine.apply(&mut ledger, &Operation::withdraw("a", amount(10)));
        assert_eq!(outcome.failure_reason, Some(FailureKind::ArithmeticUnderflow));
        assert_eq!(ledger.get_balance(&id("a")), amount(10));
    }

    #[test]
    fn test_wrapping_withdraw_underflow() {
        let engine = LedgerEngine::wrapping();
        let mut ledger = Ledger::new();

        let outcome = engine.apply(&mut ledger, &Operation::withdraw("a", amount(1)));
        assert!(outcome.succeeded);
        assert_eq!(ledger.get_balance(&id("a")), Amount::MAX);
        assert_eq!(ledger.get_aggregate(), Amount::MAX);
    }

    #[test]
    fn test_wrapping_deposit_overflow() {
        let engine = LedgerEngine::wrapping();
        let mut ledger = Ledger::seeded([(id("a"), Amount::MAX)], Amount::MAX);

        engine.apply(&mut ledger, &Operation::deposit("a", amount(2)));
        assert_eq!(ledger.get_balance(&id("a")), amount(1));
    }

    #[test]
    fn test_batch_transfer_overflow() {
        let half = Amount::from(1u64) << 255usize;
        let recipients = vec![id("user1"), id("user2")];
        let op = Operation::batch_transfer("attacker", recipients, half);

        let mut ledger = Ledger::seeded([(id("attacker"), amount(1))], amount(1));
        let outcome = LedgerEngine::checked().apply(&mut ledger, &op);
        assert_eq!(outcome.failure_reason, Some(FailureKind::ArithmeticOverflow));

        let outcome = LedgerEngine::wrapping().apply(&mut ledger, &op);
        assert!(outcome.succeeded);
        assert_eq!(ledger.get_balance(&id("attacker")), amount(1));
        assert_eq!(ledger.get_balance(&id("user1")), half);
        assert_eq!(ledger.get_balance(&id("user2")), half);
    }

    #[test]
    fn test_self_transfer_is_noop() {
        let engine = LedgerEngine::checked();
        let mut ledger = owner_ledger();

        let outcome = engine.apply(&mut ledger, &Operation::transfer("owner", "owner", amount(300)));
        assert!(outcome.succeeded);
        assert!(outcome.balance_deltas.is_empty());
        assert_eq!(ledger, owner_ledger());
    }

    #[test]
    fn test_announces_amount_moved() {
        let engine = LedgerEngine::checked();
        let mut ledger = owner_ledger();

        let outcome = engine.apply(&mut ledger, &Operation::emergency_withdraw("owner"));
        assert_eq!(outcome.applied, amount(1000));
        assert_eq!(outcome.reported, Some(amount(1000)));
        assert!(!outcome.is_misreported());
    }

    #[test]
    fn test_inflated_report() {
        let engine = LedgerEngine::checked();
        let mut ledger = owner_ledger();
        let op = Operation::withdraw("owner", amount(3)).reporting(amount(6));

        let outcome = engine.apply(&mut ledger, &op);
        assert!(outcome.succeeded);
        assert_eq!(outcome.applied, amount(3));
        assert_eq!(outcome.reported, Some(amount(6)));
        assert!(outcome.is_misreported());
        assert_eq!(ledger.get_balance(&id("owner")), amount(997));
    }

    #[test]
    fn test_rejection_reported_only_when_drifting() {
        let engine = LedgerEngine::checked();
        let mut ledger = owner_ledger();
        let transfer = Operation::transfer("owner", AccountId::zero(), amount(5));

        let outcome = engine.apply(&mut ledger, &transfer);
        assert_eq!(outcome.failure_reason, Some(FailureKind::InvalidRecipient));
        assert_eq!(outcome.reported, None);
        assert!(!outcome.is_false_report());

        let outcome = engine.apply(&mut ledger, &transfer.drifting());
        assert_eq!(outcome.failure_reason, Some(FailureKind::InvalidRecipient));
        assert_eq!(outcome.applied, Amount::ZERO);
        assert_eq!(outcome.reported, Some(amount(5)));
        assert!(outcome.is_false_report());
        assert_eq!(ledger, owner_ledger());
    }
}
