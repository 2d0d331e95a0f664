//! Balance ledger under test
//!
//! A plain value object: a map of account balances plus one aggregate
//! counter (`totalDeposits`, `totalSupply`, ...) that is *meant* to equal
//! their sum. The ledger stores whatever it is told and never validates
//! that relationship itself; see [`crate::checker`] for that.
//!
//! Zero balances are not stored, so an account credited and fully debited
//! compares equal to one never touched.

use crate::{
    error::LedgerError,
    types::{amount_serde, AccountId, Amount, SignedAmount},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Balances and aggregate counter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LedgerRepr", into = "LedgerRepr")]
pub struct Ledger {
    balances: BTreeMap<AccountId, Amount>,
    aggregate: Amount,
}

impl Ledger {
    /// Empty ledger: no balances, aggregate 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger seeded with an arbitrary distribution.
    ///
    /// The aggregate is taken as given, so a seed can start out of balance.
    pub fn seeded(
        balances: impl IntoIterator<Item = (AccountId, Amount)>,
        aggregate: Amount,
    ) -> Self {
        let mut ledger = Self {
            balances: BTreeMap::new(),
            aggregate,
        };
        for (account, amount) in balances {
            ledger.set_balance(account, amount);
        }
        ledger
    }

    /// Ledger whose aggregate equals the sum of the given balances
    pub fn balanced(
        balances: impl IntoIterator<Item = (AccountId, Amount)>,
    ) -> Result<Self, LedgerError> {
        let mut ledger = Self::new();
        for (account, amount) in balances {
            ledger.credit_balance(&account, amount)?;
            ledger.adjust_aggregate(SignedAmount::positive(amount))?;
        }
        Ok(ledger)
    }

    /// Balance of `account` (0 for unknown accounts)
    pub fn get_balance(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(Amount::ZERO)
    }

    /// Aggregate counter
    pub fn get_aggregate(&self) -> Amount {
        self.aggregate
    }

    /// Accounts holding a non-zero balance
    pub fn accounts(&self) -> impl Iterator<Item = &AccountId> {
        self.balances.keys()
    }

    /// All non-zero balances
    pub fn balances(&self) -> &BTreeMap<AccountId, Amount> {
        &self.balances
    }

    /// Add to a balance, failing on overflow
    pub fn credit_balance(&mut self, account: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        let balance = self.get_balance(account);
        let updated = balance.checked_add(amount).ok_or_else(|| {
            LedgerError::Overflow(format!("balance of {} + {}", account, amount))
        })?;
        self.set_balance(account.clone(), updated);
        Ok(())
    }

    /// Subtract from a balance, failing (never wrapping) when it is too small
    pub fn debit_balance(&mut self, account: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        let balance = self.get_balance(account);
        let updated =
            balance
                .checked_sub(amount)
                .ok_or_else(|| LedgerError::InsufficientBalance {
                    account: account.clone(),
                    balance,
                    requested: amount,
                })?;
        self.set_balance(account.clone(), updated);
        Ok(())
    }

    /// Move the aggregate by a signed delta, failing outside `0..=2^256-1`
    pub fn adjust_aggregate(&mut self, delta: SignedAmount) -> Result<(), LedgerError> {
        let magnitude = delta.magnitude();
        self.aggregate = if delta.is_negative() {
            self.aggregate
                .checked_sub(magnitude)
                .ok_or_else(|| LedgerError::Underflow(format!("aggregate - {}", magnitude)))?
        } else {
            self.aggregate
                .checked_add(magnitude)
                .ok_or_else(|| LedgerError::Overflow(format!("aggregate + {}", magnitude)))?
        };
        Ok(())
    }

    /// Overwrite a balance. Used by the engine to commit staged writes.
    pub(crate) fn set_balance(&mut self, account: AccountId, amount: Amount) {
        if amount.is_zero() {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, amount);
        }
    }

    /// Overwrite the aggregate. Used by the engine to commit staged writes.
    pub(crate) fn set_aggregate(&mut self, aggregate: Amount) {
        self.aggregate = aggregate;
    }
}

/// Wire form: amounts as decimal strings
#[derive(Serialize, Deserialize)]
struct LedgerRepr {
    #[serde(default)]
    balances: BTreeMap<AccountId, AmountRepr>,
    #[serde(default, with = "amount_serde")]
    aggregate: Amount,
}

#[derive(Serialize, Deserialize)]
#[serde(transparent)]
struct AmountRepr(#[serde(with = "amount_serde")] Amount);

impl From<LedgerRepr> for Ledger {
    fn from(repr: LedgerRepr) -> Self {
        Ledger::seeded(
            repr.balances.into_iter().map(|(k, AmountRepr(v))| (k, v)),
            repr.aggregate,
        )
    }
}

impl From<Ledger> for LedgerRepr {
    fn from(ledger: Ledger) -> Self {
        LedgerRepr {
            balances: ledger
                .balances
                .into_iter()
                .map(|(k, v)| (k, AmountRepr(v)))
                .collect(),
            aggregate: ledger.aggregate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(v: u64) -> Amount {
        Amount::from(v)
    }

    #[test]
    fn test_unknown_account_is_zero() {
        let ledger = Ledger::new();
        assert_eq!(ledger.get_balance(&AccountId::new("nobody")), Amount::ZERO);
        assert_eq!(ledger.get_aggregate(), Amount::ZERO);
    }

    #[test]
    fn test_debit_rejects_instead_of_wrapping() {
        let alice = AccountId::new("alice");
        let mut ledger = Ledger::seeded([(alice.clone(), amount(5))], amount(5));

        let err = ledger.debit_balance(&alice, amount(6)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert_eq!(ledger.get_balance(&alice), amount(5));

        ledger.debit_balance(&alice, amount(5)).unwrap();
        assert_eq!(ledger.get_balance(&alice), Amount::ZERO);
        assert_eq!(ledger.accounts().count(), 0);
    }

    #[test]
    fn test_credit_overflow() {
        let alice = AccountId::new("alice");
        let mut ledger = Ledger::seeded([(alice.clone(), Amount::MAX)], Amount::MAX);
        assert!(matches!(
            ledger.credit_balance(&alice, amount(1)),
            Err(LedgerError::Overflow(_))
        ));
        assert_eq!(ledger.get_balance(&alice), Amount::MAX);
    }

    #[test]
    fn test_adjust_aggregate() {
        let mut ledger = Ledger::new();
        ledger.adjust_aggregate(SignedAmount::positive(amount(10))).unwrap();
        ledger.adjust_aggregate(SignedAmount::negative(amount(4))).unwrap();
        assert_eq!(ledger.get_aggregate(), amount(6));
        assert!(ledger
            .adjust_aggregate(SignedAmount::negative(amount(7)))
            .is_err());
        assert_eq!(ledger.get_aggregate(), amount(6));
    }

    #[test]
    fn test_balanced_seed() {
        let ledger = Ledger::balanced([
            (AccountId::new("owner"), amount(1000)),
            (AccountId::new("user1"), amount(500)),
        ])
        .unwrap();
        assert_eq!(ledger.get_aggregate(), amount(1500));
    }

    #[test]
    fn test_serde_roundtrip_through_toml() {
        let text = r#"
            aggregate = "1000"

            [balances]
            owner = "900"
            user1 = 100
        "#;
        let ledger: Ledger = toml::from_str(text).unwrap();
        assert_eq!(ledger.get_balance(&AccountId::new("owner")), amount(900));
        assert_eq!(ledger.get_balance(&AccountId::new("user1")), amount(100));
        assert_eq!(ledger.get_aggregate(), amount(1000));

        let json = serde_json::to_value(&ledger).unwrap();
        assert_eq!(json["aggregate"], "1000");
        assert_eq!(json["balances"]["owner"], "900");
    }
}
