//! Operations replayed against a ledger
//!
//! Each [`Operation`] pairs an [`Action`] (what happens to balances) with a
//! [`Mode`] (whether the aggregate bookkeeping is carried out). This is the
//! `correctX` / `vulnerableX` pairing of the modeled contracts expressed as
//! one vocabulary.
//!
//! Serialized form (TOML/JSON):
//!
//! ```text
//! { "op": "fee_transfer", "from": "user1", "to": "user2",
//!   "amount": "100", "fee": "10", "mode": "drifting" }
//! ```

use crate::types::{amount_serde, AccountId, Amount};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregate bookkeeping discipline of one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Aggregate updated alongside balances
    #[default]
    Consistent,
    /// Aggregate update skipped
    Drifting,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Consistent => write!(f, "consistent"),
            Mode::Drifting => write!(f, "drifting"),
        }
    }
}

/// Operation discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Credit a balance from outside the ledger
    Deposit,
    /// Debit a balance to outside the ledger
    Withdraw,
    /// Move funds between accounts, charging a fee to the sender
    FeeTransfer,
    /// Privileged credit (`adminReward`, `rescueCredit`)
    AdminCredit,
    /// Clear one balance entirely
    EmergencyWithdraw,
    /// Move funds between accounts
    Transfer,
    /// Send the same amount to several recipients
    BatchTransfer,
}

impl OperationKind {
    /// snake_case name, as used in scenario files
    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::Deposit => "deposit",
            OperationKind::Withdraw => "withdraw",
            OperationKind::FeeTransfer => "fee_transfer",
            OperationKind::AdminCredit => "admin_credit",
            OperationKind::EmergencyWithdraw => "emergency_withdraw",
            OperationKind::Transfer => "transfer",
            OperationKind::BatchTransfer => "batch_transfer",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Balance-level effect of an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    /// `balances[account] += amount`
    Deposit {
        /// Depositor
        account: AccountId,
        /// Deposited amount
        #[serde(with = "amount_serde")]
        amount: Amount,
    },

    /// `balances[account] -= amount`
    Withdraw {
        /// Withdrawing account
        account: AccountId,
        /// Withdrawn amount
        #[serde(with = "amount_serde")]
        amount: Amount,
    },

    /// `balances[from] -= amount + fee; balances[to] += amount`
    FeeTransfer {
        /// Sender, pays amount and fee
        from: AccountId,
        /// Recipient
        to: AccountId,
        /// Amount received by `to`
        #[serde(with = "amount_serde")]
        amount: Amount,
        /// Fee removed from circulation
        #[serde(with = "amount_serde")]
        fee: Amount,
    },

    /// `balances[account] += amount`
    AdminCredit {
        /// Credited account
        account: AccountId,
        /// Credited amount
        #[serde(with = "amount_serde")]
        amount: Amount,
    },

    /// `balances[account] = 0`
    EmergencyWithdraw {
        /// Account being cleared
        account: AccountId,
    },

    /// `balances[from] -= amount; balances[to] += amount`
    Transfer {
        /// Sender
        from: AccountId,
        /// Recipient
        to: AccountId,
        /// Moved amount
        #[serde(with = "amount_serde")]
        amount: Amount,
    },

    /// `balances[from] -= amount * n; balances[r] += amount` for each recipient
    BatchTransfer {
        /// Sender
        from: AccountId,
        /// Recipients, each receiving `amount`
        recipients: Vec<AccountId>,
        /// Per-recipient amount
        #[serde(with = "amount_serde")]
        amount: Amount,
    },
}

impl Action {
    /// Discriminant
    pub fn kind(&self) -> OperationKind {
        match self {
            Action::Deposit { .. } => OperationKind::Deposit,
            Action::Withdraw { .. } => OperationKind::Withdraw,
            Action::FeeTransfer { .. } => OperationKind::FeeTransfer,
            Action::AdminCredit { .. } => OperationKind::AdminCredit,
            Action::EmergencyWithdraw { .. } => OperationKind::EmergencyWithdraw,
            Action::Transfer { .. } => OperationKind::Transfer,
            Action::BatchTransfer { .. } => OperationKind::BatchTransfer,
        }
    }

    /// Mode used when none is given.
    ///
    /// Admin credits and emergency withdrawals are the modeled drift sources,
    /// so they default to [`Mode::Drifting`].
    pub fn default_mode(&self) -> Mode {
        match self {
            Action::AdminCredit { .. } | Action::EmergencyWithdraw { .. } => Mode::Drifting,
            _ => Mode::Consistent,
        }
    }

    /// Every account the action names, senders first, without duplicates
    pub fn accounts(&self) -> Vec<AccountId> {
        let mut accounts: Vec<AccountId> = match self {
            Action::Deposit { account, .. }
            | Action::Withdraw { account, .. }
            | Action::AdminCredit { account, .. }
            | Action::EmergencyWithdraw { account } => vec![account.clone()],
            Action::FeeTransfer { from, to, .. } | Action::Transfer { from, to, .. } => {
                vec![from.clone(), to.clone()]
            }
            Action::BatchTransfer {
                from, recipients, ..
            } => std::iter::once(from.clone())
                .chain(recipients.iter().cloned())
                .collect(),
        };
        let mut seen = std::collections::HashSet::new();
        accounts.retain(|a| seen.insert(a.clone()));
        accounts
    }
}

/// One state-mutating step of a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// What happens to balances
    #[serde(flatten)]
    pub action: Action,

    /// Explicit mode; `None` means [`Action::default_mode`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,

    /// Amount the operation announces (its event); `None` announces the
    /// amount actually moved
    #[serde(
        default,
        with = "crate::types::amount_serde::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub reported: Option<Amount>,
}

impl Operation {
    /// Wrap an action with its default mode
    pub fn new(action: Action) -> Self {
        Self {
            action,
            mode: None,
            reported: None,
        }
    }

    /// Deposit (consistent by default)
    pub fn deposit(account: impl Into<AccountId>, amount: Amount) -> Self {
        Self::new(Action::Deposit {
            account: account.into(),
            amount,
        })
    }

    /// Withdraw (consistent by default)
    pub fn withdraw(account: impl Into<AccountId>, amount: Amount) -> Self {
        Self::new(Action::Withdraw {
            account: account.into(),
            amount,
        })
    }

    /// Fee-bearing transfer (consistent by default: the fee is burned from the aggregate)
    pub fn fee_transfer(
        from: impl Into<AccountId>,
        to: impl Into<AccountId>,
        amount: Amount,
        fee: Amount,
    ) -> Self {
        Self::new(Action::FeeTransfer {
            from: from.into(),
            to: to.into(),
            amount,
            fee,
        })
    }

    /// Admin credit (drifting by default: phantom funds)
    pub fn admin_credit(account: impl Into<AccountId>, amount: Amount) -> Self {
        Self::new(Action::AdminCredit {
            account: account.into(),
            amount,
        })
    }

    /// Emergency withdraw (drifting by default: ghost deposits)
    pub fn emergency_withdraw(account: impl Into<AccountId>) -> Self {
        Self::new(Action::EmergencyWithdraw {
            account: account.into(),
        })
    }

    /// Plain transfer
    pub fn transfer(from: impl Into<AccountId>, to: impl Into<AccountId>, amount: Amount) -> Self {
        Self::new(Action::Transfer {
            from: from.into(),
            to: to.into(),
            amount,
        })
    }

    /// Batch transfer of `amount` to each recipient
    pub fn batch_transfer(
        from: impl Into<AccountId>,
        recipients: impl IntoIterator<Item = AccountId>,
        amount: Amount,
    ) -> Self {
        Self::new(Action::BatchTransfer {
            from: from.into(),
            recipients: recipients.into_iter().collect(),
            amount,
        })
    }

    /// Set an explicit mode
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Skip the aggregate update
    pub fn drifting(self) -> Self {
        self.with_mode(Mode::Drifting)
    }

    /// Perform the aggregate update
    pub fn consistent(self) -> Self {
        self.with_mode(Mode::Consistent)
    }

    /// Announce `amount` regardless of what the operation moves
    pub fn reporting(mut self, amount: Amount) -> Self {
        self.reported = Some(amount);
        self
    }

    /// Effective mode
    pub fn mode(&self) -> Mode {
        self.mode.unwrap_or_else(|| self.action.default_mode())
    }

    /// Discriminant
    pub fn kind(&self) -> OperationKind {
        self.action.kind()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.action {
            Action::Deposit { account, amount } => write!(f, "deposit({}, {})", account, amount)?,
            Action::Withdraw { account, amount } => write!(f, "withdraw({}, {})", account, amount)?,
            Action::FeeTransfer {
                from,
                to,
                amount,
                fee,
            } => write!(f, "fee_transfer({} -> {}, {}, fee {})", from, to, amount, fee)?,
            Action::AdminCredit { account, amount } => {
                write!(f, "admin_credit({}, {})", account, amount)?
            }
            Action::EmergencyWithdraw { account } => write!(f, "emergency_withdraw({})", account)?,
            Action::Transfer { from, to, amount } => {
                write!(f, "transfer({} -> {}, {})", from, to, amount)?
            }
            Action::BatchTransfer {
                from,
                recipients,
                amount,
            } => write!(
                f,
                "batch_transfer({} -> {} recipients, {} each)",
                from,
                recipients.len(),
                amount
            )?,
        }
        if let Some(reported) = self.reported {
            write!(f, " reports {}", reported)?;
        }
        write!(f, " [{}]", self.mode())
    }
}
