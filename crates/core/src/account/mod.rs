//! Balance-bearing account model.
//!
//! An [`Account`] is any entity that carries a balance: a primary wallet, a
//! budget sub-card, an escrow hold, or a loan outstanding tracker. Accounts
//! are the only shared mutable state in the system and are mutated
//! exclusively by the transfer engine under row locks.

use chrono::{DateTime, Utc};
use payvault_shared::{AccountId, OwnerId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Classification of a balance-bearing account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    /// A primary wallet holding spendable funds.
    Wallet,
    /// A budget sub-card funded from a wallet, optionally capped per month.
    BudgetCard,
    /// A neutral account holding funds pending escrow resolution.
    Escrow,
    /// A memorandum account tracking outstanding loan principal. Carries a
    /// signed figure and holds no spendable funds.
    Loan,
}

impl AccountKind {
    /// Whether balances of this kind must never go negative.
    #[must_use]
    pub const fn enforces_non_negative(self) -> bool {
        matches!(self, Self::Wallet | Self::BudgetCard)
    }

    /// Whether balances of this kind represent real funds.
    ///
    /// Monetary kinds participate in the zero-sum check for internal
    /// operations and in the system-wide conservation invariant. Loan
    /// accounts are memorandum-only and are excluded from both.
    #[must_use]
    pub const fn is_monetary(self) -> bool {
        !matches!(self, Self::Loan)
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wallet => write!(f, "wallet"),
            Self::BudgetCard => write!(f, "budget_card"),
            Self::Escrow => write!(f, "escrow"),
            Self::Loan => write!(f, "loan"),
        }
    }
}

/// Lifecycle status of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Account participates in operations normally.
    Active,
    /// Account is temporarily blocked; all operations touching it fail.
    Frozen,
    /// Account is permanently retired.
    Closed,
}

/// A balance-bearing account row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique, totally ordered identifier.
    pub id: AccountId,
    /// Verified owner supplied by the authentication layer.
    pub owner_id: OwnerId,
    /// Account classification.
    pub kind: AccountKind,
    /// Lifecycle status.
    pub status: AccountStatus,
    /// Current balance. Never negative for wallet and budget-card kinds.
    pub balance: Decimal,
    /// Monthly spend cap; budget cards only.
    pub monthly_limit: Option<Decimal>,
    /// Bumped on every balance write.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Creates a new active account with a zero balance.
    #[must_use]
    pub fn new(owner_id: OwnerId, kind: AccountKind) -> Self {
        let now = Utc::now();
        Self {
            id: AccountId::new(),
            owner_id,
            kind,
            status: AccountStatus::Active,
            balance: Decimal::ZERO,
            monthly_limit: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the monthly spend cap (budget cards).
    #[must_use]
    pub fn with_monthly_limit(mut self, limit: Decimal) -> Self {
        self.monthly_limit = Some(limit);
        self
    }

    /// Whether the account accepts operations.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, AccountStatus::Active)
    }
}
