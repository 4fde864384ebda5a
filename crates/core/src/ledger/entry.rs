//! Immutable ledger entries.

use chrono::{DateTime, Utc};
use payvault_shared::{AccountId, EntryId, OperationId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Why a ledger entry exists.
///
/// Reasons partition into *internal* movements, which shuffle funds between
/// accounts and must net to zero over the monetary accounts of one operation,
/// and *external flows*, which exchange value with the outside funding source
/// and therefore change the system-wide total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryReason {
    /// Peer-to-peer transfer between wallets.
    Transfer,
    /// Funds entering from the external funding source.
    Topup,
    /// Funds leaving to the external funding source.
    Withdrawal,
    /// Wallet funding a budget card.
    BudgetAllocate,
    /// Recorded expense against a budget card.
    BudgetSpend,
    /// Buyer funds moving into an escrow account.
    EscrowHold,
    /// Escrow funds moving to the seller wallet.
    EscrowRelease,
    /// Escrow funds returning to the buyer wallet.
    EscrowRefund,
    /// Loan principal moving from lender to borrower.
    LoanDisburse,
    /// Loan principal moving from borrower back to lender.
    LoanRepay,
    /// Subscription payment charged against a budget card.
    SubscriptionCharge,
}

impl EntryReason {
    /// Whether this reason moves funds inside the system.
    ///
    /// Internal reasons must net to zero over the monetary accounts of the
    /// operation; external-flow reasons are exempt because their counterpart
    /// is the outside funding source.
    #[must_use]
    pub const fn is_internal(self) -> bool {
        !matches!(
            self,
            Self::Topup | Self::Withdrawal | Self::BudgetSpend | Self::SubscriptionCharge
        )
    }

    /// Stable string form, matching the persisted enum.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::Topup => "topup",
            Self::Withdrawal => "withdrawal",
            Self::BudgetAllocate => "budget_allocate",
            Self::BudgetSpend => "budget_spend",
            Self::EscrowHold => "escrow_hold",
            Self::EscrowRelease => "escrow_release",
            Self::EscrowRefund => "escrow_refund",
            Self::LoanDisburse => "loan_disburse",
            Self::LoanRepay => "loan_repay",
            Self::SubscriptionCharge => "subscription_charge",
        }
    }
}

impl std::fmt::Display for EntryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of a single signed balance change.
///
/// Created only by the transfer engine, never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry identifier.
    pub id: EntryId,
    /// The account whose balance changed.
    pub account_id: AccountId,
    /// Signed amount applied to the balance. Never zero.
    pub delta: Decimal,
    /// Correlates all entries written by one logical operation; doubles as
    /// the idempotence key.
    pub operation_id: OperationId,
    /// Why the balance changed.
    pub reason: EntryReason,
    /// Optional human-readable note.
    pub memo: Option<String>,
    /// Free-form operation metadata.
    pub metadata: serde_json::Value,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}
