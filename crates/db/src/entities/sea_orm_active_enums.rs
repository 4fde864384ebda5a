//! Database enum mappings.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account classification (`account_kind`).
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_kind")]
pub enum AccountKind {
    /// Primary wallet.
    #[sea_orm(string_value = "wallet")]
    Wallet,
    /// Budget sub-card.
    #[sea_orm(string_value = "budget_card")]
    BudgetCard,
    /// Escrow hold account.
    #[sea_orm(string_value = "escrow")]
    Escrow,
    /// Loan outstanding tracker.
    #[sea_orm(string_value = "loan")]
    Loan,
}

/// Account lifecycle status (`account_status`).
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_status")]
pub enum AccountStatus {
    /// Operating normally.
    #[sea_orm(string_value = "active")]
    Active,
    /// Temporarily blocked.
    #[sea_orm(string_value = "frozen")]
    Frozen,
    /// Permanently retired.
    #[sea_orm(string_value = "closed")]
    Closed,
}

/// Ledger entry reason (`entry_reason`).
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "entry_reason")]
pub enum EntryReason {
    /// Peer-to-peer transfer.
    #[sea_orm(string_value = "transfer")]
    Transfer,
    /// External deposit.
    #[sea_orm(string_value = "topup")]
    Topup,
    /// External withdrawal.
    #[sea_orm(string_value = "withdrawal")]
    Withdrawal,
    /// Wallet funding a budget card.
    #[sea_orm(string_value = "budget_allocate")]
    BudgetAllocate,
    /// Budget card expense.
    #[sea_orm(string_value = "budget_spend")]
    BudgetSpend,
    /// Buyer funds entering escrow.
    #[sea_orm(string_value = "escrow_hold")]
    EscrowHold,
    /// Escrow funds to seller.
    #[sea_orm(string_value = "escrow_release")]
    EscrowRelease,
    /// Escrow funds back to buyer.
    #[sea_orm(string_value = "escrow_refund")]
    EscrowRefund,
    /// Loan principal out.
    #[sea_orm(string_value = "loan_disburse")]
    LoanDisburse,
    /// Loan principal back.
    #[sea_orm(string_value = "loan_repay")]
    LoanRepay,
    /// Subscription charge.
    #[sea_orm(string_value = "subscription_charge")]
    SubscriptionCharge,
}

/// Escrow order status (`escrow_status`).
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "escrow_status")]
pub enum EscrowStatus {
    /// Created, funds not moved.
    #[sea_orm(string_value = "PENDING")]
    Pending,
    /// Funds held.
    #[sea_orm(string_value = "HELD")]
    Held,
    /// Funds released to seller.
    #[sea_orm(string_value = "RELEASED")]
    Released,
    /// Funds refunded to buyer.
    #[sea_orm(string_value = "REFUNDED")]
    Refunded,
}

/// Subscription billing cadence (`billing_cycle`).
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "billing_cycle")]
pub enum BillingCycle {
    /// Every 7 days.
    #[sea_orm(string_value = "weekly")]
    Weekly,
    /// Every month.
    #[sea_orm(string_value = "monthly")]
    Monthly,
    /// Every 3 months.
    #[sea_orm(string_value = "quarterly")]
    Quarterly,
    /// Every 12 months.
    #[sea_orm(string_value = "yearly")]
    Yearly,
}

/// Scheduled obligation status (`obligation_status`).
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "obligation_status")]
pub enum ObligationStatus {
    /// Waiting for its due date.
    #[sea_orm(string_value = "scheduled")]
    Scheduled,
    /// Charge committed.
    #[sea_orm(string_value = "settled")]
    Settled,
    /// Charge rejected.
    #[sea_orm(string_value = "failed")]
    Failed,
}
