//! Transfer request and receipt types.

use payvault_shared::types::amount::{
    validate_amount, validate_loan_amount, validate_topup_amount,
};
use payvault_shared::{AccountId, OperationId, OwnerId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::{EntryReason, LedgerEntry, LedgerError};

/// One signed balance change within an operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Move {
    /// The account to adjust.
    pub account_id: AccountId,
    /// Signed amount. Never zero.
    pub delta: Decimal,
}

/// A complete description of one ledger operation.
///
/// Built through the per-operation constructors, which encode the move
/// shapes and amount rules of each business operation. The engine treats the
/// request as data: everything is re-validated under lock before commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Idempotence key shared by all entries this operation writes.
    pub operation_id: OperationId,
    /// Why the balances move.
    pub reason: EntryReason,
    /// The balance changes to apply.
    pub moves: Vec<Move>,
    /// Ownership claims verified against fresh rows under lock.
    pub required_owners: Vec<(AccountId, OwnerId)>,
    /// Optional human-readable note, copied onto every entry.
    pub memo: Option<String>,
    /// Free-form metadata, copied onto every entry.
    pub metadata: serde_json::Value,
}

impl TransferRequest {
    /// Creates a raw request. Prefer the per-operation constructors.
    #[must_use]
    pub fn new(operation_id: OperationId, reason: EntryReason, moves: Vec<Move>) -> Self {
        Self {
            operation_id,
            reason,
            moves,
            required_owners: Vec::new(),
            memo: None,
            metadata: serde_json::Value::Null,
        }
    }

    /// Adds an ownership claim checked against the fresh row under lock.
    #[must_use]
    pub fn require_owner(mut self, account_id: AccountId, owner_id: OwnerId) -> Self {
        self.required_owners.push((account_id, owner_id));
        self
    }

    /// Attaches a memo.
    #[must_use]
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    /// Attaches free-form metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Peer-to-peer transfer between two wallets; `actor` must own `from`.
    pub fn peer_transfer(
        operation_id: OperationId,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        actor: OwnerId,
    ) -> Result<Self, LedgerError> {
        validate_amount(amount)?;
        Ok(Self::new(
            operation_id,
            EntryReason::Transfer,
            vec![
                Move { account_id: from, delta: -amount },
                Move { account_id: to, delta: amount },
            ],
        )
        .require_owner(from, actor))
    }

    /// Wallet top-up from the external funding source.
    pub fn topup(
        operation_id: OperationId,
        wallet: AccountId,
        amount: Decimal,
    ) -> Result<Self, LedgerError> {
        validate_topup_amount(amount)?;
        Ok(Self::new(
            operation_id,
            EntryReason::Topup,
            vec![Move { account_id: wallet, delta: amount }],
        ))
    }

    /// Wallet withdrawal to the external funding source.
    pub fn withdrawal(
        operation_id: OperationId,
        wallet: AccountId,
        amount: Decimal,
        actor: OwnerId,
    ) -> Result<Self, LedgerError> {
        validate_amount(amount)?;
        Ok(Self::new(
            operation_id,
            EntryReason::Withdrawal,
            vec![Move { account_id: wallet, delta: -amount }],
        )
        .require_owner(wallet, actor))
    }

    /// Wallet funding a budget card; `actor` must own the wallet.
    pub fn budget_allocate(
        operation_id: OperationId,
        wallet: AccountId,
        card: AccountId,
        amount: Decimal,
        actor: OwnerId,
    ) -> Result<Self, LedgerError> {
        validate_amount(amount)?;
        Ok(Self::new(
            operation_id,
            EntryReason::BudgetAllocate,
            vec![
                Move { account_id: wallet, delta: -amount },
                Move { account_id: card, delta: amount },
            ],
        )
        .require_owner(wallet, actor))
    }

    /// Recorded expense against a budget card; `actor` must own the card.
    pub fn budget_spend(
        operation_id: OperationId,
        card: AccountId,
        amount: Decimal,
        actor: OwnerId,
    ) -> Result<Self, LedgerError> {
        validate_amount(amount)?;
        Ok(Self::new(
            operation_id,
            EntryReason::BudgetSpend,
            vec![Move { account_id: card, delta: -amount }],
        )
        .require_owner(card, actor))
    }

    /// Loan disbursement from lender to borrower; the loan account tracks
    /// the outstanding principal. `actor` must own the lender wallet.
    pub fn loan_disburse(
        operation_id: OperationId,
        lender: AccountId,
        borrower: AccountId,
        loan_account: AccountId,
        amount: Decimal,
        actor: OwnerId,
    ) -> Result<Self, LedgerError> {
        validate_loan_amount(amount)?;
        Ok(Self::new(
            operation_id,
            EntryReason::LoanDisburse,
            vec![
                Move { account_id: lender, delta: -amount },
                Move { account_id: borrower, delta: amount },
                Move { account_id: loan_account, delta: amount },
            ],
        )
        .require_owner(lender, actor))
    }

    /// Loan repayment from borrower back to lender; `actor` must own the
    /// borrower wallet.
    pub fn loan_repay(
        operation_id: OperationId,
        borrower: AccountId,
        lender: AccountId,
        loan_account: AccountId,
        amount: Decimal,
        actor: OwnerId,
    ) -> Result<Self, LedgerError> {
        validate_amount(amount)?;
        Ok(Self::new(
            operation_id,
            EntryReason::LoanRepay,
            vec![
                Move { account_id: borrower, delta: -amount },
                Move { account_id: lender, delta: amount },
                Move { account_id: loan_account, delta: -amount },
            ],
        )
        .require_owner(borrower, actor))
    }

    /// Buyer funds moving into an escrow account.
    pub fn escrow_hold(
        operation_id: OperationId,
        buyer: AccountId,
        escrow: AccountId,
        amount: Decimal,
    ) -> Result<Self, LedgerError> {
        validate_amount(amount)?;
        Ok(Self::new(
            operation_id,
            EntryReason::EscrowHold,
            vec![
                Move { account_id: buyer, delta: -amount },
                Move { account_id: escrow, delta: amount },
            ],
        ))
    }

    /// Escrow funds moving to the seller wallet.
    pub fn escrow_release(
        operation_id: OperationId,
        escrow: AccountId,
        seller: AccountId,
        amount: Decimal,
    ) -> Result<Self, LedgerError> {
        validate_amount(amount)?;
        Ok(Self::new(
            operation_id,
            EntryReason::EscrowRelease,
            vec![
                Move { account_id: escrow, delta: -amount },
                Move { account_id: seller, delta: amount },
            ],
        ))
    }

    /// Escrow funds returning to the buyer wallet.
    pub fn escrow_refund(
        operation_id: OperationId,
        escrow: AccountId,
        buyer: AccountId,
        amount: Decimal,
    ) -> Result<Self, LedgerError> {
        validate_amount(amount)?;
        Ok(Self::new(
            operation_id,
            EntryReason::EscrowRefund,
            vec![
                Move { account_id: escrow, delta: -amount },
                Move { account_id: buyer, delta: amount },
            ],
        ))
    }

    /// Subscription payment charged against a budget card.
    pub fn subscription_charge(
        operation_id: OperationId,
        card: AccountId,
        amount: Decimal,
    ) -> Result<Self, LedgerError> {
        validate_amount(amount)?;
        Ok(Self::new(
            operation_id,
            EntryReason::SubscriptionCharge,
            vec![Move { account_id: card, delta: -amount }],
        ))
    }
}

/// Outcome of a committed (or replayed) transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReceipt {
    /// The operation this receipt belongs to.
    pub operation_id: OperationId,
    /// `false` when the operation had already been applied and this call was
    /// an idempotent replay.
    pub applied: bool,
    /// The entries written by this call; empty on a replay.
    pub entries: Vec<LedgerEntry>,
}

impl TransferReceipt {
    pub(crate) fn applied(operation_id: OperationId, entries: Vec<LedgerEntry>) -> Self {
        Self { operation_id, applied: true, entries }
    }

    pub(crate) const fn already_applied(operation_id: OperationId) -> Self {
        Self {
            operation_id,
            applied: false,
            entries: Vec::new(),
        }
    }
}
