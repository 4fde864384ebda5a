//! Error taxonomy for ledger operations.
//!
//! Business-rule violations are expected outcomes and travel as typed `Err`
//! values; only [`LedgerError::StoreUnavailable`] is fatal to a request.

use payvault_shared::{
    AccountId, AmountError, ListingId, ObligationId, OperationId, OrderId, SubscriptionId,
};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::escrow::EscrowStatus;
use crate::store::StoreError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// A debit would take a non-negative account below zero.
    #[error(
        "insufficient funds on account {account_id}: requested {requested}, available {available} (short {})",
        .requested - .available
    )]
    InsufficientFunds {
        /// The account that could not cover the debit.
        account_id: AccountId,
        /// Balance available at validation time.
        available: Decimal,
        /// Total debit requested against the account.
        requested: Decimal,
    },

    /// Account is frozen; no operations may touch it.
    #[error("account {0} is frozen")]
    AccountFrozen(AccountId),

    /// Account has been closed.
    #[error("account {0} is closed")]
    AccountClosed(AccountId),

    /// Account does not exist.
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    /// Operation requires an account of a different kind.
    #[error("account {account_id} is not a {expected} account")]
    AccountKindMismatch {
        /// The offending account.
        account_id: AccountId,
        /// The kind the operation requires.
        expected: crate::account::AccountKind,
    },

    /// The amount fails the platform input rules.
    #[error("invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    /// The request contains no moves.
    #[error("operation contains no moves")]
    EmptyOperation,

    /// An internal operation does not net to zero over monetary accounts.
    #[error("operation is not balanced: monetary moves sum to {sum}")]
    UnbalancedOperation {
        /// The nonzero sum of monetary deltas.
        sum: Decimal,
    },

    /// Escrow order is not in a state that allows the requested transition.
    #[error("invalid escrow transition: order is {from}, cannot move to {to}")]
    InvalidStateTransition {
        /// Status observed under lock.
        from: EscrowStatus,
        /// Status the caller asked for.
        to: EscrowStatus,
    },

    /// Escrow order does not exist.
    #[error("escrow order not found: {0}")]
    OrderNotFound(OrderId),

    /// Subscription does not exist.
    #[error("subscription not found: {0}")]
    SubscriptionNotFound(SubscriptionId),

    /// Scheduled obligation does not exist.
    #[error("scheduled obligation not found: {0}")]
    ObligationNotFound(ObligationId),

    /// A budget-card spend would exceed the configured monthly limit.
    #[error(
        "spend exceeds monthly limit: requested {requested}, {} remaining of {limit}",
        .limit - .spent
    )]
    MonthlyLimitExceeded {
        /// The configured monthly cap.
        limit: Decimal,
        /// Amount already spent this month.
        spent: Decimal,
        /// Amount the caller asked to spend.
        requested: Decimal,
    },

    /// Caller does not own the account the operation requires.
    #[error("caller is not authorized for account {account_id}")]
    Unauthorized {
        /// The account whose ownership check failed.
        account_id: AccountId,
    },

    /// A row lock could not be acquired within the bounded wait.
    #[error("lock wait timed out for account {0}; retry the operation")]
    LockTimeout(AccountId),

    /// The operation was already applied (idempotence hit).
    ///
    /// Success-equivalent: callers translate this into an `AlreadyApplied`
    /// receipt rather than surfacing it to the user.
    #[error("operation {0} was already applied")]
    DuplicateOperation(OperationId),

    /// Listing is missing, sold, or otherwise not purchasable.
    #[error("listing {0} is unavailable")]
    ListingUnavailable(ListingId),

    /// The backing store cannot be reached. Fatal; never retried by the core.
    #[error("storage unavailable: {0}")]
    StoreUnavailable(String),
}

impl LedgerError {
    /// Returns the stable error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::AccountFrozen(_) => "ACCOUNT_FROZEN",
            Self::AccountClosed(_) => "ACCOUNT_CLOSED",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::AccountKindMismatch { .. } => "ACCOUNT_KIND_MISMATCH",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::EmptyOperation => "EMPTY_OPERATION",
            Self::UnbalancedOperation { .. } => "UNBALANCED_OPERATION",
            Self::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            Self::OrderNotFound(_) => "ORDER_NOT_FOUND",
            Self::SubscriptionNotFound(_) => "SUBSCRIPTION_NOT_FOUND",
            Self::ObligationNotFound(_) => "OBLIGATION_NOT_FOUND",
            Self::MonthlyLimitExceeded { .. } => "MONTHLY_LIMIT_EXCEEDED",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::LockTimeout(_) => "LOCK_TIMEOUT",
            Self::DuplicateOperation(_) => "DUPLICATE_OPERATION",
            Self::ListingUnavailable(_) => "LISTING_UNAVAILABLE",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
        }
    }

    /// Whether the caller may retry the operation unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout(_))
    }

    /// Whether the error should abort the whole request (5xx-equivalent).
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::LockTimeout(account_id) => Self::LockTimeout(account_id),
            StoreError::DuplicateKey(key) => match key.operation_id {
                Some(op) => Self::DuplicateOperation(op),
                None => Self::StoreUnavailable(format!("unexpected duplicate key: {}", key.constraint)),
            },
            StoreError::RowNotFound(what) => Self::StoreUnavailable(format!("row vanished: {what}")),
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_insufficient_funds_reports_shortfall() {
        let err = LedgerError::InsufficientFunds {
            account_id: AccountId::from_uuid(uuid::Uuid::nil()),
            available: dec!(40),
            requested: dec!(60),
        };
        let msg = err.to_string();
        assert!(msg.contains("requested 60"));
        assert!(msg.contains("available 40"));
        assert!(msg.contains("short 20"));
    }

    #[test]
    fn test_monthly_limit_message_distinct_from_balance() {
        let err = LedgerError::MonthlyLimitExceeded {
            limit: dec!(100),
            spent: dec!(90),
            requested: dec!(20),
        };
        let msg = err.to_string();
        assert!(msg.contains("monthly limit"));
        assert!(msg.contains("10 remaining of 100"));
    }

    #[test]
    fn test_only_lock_timeout_is_retryable() {
        let account = AccountId::new();
        assert!(LedgerError::LockTimeout(account).is_retryable());
        assert!(!LedgerError::AccountFrozen(account).is_retryable());
        assert!(!LedgerError::StoreUnavailable("down".into()).is_retryable());
    }

    #[test]
    fn test_only_store_unavailable_is_fatal() {
        assert!(LedgerError::StoreUnavailable("down".into()).is_fatal());
        assert!(!LedgerError::LockTimeout(AccountId::new()).is_fatal());
    }

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(
            LedgerError::DuplicateOperation(OperationId::new()).error_code(),
            "DUPLICATE_OPERATION"
        );
        assert_eq!(
            LedgerError::ListingUnavailable(ListingId::new()).error_code(),
            "LISTING_UNAVAILABLE"
        );
    }
}
