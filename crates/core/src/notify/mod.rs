//! Fire-and-forget notification seam.
//!
//! The core calls the notification layer after successful financial events.
//! Delivery failure is logged and swallowed: it must never roll back or fail
//! the operation that triggered it.

use payvault_shared::{AccountId, ObligationId, OperationId, OrderId, SubscriptionId};
use thiserror::Error;

use crate::escrow::EscrowStatus;
use crate::ledger::EntryReason;

/// A financial event worth telling the user about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    /// A transfer committed.
    TransferApplied {
        /// The operation that committed.
        operation_id: OperationId,
        /// Why the balances moved.
        reason: EntryReason,
        /// The accounts whose balances changed.
        accounts: Vec<AccountId>,
    },
    /// An escrow order reached a terminal state.
    EscrowResolved {
        /// The resolved order.
        order_id: OrderId,
        /// The terminal status (released or refunded).
        status: EscrowStatus,
    },
    /// A subscription charge settled.
    ObligationSettled {
        /// The settled obligation.
        obligation_id: ObligationId,
        /// Its subscription.
        subscription_id: SubscriptionId,
    },
    /// A subscription charge failed for lack of funds.
    ObligationFailed {
        /// The failed obligation.
        obligation_id: ObligationId,
        /// Its subscription.
        subscription_id: SubscriptionId,
    },
}

/// Notification delivery failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Delivery seam for the external notification layer.
///
/// Implementations should return quickly; anything slow belongs behind a
/// queue on the implementation side.
pub trait Notifier: Send + Sync {
    /// Delivers one event.
    fn notify(&self, event: &LedgerEvent) -> Result<(), NotifyError>;
}

/// Discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _event: &LedgerEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Logs events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &LedgerEvent) -> Result<(), NotifyError> {
        tracing::info!(?event, "ledger event");
        Ok(())
    }
}
