//! Escrow order types and the listing-catalog seam.

use chrono::{DateTime, Utc};
use payvault_shared::{AccountId, ListingId, OrderId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::LedgerError;

/// Lifecycle of an escrow order.
///
/// `Pending → Held → {Released | Refunded}`; the terminal states are final
/// and orders are never physically deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscrowStatus {
    /// Order created; funds not yet moved.
    Pending,
    /// Buyer funds sit on the escrow account.
    Held,
    /// Funds went to the seller. Terminal.
    Released,
    /// Funds went back to the buyer. Terminal.
    Refunded,
}

impl EscrowStatus {
    /// Whether the order can never transition again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Released | Self::Refunded)
    }
}

impl std::fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Held => write!(f, "HELD"),
            Self::Released => write!(f, "RELEASED"),
            Self::Refunded => write!(f, "REFUNDED"),
        }
    }
}

/// A marketplace order holding funds pending fulfillment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowOrder {
    /// Unique order identifier.
    pub id: OrderId,
    /// The listing this order purchases.
    pub listing_id: ListingId,
    /// The buyer's wallet.
    pub buyer_account_id: AccountId,
    /// The seller's wallet.
    pub seller_account_id: AccountId,
    /// The dedicated account holding the funds while the order is open.
    pub escrow_account_id: AccountId,
    /// Purchase amount.
    pub amount: Decimal,
    /// Current lifecycle state.
    pub status: EscrowStatus,
    /// When the order was created.
    pub created_at: DateTime<Utc>,
    /// When the order reached a terminal state.
    pub resolved_at: Option<DateTime<Utc>>,
}

/// What the marketplace knows about a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingInfo {
    /// The listing.
    pub listing_id: ListingId,
    /// Wallet of the seller, credited on release.
    pub seller_account_id: AccountId,
    /// Asking price.
    pub price: Decimal,
    /// Whether the listing can currently be bought.
    pub available: bool,
}

/// Read-only seam to the external listing/catalog service.
#[allow(async_fn_in_trait)]
pub trait ListingCatalog: Send + Sync {
    /// Looks up a listing; `None` if it does not exist.
    async fn listing(&self, id: ListingId) -> Result<Option<ListingInfo>, LedgerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!EscrowStatus::Pending.is_terminal());
        assert!(!EscrowStatus::Held.is_terminal());
        assert!(EscrowStatus::Released.is_terminal());
        assert!(EscrowStatus::Refunded.is_terminal());
    }

    #[test]
    fn test_status_display_matches_wire_form() {
        assert_eq!(EscrowStatus::Held.to_string(), "HELD");
        assert_eq!(EscrowStatus::Refunded.to_string(), "REFUNDED");
    }
}
