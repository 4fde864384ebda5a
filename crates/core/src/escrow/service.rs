//! Escrow order operations.

use std::sync::Arc;

use chrono::Utc;
use payvault_shared::{AccountId, OperationId, OrderId, OwnerId};
use tracing::{info, warn};

use super::types::{EscrowOrder, EscrowStatus, ListingCatalog};
use crate::account::{Account, AccountKind};
use crate::ledger::LedgerError;
use crate::notify::LedgerEvent;
use crate::store::{LedgerStore, LedgerTxn};
use crate::transfer::{OperationGuard, TransferEngine, TransferRequest};

/// Stages an escrow status transition inside the engine's transaction.
///
/// The re-read happens under the escrow account's row lock, so two
/// concurrent resolutions of the same order serialize there: the second one
/// observes the terminal status and fails with `InvalidStateTransition`.
#[derive(Debug, Clone, Copy)]
pub struct EscrowTransitionGuard {
    order_id: OrderId,
    from: EscrowStatus,
    to: EscrowStatus,
}

impl EscrowTransitionGuard {
    /// Creates a guard for a `from → to` transition.
    #[must_use]
    pub const fn new(order_id: OrderId, from: EscrowStatus, to: EscrowStatus) -> Self {
        Self { order_id, from, to }
    }
}

impl<T: LedgerTxn> OperationGuard<T> for EscrowTransitionGuard {
    async fn enforce(&self, txn: &mut T) -> Result<(), LedgerError> {
        let mut order = txn
            .get_escrow_order(self.order_id)
            .await?
            .ok_or(LedgerError::OrderNotFound(self.order_id))?;
        if order.status != self.from {
            return Err(LedgerError::InvalidStateTransition {
                from: order.status,
                to: self.to,
            });
        }
        order.status = self.to;
        if self.to.is_terminal() {
            order.resolved_at = Some(Utc::now());
        }
        txn.update_escrow_order(&order).await?;
        Ok(())
    }
}

/// Marketplace escrow operations, layered on the transfer engine.
pub struct EscrowService<S: LedgerStore, C: ListingCatalog> {
    engine: Arc<TransferEngine<S>>,
    catalog: C,
}

impl<S: LedgerStore, C: ListingCatalog> EscrowService<S, C> {
    /// Creates the service.
    pub fn new(engine: Arc<TransferEngine<S>>, catalog: C) -> Self {
        Self { engine, catalog }
    }

    /// Commits a buyer to a listing.
    ///
    /// Creates the escrow account and a `Pending` order, then moves the
    /// purchase amount out of the buyer wallet atomically with the
    /// `Pending → Held` transition. On `InsufficientFunds` the order stays
    /// `Pending` and no money moves.
    pub async fn create_order(
        &self,
        buyer_account_id: AccountId,
        listing_id: payvault_shared::ListingId,
        actor: OwnerId,
    ) -> Result<EscrowOrder, LedgerError> {
        let listing = self
            .catalog
            .listing(listing_id)
            .await?
            .ok_or(LedgerError::ListingUnavailable(listing_id))?;
        if !listing.available {
            return Err(LedgerError::ListingUnavailable(listing_id));
        }

        let mut txn = self.engine.store().begin().await?;
        let buyer = txn
            .get_account(buyer_account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(buyer_account_id))?;
        if buyer.owner_id != actor {
            return Err(LedgerError::Unauthorized {
                account_id: buyer_account_id,
            });
        }

        let escrow_account = Account::new(buyer.owner_id, AccountKind::Escrow);
        let order = EscrowOrder {
            id: OrderId::new(),
            listing_id,
            buyer_account_id,
            seller_account_id: listing.seller_account_id,
            escrow_account_id: escrow_account.id,
            amount: listing.price,
            status: EscrowStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
        };
        txn.insert_account(escrow_account).await?;
        txn.insert_escrow_order(order.clone()).await?;
        txn.commit().await?;

        // The hold reuses the order id as its operation id, so a crashed and
        // retried create resumes instead of double-holding.
        let operation_id = OperationId::from_uuid(order.id.into_inner());
        let request = TransferRequest::escrow_hold(
            operation_id,
            buyer_account_id,
            order.escrow_account_id,
            order.amount,
        )?
        .require_owner(buyer_account_id, actor)
        .with_memo(format!("escrow hold for listing {listing_id}"));
        let guard =
            EscrowTransitionGuard::new(order.id, EscrowStatus::Pending, EscrowStatus::Held);
        self.engine.apply_guarded_with_retry(&request, &guard).await?;

        info!(order_id = %order.id, listing_id = %listing_id, amount = %order.amount, "escrow order held");
        Ok(EscrowOrder {
            status: EscrowStatus::Held,
            ..order
        })
    }

    /// Releases held funds to the seller. Only the seller may trigger this.
    pub async fn release(
        &self,
        order_id: OrderId,
        actor: OwnerId,
    ) -> Result<EscrowOrder, LedgerError> {
        let order = self.load_order(order_id).await?;
        if order.status != EscrowStatus::Held {
            return Err(LedgerError::InvalidStateTransition {
                from: order.status,
                to: EscrowStatus::Released,
            });
        }

        let request = TransferRequest::escrow_release(
            OperationId::new(),
            order.escrow_account_id,
            order.seller_account_id,
            order.amount,
        )?
        .require_owner(order.seller_account_id, actor);
        let guard =
            EscrowTransitionGuard::new(order_id, EscrowStatus::Held, EscrowStatus::Released);
        self.engine.apply_guarded_with_retry(&request, &guard).await?;

        self.resolved(order, EscrowStatus::Released)
    }

    /// Returns held funds to the buyer. Buyer or seller may trigger this.
    pub async fn refund(
        &self,
        order_id: OrderId,
        actor: OwnerId,
    ) -> Result<EscrowOrder, LedgerError> {
        let order = self.load_order(order_id).await?;
        if order.status != EscrowStatus::Held {
            return Err(LedgerError::InvalidStateTransition {
                from: order.status,
                to: EscrowStatus::Refunded,
            });
        }

        let mut txn = self.engine.store().begin().await?;
        let buyer = txn
            .get_account(order.buyer_account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(order.buyer_account_id))?;
        let seller = txn
            .get_account(order.seller_account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(order.seller_account_id))?;
        txn.rollback().await?;

        let authorized_account = if buyer.owner_id == actor {
            order.buyer_account_id
        } else if seller.owner_id == actor {
            order.seller_account_id
        } else {
            return Err(LedgerError::Unauthorized {
                account_id: order.buyer_account_id,
            });
        };

        let request = TransferRequest::escrow_refund(
            OperationId::new(),
            order.escrow_account_id,
            order.buyer_account_id,
            order.amount,
        )?
        .require_owner(authorized_account, actor);
        let guard =
            EscrowTransitionGuard::new(order_id, EscrowStatus::Held, EscrowStatus::Refunded);
        self.engine.apply_guarded_with_retry(&request, &guard).await?;

        self.resolved(order, EscrowStatus::Refunded)
    }

    /// Reads an order without locking it.
    pub async fn load_order(&self, order_id: OrderId) -> Result<EscrowOrder, LedgerError> {
        let mut txn = self.engine.store().begin().await?;
        let order = txn
            .get_escrow_order(order_id)
            .await?
            .ok_or(LedgerError::OrderNotFound(order_id));
        txn.rollback().await?;
        order
    }

    fn resolved(
        &self,
        order: EscrowOrder,
        status: EscrowStatus,
    ) -> Result<EscrowOrder, LedgerError> {
        info!(order_id = %order.id, %status, "escrow order resolved");
        let event = LedgerEvent::EscrowResolved {
            order_id: order.id,
            status,
        };
        if let Err(err) = self.engine.notifier().notify(&event) {
            warn!(%err, order_id = %order.id, "notification failed after escrow resolution");
        }
        Ok(EscrowOrder {
            status,
            resolved_at: Some(Utc::now()),
            ..order
        })
    }
}
