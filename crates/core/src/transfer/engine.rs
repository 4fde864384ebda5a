//! The transfer engine: lock, re-validate, commit.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use payvault_shared::config::EngineConfig;
use payvault_shared::{AccountId, AmountError, EntryId};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::types::{TransferReceipt, TransferRequest};
use crate::account::{Account, AccountStatus};
use crate::ledger::{LedgerEntry, LedgerError};
use crate::locking::lock_order;
use crate::notify::{LedgerEvent, Notifier};
use crate::store::{LedgerStore, LedgerTxn, StoreError};

/// A check-and-stage hook that runs inside the engine's transaction, after
/// balance validation and under the same row locks.
///
/// This is how state machines layered on the engine make their transitions
/// atomic with the money movement: the escrow resolution guard re-reads the
/// order status under the escrow account's lock, and the budget guard
/// re-derives the monthly spend aggregate before the commit.
#[allow(async_fn_in_trait)]
pub trait OperationGuard<T: LedgerTxn> {
    /// Validates and stages any additional writes. An `Err` aborts the whole
    /// operation; nothing committed, locks released.
    async fn enforce(&self, txn: &mut T) -> Result<(), LedgerError>;
}

/// Guard that does nothing; used by plain transfers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGuard;

impl<T: LedgerTxn> OperationGuard<T> for NoGuard {
    async fn enforce(&self, _txn: &mut T) -> Result<(), LedgerError> {
        Ok(())
    }
}

/// The sole path by which account balances are mutated.
pub struct TransferEngine<S: LedgerStore> {
    store: Arc<S>,
    config: EngineConfig,
    notifier: Arc<dyn Notifier>,
}

impl<S: LedgerStore> TransferEngine<S> {
    /// Creates an engine over a store.
    pub fn new(store: Arc<S>, config: EngineConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            config,
            notifier,
        }
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The notification seam shared by services layered on the engine.
    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Applies a transfer atomically.
    pub async fn apply(&self, request: &TransferRequest) -> Result<TransferReceipt, LedgerError> {
        self.apply_guarded(request, &NoGuard).await
    }

    /// Applies a transfer with an [`OperationGuard`] running under the same
    /// locks and transaction.
    pub async fn apply_guarded<G>(
        &self,
        request: &TransferRequest,
        guard: &G,
    ) -> Result<TransferReceipt, LedgerError>
    where
        G: OperationGuard<S::Txn>,
    {
        Self::validate_shape(request)?;

        let mut txn = self.store.begin().await?;

        // Idempotence short-circuit: a retried operation that already
        // committed reports success without touching any balance.
        match txn.operation_applied(request.operation_id).await {
            Ok(true) => {
                let _ = txn.rollback().await;
                debug!(operation_id = %request.operation_id, "operation already applied");
                return Ok(TransferReceipt::already_applied(request.operation_id));
            }
            Ok(false) => {}
            Err(err) => {
                let _ = txn.rollback().await;
                return Err(err.into());
            }
        }

        let entries = match Self::execute(&mut txn, request, guard).await {
            Ok(entries) => entries,
            // Some backends surface the idempotence key at insert time
            // rather than commit time; both are clean replays.
            Err(LedgerError::DuplicateOperation(op)) if op == request.operation_id => {
                let _ = txn.rollback().await;
                debug!(operation_id = %request.operation_id, "operation already applied");
                return Ok(TransferReceipt::already_applied(request.operation_id));
            }
            Err(err) => {
                let _ = txn.rollback().await;
                return Err(err);
            }
        };

        match txn.commit().await {
            Ok(()) => {
                let mut accounts: Vec<AccountId> =
                    entries.iter().map(|e| e.account_id).collect();
                accounts.sort_unstable();
                accounts.dedup();
                debug!(
                    operation_id = %request.operation_id,
                    reason = %request.reason,
                    accounts = accounts.len(),
                    "transfer committed"
                );
                let event = LedgerEvent::TransferApplied {
                    operation_id: request.operation_id,
                    reason: request.reason,
                    accounts,
                };
                if let Err(err) = self.notifier.notify(&event) {
                    warn!(%err, operation_id = %request.operation_id, "notification failed after commit");
                }
                Ok(TransferReceipt::applied(request.operation_id, entries))
            }
            // A concurrent retry of the same operation won the commit race;
            // the idempotence key turns that into a clean replay.
            Err(StoreError::DuplicateKey(key))
                if key.operation_id == Some(request.operation_id) =>
            {
                debug!(operation_id = %request.operation_id, "lost commit race to an identical retry");
                Ok(TransferReceipt::already_applied(request.operation_id))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// [`apply`](Self::apply) with a bounded `LockTimeout` retry loop.
    pub async fn apply_with_retry(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferReceipt, LedgerError> {
        self.apply_guarded_with_retry(request, &NoGuard).await
    }

    /// [`apply_guarded`](Self::apply_guarded) with a bounded `LockTimeout`
    /// retry loop. Any other error is surfaced immediately.
    pub async fn apply_guarded_with_retry<G>(
        &self,
        request: &TransferRequest,
        guard: &G,
    ) -> Result<TransferReceipt, LedgerError>
    where
        G: OperationGuard<S::Txn>,
    {
        let mut attempt = 0u32;
        loop {
            match self.apply_guarded(request, guard).await {
                Err(err @ LedgerError::LockTimeout(_)) if attempt < self.config.lock_retries => {
                    attempt += 1;
                    warn!(
                        operation_id = %request.operation_id,
                        attempt,
                        %err,
                        "lock contention, retrying"
                    );
                }
                other => return other,
            }
        }
    }

    /// Structural validation that needs no store access.
    fn validate_shape(request: &TransferRequest) -> Result<(), LedgerError> {
        if request.moves.is_empty() {
            return Err(LedgerError::EmptyOperation);
        }
        for mv in &request.moves {
            if mv.delta.is_zero() {
                return Err(LedgerError::InvalidAmount(AmountError::NotPositive));
            }
            if mv.delta.normalize().scale() > 2 {
                return Err(LedgerError::InvalidAmount(AmountError::TooPrecise));
            }
        }
        Ok(())
    }

    /// The lock-validate-stage sequence, run inside an open transaction.
    ///
    /// Locks are acquired strictly in coordinator order; every precondition
    /// is checked against the fresh rows read under those locks.
    async fn execute<G>(
        txn: &mut S::Txn,
        request: &TransferRequest,
        guard: &G,
    ) -> Result<Vec<LedgerEntry>, LedgerError>
    where
        G: OperationGuard<S::Txn>,
    {
        // Ownership-check accounts are locked alongside the mutated set so
        // the claims hold for the lifetime of the transaction.
        let lock_set = lock_order(
            request
                .moves
                .iter()
                .map(|m| m.account_id)
                .chain(request.required_owners.iter().map(|(id, _)| *id)),
        );

        let mut accounts: HashMap<AccountId, Account> = HashMap::with_capacity(lock_set.len());
        for &id in &lock_set {
            let row = txn
                .lock_account(id)
                .await?
                .ok_or(LedgerError::AccountNotFound(id))?;
            accounts.insert(id, row);
        }

        for (account_id, owner_id) in &request.required_owners {
            let row = accounts
                .get(account_id)
                .ok_or(LedgerError::AccountNotFound(*account_id))?;
            if row.owner_id != *owner_id {
                return Err(LedgerError::Unauthorized {
                    account_id: *account_id,
                });
            }
        }

        // Net delta per mutated account; a request may move the same account
        // more than once.
        let mut deltas: HashMap<AccountId, Decimal> = HashMap::new();
        for mv in &request.moves {
            *deltas.entry(mv.account_id).or_insert(Decimal::ZERO) += mv.delta;
        }

        for &id in &lock_set {
            if !deltas.contains_key(&id) {
                continue;
            }
            match accounts[&id].status {
                AccountStatus::Active => {}
                AccountStatus::Frozen => return Err(LedgerError::AccountFrozen(id)),
                AccountStatus::Closed => return Err(LedgerError::AccountClosed(id)),
            }
        }

        if request.reason.is_internal() {
            let sum: Decimal = request
                .moves
                .iter()
                .filter(|m| accounts[&m.account_id].kind.is_monetary())
                .map(|m| m.delta)
                .sum();
            if !sum.is_zero() {
                return Err(LedgerError::UnbalancedOperation { sum });
            }
        }

        let now = Utc::now();
        for &id in &lock_set {
            let Some(delta) = deltas.get(&id) else {
                continue;
            };
            let row = accounts
                .get_mut(&id)
                .ok_or(LedgerError::AccountNotFound(id))?;
            let new_balance = row.balance + *delta;
            if row.kind.enforces_non_negative() && new_balance < Decimal::ZERO {
                return Err(LedgerError::InsufficientFunds {
                    account_id: id,
                    available: row.balance,
                    requested: -*delta,
                });
            }
            row.balance = new_balance;
            row.version += 1;
            row.updated_at = now;
        }

        guard.enforce(txn).await?;

        for &id in &lock_set {
            if !deltas.contains_key(&id) {
                continue;
            }
            txn.update_account(&accounts[&id]).await?;
        }

        let entries: Vec<LedgerEntry> = request
            .moves
            .iter()
            .map(|mv| LedgerEntry {
                id: EntryId::new(),
                account_id: mv.account_id,
                delta: mv.delta,
                operation_id: request.operation_id,
                reason: request.reason,
                memo: request.memo.clone(),
                metadata: request.metadata.clone(),
                created_at: now,
            })
            .collect();
        txn.insert_entries(entries.clone()).await?;

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountKind;
    use crate::ledger::EntryReason;
    use crate::notify::NoopNotifier;
    use crate::store::memory::MemoryStore;
    use crate::transfer::types::Move;
    use payvault_shared::{OperationId, OwnerId};
    use rust_decimal_macros::dec;

    fn engine(store: &MemoryStore) -> TransferEngine<MemoryStore> {
        TransferEngine::new(
            Arc::new(store.clone()),
            EngineConfig::default(),
            Arc::new(NoopNotifier),
        )
    }

    fn seeded_wallet(store: &MemoryStore, owner: OwnerId, balance: Decimal) -> AccountId {
        let mut account = Account::new(owner, AccountKind::Wallet);
        account.balance = balance;
        let id = account.id;
        store.seed_account(account).unwrap();
        id
    }

    #[tokio::test]
    async fn test_peer_transfer_moves_funds() {
        let store = MemoryStore::default();
        let engine = engine(&store);
        let owner = OwnerId::new();
        let from = seeded_wallet(&store, owner, dec!(100));
        let to = seeded_wallet(&store, OwnerId::new(), dec!(0));

        let request =
            TransferRequest::peer_transfer(OperationId::new(), from, to, dec!(60), owner).unwrap();
        let receipt = engine.apply(&request).await.unwrap();

        assert!(receipt.applied);
        assert_eq!(receipt.entries.len(), 2);

        let accounts = store.snapshot_accounts().unwrap();
        let from_row = accounts.iter().find(|a| a.id == from).unwrap();
        let to_row = accounts.iter().find(|a| a.id == to).unwrap();
        assert_eq!(from_row.balance, dec!(40));
        assert_eq!(to_row.balance, dec!(60));
        assert_eq!(from_row.version, 1);
        assert_eq!(to_row.version, 1);
    }

    #[tokio::test]
    async fn test_insufficient_funds_reports_available_and_requested() {
        let store = MemoryStore::default();
        let engine = engine(&store);
        let owner = OwnerId::new();
        let from = seeded_wallet(&store, owner, dec!(100));
        let to = seeded_wallet(&store, OwnerId::new(), dec!(0));

        let request =
            TransferRequest::peer_transfer(OperationId::new(), from, to, dec!(150), owner)
                .unwrap();
        let err = engine.apply(&request).await.unwrap_err();

        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                account_id: from,
                available: dec!(100),
                requested: dec!(150),
            }
        );
        // nothing committed
        let accounts = store.snapshot_accounts().unwrap();
        assert_eq!(accounts.iter().find(|a| a.id == from).unwrap().balance, dec!(100));
        assert!(store.snapshot_entries().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_frozen_account_rejected() {
        let store = MemoryStore::default();
        let engine = engine(&store);
        let owner = OwnerId::new();
        let from = seeded_wallet(&store, owner, dec!(100));

        let mut frozen = Account::new(OwnerId::new(), AccountKind::Wallet);
        frozen.status = AccountStatus::Frozen;
        let frozen_id = frozen.id;
        store.seed_account(frozen).unwrap();

        let request =
            TransferRequest::peer_transfer(OperationId::new(), from, frozen_id, dec!(10), owner)
                .unwrap();
        assert_eq!(
            engine.apply(&request).await.unwrap_err(),
            LedgerError::AccountFrozen(frozen_id)
        );
    }

    #[tokio::test]
    async fn test_unknown_account_rejected() {
        let store = MemoryStore::default();
        let engine = engine(&store);
        let owner = OwnerId::new();
        let from = seeded_wallet(&store, owner, dec!(100));
        let ghost = AccountId::new();

        let request =
            TransferRequest::peer_transfer(OperationId::new(), from, ghost, dec!(10), owner)
                .unwrap();
        assert_eq!(
            engine.apply(&request).await.unwrap_err(),
            LedgerError::AccountNotFound(ghost)
        );
    }

    #[tokio::test]
    async fn test_wrong_owner_rejected_under_lock() {
        let store = MemoryStore::default();
        let engine = engine(&store);
        let from = seeded_wallet(&store, OwnerId::new(), dec!(100));
        let to = seeded_wallet(&store, OwnerId::new(), dec!(0));
        let imposter = OwnerId::new();

        let request =
            TransferRequest::peer_transfer(OperationId::new(), from, to, dec!(10), imposter)
                .unwrap();
        assert_eq!(
            engine.apply(&request).await.unwrap_err(),
            LedgerError::Unauthorized { account_id: from }
        );
    }

    #[tokio::test]
    async fn test_unbalanced_internal_operation_rejected() {
        let store = MemoryStore::default();
        let engine = engine(&store);
        let owner = OwnerId::new();
        let from = seeded_wallet(&store, owner, dec!(100));
        let to = seeded_wallet(&store, OwnerId::new(), dec!(0));

        // hand-built request that drops money on the floor
        let request = TransferRequest::new(
            OperationId::new(),
            EntryReason::Transfer,
            vec![
                Move { account_id: from, delta: dec!(-30) },
                Move { account_id: to, delta: dec!(20) },
            ],
        );
        assert_eq!(
            engine.apply(&request).await.unwrap_err(),
            LedgerError::UnbalancedOperation { sum: dec!(-10) }
        );
    }

    #[tokio::test]
    async fn test_external_reasons_exempt_from_zero_sum() {
        let store = MemoryStore::default();
        let engine = engine(&store);
        let wallet = seeded_wallet(&store, OwnerId::new(), dec!(0));

        let request = TransferRequest::topup(OperationId::new(), wallet, dec!(50)).unwrap();
        let receipt = engine.apply(&request).await.unwrap();
        assert!(receipt.applied);

        let accounts = store.snapshot_accounts().unwrap();
        assert_eq!(accounts.iter().find(|a| a.id == wallet).unwrap().balance, dec!(50));
    }

    #[tokio::test]
    async fn test_replayed_operation_is_a_noop() {
        let store = MemoryStore::default();
        let engine = engine(&store);
        let owner = OwnerId::new();
        let from = seeded_wallet(&store, owner, dec!(100));
        let to = seeded_wallet(&store, OwnerId::new(), dec!(0));

        let operation = OperationId::new();
        let request =
            TransferRequest::peer_transfer(operation, from, to, dec!(25), owner).unwrap();

        let first = engine.apply(&request).await.unwrap();
        assert!(first.applied);

        let second = engine.apply(&request).await.unwrap();
        assert!(!second.applied);
        assert!(second.entries.is_empty());

        // exactly one entry set, balances applied once
        assert_eq!(store.snapshot_entries().unwrap().len(), 2);
        let accounts = store.snapshot_accounts().unwrap();
        assert_eq!(accounts.iter().find(|a| a.id == from).unwrap().balance, dec!(75));
    }

    #[tokio::test]
    async fn test_zero_delta_rejected() {
        let store = MemoryStore::default();
        let engine = engine(&store);
        let wallet = seeded_wallet(&store, OwnerId::new(), dec!(10));

        let request = TransferRequest::new(
            OperationId::new(),
            EntryReason::Transfer,
            vec![Move { account_id: wallet, delta: Decimal::ZERO }],
        );
        assert!(matches!(
            engine.apply(&request).await.unwrap_err(),
            LedgerError::InvalidAmount(AmountError::NotPositive)
        ));
    }

    #[tokio::test]
    async fn test_empty_request_rejected() {
        let store = MemoryStore::default();
        let engine = engine(&store);
        let request = TransferRequest::new(OperationId::new(), EntryReason::Transfer, vec![]);
        assert_eq!(
            engine.apply(&request).await.unwrap_err(),
            LedgerError::EmptyOperation
        );
    }

    #[tokio::test]
    async fn test_failed_validation_rolls_back_guard_and_locks() {
        let store = MemoryStore::new(std::time::Duration::from_millis(100));
        let engine = engine(&store);
        let owner = OwnerId::new();
        let from = seeded_wallet(&store, owner, dec!(10));
        let to = seeded_wallet(&store, OwnerId::new(), dec!(0));

        let request =
            TransferRequest::peer_transfer(OperationId::new(), from, to, dec!(50), owner)
                .unwrap();
        assert!(engine.apply(&request).await.is_err());

        // locks were released on the failure path: a follow-up succeeds
        let retry =
            TransferRequest::peer_transfer(OperationId::new(), from, to, dec!(5), owner).unwrap();
        assert!(engine.apply(&retry).await.unwrap().applied);
    }
}
