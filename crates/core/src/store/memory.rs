//! In-process storage backend.
//!
//! `MemoryStore` implements the full storage contract against process
//! memory: one async mutex per account row plays the part of the row lock
//! (acquired with the same bounded wait as the SQL backend), writes are
//! staged per transaction and applied atomically under a commit mutex, and
//! unique keys are re-checked at commit so racing transactions observe the
//! same outcomes a relational store would give them.
//!
//! Used by the unit, property, and concurrency tests; also usable as an
//! ephemeral backend.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use dashmap::DashMap;
use payvault_shared::{AccountId, ObligationId, OperationId, OrderId, SubscriptionId};
use rust_decimal::Decimal;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::{LedgerStore, LedgerTxn, StoreError};
use crate::account::Account;
use crate::escrow::EscrowOrder;
use crate::ledger::{EntryReason, LedgerEntry};
use crate::scheduler::{ObligationStatus, ScheduledObligation, Subscription};

/// Committed state, guarded by the commit mutex.
#[derive(Default)]
struct State {
    accounts: HashMap<AccountId, Account>,
    entries: Vec<LedgerEntry>,
    operations: HashSet<OperationId>,
    escrow_orders: HashMap<OrderId, EscrowOrder>,
    subscriptions: HashMap<SubscriptionId, Subscription>,
    obligations: HashMap<ObligationId, ScheduledObligation>,
    obligation_keys: HashSet<(SubscriptionId, NaiveDate)>,
}

struct Inner {
    lock_timeout: Duration,
    locks: DashMap<AccountId, Arc<AsyncMutex<()>>>,
    state: StdMutex<State>,
}

/// In-process implementation of [`LedgerStore`].
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Creates an empty store with the given row-lock wait bound.
    #[must_use]
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                lock_timeout,
                locks: DashMap::new(),
                state: StdMutex::new(State::default()),
            }),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> Result<R, StoreError> {
        let mut state = self
            .inner
            .state
            .lock()
            .map_err(|_| StoreError::Unavailable("state mutex poisoned".to_string()))?;
        Ok(f(&mut state))
    }

    /// Inserts an account directly into committed state.
    ///
    /// Bypasses the transaction machinery; intended for seeding tests and
    /// ephemeral deployments.
    pub fn seed_account(&self, account: Account) -> Result<(), StoreError> {
        self.with_state(|state| {
            state.accounts.insert(account.id, account);
        })
    }

    /// Inserts a subscription directly into committed state.
    pub fn seed_subscription(&self, subscription: Subscription) -> Result<(), StoreError> {
        self.with_state(|state| {
            state.subscriptions.insert(subscription.id, subscription);
        })
    }

    /// Snapshot of all committed accounts.
    pub fn snapshot_accounts(&self) -> Result<Vec<Account>, StoreError> {
        self.with_state(|state| state.accounts.values().cloned().collect())
    }

    /// Snapshot of all committed ledger entries, oldest first.
    pub fn snapshot_entries(&self) -> Result<Vec<LedgerEntry>, StoreError> {
        self.with_state(|state| state.entries.clone())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Duration::from_millis(1_500))
    }
}

impl LedgerStore for MemoryStore {
    type Txn = MemoryTxn;

    async fn begin(&self) -> Result<Self::Txn, StoreError> {
        Ok(MemoryTxn {
            inner: Arc::clone(&self.inner),
            guards: HashMap::new(),
            staged: Staged::default(),
        })
    }
}

/// Writes staged by one transaction, applied atomically on commit.
#[derive(Default)]
struct Staged {
    account_inserts: Vec<Account>,
    account_updates: HashMap<AccountId, Account>,
    entries: Vec<LedgerEntry>,
    escrow_inserts: Vec<EscrowOrder>,
    escrow_updates: HashMap<OrderId, EscrowOrder>,
    subscription_inserts: Vec<Subscription>,
    subscription_updates: HashMap<SubscriptionId, Subscription>,
    obligation_inserts: Vec<ScheduledObligation>,
    obligation_updates: HashMap<ObligationId, ScheduledObligation>,
}

/// A transaction over [`MemoryStore`].
///
/// Holds the row-lock guards it acquired; dropping the transaction (with or
/// without commit) releases them.
pub struct MemoryTxn {
    inner: Arc<Inner>,
    guards: HashMap<AccountId, OwnedMutexGuard<()>>,
    staged: Staged,
}

impl MemoryTxn {
    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> Result<R, StoreError> {
        let mut state = self
            .inner
            .state
            .lock()
            .map_err(|_| StoreError::Unavailable("state mutex poisoned".to_string()))?;
        Ok(f(&mut state))
    }

    /// Staged-aware account read: updates shadow inserts shadow committed.
    fn read_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        if let Some(updated) = self.staged.account_updates.get(&id) {
            return Ok(Some(updated.clone()));
        }
        if let Some(inserted) = self.staged.account_inserts.iter().find(|a| a.id == id) {
            return Ok(Some(inserted.clone()));
        }
        self.with_state(|state| state.accounts.get(&id).cloned())
    }
}

impl LedgerTxn for MemoryTxn {
    async fn lock_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        if !self.guards.contains_key(&id) {
            let lock = Arc::clone(&*self.inner.locks.entry(id).or_default());
            let guard = tokio::time::timeout(self.inner.lock_timeout, lock.lock_owned())
                .await
                .map_err(|_| StoreError::LockTimeout(id))?;
            self.guards.insert(id, guard);
        }
        self.read_account(id)
    }

    async fn get_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.read_account(id)
    }

    async fn insert_account(&mut self, account: Account) -> Result<(), StoreError> {
        self.staged.account_inserts.push(account);
        Ok(())
    }

    async fn update_account(&mut self, account: &Account) -> Result<(), StoreError> {
        self.staged.account_updates.insert(account.id, account.clone());
        Ok(())
    }

    async fn operation_applied(&mut self, operation_id: OperationId) -> Result<bool, StoreError> {
        self.with_state(|state| state.operations.contains(&operation_id))
    }

    async fn insert_entries(&mut self, entries: Vec<LedgerEntry>) -> Result<(), StoreError> {
        self.staged.entries.extend(entries);
        Ok(())
    }

    async fn entries_for_account(
        &mut self,
        id: AccountId,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        self.with_state(|state| {
            state
                .entries
                .iter()
                .filter(|e| e.account_id == id)
                .cloned()
                .collect()
        })
    }

    async fn month_spend(
        &mut self,
        id: AccountId,
        year: i32,
        month: u32,
    ) -> Result<Decimal, StoreError> {
        self.with_state(|state| {
            state
                .entries
                .iter()
                .filter(|e| {
                    e.account_id == id
                        && e.reason == EntryReason::BudgetSpend
                        && e.created_at.year() == year
                        && e.created_at.month() == month
                })
                .map(|e| -e.delta)
                .sum()
        })
    }

    async fn insert_escrow_order(&mut self, order: EscrowOrder) -> Result<(), StoreError> {
        self.staged.escrow_inserts.push(order);
        Ok(())
    }

    async fn get_escrow_order(&mut self, id: OrderId) -> Result<Option<EscrowOrder>, StoreError> {
        if let Some(updated) = self.staged.escrow_updates.get(&id) {
            return Ok(Some(updated.clone()));
        }
        if let Some(inserted) = self.staged.escrow_inserts.iter().find(|o| o.id == id) {
            return Ok(Some(inserted.clone()));
        }
        self.with_state(|state| state.escrow_orders.get(&id).cloned())
    }

    async fn update_escrow_order(&mut self, order: &EscrowOrder) -> Result<(), StoreError> {
        self.staged.escrow_updates.insert(order.id, order.clone());
        Ok(())
    }

    async fn insert_subscription(&mut self, subscription: Subscription) -> Result<(), StoreError> {
        self.staged.subscription_inserts.push(subscription);
        Ok(())
    }

    async fn get_subscription(
        &mut self,
        id: SubscriptionId,
    ) -> Result<Option<Subscription>, StoreError> {
        if let Some(updated) = self.staged.subscription_updates.get(&id) {
            return Ok(Some(updated.clone()));
        }
        if let Some(inserted) = self.staged.subscription_inserts.iter().find(|s| s.id == id) {
            return Ok(Some(inserted.clone()));
        }
        self.with_state(|state| state.subscriptions.get(&id).cloned())
    }

    async fn update_subscription(
        &mut self,
        subscription: &Subscription,
    ) -> Result<(), StoreError> {
        self.staged
            .subscription_updates
            .insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn list_active_subscriptions(&mut self) -> Result<Vec<Subscription>, StoreError> {
        self.with_state(|state| {
            let mut subs: Vec<Subscription> = state
                .subscriptions
                .values()
                .filter(|s| s.is_active && s.auto_renew)
                .cloned()
                .collect();
            subs.sort_by_key(|s| s.id);
            subs
        })
    }

    async fn insert_obligation(
        &mut self,
        obligation: ScheduledObligation,
    ) -> Result<(), StoreError> {
        self.staged.obligation_inserts.push(obligation);
        Ok(())
    }

    async fn get_obligation(
        &mut self,
        id: ObligationId,
    ) -> Result<Option<ScheduledObligation>, StoreError> {
        if let Some(updated) = self.staged.obligation_updates.get(&id) {
            return Ok(Some(updated.clone()));
        }
        if let Some(inserted) = self.staged.obligation_inserts.iter().find(|o| o.id == id) {
            return Ok(Some(inserted.clone()));
        }
        self.with_state(|state| state.obligations.get(&id).cloned())
    }

    async fn find_obligation(
        &mut self,
        subscription_id: SubscriptionId,
        due_date: NaiveDate,
    ) -> Result<Option<ScheduledObligation>, StoreError> {
        if let Some(staged) = self
            .staged
            .obligation_inserts
            .iter()
            .find(|o| o.subscription_id == subscription_id && o.due_date == due_date)
        {
            return Ok(Some(staged.clone()));
        }
        self.with_state(|state| {
            state
                .obligations
                .values()
                .find(|o| o.subscription_id == subscription_id && o.due_date == due_date)
                .cloned()
        })
    }

    async fn update_obligation(
        &mut self,
        obligation: &ScheduledObligation,
    ) -> Result<(), StoreError> {
        self.staged
            .obligation_updates
            .insert(obligation.id, obligation.clone());
        Ok(())
    }

    async fn list_due_obligations(
        &mut self,
        on_or_before: NaiveDate,
    ) -> Result<Vec<ScheduledObligation>, StoreError> {
        self.with_state(|state| {
            let mut due: Vec<ScheduledObligation> = state
                .obligations
                .values()
                .filter(|o| o.status == ObligationStatus::Scheduled && o.due_date <= on_or_before)
                .cloned()
                .collect();
            due.sort_by_key(|o| (o.due_date, o.id));
            due
        })
    }

    async fn commit(self) -> Result<(), StoreError> {
        let mut state = self
            .inner
            .state
            .lock()
            .map_err(|_| StoreError::Unavailable("state mutex poisoned".to_string()))?;

        // Unique keys are checked against committed state before anything is
        // applied; a violation fails the whole transaction.
        let batch_operations: HashSet<OperationId> =
            self.staged.entries.iter().map(|e| e.operation_id).collect();
        for operation_id in &batch_operations {
            if state.operations.contains(operation_id) {
                return Err(StoreError::duplicate_operation(*operation_id));
            }
        }
        for account in &self.staged.account_inserts {
            if state.accounts.contains_key(&account.id) {
                return Err(StoreError::duplicate_key("accounts_pkey"));
            }
        }
        let mut new_keys: HashSet<(SubscriptionId, NaiveDate)> = HashSet::new();
        for obligation in &self.staged.obligation_inserts {
            let key = (obligation.subscription_id, obligation.due_date);
            if state.obligation_keys.contains(&key) || !new_keys.insert(key) {
                return Err(StoreError::duplicate_key(
                    "scheduled_obligations_subscription_due_key",
                ));
            }
        }

        for account in self.staged.account_inserts {
            state.accounts.insert(account.id, account);
        }
        for (id, account) in self.staged.account_updates {
            match state.accounts.get_mut(&id) {
                Some(existing) => *existing = account,
                None => return Err(StoreError::RowNotFound(format!("account {id}"))),
            }
        }
        for operation_id in batch_operations {
            state.operations.insert(operation_id);
        }
        state.entries.extend(self.staged.entries);
        for order in self.staged.escrow_inserts {
            state.escrow_orders.insert(order.id, order);
        }
        for (id, order) in self.staged.escrow_updates {
            match state.escrow_orders.get_mut(&id) {
                Some(existing) => *existing = order,
                None => return Err(StoreError::RowNotFound(format!("escrow order {id}"))),
            }
        }
        for subscription in self.staged.subscription_inserts {
            state.subscriptions.insert(subscription.id, subscription);
        }
        for (id, subscription) in self.staged.subscription_updates {
            match state.subscriptions.get_mut(&id) {
                Some(existing) => *existing = subscription,
                None => return Err(StoreError::RowNotFound(format!("subscription {id}"))),
            }
        }
        for obligation in self.staged.obligation_inserts {
            state
                .obligation_keys
                .insert((obligation.subscription_id, obligation.due_date));
            state.obligations.insert(obligation.id, obligation);
        }
        for (id, obligation) in self.staged.obligation_updates {
            match state.obligations.get_mut(&id) {
                Some(existing) => *existing = obligation,
                None => return Err(StoreError::RowNotFound(format!("obligation {id}"))),
            }
        }

        // The state mutex is released before the row-lock guards drop, so
        // the next holder of any touched row observes the committed writes.
        drop(state);
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        // Staged writes and lock guards are dropped with `self`.
        Ok(())
    }
}
