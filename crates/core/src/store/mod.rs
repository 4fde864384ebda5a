//! Storage traits for the ledger core.
//!
//! The core never touches a database directly. It speaks to durable row
//! storage through [`LedgerStore`] / [`LedgerTxn`], which model exactly what
//! the concurrency design needs from a relational store: transactional
//! begin/commit/rollback, pessimistic row locks with a bounded wait, and
//! unique keys usable as idempotence guards.
//!
//! Two implementations exist: [`memory::MemoryStore`] in this crate and the
//! PostgreSQL-backed `SqlStore` in `payvault-db`.

use chrono::NaiveDate;
use payvault_shared::{AccountId, ObligationId, OperationId, OrderId, SubscriptionId};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::account::Account;
use crate::escrow::EscrowOrder;
use crate::ledger::LedgerEntry;
use crate::scheduler::{ScheduledObligation, Subscription};

pub mod memory;

/// Details of a unique-key violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateKey {
    /// Name of the violated constraint.
    pub constraint: &'static str,
    /// The operation id of the batch, when the constraint is the ledger
    /// idempotence key.
    pub operation_id: Option<OperationId>,
}

/// Errors surfaced by a storage backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// A row lock could not be acquired within the configured bounded wait.
    #[error("lock wait timed out for account {0}")]
    LockTimeout(AccountId),

    /// A unique key was violated on commit or insert.
    #[error("unique constraint violated: {}", .0.constraint)]
    DuplicateKey(DuplicateKey),

    /// A row expected to exist was not found.
    #[error("row not found: {0}")]
    RowNotFound(String),

    /// The store cannot be reached or failed unrecoverably.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Convenience constructor for an idempotence-key violation.
    #[must_use]
    pub const fn duplicate_operation(operation_id: OperationId) -> Self {
        Self::DuplicateKey(DuplicateKey {
            constraint: "ledger_entries_operation_account_key",
            operation_id: Some(operation_id),
        })
    }

    /// Convenience constructor for a non-ledger unique-key violation.
    #[must_use]
    pub const fn duplicate_key(constraint: &'static str) -> Self {
        Self::DuplicateKey(DuplicateKey {
            constraint,
            operation_id: None,
        })
    }
}

/// Handle to a storage backend that can open transactions.
#[allow(async_fn_in_trait)]
pub trait LedgerStore: Send + Sync {
    /// The transaction type this store produces.
    type Txn: LedgerTxn + Send;

    /// Begins a new transaction.
    async fn begin(&self) -> Result<Self::Txn, StoreError>;
}

/// A storage transaction.
///
/// Writes are staged and become visible to other transactions only on
/// [`commit`](Self::commit). Dropping a transaction without committing
/// releases its locks and discards staged writes.
#[allow(async_fn_in_trait)]
pub trait LedgerTxn: Send {
    // ---- accounts ----

    /// Acquires the pessimistic row lock for an account and returns a fresh
    /// read of the row, or `None` if it does not exist.
    ///
    /// Blocks at most the store's configured lock wait; a lapsed wait
    /// returns [`StoreError::LockTimeout`]. Re-locking an account already
    /// held by this transaction is a no-op.
    async fn lock_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Reads an account without locking it.
    async fn get_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Stages a new account row.
    async fn insert_account(&mut self, account: Account) -> Result<(), StoreError>;

    /// Stages an update of an existing account row.
    async fn update_account(&mut self, account: &Account) -> Result<(), StoreError>;

    // ---- ledger entries ----

    /// Whether ledger entries for this operation id have been committed.
    async fn operation_applied(&mut self, operation_id: OperationId) -> Result<bool, StoreError>;

    /// Stages a batch of ledger entries sharing one operation id.
    async fn insert_entries(&mut self, entries: Vec<LedgerEntry>) -> Result<(), StoreError>;

    /// Returns all committed entries for an account, oldest first.
    async fn entries_for_account(&mut self, id: AccountId)
    -> Result<Vec<LedgerEntry>, StoreError>;

    /// Total spent through `budget_spend` entries on this account during the
    /// given calendar month, as a positive figure.
    async fn month_spend(
        &mut self,
        id: AccountId,
        year: i32,
        month: u32,
    ) -> Result<Decimal, StoreError>;

    // ---- escrow orders ----

    /// Stages a new escrow order.
    async fn insert_escrow_order(&mut self, order: EscrowOrder) -> Result<(), StoreError>;

    /// Reads an escrow order.
    async fn get_escrow_order(&mut self, id: OrderId) -> Result<Option<EscrowOrder>, StoreError>;

    /// Stages an update of an escrow order.
    async fn update_escrow_order(&mut self, order: &EscrowOrder) -> Result<(), StoreError>;

    // ---- subscriptions ----

    /// Stages a new subscription.
    async fn insert_subscription(&mut self, subscription: Subscription) -> Result<(), StoreError>;

    /// Reads a subscription.
    async fn get_subscription(
        &mut self,
        id: SubscriptionId,
    ) -> Result<Option<Subscription>, StoreError>;

    /// Stages an update of a subscription.
    async fn update_subscription(&mut self, subscription: &Subscription)
    -> Result<(), StoreError>;

    /// Returns all subscriptions that are active and auto-renewing.
    async fn list_active_subscriptions(&mut self) -> Result<Vec<Subscription>, StoreError>;

    // ---- scheduled obligations ----

    /// Stages a new scheduled obligation. The `(subscription_id, due_date)`
    /// pair is unique; a committed duplicate fails the commit with
    /// [`StoreError::DuplicateKey`].
    async fn insert_obligation(&mut self, obligation: ScheduledObligation)
    -> Result<(), StoreError>;

    /// Reads an obligation by id.
    async fn get_obligation(
        &mut self,
        id: ObligationId,
    ) -> Result<Option<ScheduledObligation>, StoreError>;

    /// Finds the obligation for a `(subscription, due_date)` pair.
    async fn find_obligation(
        &mut self,
        subscription_id: SubscriptionId,
        due_date: NaiveDate,
    ) -> Result<Option<ScheduledObligation>, StoreError>;

    /// Stages an update of an obligation.
    async fn update_obligation(
        &mut self,
        obligation: &ScheduledObligation,
    ) -> Result<(), StoreError>;

    /// Returns unsettled obligations due on or before the given date.
    async fn list_due_obligations(
        &mut self,
        on_or_before: NaiveDate,
    ) -> Result<Vec<ScheduledObligation>, StoreError>;

    // ---- transaction boundary ----

    /// Atomically applies all staged writes and releases all locks.
    async fn commit(self) -> Result<(), StoreError>;

    /// Discards staged writes and releases all locks.
    async fn rollback(self) -> Result<(), StoreError>;
}
