//! PostgreSQL implementation of the core storage traits.
//!
//! Row locks are `SELECT ... FOR UPDATE`; the bounded wait comes from
//! `SET LOCAL lock_timeout`, issued at the start of every transaction, so a
//! blocked lock acquisition fails the statement instead of parking forever.
//! Idempotence rests on two unique indexes: `(operation_id, account_id)` on
//! ledger entries and `(subscription_id, due_date)` on obligations.

use chrono::{Datelike, Months, NaiveDate, Utc};
use payvault_core::account::Account;
use payvault_core::escrow::{EscrowOrder, EscrowStatus};
use payvault_core::ledger::{EntryReason, LedgerEntry};
use payvault_core::scheduler::{
    BillingCycle, ObligationStatus, ScheduledObligation, Subscription,
};
use payvault_core::store::{LedgerStore, LedgerTxn, StoreError};
use payvault_shared::{
    AccountId, EntryId, ListingId, ObligationId, OperationId, OrderId, OwnerId, SubscriptionId,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};

use crate::entities::{
    accounts, escrow_orders, ledger_entries, scheduled_obligations, sea_orm_active_enums,
    subscriptions,
};

/// PostgreSQL-backed [`LedgerStore`].
#[derive(Debug, Clone)]
pub struct SqlStore {
    db: DatabaseConnection,
    lock_timeout_ms: u64,
}

impl SqlStore {
    /// Creates a store over an established connection pool.
    #[must_use]
    pub const fn new(db: DatabaseConnection, lock_timeout_ms: u64) -> Self {
        Self {
            db,
            lock_timeout_ms,
        }
    }
}

impl LedgerStore for SqlStore {
    type Txn = SqlTxn;

    async fn begin(&self) -> Result<Self::Txn, StoreError> {
        let txn = self.db.begin().await.map_err(unavailable)?;
        txn.execute_unprepared(&format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.lock_timeout_ms
        ))
        .await
        .map_err(unavailable)?;
        Ok(SqlTxn { txn })
    }
}

/// A transaction over [`SqlStore`].
///
/// Dropping without commit rolls the database transaction back and releases
/// all row locks.
pub struct SqlTxn {
    txn: DatabaseTransaction,
}

fn unavailable(err: DbErr) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn is_lock_timeout(err: &DbErr) -> bool {
    // Postgres reports SQLSTATE 55P03 as "canceling statement due to lock timeout"
    err.to_string().contains("lock timeout")
}

fn is_duplicate_key(err: &DbErr) -> bool {
    err.to_string().contains("duplicate key")
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate, StoreError> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| StoreError::Unavailable(format!("invalid month {year}-{month}")))
}

// ---- model conversions ----

fn account_from_model(model: accounts::Model) -> Account {
    Account {
        id: AccountId::from_uuid(model.id),
        owner_id: OwnerId::from_uuid(model.owner_id),
        kind: match model.kind {
            sea_orm_active_enums::AccountKind::Wallet => {
                payvault_core::account::AccountKind::Wallet
            }
            sea_orm_active_enums::AccountKind::BudgetCard => {
                payvault_core::account::AccountKind::BudgetCard
            }
            sea_orm_active_enums::AccountKind::Escrow => {
                payvault_core::account::AccountKind::Escrow
            }
            sea_orm_active_enums::AccountKind::Loan => payvault_core::account::AccountKind::Loan,
        },
        status: match model.status {
            sea_orm_active_enums::AccountStatus::Active => {
                payvault_core::account::AccountStatus::Active
            }
            sea_orm_active_enums::AccountStatus::Frozen => {
                payvault_core::account::AccountStatus::Frozen
            }
            sea_orm_active_enums::AccountStatus::Closed => {
                payvault_core::account::AccountStatus::Closed
            }
        },
        balance: model.balance,
        monthly_limit: model.monthly_limit,
        version: model.version,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn account_to_active(account: &Account) -> accounts::ActiveModel {
    accounts::ActiveModel {
        id: Set(account.id.into_inner()),
        owner_id: Set(account.owner_id.into_inner()),
        kind: Set(match account.kind {
            payvault_core::account::AccountKind::Wallet => {
                sea_orm_active_enums::AccountKind::Wallet
            }
            payvault_core::account::AccountKind::BudgetCard => {
                sea_orm_active_enums::AccountKind::BudgetCard
            }
            payvault_core::account::AccountKind::Escrow => {
                sea_orm_active_enums::AccountKind::Escrow
            }
            payvault_core::account::AccountKind::Loan => sea_orm_active_enums::AccountKind::Loan,
        }),
        status: Set(match account.status {
            payvault_core::account::AccountStatus::Active => {
                sea_orm_active_enums::AccountStatus::Active
            }
            payvault_core::account::AccountStatus::Frozen => {
                sea_orm_active_enums::AccountStatus::Frozen
            }
            payvault_core::account::AccountStatus::Closed => {
                sea_orm_active_enums::AccountStatus::Closed
            }
        }),
        balance: Set(account.balance),
        monthly_limit: Set(account.monthly_limit),
        version: Set(account.version),
        created_at: Set(account.created_at.into()),
        updated_at: Set(account.updated_at.into()),
    }
}

fn reason_to_db(reason: EntryReason) -> sea_orm_active_enums::EntryReason {
    match reason {
        EntryReason::Transfer => sea_orm_active_enums::EntryReason::Transfer,
        EntryReason::Topup => sea_orm_active_enums::EntryReason::Topup,
        EntryReason::Withdrawal => sea_orm_active_enums::EntryReason::Withdrawal,
        EntryReason::BudgetAllocate => sea_orm_active_enums::EntryReason::BudgetAllocate,
        EntryReason::BudgetSpend => sea_orm_active_enums::EntryReason::BudgetSpend,
        EntryReason::EscrowHold => sea_orm_active_enums::EntryReason::EscrowHold,
        EntryReason::EscrowRelease => sea_orm_active_enums::EntryReason::EscrowRelease,
        EntryReason::EscrowRefund => sea_orm_active_enums::EntryReason::EscrowRefund,
        EntryReason::LoanDisburse => sea_orm_active_enums::EntryReason::LoanDisburse,
        EntryReason::LoanRepay => sea_orm_active_enums::EntryReason::LoanRepay,
        EntryReason::SubscriptionCharge => sea_orm_active_enums::EntryReason::SubscriptionCharge,
    }
}

fn reason_from_db(reason: sea_orm_active_enums::EntryReason) -> EntryReason {
    match reason {
        sea_orm_active_enums::EntryReason::Transfer => EntryReason::Transfer,
        sea_orm_active_enums::EntryReason::Topup => EntryReason::Topup,
        sea_orm_active_enums::EntryReason::Withdrawal => EntryReason::Withdrawal,
        sea_orm_active_enums::EntryReason::BudgetAllocate => EntryReason::BudgetAllocate,
        sea_orm_active_enums::EntryReason::BudgetSpend => EntryReason::BudgetSpend,
        sea_orm_active_enums::EntryReason::EscrowHold => EntryReason::EscrowHold,
        sea_orm_active_enums::EntryReason::EscrowRelease => EntryReason::EscrowRelease,
        sea_orm_active_enums::EntryReason::EscrowRefund => EntryReason::EscrowRefund,
        sea_orm_active_enums::EntryReason::LoanDisburse => EntryReason::LoanDisburse,
        sea_orm_active_enums::EntryReason::LoanRepay => EntryReason::LoanRepay,
        sea_orm_active_enums::EntryReason::SubscriptionCharge => EntryReason::SubscriptionCharge,
    }
}

fn entry_from_model(model: ledger_entries::Model) -> LedgerEntry {
    LedgerEntry {
        id: EntryId::from_uuid(model.id),
        account_id: AccountId::from_uuid(model.account_id),
        delta: model.delta,
        operation_id: OperationId::from_uuid(model.operation_id),
        reason: reason_from_db(model.reason),
        memo: model.memo,
        metadata: model.metadata,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn escrow_status_to_db(status: EscrowStatus) -> sea_orm_active_enums::EscrowStatus {
    match status {
        EscrowStatus::Pending => sea_orm_active_enums::EscrowStatus::Pending,
        EscrowStatus::Held => sea_orm_active_enums::EscrowStatus::Held,
        EscrowStatus::Released => sea_orm_active_enums::EscrowStatus::Released,
        EscrowStatus::Refunded => sea_orm_active_enums::EscrowStatus::Refunded,
    }
}

fn escrow_from_model(model: escrow_orders::Model) -> EscrowOrder {
    EscrowOrder {
        id: OrderId::from_uuid(model.id),
        listing_id: ListingId::from_uuid(model.listing_id),
        buyer_account_id: AccountId::from_uuid(model.buyer_account_id),
        seller_account_id: AccountId::from_uuid(model.seller_account_id),
        escrow_account_id: AccountId::from_uuid(model.escrow_account_id),
        amount: model.amount,
        status: match model.status {
            sea_orm_active_enums::EscrowStatus::Pending => EscrowStatus::Pending,
            sea_orm_active_enums::EscrowStatus::Held => EscrowStatus::Held,
            sea_orm_active_enums::EscrowStatus::Released => EscrowStatus::Released,
            sea_orm_active_enums::EscrowStatus::Refunded => EscrowStatus::Refunded,
        },
        created_at: model.created_at.with_timezone(&Utc),
        resolved_at: model.resolved_at.map(|t| t.with_timezone(&Utc)),
    }
}

fn escrow_to_active(order: &EscrowOrder) -> escrow_orders::ActiveModel {
    escrow_orders::ActiveModel {
        id: Set(order.id.into_inner()),
        listing_id: Set(order.listing_id.into_inner()),
        buyer_account_id: Set(order.buyer_account_id.into_inner()),
        seller_account_id: Set(order.seller_account_id.into_inner()),
        escrow_account_id: Set(order.escrow_account_id.into_inner()),
        amount: Set(order.amount),
        status: Set(escrow_status_to_db(order.status)),
        created_at: Set(order.created_at.into()),
        resolved_at: Set(order.resolved_at.map(Into::into)),
    }
}

fn cycle_from_db(cycle: sea_orm_active_enums::BillingCycle) -> BillingCycle {
    match cycle {
        sea_orm_active_enums::BillingCycle::Weekly => BillingCycle::Weekly,
        sea_orm_active_enums::BillingCycle::Monthly => BillingCycle::Monthly,
        sea_orm_active_enums::BillingCycle::Quarterly => BillingCycle::Quarterly,
        sea_orm_active_enums::BillingCycle::Yearly => BillingCycle::Yearly,
    }
}

fn cycle_to_db(cycle: BillingCycle) -> sea_orm_active_enums::BillingCycle {
    match cycle {
        BillingCycle::Weekly => sea_orm_active_enums::BillingCycle::Weekly,
        BillingCycle::Monthly => sea_orm_active_enums::BillingCycle::Monthly,
        BillingCycle::Quarterly => sea_orm_active_enums::BillingCycle::Quarterly,
        BillingCycle::Yearly => sea_orm_active_enums::BillingCycle::Yearly,
    }
}

fn subscription_from_model(model: subscriptions::Model) -> Subscription {
    Subscription {
        id: SubscriptionId::from_uuid(model.id),
        account_id: AccountId::from_uuid(model.account_id),
        service_name: model.service_name,
        amount: model.amount,
        billing_cycle: cycle_from_db(model.billing_cycle),
        next_billing_date: model.next_billing_date,
        last_payment_date: model.last_payment_date,
        is_active: model.is_active,
        auto_renew: model.auto_renew,
        created_at: model.created_at.with_timezone(&Utc),
        cancelled_at: model.cancelled_at.map(|t| t.with_timezone(&Utc)),
    }
}

fn subscription_to_active(subscription: &Subscription) -> subscriptions::ActiveModel {
    subscriptions::ActiveModel {
        id: Set(subscription.id.into_inner()),
        account_id: Set(subscription.account_id.into_inner()),
        service_name: Set(subscription.service_name.clone()),
        amount: Set(subscription.amount),
        billing_cycle: Set(cycle_to_db(subscription.billing_cycle)),
        next_billing_date: Set(subscription.next_billing_date),
        last_payment_date: Set(subscription.last_payment_date),
        is_active: Set(subscription.is_active),
        auto_renew: Set(subscription.auto_renew),
        created_at: Set(subscription.created_at.into()),
        cancelled_at: Set(subscription.cancelled_at.map(Into::into)),
    }
}

fn obligation_status_to_db(status: ObligationStatus) -> sea_orm_active_enums::ObligationStatus {
    match status {
        ObligationStatus::Scheduled => sea_orm_active_enums::ObligationStatus::Scheduled,
        ObligationStatus::Settled => sea_orm_active_enums::ObligationStatus::Settled,
        ObligationStatus::Failed => sea_orm_active_enums::ObligationStatus::Failed,
    }
}

fn obligation_from_model(model: scheduled_obligations::Model) -> ScheduledObligation {
    ScheduledObligation {
        id: ObligationId::from_uuid(model.id),
        subscription_id: SubscriptionId::from_uuid(model.subscription_id),
        account_id: AccountId::from_uuid(model.account_id),
        amount: model.amount,
        due_date: model.due_date,
        materialized: model.materialized,
        status: match model.status {
            sea_orm_active_enums::ObligationStatus::Scheduled => ObligationStatus::Scheduled,
            sea_orm_active_enums::ObligationStatus::Settled => ObligationStatus::Settled,
            sea_orm_active_enums::ObligationStatus::Failed => ObligationStatus::Failed,
        },
        settled_operation_id: model.settled_operation_id.map(OperationId::from_uuid),
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn obligation_to_active(
    obligation: &ScheduledObligation,
) -> scheduled_obligations::ActiveModel {
    scheduled_obligations::ActiveModel {
        id: Set(obligation.id.into_inner()),
        subscription_id: Set(obligation.subscription_id.into_inner()),
        account_id: Set(obligation.account_id.into_inner()),
        amount: Set(obligation.amount),
        due_date: Set(obligation.due_date),
        materialized: Set(obligation.materialized),
        status: Set(obligation_status_to_db(obligation.status)),
        settled_operation_id: Set(obligation.settled_operation_id.map(OperationId::into_inner)),
        created_at: Set(obligation.created_at.into()),
    }
}

impl LedgerTxn for SqlTxn {
    async fn lock_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = accounts::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(|err| {
                if is_lock_timeout(&err) {
                    tracing::warn!(account_id = %id, "row lock wait timed out");
                    StoreError::LockTimeout(id)
                } else {
                    unavailable(err)
                }
            })?;
        Ok(row.map(account_from_model))
    }

    async fn get_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = accounts::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(unavailable)?;
        Ok(row.map(account_from_model))
    }

    async fn insert_account(&mut self, account: Account) -> Result<(), StoreError> {
        account_to_active(&account)
            .insert(&self.txn)
            .await
            .map_err(|err| {
                if is_duplicate_key(&err) {
                    StoreError::duplicate_key("accounts_pkey")
                } else {
                    unavailable(err)
                }
            })?;
        Ok(())
    }

    async fn update_account(&mut self, account: &Account) -> Result<(), StoreError> {
        account_to_active(account)
            .update(&self.txn)
            .await
            .map_err(|err| match err {
                DbErr::RecordNotUpdated => {
                    StoreError::RowNotFound(format!("account {}", account.id))
                }
                other => unavailable(other),
            })?;
        Ok(())
    }

    async fn operation_applied(&mut self, operation_id: OperationId) -> Result<bool, StoreError> {
        let count = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::OperationId.eq(operation_id.into_inner()))
            .count(&self.txn)
            .await
            .map_err(unavailable)?;
        Ok(count > 0)
    }

    async fn insert_entries(&mut self, entries: Vec<LedgerEntry>) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        let operation_id = entries[0].operation_id;
        let models: Vec<ledger_entries::ActiveModel> = entries
            .into_iter()
            .map(|entry| ledger_entries::ActiveModel {
                id: Set(entry.id.into_inner()),
                account_id: Set(entry.account_id.into_inner()),
                delta: Set(entry.delta),
                operation_id: Set(entry.operation_id.into_inner()),
                reason: Set(reason_to_db(entry.reason)),
                memo: Set(entry.memo),
                metadata: Set(entry.metadata),
                created_at: Set(entry.created_at.into()),
            })
            .collect();
        ledger_entries::Entity::insert_many(models)
            .exec(&self.txn)
            .await
            .map_err(|err| {
                if is_duplicate_key(&err) {
                    StoreError::duplicate_operation(operation_id)
                } else {
                    unavailable(err)
                }
            })?;
        Ok(())
    }

    async fn entries_for_account(
        &mut self,
        id: AccountId,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let rows = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::AccountId.eq(id.into_inner()))
            .order_by_asc(ledger_entries::Column::CreatedAt)
            .all(&self.txn)
            .await
            .map_err(unavailable)?;
        Ok(rows.into_iter().map(entry_from_model).collect())
    }

    async fn month_spend(
        &mut self,
        id: AccountId,
        year: i32,
        month: u32,
    ) -> Result<Decimal, StoreError> {
        let start = first_of_month(year, month)?;
        let end = start
            .checked_add_months(Months::new(1))
            .unwrap_or(start);
        let start_at = start.and_time(chrono::NaiveTime::MIN).and_utc();
        let end_at = end.and_time(chrono::NaiveTime::MIN).and_utc();

        let rows: Vec<Decimal> = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::AccountId.eq(id.into_inner()))
            .filter(
                ledger_entries::Column::Reason.eq(sea_orm_active_enums::EntryReason::BudgetSpend),
            )
            .filter(ledger_entries::Column::CreatedAt.gte(start_at))
            .filter(ledger_entries::Column::CreatedAt.lt(end_at))
            .select_only()
            .column(ledger_entries::Column::Delta)
            .into_tuple()
            .all(&self.txn)
            .await
            .map_err(unavailable)?;
        Ok(rows.into_iter().map(|delta| -delta).sum())
    }

    async fn insert_escrow_order(&mut self, order: EscrowOrder) -> Result<(), StoreError> {
        escrow_to_active(&order)
            .insert(&self.txn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn get_escrow_order(&mut self, id: OrderId) -> Result<Option<EscrowOrder>, StoreError> {
        let row = escrow_orders::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(unavailable)?;
        Ok(row.map(escrow_from_model))
    }

    async fn update_escrow_order(&mut self, order: &EscrowOrder) -> Result<(), StoreError> {
        escrow_to_active(order)
            .update(&self.txn)
            .await
            .map_err(|err| match err {
                DbErr::RecordNotUpdated => {
                    StoreError::RowNotFound(format!("escrow order {}", order.id))
                }
                other => unavailable(other),
            })?;
        Ok(())
    }

    async fn insert_subscription(&mut self, subscription: Subscription) -> Result<(), StoreError> {
        subscription_to_active(&subscription)
            .insert(&self.txn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn get_subscription(
        &mut self,
        id: SubscriptionId,
    ) -> Result<Option<Subscription>, StoreError> {
        let row = subscriptions::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(unavailable)?;
        Ok(row.map(subscription_from_model))
    }

    async fn update_subscription(
        &mut self,
        subscription: &Subscription,
    ) -> Result<(), StoreError> {
        subscription_to_active(subscription)
            .update(&self.txn)
            .await
            .map_err(|err| match err {
                DbErr::RecordNotUpdated => {
                    StoreError::RowNotFound(format!("subscription {}", subscription.id))
                }
                other => unavailable(other),
            })?;
        Ok(())
    }

    async fn list_active_subscriptions(&mut self) -> Result<Vec<Subscription>, StoreError> {
        let rows = subscriptions::Entity::find()
            .filter(subscriptions::Column::IsActive.eq(true))
            .filter(subscriptions::Column::AutoRenew.eq(true))
            .order_by_asc(subscriptions::Column::Id)
            .all(&self.txn)
            .await
            .map_err(unavailable)?;
        Ok(rows.into_iter().map(subscription_from_model).collect())
    }

    async fn insert_obligation(
        &mut self,
        obligation: ScheduledObligation,
    ) -> Result<(), StoreError> {
        obligation_to_active(&obligation)
            .insert(&self.txn)
            .await
            .map_err(|err| {
                if is_duplicate_key(&err) {
                    StoreError::duplicate_key("scheduled_obligations_subscription_due_key")
                } else {
                    unavailable(err)
                }
            })?;
        Ok(())
    }

    async fn get_obligation(
        &mut self,
        id: ObligationId,
    ) -> Result<Option<ScheduledObligation>, StoreError> {
        let row = scheduled_obligations::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(unavailable)?;
        Ok(row.map(obligation_from_model))
    }

    async fn find_obligation(
        &mut self,
        subscription_id: SubscriptionId,
        due_date: NaiveDate,
    ) -> Result<Option<ScheduledObligation>, StoreError> {
        let row = scheduled_obligations::Entity::find()
            .filter(
                scheduled_obligations::Column::SubscriptionId.eq(subscription_id.into_inner()),
            )
            .filter(scheduled_obligations::Column::DueDate.eq(due_date))
            .one(&self.txn)
            .await
            .map_err(unavailable)?;
        Ok(row.map(obligation_from_model))
    }

    async fn update_obligation(
        &mut self,
        obligation: &ScheduledObligation,
    ) -> Result<(), StoreError> {
        obligation_to_active(obligation)
            .update(&self.txn)
            .await
            .map_err(|err| match err {
                DbErr::RecordNotUpdated => {
                    StoreError::RowNotFound(format!("obligation {}", obligation.id))
                }
                other => unavailable(other),
            })?;
        Ok(())
    }

    async fn list_due_obligations(
        &mut self,
        on_or_before: NaiveDate,
    ) -> Result<Vec<ScheduledObligation>, StoreError> {
        let rows = scheduled_obligations::Entity::find()
            .filter(
                scheduled_obligations::Column::Status
                    .eq(sea_orm_active_enums::ObligationStatus::Scheduled),
            )
            .filter(scheduled_obligations::Column::DueDate.lte(on_or_before))
            .order_by_asc(scheduled_obligations::Column::DueDate)
            .order_by_asc(scheduled_obligations::Column::Id)
            .all(&self.txn)
            .await
            .map_err(unavailable)?;
        Ok(rows.into_iter().map(obligation_from_model).collect())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().await.map_err(|err| {
            if is_duplicate_key(&err) {
                StoreError::duplicate_key("deferred unique constraint")
            } else {
                unavailable(err)
            }
        })
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.txn.rollback().await.map_err(unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payvault_core::account::AccountKind as CoreKind;
    use payvault_shared::OwnerId;
    use rust_decimal_macros::dec;

    #[test]
    fn test_account_roundtrip_through_model() {
        let mut account = Account::new(OwnerId::new(), CoreKind::BudgetCard);
        account.balance = dec!(123.45);
        account.monthly_limit = Some(dec!(500));
        account.version = 7;

        let active = account_to_active(&account);
        assert_eq!(active.id, Set(account.id.into_inner()));

        let model = accounts::Model {
            id: account.id.into_inner(),
            owner_id: account.owner_id.into_inner(),
            kind: sea_orm_active_enums::AccountKind::BudgetCard,
            status: sea_orm_active_enums::AccountStatus::Active,
            balance: dec!(123.45),
            monthly_limit: Some(dec!(500)),
            version: 7,
            created_at: account.created_at.into(),
            updated_at: account.updated_at.into(),
        };
        let back = account_from_model(model);
        assert_eq!(back, account);
    }

    #[test]
    fn test_reason_mapping_is_total_and_inverse() {
        for reason in [
            EntryReason::Transfer,
            EntryReason::Topup,
            EntryReason::Withdrawal,
            EntryReason::BudgetAllocate,
            EntryReason::BudgetSpend,
            EntryReason::EscrowHold,
            EntryReason::EscrowRelease,
            EntryReason::EscrowRefund,
            EntryReason::LoanDisburse,
            EntryReason::LoanRepay,
            EntryReason::SubscriptionCharge,
        ] {
            assert_eq!(reason_from_db(reason_to_db(reason)), reason);
        }
    }
}
