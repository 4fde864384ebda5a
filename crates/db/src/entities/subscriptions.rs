//! `SeaORM` entity for the subscriptions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::BillingCycle;

/// A recurring payment agreement.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    /// Primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// The budget card charged each cycle.
    pub account_id: Uuid,
    /// Subscribed service name.
    pub service_name: String,
    /// Charge amount per cycle.
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub amount: Decimal,
    /// Billing cadence.
    pub billing_cycle: BillingCycle,
    /// Next expected charge date.
    #[sea_orm(nullable)]
    pub next_billing_date: Option<Date>,
    /// Last settled charge date.
    #[sea_orm(nullable)]
    pub last_payment_date: Option<Date>,
    /// Whether the subscription is live.
    pub is_active: bool,
    /// Whether new cycles are scheduled automatically.
    pub auto_renew: bool,
    /// Creation timestamp.
    pub created_at: DateTimeWithTimeZone,
    /// Cancellation timestamp.
    #[sea_orm(nullable)]
    pub cancelled_at: Option<DateTimeWithTimeZone>,
}

/// No declared relations; subscriptions reference accounts by id only.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
