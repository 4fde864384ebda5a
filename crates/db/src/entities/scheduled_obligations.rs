//! `SeaORM` entity for the scheduled_obligations table.
//!
//! `(subscription_id, due_date)` carries a unique index: the scheduler
//! idempotence key.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::ObligationStatus;

/// A future subscription payment.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "scheduled_obligations")]
pub struct Model {
    /// Primary key; doubles as the charge operation id.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// The subscription this payment belongs to.
    pub subscription_id: Uuid,
    /// The budget card to charge.
    pub account_id: Uuid,
    /// Charge amount.
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub amount: Decimal,
    /// When the charge is due.
    pub due_date: Date,
    /// Whether the charge was submitted to the transfer engine.
    pub materialized: bool,
    /// Lifecycle state.
    pub status: ObligationStatus,
    /// Operation id of the settling charge.
    #[sea_orm(nullable)]
    pub settled_operation_id: Option<Uuid>,
    /// Creation timestamp.
    pub created_at: DateTimeWithTimeZone,
}

/// No declared relations; obligations reference subscriptions by id only.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
