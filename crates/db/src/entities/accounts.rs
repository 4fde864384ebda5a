//! `SeaORM` entity for the accounts table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{AccountKind, AccountStatus};

/// A balance-bearing account row.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    /// Primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Verified owner.
    pub owner_id: Uuid,
    /// Account classification.
    pub kind: AccountKind,
    /// Lifecycle status.
    pub status: AccountStatus,
    /// Current balance.
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub balance: Decimal,
    /// Monthly spend cap (budget cards).
    #[sea_orm(column_type = "Decimal(Some((20, 2)))", nullable)]
    pub monthly_limit: Option<Decimal>,
    /// Bumped on every balance write.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTimeWithTimeZone,
    /// Last mutation timestamp.
    pub updated_at: DateTimeWithTimeZone,
}

/// No declared relations; ledger entries reference accounts by id only.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
