//! `SeaORM` entity for the escrow_orders table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::EscrowStatus;

/// A marketplace order holding funds pending fulfillment.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "escrow_orders")]
pub struct Model {
    /// Primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// The purchased listing.
    pub listing_id: Uuid,
    /// Buyer wallet.
    pub buyer_account_id: Uuid,
    /// Seller wallet.
    pub seller_account_id: Uuid,
    /// Dedicated hold account.
    pub escrow_account_id: Uuid,
    /// Purchase amount.
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub amount: Decimal,
    /// Lifecycle state.
    pub status: EscrowStatus,
    /// Creation timestamp.
    pub created_at: DateTimeWithTimeZone,
    /// Terminal-transition timestamp.
    #[sea_orm(nullable)]
    pub resolved_at: Option<DateTimeWithTimeZone>,
}

/// No declared relations; orders reference accounts by id only.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
