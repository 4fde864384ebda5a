//! `SeaORM` entity for the ledger_entries table.
//!
//! Append-only; `(operation_id, account_id)` carries a unique index that
//! doubles as the transfer idempotence key.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::EntryReason;

/// One immutable signed balance change.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    /// Primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// The account whose balance changed.
    pub account_id: Uuid,
    /// Signed amount.
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub delta: Decimal,
    /// Correlates the entries of one operation.
    pub operation_id: Uuid,
    /// Why the balance changed.
    pub reason: EntryReason,
    /// Optional note.
    #[sea_orm(nullable)]
    pub memo: Option<String>,
    /// Free-form operation metadata.
    pub metadata: Json,
    /// When the entry was written.
    pub created_at: DateTimeWithTimeZone,
}

/// No declared relations; entries reference accounts by id only.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
