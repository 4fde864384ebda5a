//! `SeaORM` entity definitions for the ledger tables.

pub mod accounts;
pub mod escrow_orders;
pub mod ledger_entries;
pub mod scheduled_obligations;
pub mod sea_orm_active_enums;
pub mod subscriptions;
