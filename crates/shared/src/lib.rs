//! Shared types and configuration for PayVault.
//!
//! This crate provides common building blocks used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Monetary amount validation rules
//! - Configuration management
//!
//! No ledger logic or database code lives here.

pub mod config;
pub mod types;

pub use config::AppConfig;
pub use types::amount::{AmountError, validate_amount, validate_loan_amount, validate_topup_amount};
pub use types::id::{
    AccountId, EntryId, ListingId, ObligationId, OperationId, OrderId, OwnerId, SubscriptionId,
};
