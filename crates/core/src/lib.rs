//! Ledger and concurrency-control core for PayVault.
//!
//! This crate contains the transactional heart of the wallet: every balance
//! mutation in the system flows through the [`transfer::TransferEngine`],
//! which acquires account row locks in the order computed by [`locking`],
//! re-validates invariants under lock, and commits balances plus append-only
//! ledger entries as one atomic unit.
//!
//! # Modules
//!
//! - `account` - Balance-bearing account model
//! - `ledger` - Append-only ledger entries and the error taxonomy
//! - `locking` - Deterministic lock-order coordinator
//! - `store` - Storage traits and the in-process `MemoryStore` backend
//! - `transfer` - The atomic transfer engine
//! - `escrow` - Marketplace escrow order state machine
//! - `budget` - Budget-card spend authorization guard
//! - `scheduler` - Idempotent subscription payment scheduler
//! - `notify` - Fire-and-forget notification seam

pub mod account;
pub mod budget;
pub mod escrow;
pub mod ledger;
pub mod locking;
pub mod notify;
pub mod scheduler;
pub mod store;
pub mod transfer;
