//! The atomic transfer engine.
//!
//! The sole path by which any account balance is mutated. Callers describe
//! an operation as a [`TransferRequest`]; the engine acquires row locks in
//! the global order, re-validates every invariant against fresh rows, and
//! commits balances plus ledger entries as one atomic unit.

pub mod engine;
pub mod types;

#[cfg(test)]
mod engine_props;

pub use engine::{NoGuard, OperationGuard, TransferEngine};
pub use types::{Move, TransferReceipt, TransferRequest};
