//! Append-only ledger and the core error taxonomy.
//!
//! Every balance mutation leaves one immutable [`LedgerEntry`] per moved
//! account, correlated by a shared operation id. The ledger is the audit
//! trail from which every balance can be reconstructed.

pub mod balance;
pub mod entry;
pub mod error;

pub use balance::{replay_balance, total_monetary_balance};
pub use entry::{EntryReason, LedgerEntry};
pub use error::LedgerError;
