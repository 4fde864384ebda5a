//! Marketplace escrow order state machine.
//!
//! Buyer funds are parked on a dedicated escrow account while an order is
//! open, then move exactly once: to the seller on release, or back to the
//! buyer on refund. The terminal transition is staged inside the transfer
//! engine's transaction, under the escrow account's row lock, which is what
//! makes concurrent release/refund resolve to exactly one outcome.

pub mod service;
pub mod types;

pub use service::{EscrowService, EscrowTransitionGuard};
pub use types::{EscrowOrder, EscrowStatus, ListingCatalog, ListingInfo};
