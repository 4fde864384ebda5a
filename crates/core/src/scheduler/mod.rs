//! Idempotent subscription payment scheduler.
//!
//! Materializes upcoming subscription charges as [`ScheduledObligation`]
//! rows within a configurable horizon, and executes due obligations through
//! the transfer engine. Every path is safe to re-run: the
//! `(subscription, due_date)` pair is a unique key, and charges reuse the
//! obligation id as their operation id.

pub mod service;
pub mod types;

pub use service::SchedulerService;
pub use types::{
    BillingCycle, ChargeOutcome, EnsureOutcome, ObligationStatus, ScheduledObligation,
    Subscription, SyncReport,
};
