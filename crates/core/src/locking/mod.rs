//! Deterministic lock-order coordinator.
//!
//! Every operation that touches more than one account acquires the account
//! row locks in the order produced here. The specific order is irrelevant;
//! what matters is that it is a total order applied identically by every
//! caller, so two operations with overlapping account sets always acquire
//! the overlap in the same relative order and no wait-for cycle can form.

use payvault_shared::AccountId;

#[cfg(test)]
mod order_props;

/// Produces the global lock acquisition order for a set of accounts.
///
/// Pure function: deduplicates and sorts ascending by account id (UUID v7,
/// so the order is total and stable). The result is identical regardless of
/// the order in which the caller assembled the set.
#[must_use]
pub fn lock_order<I>(accounts: I) -> Vec<AccountId>
where
    I: IntoIterator<Item = AccountId>,
{
    let mut ordered: Vec<AccountId> = accounts.into_iter().collect();
    ordered.sort_unstable();
    ordered.dedup();
    ordered
}
