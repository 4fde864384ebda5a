//! Property-based tests for the lock-order coordinator.
//!
//! The deadlock-freedom argument rests entirely on these properties: the
//! order is a total order, computed identically for every caller.

use proptest::prelude::*;
use uuid::Uuid;

use super::lock_order;
use payvault_shared::AccountId;

/// Strategy to generate small sets of account ids (with duplicates allowed).
fn account_ids() -> impl Strategy<Value = Vec<AccountId>> {
    prop::collection::vec(prop::array::uniform16(any::<u8>()), 0..12)
        .prop_map(|ids| ids.into_iter().map(|b| AccountId::from_uuid(Uuid::from_bytes(b))).collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The order never depends on how the caller assembled the set.
    #[test]
    fn prop_permutation_invariant(ids in account_ids(), seed in any::<u64>()) {
        let mut shuffled = ids.clone();
        // cheap deterministic shuffle driven by the seed
        let len = shuffled.len();
        if len > 1 {
            for i in 0..len {
                #[allow(clippy::cast_possible_truncation)]
                let j = ((seed.rotate_left(i as u32) as usize) % len + i) % len;
                shuffled.swap(i, j);
            }
        }
        prop_assert_eq!(lock_order(ids), lock_order(shuffled));
    }

    /// The output is strictly ascending, hence duplicate-free and total.
    #[test]
    fn prop_strictly_ascending(ids in account_ids()) {
        let ordered = lock_order(ids);
        prop_assert!(ordered.windows(2).all(|w| w[0] < w[1]));
    }

    /// Every distinct input id appears exactly once in the output.
    #[test]
    fn prop_preserves_set(ids in account_ids()) {
        let ordered = lock_order(ids.clone());
        let mut expected: Vec<AccountId> = ids;
        expected.sort_unstable();
        expected.dedup();
        prop_assert_eq!(ordered, expected);
    }

    /// Two operations agree on the relative order of their shared accounts.
    #[test]
    fn prop_overlap_consistency(left in account_ids(), right in account_ids()) {
        let left_order = lock_order(left.clone());
        let right_order = lock_order(right.clone());

        for a in &left_order {
            for b in &left_order {
                let la = left_order.iter().position(|x| x == a);
                let lb = left_order.iter().position(|x| x == b);
                let ra = right_order.iter().position(|x| x == a);
                let rb = right_order.iter().position(|x| x == b);
                if let (Some(la), Some(lb), Some(ra), Some(rb)) = (la, lb, ra, rb) {
                    // shared pair: relative order must match in both sequences
                    prop_assert_eq!(la < lb, ra < rb);
                }
            }
        }
    }
}
