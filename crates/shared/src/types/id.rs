//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing an `OwnerId` where an
//! `AccountId` is expected. All IDs are UUID v7, which is time-ordered and
//! therefore gives every entity a total order — the lock coordinator relies
//! on `AccountId: Ord` for its global acquisition order.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

typed_id!(AccountId, "Unique identifier for a balance-bearing account.");
typed_id!(OwnerId, "Unique identifier for the owner of one or more accounts.");
typed_id!(EntryId, "Unique identifier for a ledger entry.");
typed_id!(
    OperationId,
    "Correlates all ledger entries written by one logical operation; doubles as the idempotence key."
);
typed_id!(OrderId, "Unique identifier for an escrow order.");
typed_id!(ListingId, "Unique identifier for a marketplace listing.");
typed_id!(SubscriptionId, "Unique identifier for a subscription.");
typed_id!(
    ObligationId,
    "Unique identifier for a scheduled subscription payment obligation."
);
