//! Subscription and scheduled-obligation types.

use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use payvault_shared::{AccountId, ObligationId, OperationId, SubscriptionId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::LedgerError;

/// How often a subscription bills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    /// Every 7 days.
    Weekly,
    /// Every calendar month; day-of-month clamps at month end.
    Monthly,
    /// Every 3 calendar months.
    Quarterly,
    /// Every 12 calendar months.
    Yearly,
}

impl BillingCycle {
    /// The next billing date after `from`.
    ///
    /// Month arithmetic is calendar-aware: Jan 31 + 1 month = Feb 28 (or 29).
    /// Saturates at the calendar limits, which are unreachable in practice.
    #[must_use]
    pub fn next_date(self, from: NaiveDate) -> NaiveDate {
        match self {
            Self::Weekly => from.checked_add_days(Days::new(7)).unwrap_or(from),
            Self::Monthly => from.checked_add_months(Months::new(1)).unwrap_or(from),
            Self::Quarterly => from.checked_add_months(Months::new(3)).unwrap_or(from),
            Self::Yearly => from.checked_add_months(Months::new(12)).unwrap_or(from),
        }
    }
}

/// A recurring payment agreement charged against a budget card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique subscription identifier.
    pub id: SubscriptionId,
    /// The budget card the charges hit.
    pub account_id: AccountId,
    /// Name of the subscribed service.
    pub service_name: String,
    /// Charge amount per cycle.
    pub amount: Decimal,
    /// Billing cadence.
    pub billing_cycle: BillingCycle,
    /// Date of the next expected charge; `None` when never anchored.
    pub next_billing_date: Option<NaiveDate>,
    /// Date of the last settled charge.
    pub last_payment_date: Option<NaiveDate>,
    /// Whether the subscription is live.
    pub is_active: bool,
    /// Whether new cycles are scheduled automatically.
    pub auto_renew: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Cancellation timestamp, if cancelled.
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Subscription {
    /// Creates an active, auto-renewing subscription anchored at
    /// `first_billing_date`.
    #[must_use]
    pub fn new(
        account_id: AccountId,
        service_name: impl Into<String>,
        amount: Decimal,
        billing_cycle: BillingCycle,
        first_billing_date: NaiveDate,
    ) -> Self {
        Self {
            id: SubscriptionId::new(),
            account_id,
            service_name: service_name.into(),
            amount,
            billing_cycle,
            next_billing_date: Some(first_billing_date),
            last_payment_date: None,
            is_active: true,
            auto_renew: true,
            created_at: Utc::now(),
            cancelled_at: None,
        }
    }

    /// The billing date following `from` (or the current anchor), or `None`
    /// when the subscription no longer renews.
    #[must_use]
    pub fn next_cycle_date(&self, from: Option<NaiveDate>) -> Option<NaiveDate> {
        if !self.is_active || !self.auto_renew {
            return None;
        }
        let base = from.or(self.next_billing_date)?;
        Some(self.billing_cycle.next_date(base))
    }
}

/// Lifecycle of a scheduled obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObligationStatus {
    /// Waiting for its due date.
    Scheduled,
    /// Charge committed through the transfer engine.
    Settled,
    /// Charge attempted and rejected (insufficient funds); reported, not
    /// silently retried.
    Failed,
}

/// A future subscription payment, materialized within the horizon.
///
/// Never duplicated: `(subscription_id, due_date)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledObligation {
    /// Unique obligation identifier; doubles as the charge operation id.
    pub id: ObligationId,
    /// The subscription this payment belongs to.
    pub subscription_id: SubscriptionId,
    /// The budget card to charge.
    pub account_id: AccountId,
    /// Charge amount.
    pub amount: Decimal,
    /// When the charge is due.
    pub due_date: NaiveDate,
    /// Whether the charge has been submitted to the transfer engine.
    pub materialized: bool,
    /// Lifecycle state.
    pub status: ObligationStatus,
    /// Operation id of the settling charge.
    pub settled_operation_id: Option<OperationId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Outcome of `ensure_next_payment`.
#[derive(Debug, Clone, PartialEq)]
pub enum EnsureOutcome {
    /// A new obligation was created.
    Created(ScheduledObligation),
    /// The obligation already existed; nothing changed.
    Existing(ScheduledObligation),
    /// The next billing date lies beyond the horizon.
    NotYetDue,
    /// The subscription is inactive, non-renewing, or unanchored.
    Inactive,
}

/// Outcome of `charge_due`.
#[derive(Debug, Clone, PartialEq)]
pub enum ChargeOutcome {
    /// The charge committed and the next cycle was scheduled.
    Settled(ScheduledObligation),
    /// The obligation had already settled; nothing changed.
    AlreadySettled(ScheduledObligation),
    /// The obligation is not yet due.
    NotDue(ScheduledObligation),
    /// The charge was rejected; the obligation is marked failed and the
    /// rejection is carried for reporting.
    Failed {
        /// The failed obligation.
        obligation: ScheduledObligation,
        /// Why the charge was rejected.
        error: LedgerError,
    },
}

/// Counters from one `sync_all` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Subscriptions with an obligation inside the horizon (existing or new).
    pub synced: usize,
    /// Obligations created by this pass.
    pub created: usize,
    /// Subscriptions skipped (inactive or unanchored).
    pub skipped: usize,
    /// Active subscriptions examined.
    pub total_active: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(BillingCycle::Weekly, date(2026, 3, 10), date(2026, 3, 17))]
    #[case(BillingCycle::Monthly, date(2026, 3, 10), date(2026, 4, 10))]
    #[case(BillingCycle::Quarterly, date(2026, 3, 10), date(2026, 6, 10))]
    #[case(BillingCycle::Yearly, date(2026, 3, 10), date(2027, 3, 10))]
    fn test_cycle_arithmetic(
        #[case] cycle: BillingCycle,
        #[case] from: NaiveDate,
        #[case] expected: NaiveDate,
    ) {
        assert_eq!(cycle.next_date(from), expected);
    }

    #[test]
    fn test_monthly_clamps_at_month_end() {
        assert_eq!(
            BillingCycle::Monthly.next_date(date(2026, 1, 31)),
            date(2026, 2, 28)
        );
        // leap year
        assert_eq!(
            BillingCycle::Monthly.next_date(date(2028, 1, 31)),
            date(2028, 2, 29)
        );
    }

    #[test]
    fn test_next_cycle_date_uses_anchor_by_default() {
        let sub = Subscription::new(
            AccountId::new(),
            "Music",
            dec!(9.99),
            BillingCycle::Monthly,
            date(2026, 5, 1),
        );
        assert_eq!(sub.next_cycle_date(None), Some(date(2026, 6, 1)));
        assert_eq!(
            sub.next_cycle_date(Some(date(2026, 5, 3))),
            Some(date(2026, 6, 3))
        );
    }

    #[test]
    fn test_next_cycle_date_none_when_not_renewing() {
        let mut sub = Subscription::new(
            AccountId::new(),
            "Music",
            dec!(9.99),
            BillingCycle::Monthly,
            date(2026, 5, 1),
        );
        sub.auto_renew = false;
        assert_eq!(sub.next_cycle_date(None), None);

        sub.auto_renew = true;
        sub.is_active = false;
        assert_eq!(sub.next_cycle_date(None), None);
    }
}
