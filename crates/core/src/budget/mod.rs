//! Budget-card spend authorization.
//!
//! A spend must clear two independent checks: the card's allocated balance
//! and, when configured, its monthly limit. The monthly aggregate is always
//! derived from the month's `budget_spend` ledger entries, never stored, so
//! there is no second source of truth to drift. The limit is re-derived
//! under the card's row lock before the spend commits.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use payvault_shared::{AccountId, OperationId, OwnerId};
use rust_decimal::Decimal;
use tracing::debug;

use crate::account::AccountKind;
use crate::ledger::LedgerError;
use crate::store::{LedgerStore, LedgerTxn};
use crate::transfer::{OperationGuard, TransferEngine, TransferReceipt, TransferRequest};

/// Why a spend was refused.
///
/// The two constraints produce distinguishable messages so callers can
/// report which one bound.
#[derive(Debug, Clone, PartialEq)]
pub enum SpendRefusal {
    /// The card's allocated balance cannot cover the spend.
    ExceedsBalance {
        /// Balance currently on the card.
        available: Decimal,
        /// Amount requested.
        requested: Decimal,
    },
    /// The spend would take the card over its monthly limit.
    ExceedsMonthlyLimit {
        /// Configured monthly cap.
        limit: Decimal,
        /// Spent so far this month (derived from the ledger).
        spent: Decimal,
        /// Amount requested.
        requested: Decimal,
    },
}

impl SpendRefusal {
    fn into_error(self, account_id: AccountId) -> LedgerError {
        match self {
            Self::ExceedsBalance {
                available,
                requested,
            } => LedgerError::InsufficientFunds {
                account_id,
                available,
                requested,
            },
            Self::ExceedsMonthlyLimit {
                limit,
                spent,
                requested,
            } => LedgerError::MonthlyLimitExceeded {
                limit,
                spent,
                requested,
            },
        }
    }
}

impl std::fmt::Display for SpendRefusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExceedsBalance {
                available,
                requested,
            } => write!(
                f,
                "exceeds allocated balance: requested {requested}, available {available}"
            ),
            Self::ExceedsMonthlyLimit {
                limit,
                spent,
                requested,
            } => write!(
                f,
                "exceeds monthly limit: requested {requested}, {} remaining of {limit}",
                limit - spent
            ),
        }
    }
}

/// Result of a spend authorization check.
#[derive(Debug, Clone, PartialEq)]
pub struct SpendCheck {
    /// Whether the spend may proceed.
    pub allowed: bool,
    /// The binding constraint when refused.
    pub refusal: Option<SpendRefusal>,
}

impl SpendCheck {
    const fn allowed() -> Self {
        Self {
            allowed: true,
            refusal: None,
        }
    }

    const fn refused(refusal: SpendRefusal) -> Self {
        Self {
            allowed: false,
            refusal: Some(refusal),
        }
    }
}

/// Re-derives the monthly aggregate under the card's row lock.
///
/// The pre-flight check in [`BudgetService::can_spend`] reads without locks
/// and can go stale; this guard makes the limit authoritative at commit
/// time.
struct MonthlyLimitGuard {
    card_id: AccountId,
    amount: Decimal,
    year: i32,
    month: u32,
}

impl<T: LedgerTxn> OperationGuard<T> for MonthlyLimitGuard {
    async fn enforce(&self, txn: &mut T) -> Result<(), LedgerError> {
        let card = txn
            .get_account(self.card_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(self.card_id))?;
        if let Some(limit) = card.monthly_limit {
            let spent = txn.month_spend(self.card_id, self.year, self.month).await?;
            if self.amount > limit - spent {
                return Err(LedgerError::MonthlyLimitExceeded {
                    limit,
                    spent,
                    requested: self.amount,
                });
            }
        }
        Ok(())
    }
}

/// Budget-card operations, layered on the transfer engine.
pub struct BudgetService<S: LedgerStore> {
    engine: Arc<TransferEngine<S>>,
}

impl<S: LedgerStore> BudgetService<S> {
    /// Creates the service.
    pub fn new(engine: Arc<TransferEngine<S>>) -> Self {
        Self { engine }
    }

    /// Authorizes a spend without executing it.
    ///
    /// Both constraints are evaluated; the balance check binds first so a
    /// spend that fails both reports the more fundamental shortfall.
    pub async fn can_spend(
        &self,
        card_id: AccountId,
        amount: Decimal,
        today: NaiveDate,
    ) -> Result<SpendCheck, LedgerError> {
        payvault_shared::validate_amount(amount)?;

        let mut txn = self.engine.store().begin().await?;
        let card = txn
            .get_account(card_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(card_id))?;
        if card.kind != AccountKind::BudgetCard {
            txn.rollback().await?;
            return Err(LedgerError::AccountKindMismatch {
                account_id: card_id,
                expected: AccountKind::BudgetCard,
            });
        }
        let spent = txn
            .month_spend(card_id, today.year(), today.month())
            .await?;
        txn.rollback().await?;

        if amount > card.balance {
            return Ok(SpendCheck::refused(SpendRefusal::ExceedsBalance {
                available: card.balance,
                requested: amount,
            }));
        }
        if let Some(limit) = card.monthly_limit {
            if amount > limit - spent {
                return Ok(SpendCheck::refused(SpendRefusal::ExceedsMonthlyLimit {
                    limit,
                    spent,
                    requested: amount,
                }));
            }
        }
        Ok(SpendCheck::allowed())
    }

    /// Executes an authorized spend.
    ///
    /// Delegates to the transfer engine with reason `budget_spend`; the
    /// monthly limit is re-derived under lock before commit.
    pub async fn spend(
        &self,
        operation_id: OperationId,
        card_id: AccountId,
        amount: Decimal,
        actor: OwnerId,
        today: NaiveDate,
        memo: Option<String>,
    ) -> Result<TransferReceipt, LedgerError> {
        let check = self.can_spend(card_id, amount, today).await?;
        if let Some(refusal) = check.refusal {
            debug!(card_id = %card_id, %refusal, "spend refused");
            return Err(refusal.into_error(card_id));
        }

        let mut request = TransferRequest::budget_spend(operation_id, card_id, amount, actor)?;
        if let Some(memo) = memo {
            request = request.with_memo(memo);
        }
        let guard = MonthlyLimitGuard {
            card_id,
            amount,
            year: today.year(),
            month: today.month(),
        };
        self.engine.apply_guarded_with_retry(&request, &guard).await
    }

    /// Funds a budget card from the owner's wallet.
    pub async fn allocate(
        &self,
        operation_id: OperationId,
        wallet_id: AccountId,
        card_id: AccountId,
        amount: Decimal,
        actor: OwnerId,
    ) -> Result<TransferReceipt, LedgerError> {
        let mut txn = self.engine.store().begin().await?;
        let wallet = txn
            .get_account(wallet_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(wallet_id))?;
        let card = txn
            .get_account(card_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(card_id))?;
        txn.rollback().await?;

        if wallet.kind != AccountKind::Wallet {
            return Err(LedgerError::AccountKindMismatch {
                account_id: wallet_id,
                expected: AccountKind::Wallet,
            });
        }
        if card.kind != AccountKind::BudgetCard {
            return Err(LedgerError::AccountKindMismatch {
                account_id: card_id,
                expected: AccountKind::BudgetCard,
            });
        }

        let request =
            TransferRequest::budget_allocate(operation_id, wallet_id, card_id, amount, actor)?;
        self.engine.apply_with_retry(&request).await
    }
}
