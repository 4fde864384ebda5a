//! Property-based tests for the transfer engine.
//!
//! Drives random operation sequences against an in-process store and checks
//! the two load-bearing invariants after every step: conservation (monetary
//! balances equal net external flow) and non-negativity of wallet and
//! budget-card balances.

use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::account::{Account, AccountKind};
use crate::ledger::balance::conservation_holds;
use crate::ledger::LedgerError;
use crate::notify::NoopNotifier;
use crate::store::memory::MemoryStore;
use crate::transfer::{TransferEngine, TransferRequest};
use payvault_shared::config::EngineConfig;
use payvault_shared::{AccountId, OperationId, OwnerId};

/// A randomly generated operation over a fixed fleet of three wallets and
/// one budget card.
#[derive(Debug, Clone)]
enum Op {
    Topup { wallet: usize, amount: Decimal },
    Transfer { from: usize, to: usize, amount: Decimal },
    Allocate { wallet: usize, amount: Decimal },
    Spend { amount: Decimal },
}

fn dollars(range: std::ops::Range<i64>) -> impl Strategy<Value = Decimal> {
    range.prop_map(|cents| Decimal::new(cents, 2))
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..3, dollars(500..50_000))
            .prop_map(|(wallet, amount)| Op::Topup { wallet, amount }),
        (0usize..3, 0usize..3, dollars(1..20_000))
            .prop_map(|(from, to, amount)| Op::Transfer { from, to, amount }),
        (0usize..3, dollars(1..10_000)).prop_map(|(wallet, amount)| Op::Allocate {
            wallet,
            amount
        }),
        dollars(1..10_000).prop_map(|amount| Op::Spend { amount }),
    ]
}

/// Business-rule rejections are expected outcomes under random inputs;
/// anything else fails the property.
fn is_expected_rejection(err: &LedgerError) -> bool {
    matches!(
        err,
        LedgerError::InsufficientFunds { .. }
            | LedgerError::InvalidAmount(_)
            | LedgerError::UnbalancedOperation { .. }
    )
}

async fn run_ops(ops: Vec<Op>) -> Result<(), TestCaseError> {
    let store = MemoryStore::default();
    let engine = TransferEngine::new(
        Arc::new(store.clone()),
        EngineConfig::default(),
        Arc::new(NoopNotifier),
    );

    let owner = OwnerId::new();
    let mut wallets: Vec<AccountId> = Vec::new();
    for _ in 0..3 {
        let wallet = Account::new(owner, AccountKind::Wallet);
        wallets.push(wallet.id);
        store.seed_account(wallet).map_err(|e| TestCaseError::fail(e.to_string()))?;
    }
    let card = Account::new(owner, AccountKind::BudgetCard);
    let card_id = card.id;
    store.seed_account(card).map_err(|e| TestCaseError::fail(e.to_string()))?;

    for op in ops {
        let request = match op {
            Op::Topup { wallet, amount } => {
                TransferRequest::topup(OperationId::new(), wallets[wallet], amount)
            }
            Op::Transfer { from, to, amount } if from != to => TransferRequest::peer_transfer(
                OperationId::new(),
                wallets[from],
                wallets[to],
                amount,
                owner,
            ),
            Op::Transfer { .. } => continue,
            Op::Allocate { wallet, amount } => TransferRequest::budget_allocate(
                OperationId::new(),
                wallets[wallet],
                card_id,
                amount,
                owner,
            ),
            Op::Spend { amount } => {
                TransferRequest::budget_spend(OperationId::new(), card_id, amount, owner)
            }
        };

        match request {
            Ok(request) => match engine.apply(&request).await {
                Ok(_) => {}
                Err(err) if is_expected_rejection(&err) => {}
                Err(err) => return Err(TestCaseError::fail(format!("unexpected error: {err}"))),
            },
            Err(err) if is_expected_rejection(&err) => {}
            Err(err) => return Err(TestCaseError::fail(format!("unexpected error: {err}"))),
        }

        let accounts = store
            .snapshot_accounts()
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let entries = store
            .snapshot_entries()
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        prop_assert!(
            conservation_holds(accounts.iter(), &entries),
            "conservation violated after an operation"
        );
        for account in &accounts {
            if account.kind.enforces_non_negative() {
                prop_assert!(
                    account.balance >= Decimal::ZERO,
                    "negative balance on {}",
                    account.id
                );
            }
        }
    }

    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Conservation and non-negativity hold after every committed or
    /// rejected operation in any random sequence.
    #[test]
    fn prop_invariants_hold_under_random_operations(ops in prop::collection::vec(op_strategy(), 1..24)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        runtime.block_on(run_ops(ops))?;
    }
}
