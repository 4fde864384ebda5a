//! Initial database migration.
//!
//! Creates the ledger enums and tables, the row-lock target (accounts), the
//! append-only ledger with its idempotence index, and the escrow/scheduler
//! tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(ENUMS_SQL).await?;
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(LEDGER_ENTRIES_SQL).await?;
        db.execute_unprepared(ESCROW_ORDERS_SQL).await?;
        db.execute_unprepared(SUBSCRIPTIONS_SQL).await?;
        db.execute_unprepared(SCHEDULED_OBLIGATIONS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE account_kind AS ENUM ('wallet', 'budget_card', 'escrow', 'loan');

CREATE TYPE account_status AS ENUM ('active', 'frozen', 'closed');

CREATE TYPE entry_reason AS ENUM (
    'transfer',
    'topup',
    'withdrawal',
    'budget_allocate',
    'budget_spend',
    'escrow_hold',
    'escrow_release',
    'escrow_refund',
    'loan_disburse',
    'loan_repay',
    'subscription_charge'
);

CREATE TYPE escrow_status AS ENUM ('PENDING', 'HELD', 'RELEASED', 'REFUNDED');

CREATE TYPE billing_cycle AS ENUM ('weekly', 'monthly', 'quarterly', 'yearly');

CREATE TYPE obligation_status AS ENUM ('scheduled', 'settled', 'failed');
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    owner_id UUID NOT NULL,
    kind account_kind NOT NULL,
    status account_status NOT NULL DEFAULT 'active',
    balance NUMERIC(20, 2) NOT NULL DEFAULT 0,
    monthly_limit NUMERIC(20, 2),
    version BIGINT NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT accounts_non_negative_check CHECK (
        kind NOT IN ('wallet', 'budget_card') OR balance >= 0
    )
);

CREATE INDEX idx_accounts_owner ON accounts (owner_id);
";

const LEDGER_ENTRIES_SQL: &str = r"
CREATE TABLE ledger_entries (
    id UUID PRIMARY KEY,
    account_id UUID NOT NULL REFERENCES accounts (id),
    delta NUMERIC(20, 2) NOT NULL,
    operation_id UUID NOT NULL,
    reason entry_reason NOT NULL,
    memo TEXT,
    metadata JSONB NOT NULL DEFAULT 'null'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT ledger_entries_nonzero_check CHECK (delta <> 0)
);

-- Transfer idempotence key: a retried operation cannot write a second
-- entry set.
CREATE UNIQUE INDEX ledger_entries_operation_account_key
    ON ledger_entries (operation_id, account_id);

CREATE INDEX idx_ledger_entries_account_created
    ON ledger_entries (account_id, created_at);

CREATE INDEX idx_ledger_entries_account_reason
    ON ledger_entries (account_id, reason, created_at);
";

const ESCROW_ORDERS_SQL: &str = r"
CREATE TABLE escrow_orders (
    id UUID PRIMARY KEY,
    listing_id UUID NOT NULL,
    buyer_account_id UUID NOT NULL REFERENCES accounts (id),
    seller_account_id UUID NOT NULL REFERENCES accounts (id),
    escrow_account_id UUID NOT NULL REFERENCES accounts (id),
    amount NUMERIC(20, 2) NOT NULL CHECK (amount > 0),
    status escrow_status NOT NULL DEFAULT 'PENDING',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    resolved_at TIMESTAMPTZ
);

CREATE INDEX idx_escrow_orders_buyer ON escrow_orders (buyer_account_id);
CREATE INDEX idx_escrow_orders_seller ON escrow_orders (seller_account_id);
";

const SUBSCRIPTIONS_SQL: &str = r"
CREATE TABLE subscriptions (
    id UUID PRIMARY KEY,
    account_id UUID NOT NULL REFERENCES accounts (id),
    service_name VARCHAR(100) NOT NULL,
    amount NUMERIC(20, 2) NOT NULL CHECK (amount > 0),
    billing_cycle billing_cycle NOT NULL DEFAULT 'monthly',
    next_billing_date DATE,
    last_payment_date DATE,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    auto_renew BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    cancelled_at TIMESTAMPTZ
);

CREATE INDEX idx_subscriptions_account ON subscriptions (account_id);
CREATE INDEX idx_subscriptions_active
    ON subscriptions (is_active, auto_renew, next_billing_date);
";

const SCHEDULED_OBLIGATIONS_SQL: &str = r"
CREATE TABLE scheduled_obligations (
    id UUID PRIMARY KEY,
    subscription_id UUID NOT NULL REFERENCES subscriptions (id),
    account_id UUID NOT NULL REFERENCES accounts (id),
    amount NUMERIC(20, 2) NOT NULL CHECK (amount > 0),
    due_date DATE NOT NULL,
    materialized BOOLEAN NOT NULL DEFAULT FALSE,
    status obligation_status NOT NULL DEFAULT 'scheduled',
    settled_operation_id UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- Scheduler idempotence key: one obligation per subscription and due date.
CREATE UNIQUE INDEX scheduled_obligations_subscription_due_key
    ON scheduled_obligations (subscription_id, due_date);

CREATE INDEX idx_scheduled_obligations_due
    ON scheduled_obligations (status, due_date);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS scheduled_obligations;
DROP TABLE IF EXISTS subscriptions;
DROP TABLE IF EXISTS escrow_orders;
DROP TABLE IF EXISTS ledger_entries;
DROP TABLE IF EXISTS accounts;

DROP TYPE IF EXISTS obligation_status;
DROP TYPE IF EXISTS billing_cycle;
DROP TYPE IF EXISTS escrow_status;
DROP TYPE IF EXISTS entry_reason;
DROP TYPE IF EXISTS account_status;
DROP TYPE IF EXISTS account_kind;
";
