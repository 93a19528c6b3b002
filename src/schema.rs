//! Schema bootstrap for both service stores.
//!
//! Each service owns its own PostgreSQL database; table names are part of
//! the operational contract. The coordinator store holds `transfers` and
//! `outbox`; the ledger store holds `wallets`, `wallet_ledger_entries`,
//! `dead_letter_queue` and its own `outbox`.

use anyhow::Result;
use sqlx::PgPool;

/// Initialize the coordinator service schema.
pub async fn init_coordinator_schema(pool: &PgPool) -> Result<()> {
    tracing::info!("Initializing coordinator schema...");

    for ddl in [
        CREATE_TRANSFERS_TABLE,
        CREATE_TRANSFERS_TIMEOUT_INDEX,
        CREATE_OUTBOX_TABLE,
        CREATE_OUTBOX_UNPUBLISHED_INDEX,
    ] {
        sqlx::query(ddl).execute(pool).await?;
    }

    tracing::info!("Coordinator schema initialized");
    Ok(())
}

/// Initialize the ledger service schema.
pub async fn init_ledger_schema(pool: &PgPool) -> Result<()> {
    tracing::info!("Initializing ledger schema...");

    for ddl in [
        CREATE_WALLETS_TABLE,
        CREATE_LEDGER_ENTRIES_TABLE,
        CREATE_DEAD_LETTER_TABLE,
        CREATE_OUTBOX_TABLE,
        CREATE_OUTBOX_UNPUBLISHED_INDEX,
    ] {
        sqlx::query(ddl).execute(pool).await?;
    }

    tracing::info!("Ledger schema initialized");
    Ok(())
}

const CREATE_TRANSFERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS transfers (
    transfer_id UUID PRIMARY KEY,
    sender_wallet_id UUID NOT NULL,
    receiver_wallet_id UUID NOT NULL,
    amount BIGINT NOT NULL CHECK (amount > 0),
    status TEXT NOT NULL,
    failure_reason TEXT,
    timeout_at TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CHECK (sender_wallet_id <> receiver_wallet_id)
)
"#;

const CREATE_TRANSFERS_TIMEOUT_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_transfers_timeout
    ON transfers (timeout_at)
    WHERE status IN ('PENDING', 'DEBITED')
"#;

const CREATE_WALLETS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS wallets (
    wallet_id UUID PRIMARY KEY,
    user_id TEXT NOT NULL UNIQUE,
    balance BIGINT NOT NULL DEFAULT 0 CHECK (balance >= 0),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_LEDGER_ENTRIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS wallet_ledger_entries (
    entry_id UUID PRIMARY KEY,
    wallet_id UUID NOT NULL REFERENCES wallets (wallet_id),
    transaction_id UUID NOT NULL,
    entry_type TEXT NOT NULL,
    amount BIGINT NOT NULL CHECK (amount > 0),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (wallet_id, transaction_id)
)
"#;

const CREATE_DEAD_LETTER_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS dead_letter_queue (
    id UUID PRIMARY KEY,
    original_topic TEXT NOT NULL,
    original_payload JSONB NOT NULL,
    error_message TEXT NOT NULL,
    error_stack TEXT,
    attempt_count INT NOT NULL,
    status TEXT NOT NULL DEFAULT 'PENDING',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    processed_at TIMESTAMPTZ
)
"#;

const CREATE_OUTBOX_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS outbox (
    id UUID PRIMARY KEY,
    aggregate_type TEXT NOT NULL,
    aggregate_id UUID NOT NULL,
    event_type TEXT NOT NULL,
    payload JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    published_at TIMESTAMPTZ
)
"#;

const CREATE_OUTBOX_UNPUBLISHED_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_outbox_unpublished
    ON outbox (created_at)
    WHERE published_at IS NULL
"#;
