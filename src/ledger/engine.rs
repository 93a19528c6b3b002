//! Idempotent ledger engine.
//!
//! One operation: `apply`. It mutates a wallet balance, records the entry,
//! and optionally captures the resulting event, all in a single transaction.
//! The `(wallet_id, transaction_id)` uniqueness is the idempotency key
//! that absorbs redeliveries, retries and replays.

use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use super::error::LedgerError;
use super::models::{EntryType, LedgerEntry, Wallet};
use crate::core_types::{Amount, WalletId, new_id};
use crate::events::SagaEvent;
use crate::outbox;

const WALLET_COLUMNS: &str = "wallet_id, user_id, balance, created_at, updated_at";
const ENTRY_COLUMNS: &str = "entry_id, wallet_id, transaction_id, entry_type, amount, created_at";

/// Result of a ledger application.
pub struct LedgerApplied {
    pub wallet: Wallet,
    pub entry: LedgerEntry,
    /// True when the entry already existed and nothing was changed.
    pub is_duplicate: bool,
}

pub struct LedgerEngine {
    pool: PgPool,
}

impl LedgerEngine {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply a balance mutation idempotently.
    ///
    /// In one transaction:
    /// 1. If an entry with `(wallet_id, transaction_id)` exists, return it
    ///    with `is_duplicate = true`; the outbox event is NOT written.
    /// 2. Update the wallet row. Debits carry `balance >= amount` in the
    ///    UPDATE predicate, evaluated under the row lock, so two concurrent
    ///    debits cannot both pass.
    /// 3. Zero rows affected means either the wallet is missing or the
    ///    balance check failed; look up which and fail accordingly.
    /// 4. Insert the ledger entry.
    /// 5. Capture `outbox_event` if provided.
    pub async fn apply(
        &self,
        wallet_id: WalletId,
        transaction_id: Uuid,
        amount: Amount,
        entry_type: EntryType,
        outbox_event: Option<&SagaEvent>,
    ) -> Result<LedgerApplied, LedgerError> {
        if amount < 1 {
            return Err(LedgerError::InvalidAmount);
        }

        let mut tx = self.pool.begin().await?;

        // Idempotency short-circuit.
        let existing = sqlx::query_as::<_, LedgerEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM wallet_ledger_entries
            WHERE wallet_id = $1 AND transaction_id = $2
            "#
        ))
        .bind(wallet_id)
        .bind(transaction_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(entry) = existing {
            let wallet = sqlx::query_as::<_, Wallet>(&format!(
                "SELECT {WALLET_COLUMNS} FROM wallets WHERE wallet_id = $1"
            ))
            .bind(wallet_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(LedgerError::WalletNotFound(wallet_id))?;

            debug!(
                wallet_id = %wallet_id,
                transaction_id = %transaction_id,
                entry_type = %entry_type,
                "Duplicate ledger application absorbed"
            );

            return Ok(LedgerApplied {
                wallet,
                entry,
                is_duplicate: true,
            });
        }

        let update = match entry_type {
            EntryType::Debit => {
                sqlx::query(
                    r#"
                    UPDATE wallets
                    SET balance = balance - $1, updated_at = NOW()
                    WHERE wallet_id = $2 AND balance >= $1
                    "#,
                )
                .bind(amount)
                .bind(wallet_id)
                .execute(&mut *tx)
                .await?
            }
            EntryType::Credit | EntryType::Refund => {
                sqlx::query(
                    r#"
                    UPDATE wallets
                    SET balance = balance + $1, updated_at = NOW()
                    WHERE wallet_id = $2
                    "#,
                )
                .bind(amount)
                .bind(wallet_id)
                .execute(&mut *tx)
                .await?
            }
        };

        if update.rows_affected() != 1 {
            let current: Option<Amount> =
                sqlx::query_scalar("SELECT balance FROM wallets WHERE wallet_id = $1")
                    .bind(wallet_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            tx.rollback().await?;

            return Err(match current {
                None => LedgerError::WalletNotFound(wallet_id),
                Some(current) => LedgerError::InsufficientBalance {
                    current,
                    required: amount,
                },
            });
        }

        // A concurrent apply with the same key can still beat us to this
        // insert; the unique constraint rolls everything back and broker
        // redelivery lands on the short-circuit above.
        let entry = sqlx::query_as::<_, LedgerEntry>(&format!(
            r#"
            INSERT INTO wallet_ledger_entries
                (entry_id, wallet_id, transaction_id, entry_type, amount)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(new_id())
        .bind(wallet_id)
        .bind(transaction_id)
        .bind(entry_type.as_str())
        .bind(amount)
        .fetch_one(&mut *tx)
        .await?;

        let wallet = sqlx::query_as::<_, Wallet>(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE wallet_id = $1"
        ))
        .bind(wallet_id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(event) = outbox_event {
            outbox::append(&mut tx, event).await?;
        }

        tx.commit().await?;

        info!(
            wallet_id = %wallet_id,
            transaction_id = %transaction_id,
            entry_type = %entry_type,
            amount = amount,
            balance = wallet.balance,
            "Ledger entry applied"
        );

        Ok(LedgerApplied {
            wallet,
            entry,
            is_duplicate: false,
        })
    }
}
