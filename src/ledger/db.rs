//! Wallet persistence.

use sqlx::PgPool;

use super::error::LedgerError;
use super::models::{LedgerEntry, Wallet};
use crate::core_types::{WalletId, new_id};

const WALLET_COLUMNS: &str = "wallet_id, user_id, balance, created_at, updated_at";
const ENTRY_COLUMNS: &str = "entry_id, wallet_id, transaction_id, entry_type, amount, created_at";

/// Wallet database operations.
pub struct WalletDb {
    pool: PgPool,
}

impl WalletDb {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create a wallet with zero balance. One wallet per user.
    pub async fn create_wallet(&self, user_id: &str) -> Result<Wallet, LedgerError> {
        let result = sqlx::query_as::<_, Wallet>(&format!(
            r#"
            INSERT INTO wallets (wallet_id, user_id, balance)
            VALUES ($1, $2, 0)
            RETURNING {WALLET_COLUMNS}
            "#
        ))
        .bind(new_id())
        .bind(user_id)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(wallet) => {
                tracing::info!(
                    wallet_id = %wallet.wallet_id,
                    user_id = %user_id,
                    "Wallet created"
                );
                Ok(wallet)
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(LedgerError::DuplicateUser(user_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get a wallet by id.
    pub async fn get_wallet(&self, wallet_id: WalletId) -> Result<Option<Wallet>, LedgerError> {
        let wallet = sqlx::query_as::<_, Wallet>(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE wallet_id = $1"
        ))
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(wallet)
    }

    /// All ledger entries for a wallet, oldest first.
    pub async fn entries(&self, wallet_id: WalletId) -> Result<Vec<LedgerEntry>, LedgerError> {
        let entries = sqlx::query_as::<_, LedgerEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM wallet_ledger_entries
            WHERE wallet_id = $1
            ORDER BY created_at ASC
            "#
        ))
        .bind(wallet_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
