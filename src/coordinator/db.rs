//! Transfer persistence.
//!
//! All state transitions are conditional updates guarded by the expected
//! current status; the affected-row count decides the winner. The status
//! change and the outbox rows for its resulting events commit in one local
//! transaction, which is what makes write-then-publish atomic.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use super::error::CoordinatorError;
use super::status::TransferStatus;
use crate::core_types::{Amount, TransferId, WalletId};
use crate::events::SagaEvent;
use crate::outbox;

/// A transfer saga record.
#[derive(Debug, Clone, FromRow)]
pub struct Transfer {
    pub transfer_id: TransferId,
    pub sender_wallet_id: WalletId,
    pub receiver_wallet_id: WalletId,
    pub amount: Amount,
    #[sqlx(try_from = "String")]
    pub status: TransferStatus,
    pub failure_reason: Option<String>,
    pub timeout_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const TRANSFER_COLUMNS: &str = "transfer_id, sender_wallet_id, receiver_wallet_id, amount, \
     status, failure_reason, timeout_at, created_at, updated_at";

/// Transfer database operations.
pub struct TransferDb {
    pool: PgPool,
}

impl TransferDb {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert a new transfer together with the outbox rows for `events`.
    pub async fn create(
        &self,
        transfer: &Transfer,
        events: &[SagaEvent],
    ) -> Result<(), CoordinatorError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO transfers
                (transfer_id, sender_wallet_id, receiver_wallet_id, amount,
                 status, failure_reason, timeout_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(transfer.transfer_id)
        .bind(transfer.sender_wallet_id)
        .bind(transfer.receiver_wallet_id)
        .bind(transfer.amount)
        .bind(transfer.status.as_str())
        .bind(&transfer.failure_reason)
        .bind(transfer.timeout_at)
        .execute(&mut *tx)
        .await?;

        for event in events {
            outbox::append(&mut tx, event).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Get a transfer by id.
    pub async fn get(&self, transfer_id: TransferId) -> Result<Option<Transfer>, CoordinatorError> {
        let transfer = sqlx::query_as::<_, Transfer>(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM transfers WHERE transfer_id = $1"
        ))
        .bind(transfer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transfer)
    }

    /// Conditional transition: move `transfer_id` from `expected` to `new`
    /// and append the outbox rows for `events`, all in one transaction.
    ///
    /// Returns false when the guard fails (duplicate delivery or a race
    /// with the timeout scanner); the loser leaves no observable effect.
    pub async fn transition(
        &self,
        transfer_id: TransferId,
        expected: TransferStatus,
        new: TransferStatus,
        failure_reason: Option<&str>,
        events: &[SagaEvent],
    ) -> Result<bool, CoordinatorError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE transfers
            SET status = $1,
                failure_reason = COALESCE($2, failure_reason),
                updated_at = NOW()
            WHERE transfer_id = $3 AND status = $4
            "#,
        )
        .bind(new.as_str())
        .bind(failure_reason)
        .bind(transfer_id)
        .bind(expected.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        for event in events {
            outbox::append(&mut tx, event).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Find stuck sagas: non-terminal transfers past their deadline,
    /// oldest deadline first.
    pub async fn find_expired(&self, limit: i64) -> Result<Vec<Transfer>, CoordinatorError> {
        let transfers = sqlx::query_as::<_, Transfer>(&format!(
            r#"
            SELECT {TRANSFER_COLUMNS}
            FROM transfers
            WHERE status IN ('PENDING', 'DEBITED')
              AND timeout_at < NOW()
            ORDER BY timeout_at ASC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(transfers)
    }
}
