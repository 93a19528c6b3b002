//! Transfer initiation and query.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::info;

use super::db::{Transfer, TransferDb};
use super::error::CoordinatorError;
use super::status::TransferStatus;
use crate::core_types::{Amount, TransferId, WalletId, new_id};
use crate::events::SagaEvent;

/// The coordinator's request-path surface: initiate and query.
///
/// Initiation does no broker I/O; the `transfer.initiated` event is written
/// to the outbox in the same transaction as the transfer row and shipped by
/// the publisher.
pub struct TransferService {
    db: Arc<TransferDb>,
    saga_timeout: Duration,
}

impl TransferService {
    pub fn new(db: Arc<TransferDb>, saga_timeout: Duration) -> Self {
        Self { db, saga_timeout }
    }

    /// Start a new transfer saga in PENDING.
    pub async fn initiate(
        &self,
        sender_wallet_id: WalletId,
        receiver_wallet_id: WalletId,
        amount: Amount,
    ) -> Result<Transfer, CoordinatorError> {
        if amount < 1 {
            return Err(CoordinatorError::InvalidAmount);
        }
        if sender_wallet_id == receiver_wallet_id {
            return Err(CoordinatorError::SameWallet);
        }

        let now = Utc::now();
        let timeout_at = now
            + chrono::Duration::from_std(self.saga_timeout)
                .map_err(|e| CoordinatorError::Database(format!("Invalid saga timeout: {}", e)))?;

        let transfer = Transfer {
            transfer_id: new_id(),
            sender_wallet_id,
            receiver_wallet_id,
            amount,
            status: TransferStatus::Pending,
            failure_reason: None,
            timeout_at,
            created_at: now,
            updated_at: now,
        };

        let event = SagaEvent::transfer_initiated(
            transfer.transfer_id,
            sender_wallet_id,
            receiver_wallet_id,
            amount,
        );

        self.db.create(&transfer, &[event]).await?;

        info!(
            transfer_id = %transfer.transfer_id,
            sender_wallet_id = %sender_wallet_id,
            receiver_wallet_id = %receiver_wallet_id,
            amount = amount,
            "Transfer initiated"
        );

        Ok(transfer)
    }

    /// Get a transfer by id.
    pub async fn get(&self, transfer_id: TransferId) -> Result<Transfer, CoordinatorError> {
        self.db
            .get(transfer_id)
            .await?
            .ok_or(CoordinatorError::TransferNotFound(transfer_id))
    }
}
