//! Coordinator event handlers.
//!
//! Reacts to wallet events and advances the saga. Every transition is a
//! conditional update, so duplicate deliveries and races with the timeout
//! scanner are silent no-ops.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::db::TransferDb;
use super::error::CoordinatorError;
use super::status::TransferStatus;
use crate::broker::EventHandler;
use crate::events::{SagaEvent, Topic};

pub struct CoordinatorEventHandler {
    db: Arc<TransferDb>,
}

impl CoordinatorEventHandler {
    pub fn new(db: Arc<TransferDb>) -> Self {
        Self { db }
    }

    pub async fn dispatch(&self, topic: Topic, payload: &[u8]) -> Result<(), CoordinatorError> {
        let event = SagaEvent::decode(topic, payload)
            .map_err(|e| CoordinatorError::Payload(e.to_string()))?;

        match event {
            SagaEvent::WalletDebited(p) => {
                let won = self
                    .db
                    .transition(
                        p.transfer_id,
                        TransferStatus::Pending,
                        TransferStatus::Debited,
                        None,
                        &[],
                    )
                    .await?;
                self.log_transition(p.transfer_id, TransferStatus::Debited, won);
            }
            SagaEvent::WalletCredited(p) => {
                let won = self
                    .db
                    .transition(
                        p.transfer_id,
                        TransferStatus::Debited,
                        TransferStatus::Completed,
                        None,
                        &[SagaEvent::transfer_completed(p.transfer_id)],
                    )
                    .await?;
                self.log_transition(p.transfer_id, TransferStatus::Completed, won);
            }
            SagaEvent::WalletDebitFailed(p) => {
                let won = self
                    .db
                    .transition(
                        p.transfer_id,
                        TransferStatus::Pending,
                        TransferStatus::Failed,
                        Some(&p.reason),
                        &[SagaEvent::transfer_failed(p.transfer_id, p.reason.clone())],
                    )
                    .await?;
                self.log_transition(p.transfer_id, TransferStatus::Failed, won);
            }
            SagaEvent::WalletCreditFailed(p) => {
                // The ledger drives the refund; the coordinator only records
                // the terminal state.
                let won = self
                    .db
                    .transition(
                        p.transfer_id,
                        TransferStatus::Debited,
                        TransferStatus::Failed,
                        Some(&p.reason),
                        &[SagaEvent::transfer_failed(p.transfer_id, p.reason.clone())],
                    )
                    .await?;
                self.log_transition(p.transfer_id, TransferStatus::Failed, won);
            }
            SagaEvent::WalletRefunded(p) => {
                // Audit only; no state change.
                info!(
                    transfer_id = %p.transfer_id,
                    wallet_id = %p.wallet_id,
                    amount = p.amount,
                    "Refund observed for failed transfer"
                );
            }
            other => {
                warn!(topic = %other.topic(), "Coordinator received unexpected event");
            }
        }

        Ok(())
    }

    fn log_transition(&self, transfer_id: uuid::Uuid, new: TransferStatus, won: bool) {
        if won {
            info!(transfer_id = %transfer_id, status = %new, "Transfer state advanced");
        } else {
            debug!(
                transfer_id = %transfer_id,
                attempted = %new,
                "Transition lost the update race (duplicate or stale event)"
            );
        }
    }
}

#[async_trait]
impl EventHandler for CoordinatorEventHandler {
    async fn handle(&self, topic: Topic, payload: &[u8]) -> anyhow::Result<()> {
        self.dispatch(topic, payload).await.map_err(Into::into)
    }
}
