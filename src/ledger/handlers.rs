//! Ledger event handlers.
//!
//! Drives the wallet side of the choreography: debit on
//! `transfer.initiated`, credit on `wallet.debited`, refund on
//! `wallet.credit-failed`. Business failures become `*Failed` events;
//! transient store failures are left to broker redelivery, except on the
//! refund path which retries in-process and quarantines to the DLQ.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::dlq::DeadLetterStore;
use super::engine::{LedgerApplied, LedgerEngine};
use super::error::LedgerError;
use super::models::EntryType;
use super::retry::{self, RetryPolicy};
use crate::broker::EventHandler;
use crate::core_types::refund_transaction_id;
use crate::events::{
    SagaEvent, Topic, TransferInitiatedPayload, WalletCreditFailedPayload, WalletDebitedPayload,
};
use crate::outbox;

/// Refund the sender for a failed credit.
///
/// The transaction id is derived deterministically from the transfer id,
/// so every path that can reach here (redelivery, retry, DLQ replay,
/// timeout-driven synthetic credit-failed) converges on one refund entry.
/// The `wallet.refunded` event is captured only on the first application.
pub(crate) async fn apply_refund(
    engine: &LedgerEngine,
    p: &WalletCreditFailedPayload,
) -> Result<LedgerApplied, LedgerError> {
    let transaction_id = refund_transaction_id(p.transfer_id);
    let event = SagaEvent::wallet_refunded(p.transfer_id, p.sender_wallet_id, p.amount);

    engine
        .apply(
            p.sender_wallet_id,
            transaction_id,
            p.amount,
            EntryType::Refund,
            Some(&event),
        )
        .await
}

pub struct LedgerEventHandler {
    engine: Arc<LedgerEngine>,
    dlq: Arc<DeadLetterStore>,
    retry_policy: RetryPolicy,
}

impl LedgerEventHandler {
    pub fn new(
        engine: Arc<LedgerEngine>,
        dlq: Arc<DeadLetterStore>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            engine,
            dlq,
            retry_policy,
        }
    }

    pub async fn dispatch(&self, topic: Topic, payload: &[u8]) -> Result<(), LedgerError> {
        let event =
            SagaEvent::decode(topic, payload).map_err(|e| LedgerError::Payload(e.to_string()))?;

        match event {
            SagaEvent::TransferInitiated(p) => self.on_transfer_initiated(p).await,
            SagaEvent::WalletDebited(p) => self.on_wallet_debited(p).await,
            SagaEvent::WalletCreditFailed(p) => self.on_wallet_credit_failed(p).await,
            other => {
                warn!(topic = %other.topic(), "Ledger received unexpected event");
                Ok(())
            }
        }
    }

    /// Debit the sender. The transaction id is the transfer id itself.
    async fn on_transfer_initiated(&self, p: TransferInitiatedPayload) -> Result<(), LedgerError> {
        let debited = SagaEvent::wallet_debited(
            p.transfer_id,
            p.sender_wallet_id,
            p.receiver_wallet_id,
            p.amount,
        );

        match self
            .engine
            .apply(
                p.sender_wallet_id,
                p.transfer_id,
                p.amount,
                EntryType::Debit,
                Some(&debited),
            )
            .await
        {
            Ok(applied) => {
                if applied.is_duplicate {
                    debug!(transfer_id = %p.transfer_id, "Debit already applied");
                }
                Ok(())
            }
            Err(e) if !e.is_transient() => {
                info!(
                    transfer_id = %p.transfer_id,
                    sender_wallet_id = %p.sender_wallet_id,
                    reason = %e,
                    "Debit rejected"
                );
                let failed = SagaEvent::wallet_debit_failed(p.transfer_id, e.to_string());
                outbox::append_standalone(self.engine.pool(), &failed).await?;
                Ok(())
            }
            // Transient: leave uncommitted and let redelivery re-execute.
            Err(e) => Err(e),
        }
    }

    /// Credit the receiver; on business failure emit `wallet.credit-failed`
    /// carrying the sender so the refund path can run.
    async fn on_wallet_debited(&self, p: WalletDebitedPayload) -> Result<(), LedgerError> {
        let credited = SagaEvent::wallet_credited(p.transfer_id, p.receiver_wallet_id, p.amount);

        match self
            .engine
            .apply(
                p.receiver_wallet_id,
                p.transfer_id,
                p.amount,
                EntryType::Credit,
                Some(&credited),
            )
            .await
        {
            Ok(applied) => {
                if applied.is_duplicate {
                    debug!(transfer_id = %p.transfer_id, "Credit already applied");
                }
                Ok(())
            }
            Err(e) if !e.is_transient() => {
                info!(
                    transfer_id = %p.transfer_id,
                    receiver_wallet_id = %p.receiver_wallet_id,
                    reason = %e,
                    "Credit rejected; compensation will refund the sender"
                );
                let failed = SagaEvent::wallet_credit_failed(
                    p.transfer_id,
                    p.wallet_id,
                    p.amount,
                    e.to_string(),
                );
                outbox::append_standalone(self.engine.pool(), &failed).await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Refund path: bounded in-process retry, then DLQ quarantine.
    ///
    /// Quarantining still returns `Ok` so the broker message is
    /// acknowledged and the partition keeps draining.
    async fn on_wallet_credit_failed(
        &self,
        p: WalletCreditFailedPayload,
    ) -> Result<(), LedgerError> {
        match retry::with_backoff(&self.retry_policy, || apply_refund(&self.engine, &p)).await {
            Ok(applied) => {
                if applied.is_duplicate {
                    debug!(transfer_id = %p.transfer_id, "Refund already applied");
                } else {
                    info!(
                        transfer_id = %p.transfer_id,
                        sender_wallet_id = %p.sender_wallet_id,
                        amount = p.amount,
                        "Sender refunded"
                    );
                }
                Ok(())
            }
            Err(exhausted) => {
                let payload = serde_json::to_value(&p)?;
                self.dlq
                    .insert(
                        Topic::WalletCreditFailed,
                        payload,
                        &exhausted.error,
                        exhausted.attempts,
                    )
                    .await?;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl EventHandler for LedgerEventHandler {
    async fn handle(&self, topic: Topic, payload: &[u8]) -> anyhow::Result<()> {
        self.dispatch(topic, payload).await.map_err(Into::into)
    }
}
