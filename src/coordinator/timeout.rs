//! Timeout recovery.
//!
//! Background worker that fails sagas stuck past their deadline. A stuck
//! DEBITED transfer additionally emits a synthetic `wallet.credit-failed`
//! so the ledger runs its normal refund path; the deterministic refund
//! transaction id deduplicates against a real credit-failed that may still
//! arrive.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use super::db::TransferDb;
use super::error::CoordinatorError;
use super::status::TransferStatus;
use crate::events::SagaEvent;

/// Configuration for the timeout scanner.
#[derive(Debug, Clone)]
pub struct TimeoutWorkerConfig {
    /// How often to scan for expired transfers.
    pub scan_interval: Duration,
    /// Maximum transfers to fail per scan.
    pub batch_size: i64,
}

impl Default for TimeoutWorkerConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(10),
            batch_size: 100,
        }
    }
}

pub struct TimeoutWorker {
    db: Arc<TransferDb>,
    config: TimeoutWorkerConfig,
}

impl TimeoutWorker {
    pub fn new(db: Arc<TransferDb>, config: TimeoutWorkerConfig) -> Self {
        Self { db, config }
    }

    /// Run the scanner loop forever.
    pub async fn run(&self) -> ! {
        info!(
            scan_interval_secs = self.config.scan_interval.as_secs(),
            batch_size = self.config.batch_size,
            "Starting timeout scanner"
        );

        loop {
            if let Err(e) = self.scan_once().await {
                error!(error = %e, "Timeout scan failed");
            }

            tokio::time::sleep(self.config.scan_interval).await;
        }
    }

    /// Run a single scan cycle. Returns how many transfers were failed.
    pub async fn scan_once(&self) -> Result<usize, CoordinatorError> {
        let stuck = self.db.find_expired(self.config.batch_size).await?;

        if stuck.is_empty() {
            debug!("No expired transfers found");
            return Ok(0);
        }

        info!(count = stuck.len(), "Found expired transfers");

        let mut failed = 0;

        for transfer in stuck {
            let won = match transfer.status {
                TransferStatus::Pending => {
                    let reason = "saga timeout: debit not processed";
                    self.db
                        .transition(
                            transfer.transfer_id,
                            TransferStatus::Pending,
                            TransferStatus::Failed,
                            Some(reason),
                            &[SagaEvent::transfer_failed(transfer.transfer_id, reason)],
                        )
                        .await?
                }
                TransferStatus::Debited => {
                    // Funds left the sender; the synthetic credit-failed
                    // routes through the ledger's refund path.
                    let reason = "saga timeout: credit not processed";
                    self.db
                        .transition(
                            transfer.transfer_id,
                            TransferStatus::Debited,
                            TransferStatus::Failed,
                            Some(reason),
                            &[
                                SagaEvent::transfer_failed(transfer.transfer_id, reason),
                                SagaEvent::wallet_credit_failed(
                                    transfer.transfer_id,
                                    transfer.sender_wallet_id,
                                    transfer.amount,
                                    "saga timeout",
                                ),
                            ],
                        )
                        .await?
                }
                // find_expired only returns non-terminal rows; a terminal
                // status here means a real event won the race meanwhile.
                _ => false,
            };

            if won {
                info!(
                    transfer_id = %transfer.transfer_id,
                    was = %transfer.status,
                    "Expired transfer failed by timeout scanner"
                );
                failed += 1;
            } else {
                debug!(
                    transfer_id = %transfer.transfer_id,
                    "Timeout transition lost to a concurrent event"
                );
            }
        }

        Ok(failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_config_default() {
        let config = TimeoutWorkerConfig::default();
        assert_eq!(config.scan_interval, Duration::from_secs(10));
        assert_eq!(config.batch_size, 100);
    }
}
