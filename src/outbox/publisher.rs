//! Polling outbox publisher.
//!
//! One periodic task per service instance. Selection uses skip-locked row
//! locks so multiple replicas drain the same table without blocking or
//! double-publishing within a commit window.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{OutboxError, OutboxRecord};
use crate::broker::MessageBroker;
use crate::events::Topic;

#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub poll_interval: Duration,
    pub batch_size: i64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            batch_size: 100,
        }
    }
}

pub struct OutboxPublisher {
    pool: PgPool,
    broker: Arc<dyn MessageBroker>,
    config: PublisherConfig,
}

impl OutboxPublisher {
    pub fn new(pool: PgPool, broker: Arc<dyn MessageBroker>, config: PublisherConfig) -> Self {
        Self {
            pool,
            broker,
            config,
        }
    }

    /// Run the publisher loop forever. Missed ticks are harmless; records
    /// stay unpublished until a later tick succeeds.
    pub async fn run(&self) -> ! {
        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            "Starting outbox publisher"
        );

        loop {
            if let Err(e) = self.tick().await {
                error!(error = %e, "Outbox publish tick failed");
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// One polling cycle. Returns the number of records marked published.
    pub async fn tick(&self) -> Result<usize, OutboxError> {
        let mut tx = self.pool.begin().await?;

        let batch: Vec<OutboxRecord> = sqlx::query_as(
            r#"
            SELECT id, aggregate_type, aggregate_id, event_type, payload,
                   created_at, published_at
            FROM outbox
            WHERE published_at IS NULL
            ORDER BY created_at ASC, id ASC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(self.config.batch_size)
        .fetch_all(&mut *tx)
        .await?;

        if batch.is_empty() {
            return Ok(0);
        }

        let mut published: Vec<Uuid> = Vec::with_capacity(batch.len());
        // Once a publish for an aggregate fails, later records of the same
        // aggregate must wait for the next tick or per-key order breaks.
        let mut stalled: HashSet<Uuid> = HashSet::new();

        for record in &batch {
            if stalled.contains(&record.aggregate_id) {
                continue;
            }

            let Some(topic) = Topic::parse(&record.event_type) else {
                // Can never publish; mark it so the queue keeps draining.
                error!(
                    id = %record.id,
                    event_type = %record.event_type,
                    "Outbox record with unknown event type"
                );
                published.push(record.id);
                continue;
            };

            let key = record.aggregate_id.to_string();
            let payload = serde_json::to_vec(&record.payload)?;

            match self.broker.publish(topic, &key, &payload).await {
                Ok(()) => published.push(record.id),
                Err(e) => {
                    warn!(
                        id = %record.id,
                        topic = %topic,
                        error = %e,
                        "Outbox publish failed; record stays unpublished"
                    );
                    stalled.insert(record.aggregate_id);
                }
            }
        }

        if !published.is_empty() {
            sqlx::query("UPDATE outbox SET published_at = NOW() WHERE id = ANY($1)")
                .bind(&published)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        debug!(count = published.len(), "Outbox records published");
        Ok(published.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publisher_config_default() {
        let config = PublisherConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.batch_size, 100);
    }
}
