//! Message broker abstraction.
//!
//! The broker is the only cross-service coordination point. It is assumed
//! to be topic-partitioned, keyed, and at-least-once; both sinks absorb
//! duplicate deliveries (ledger idempotency key, coordinator conditional
//! transitions), so nothing here needs exactly-once plumbing.

pub mod kafka;

pub use kafka::{KafkaBroker, KafkaConsumer, KafkaConsumerConfig};

use async_trait::async_trait;
use thiserror::Error;

use crate::events::Topic;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Broker connection failed: {0}")]
    Connection(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Subscribe failed: {0}")]
    Subscribe(String),
}

pub type Result<T> = std::result::Result<T, BrokerError>;

/// Producer side. The outbox publisher is the only caller; domain code
/// never publishes directly.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    async fn publish(&self, topic: Topic, key: &str, payload: &[u8]) -> Result<()>;
}

/// Consumer-side dispatch target. One implementation per service.
///
/// Returning `Err` leaves the message uncommitted so the broker redelivers
/// it; handlers must therefore be idempotent.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, topic: Topic, payload: &[u8]) -> anyhow::Result<()>;
}
