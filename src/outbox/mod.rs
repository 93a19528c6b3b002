//! Transactional outbox.
//!
//! Any event observable to the other service has a durable antecedent row
//! written in the same local transaction as the domain change that caused
//! it. Producers never talk to the broker; the polling publisher drains
//! unpublished rows and marks them published once the broker accepts them.

pub mod publisher;
pub mod store;

pub use publisher::{OutboxPublisher, PublisherConfig};
pub use store::{OutboxRecord, append, append_standalone};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutboxError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Event encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}
