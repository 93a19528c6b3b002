//! Fundflow - Distributed Money-Transfer Saga Engine
//!
//! Two cooperating services move funds between wallets by exchanging
//! events over a partitioned log, with no central orchestrator:
//!
//! - [`coordinator`] - Transaction coordinator owning the Transfer saga
//! - [`ledger`] - Wallet ledger performing idempotent debit/credit/refund
//! - [`outbox`] - Transactional outbox with a polling publisher
//! - [`broker`] - Kafka producer/consumer plumbing
//! - [`events`] - The closed saga event vocabulary
//!
//! Cross-service correctness rests on three mechanisms: atomic
//! write-then-publish via the outbox, the ledger's `(wallet_id,
//! transaction_id)` idempotency key, and conditional saga state
//! transitions. Together they yield exactly-once business effects on an
//! at-least-once broker.

// Core types - must be first!
pub mod core_types;

// Configuration and infrastructure
pub mod config;
pub mod db;
pub mod logging;
pub mod schema;

// Messaging
pub mod broker;
pub mod events;
pub mod outbox;

// Services
pub mod coordinator;
pub mod ledger;

// Convenient re-exports at crate root
pub use config::AppConfig;
pub use core_types::{Amount, TransferId, WalletId, new_id, refund_transaction_id};
pub use events::{SagaEvent, Topic};
