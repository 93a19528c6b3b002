//! Wallet ledger service.
//!
//! Owns wallets and their append-only ledger. Every balance mutation is
//! idempotent via the `(wallet_id, transaction_id)` uniqueness, which is
//! what turns at-least-once delivery into at-most-once wallet effects.
//! Compensation (refund) is the only path with in-process retries; its
//! terminal failures are quarantined to the dead-letter queue.

pub mod api;
pub mod db;
pub mod dlq;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod models;
pub mod retry;

#[cfg(test)]
mod integration_tests;

pub use db::WalletDb;
pub use dlq::{DeadLetter, DeadLetterStatus, DeadLetterStore, ReplayService};
pub use engine::{LedgerApplied, LedgerEngine};
pub use error::LedgerError;
pub use handlers::LedgerEventHandler;
pub use models::{EntryType, LedgerEntry, Wallet};
pub use retry::RetryPolicy;
