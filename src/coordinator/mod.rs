//! Transaction coordinator service.
//!
//! Owns the Transfer saga state machine. Accepts transfer requests over
//! HTTP, reacts to wallet events from the broker, and fails stuck sagas
//! via the timeout scanner. There is no orchestrator: the ledger and the
//! coordinator each react to the other's events.
//!
//! # State Machine
//!
//! ```text
//! PENDING → DEBITED → COMPLETED
//!    ↓         ↓
//!  FAILED    FAILED (ledger refunds the sender)
//! ```
//!
//! # Safety Invariants
//!
//! 1. Every transition is a conditional update on the expected status
//! 2. Status change and resulting outbox rows commit in one transaction
//! 3. Terminal states are absorbing
//! 4. No broker I/O on the HTTP request path

pub mod api;
pub mod db;
pub mod error;
pub mod handlers;
pub mod service;
pub mod status;
pub mod timeout;

#[cfg(test)]
mod integration_tests;

pub use db::{Transfer, TransferDb};
pub use error::CoordinatorError;
pub use handlers::CoordinatorEventHandler;
pub use service::TransferService;
pub use status::TransferStatus;
pub use timeout::{TimeoutWorker, TimeoutWorkerConfig};
