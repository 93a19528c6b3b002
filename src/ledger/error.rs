//! Ledger error types.
//!
//! Business failures (`WalletNotFound`, `InsufficientBalance`) are events
//! in disguise: handlers convert them into `*Failed` events rather than
//! retrying. Only transient store errors are retryable, and only on the
//! refund path.

use thiserror::Error;

use crate::core_types::{Amount, DeadLetterId, WalletId};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Wallet not found: {0}")]
    WalletNotFound(WalletId),

    #[error("Insufficient balance: have {current}, need {required}")]
    InsufficientBalance { current: Amount, required: Amount },

    #[error("User already has a wallet: {0}")]
    DuplicateUser(String),

    #[error("Amount must be a positive integer")]
    InvalidAmount,

    #[error("Dead letter entry not found: {0}")]
    DeadLetterNotFound(DeadLetterId),

    #[error("Malformed event payload: {0}")]
    Payload(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl LedgerError {
    /// Stable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::WalletNotFound(_) => "WALLET_NOT_FOUND",
            LedgerError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            LedgerError::DuplicateUser(_) => "DUPLICATE_USER",
            LedgerError::InvalidAmount => "INVALID_AMOUNT",
            LedgerError::DeadLetterNotFound(_) => "DEAD_LETTER_NOT_FOUND",
            LedgerError::Payload(_) => "MALFORMED_PAYLOAD",
            LedgerError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// HTTP status for API responses.
    pub fn http_status(&self) -> u16 {
        match self {
            LedgerError::InvalidAmount => 400,
            LedgerError::DuplicateUser(_) => 409,
            LedgerError::WalletNotFound(_) | LedgerError::DeadLetterNotFound(_) => 404,
            LedgerError::InsufficientBalance { .. } => 422,
            LedgerError::Payload(_) | LedgerError::Database(_) => 500,
        }
    }

    /// Whether a retry could plausibly succeed. Business outcomes are
    /// deterministic and never retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Database(_))
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::Database(e.to_string())
    }
}

impl From<crate::outbox::OutboxError> for LedgerError {
    fn from(e: crate::outbox::OutboxError) -> Self {
        match e {
            crate::outbox::OutboxError::Database(e) => LedgerError::Database(e.to_string()),
            crate::outbox::OutboxError::Encode(e) => LedgerError::Payload(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::Payload(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::new_id;

    #[test]
    fn test_http_status() {
        assert_eq!(LedgerError::DuplicateUser("u1".into()).http_status(), 409);
        assert_eq!(LedgerError::WalletNotFound(new_id()).http_status(), 404);
        assert_eq!(
            LedgerError::InsufficientBalance {
                current: 0,
                required: 5000
            }
            .http_status(),
            422
        );
        assert_eq!(LedgerError::Database("boom".into()).http_status(), 500);
    }

    #[test]
    fn test_transient_classification() {
        assert!(LedgerError::Database("connection reset".into()).is_transient());

        assert!(!LedgerError::WalletNotFound(new_id()).is_transient());
        assert!(
            !LedgerError::InsufficientBalance {
                current: 1,
                required: 2
            }
            .is_transient()
        );
    }

    #[test]
    fn test_insufficient_balance_message() {
        let e = LedgerError::InsufficientBalance {
            current: 100,
            required: 5000,
        };
        assert!(e.to_string().contains("Insufficient balance"));
    }

    #[test]
    fn test_wallet_not_found_message() {
        let e = LedgerError::WalletNotFound(new_id());
        assert!(e.to_string().contains("Wallet not found"));
    }
}
