//! Coordinator error types.

use thiserror::Error;

use crate::core_types::TransferId;

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("Sender and receiver wallet must differ")]
    SameWallet,

    #[error("Amount must be a positive integer")]
    InvalidAmount,

    #[error("Transfer not found: {0}")]
    TransferNotFound(TransferId),

    #[error("Malformed event payload: {0}")]
    Payload(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl CoordinatorError {
    /// Stable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            CoordinatorError::SameWallet => "SAME_WALLET",
            CoordinatorError::InvalidAmount => "INVALID_AMOUNT",
            CoordinatorError::TransferNotFound(_) => "TRANSFER_NOT_FOUND",
            CoordinatorError::Payload(_) => "MALFORMED_PAYLOAD",
            CoordinatorError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// HTTP status for API responses.
    pub fn http_status(&self) -> u16 {
        match self {
            CoordinatorError::SameWallet | CoordinatorError::InvalidAmount => 400,
            CoordinatorError::TransferNotFound(_) => 404,
            CoordinatorError::Payload(_) | CoordinatorError::Database(_) => 500,
        }
    }
}

impl From<sqlx::Error> for CoordinatorError {
    fn from(e: sqlx::Error) -> Self {
        CoordinatorError::Database(e.to_string())
    }
}

impl From<crate::outbox::OutboxError> for CoordinatorError {
    fn from(e: crate::outbox::OutboxError) -> Self {
        match e {
            crate::outbox::OutboxError::Database(e) => CoordinatorError::Database(e.to_string()),
            crate::outbox::OutboxError::Encode(e) => CoordinatorError::Payload(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for CoordinatorError {
    fn from(e: serde_json::Error) -> Self {
        CoordinatorError::Payload(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::new_id;

    #[test]
    fn test_http_status() {
        assert_eq!(CoordinatorError::SameWallet.http_status(), 400);
        assert_eq!(CoordinatorError::InvalidAmount.http_status(), 400);
        assert_eq!(CoordinatorError::TransferNotFound(new_id()).http_status(), 404);
        assert_eq!(CoordinatorError::Database("boom".into()).http_status(), 500);
    }
}
