//! Transfer saga states.
//!
//! Stored as TEXT in PostgreSQL; the same strings appear in API
//! projections. Terminal states are absorbing: every transition is a
//! conditional update guarded by the expected current status, so late or
//! duplicate events lose the update race and become no-ops.

use std::fmt;

/// Transfer saga states.
///
/// ```text
/// PENDING → DEBITED → COMPLETED
///    ↓         ↓
///  FAILED    FAILED (refund driven by the ledger)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferStatus {
    /// Accepted; debit not yet confirmed.
    Pending,
    /// Sender debited; credit not yet confirmed. Funds are in flight.
    Debited,
    /// Terminal: receiver credited.
    Completed,
    /// Terminal: saga failed; any debited funds are refunded by the ledger.
    Failed,
}

impl TransferStatus {
    /// Terminal states accept no further transitions.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "PENDING",
            TransferStatus::Debited => "DEBITED",
            TransferStatus::Completed => "COMPLETED",
            TransferStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(TransferStatus::Pending),
            "DEBITED" => Some(TransferStatus::Debited),
            "COMPLETED" => Some(TransferStatus::Completed),
            "FAILED" => Some(TransferStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for TransferStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TransferStatus::parse(&value).ok_or_else(|| format!("Invalid transfer status: {}", value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(TransferStatus::Completed.is_terminal());
        assert!(TransferStatus::Failed.is_terminal());

        assert!(!TransferStatus::Pending.is_terminal());
        assert!(!TransferStatus::Debited.is_terminal());
    }

    #[test]
    fn test_status_string_round_trip() {
        for status in [
            TransferStatus::Pending,
            TransferStatus::Debited,
            TransferStatus::Completed,
            TransferStatus::Failed,
        ] {
            assert_eq!(TransferStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_invalid_status_string() {
        assert_eq!(TransferStatus::parse("COMMITTED"), None);
        assert_eq!(TransferStatus::parse("pending"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(TransferStatus::Pending.to_string(), "PENDING");
        assert_eq!(TransferStatus::Failed.to_string(), "FAILED");
    }
}
