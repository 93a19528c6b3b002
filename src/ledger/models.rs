//! Wallet and ledger entry types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::core_types::{Amount, EntryId, WalletId};

/// A user's wallet. Balance is integer minor units and can never go
/// negative: the check constraint and the guarded debit UPDATE both
/// enforce it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Wallet {
    pub wallet_id: WalletId,
    pub user_id: String,
    pub balance: Amount,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ledger entry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    Debit,
    Credit,
    Refund,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Debit => "DEBIT",
            EntryType::Credit => "CREDIT",
            EntryType::Refund => "REFUND",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DEBIT" => Some(EntryType::Debit),
            "CREDIT" => Some(EntryType::Credit),
            "REFUND" => Some(EntryType::Refund),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for EntryType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        EntryType::parse(&value).ok_or_else(|| format!("Invalid entry type: {}", value))
    }
}

/// An append-only record of one balance mutation.
///
/// `(wallet_id, transaction_id)` is unique: it is the idempotency key that
/// gives every wallet effect at-most-once semantics under at-least-once
/// delivery.
#[derive(Debug, Clone, FromRow)]
pub struct LedgerEntry {
    pub entry_id: EntryId,
    pub wallet_id: WalletId,
    pub transaction_id: Uuid,
    #[sqlx(try_from = "String")]
    pub entry_type: EntryType,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_type_round_trip() {
        for entry_type in [EntryType::Debit, EntryType::Credit, EntryType::Refund] {
            assert_eq!(EntryType::parse(entry_type.as_str()), Some(entry_type));
        }
    }

    #[test]
    fn test_invalid_entry_type() {
        assert_eq!(EntryType::parse("WITHDRAW"), None);
        assert_eq!(EntryType::parse("debit"), None);
    }
}
