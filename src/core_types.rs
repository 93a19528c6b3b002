//! Core identity and money types shared by both services.

use uuid::Uuid;

/// Saga identity. Time-ordered (UUIDv7) so it doubles as the broker
/// message key and keeps outbox index locality.
pub type TransferId = Uuid;

/// Wallet identity.
pub type WalletId = Uuid;

/// Ledger entry identity.
pub type EntryId = Uuid;

/// Dead-letter entry identity.
pub type DeadLetterId = Uuid;

/// Monetary amount in integer minor units. Floating point is never used
/// for money anywhere in this crate.
pub type Amount = i64;

/// Namespace for deriving deterministic refund transaction ids.
///
/// Fixed forever: changing it would break refund idempotency for sagas
/// already in flight.
pub const REFUND_NAMESPACE: Uuid = Uuid::from_u128(0x9e2f41d87a304c5ba1e603bd52c488f1);

/// Generate a fresh time-ordered id for a new row.
pub fn new_id() -> Uuid {
    Uuid::now_v7()
}

/// Derive the transaction id for the refund that compensates `transfer_id`.
///
/// The derivation is deterministic so that every path able to trigger the
/// refund (handler retry, broker redelivery, DLQ replay, timeout-driven
/// synthetic credit-failed) lands on the same `(wallet_id, transaction_id)`
/// idempotency key. It always differs from the original debit's
/// transaction id, which is `transfer_id` itself.
pub fn refund_transaction_id(transfer_id: TransferId) -> Uuid {
    let name = format!("refund:{}", transfer_id);
    Uuid::new_v5(&REFUND_NAMESPACE, name.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refund_id_deterministic() {
        let transfer_id = new_id();
        let a = refund_transaction_id(transfer_id);
        let b = refund_transaction_id(transfer_id);
        assert_eq!(a, b);
    }

    #[test]
    fn test_refund_id_differs_from_transfer_id() {
        let transfer_id = new_id();
        assert_ne!(refund_transaction_id(transfer_id), transfer_id);
    }

    #[test]
    fn test_refund_id_differs_across_transfers() {
        let a = refund_transaction_id(new_id());
        let b = refund_transaction_id(new_id());
        assert_ne!(a, b);
    }

    #[test]
    fn test_new_ids_are_unique() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
    }
}
