//! Saga event vocabulary.
//!
//! Eight broker topics form a closed set; every event is a tagged variant
//! over them. The message key is always the saga's `transfer_id`, which
//! gives per-saga total order on a key-partitioned broker. Payloads are
//! JSON with a fixed shape per topic; every payload carries `transferId`
//! and an ISO-8601 UTC `timestamp`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core_types::{Amount, TransferId, WalletId};

/// Broker topics. Names are part of the wire contract and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    TransferInitiated,
    TransferCompleted,
    TransferFailed,
    WalletDebited,
    WalletDebitFailed,
    WalletCredited,
    WalletCreditFailed,
    WalletRefunded,
}

impl Topic {
    pub const ALL: [Topic; 8] = [
        Topic::TransferInitiated,
        Topic::TransferCompleted,
        Topic::TransferFailed,
        Topic::WalletDebited,
        Topic::WalletDebitFailed,
        Topic::WalletCredited,
        Topic::WalletCreditFailed,
        Topic::WalletRefunded,
    ];

    /// Topics the coordinator's consumer group subscribes to.
    ///
    /// `wallet.refunded` is consumed for audit logging only.
    pub const COORDINATOR: [Topic; 5] = [
        Topic::WalletDebited,
        Topic::WalletDebitFailed,
        Topic::WalletCredited,
        Topic::WalletCreditFailed,
        Topic::WalletRefunded,
    ];

    /// Topics the ledger's consumer group subscribes to.
    pub const LEDGER: [Topic; 3] = [
        Topic::TransferInitiated,
        Topic::WalletDebited,
        Topic::WalletCreditFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::TransferInitiated => "transfer.initiated",
            Topic::TransferCompleted => "transfer.completed",
            Topic::TransferFailed => "transfer.failed",
            Topic::WalletDebited => "wallet.debited",
            Topic::WalletDebitFailed => "wallet.debit-failed",
            Topic::WalletCredited => "wallet.credited",
            Topic::WalletCreditFailed => "wallet.credit-failed",
            Topic::WalletRefunded => "wallet.refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Topic> {
        match s {
            "transfer.initiated" => Some(Topic::TransferInitiated),
            "transfer.completed" => Some(Topic::TransferCompleted),
            "transfer.failed" => Some(Topic::TransferFailed),
            "wallet.debited" => Some(Topic::WalletDebited),
            "wallet.debit-failed" => Some(Topic::WalletDebitFailed),
            "wallet.credited" => Some(Topic::WalletCredited),
            "wallet.credit-failed" => Some(Topic::WalletCreditFailed),
            "wallet.refunded" => Some(Topic::WalletRefunded),
            _ => None,
        }
    }

    /// Aggregate type recorded on outbox rows for this topic.
    pub fn aggregate_type(&self) -> &'static str {
        match self {
            Topic::TransferInitiated | Topic::TransferCompleted | Topic::TransferFailed => {
                "transfer"
            }
            _ => "wallet",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferInitiatedPayload {
    pub transfer_id: TransferId,
    pub sender_wallet_id: WalletId,
    pub receiver_wallet_id: WalletId,
    pub amount: Amount,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferCompletedPayload {
    pub transfer_id: TransferId,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferFailedPayload {
    pub transfer_id: TransferId,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

/// Carries the receiver so the ledger can drive the credit step without a
/// cross-service lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletDebitedPayload {
    pub transfer_id: TransferId,
    pub wallet_id: WalletId,
    pub receiver_wallet_id: WalletId,
    pub amount: Amount,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletDebitFailedPayload {
    pub transfer_id: TransferId,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletCreditedPayload {
    pub transfer_id: TransferId,
    pub wallet_id: WalletId,
    pub amount: Amount,
    pub timestamp: DateTime<Utc>,
}

/// Carries the sender and amount so the ledger can refund without a
/// cross-service lookup. Also emitted synthetically by the timeout scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletCreditFailedPayload {
    pub transfer_id: TransferId,
    pub sender_wallet_id: WalletId,
    pub amount: Amount,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletRefundedPayload {
    pub transfer_id: TransferId,
    pub wallet_id: WalletId,
    pub amount: Amount,
    pub timestamp: DateTime<Utc>,
}

/// A saga event: one variant per broker topic.
#[derive(Debug, Clone)]
pub enum SagaEvent {
    TransferInitiated(TransferInitiatedPayload),
    TransferCompleted(TransferCompletedPayload),
    TransferFailed(TransferFailedPayload),
    WalletDebited(WalletDebitedPayload),
    WalletDebitFailed(WalletDebitFailedPayload),
    WalletCredited(WalletCreditedPayload),
    WalletCreditFailed(WalletCreditFailedPayload),
    WalletRefunded(WalletRefundedPayload),
}

impl SagaEvent {
    pub fn transfer_initiated(
        transfer_id: TransferId,
        sender_wallet_id: WalletId,
        receiver_wallet_id: WalletId,
        amount: Amount,
    ) -> Self {
        SagaEvent::TransferInitiated(TransferInitiatedPayload {
            transfer_id,
            sender_wallet_id,
            receiver_wallet_id,
            amount,
            timestamp: Utc::now(),
        })
    }

    pub fn transfer_completed(transfer_id: TransferId) -> Self {
        SagaEvent::TransferCompleted(TransferCompletedPayload {
            transfer_id,
            timestamp: Utc::now(),
        })
    }

    pub fn transfer_failed(transfer_id: TransferId, reason: impl Into<String>) -> Self {
        SagaEvent::TransferFailed(TransferFailedPayload {
            transfer_id,
            reason: reason.into(),
            timestamp: Utc::now(),
        })
    }

    pub fn wallet_debited(
        transfer_id: TransferId,
        wallet_id: WalletId,
        receiver_wallet_id: WalletId,
        amount: Amount,
    ) -> Self {
        SagaEvent::WalletDebited(WalletDebitedPayload {
            transfer_id,
            wallet_id,
            receiver_wallet_id,
            amount,
            timestamp: Utc::now(),
        })
    }

    pub fn wallet_debit_failed(transfer_id: TransferId, reason: impl Into<String>) -> Self {
        SagaEvent::WalletDebitFailed(WalletDebitFailedPayload {
            transfer_id,
            reason: reason.into(),
            timestamp: Utc::now(),
        })
    }

    pub fn wallet_credited(transfer_id: TransferId, wallet_id: WalletId, amount: Amount) -> Self {
        SagaEvent::WalletCredited(WalletCreditedPayload {
            transfer_id,
            wallet_id,
            amount,
            timestamp: Utc::now(),
        })
    }

    pub fn wallet_credit_failed(
        transfer_id: TransferId,
        sender_wallet_id: WalletId,
        amount: Amount,
        reason: impl Into<String>,
    ) -> Self {
        SagaEvent::WalletCreditFailed(WalletCreditFailedPayload {
            transfer_id,
            sender_wallet_id,
            amount,
            reason: reason.into(),
            timestamp: Utc::now(),
        })
    }

    pub fn wallet_refunded(transfer_id: TransferId, wallet_id: WalletId, amount: Amount) -> Self {
        SagaEvent::WalletRefunded(WalletRefundedPayload {
            transfer_id,
            wallet_id,
            amount,
            timestamp: Utc::now(),
        })
    }

    pub fn topic(&self) -> Topic {
        match self {
            SagaEvent::TransferInitiated(_) => Topic::TransferInitiated,
            SagaEvent::TransferCompleted(_) => Topic::TransferCompleted,
            SagaEvent::TransferFailed(_) => Topic::TransferFailed,
            SagaEvent::WalletDebited(_) => Topic::WalletDebited,
            SagaEvent::WalletDebitFailed(_) => Topic::WalletDebitFailed,
            SagaEvent::WalletCredited(_) => Topic::WalletCredited,
            SagaEvent::WalletCreditFailed(_) => Topic::WalletCreditFailed,
            SagaEvent::WalletRefunded(_) => Topic::WalletRefunded,
        }
    }

    /// The broker message key and outbox aggregate id.
    pub fn transfer_id(&self) -> TransferId {
        match self {
            SagaEvent::TransferInitiated(p) => p.transfer_id,
            SagaEvent::TransferCompleted(p) => p.transfer_id,
            SagaEvent::TransferFailed(p) => p.transfer_id,
            SagaEvent::WalletDebited(p) => p.transfer_id,
            SagaEvent::WalletDebitFailed(p) => p.transfer_id,
            SagaEvent::WalletCredited(p) => p.transfer_id,
            SagaEvent::WalletCreditFailed(p) => p.transfer_id,
            SagaEvent::WalletRefunded(p) => p.transfer_id,
        }
    }

    pub fn payload_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            SagaEvent::TransferInitiated(p) => serde_json::to_value(p),
            SagaEvent::TransferCompleted(p) => serde_json::to_value(p),
            SagaEvent::TransferFailed(p) => serde_json::to_value(p),
            SagaEvent::WalletDebited(p) => serde_json::to_value(p),
            SagaEvent::WalletDebitFailed(p) => serde_json::to_value(p),
            SagaEvent::WalletCredited(p) => serde_json::to_value(p),
            SagaEvent::WalletCreditFailed(p) => serde_json::to_value(p),
            SagaEvent::WalletRefunded(p) => serde_json::to_value(p),
        }
    }

    /// Decode a broker message for `topic` back into an event.
    pub fn decode(topic: Topic, payload: &[u8]) -> Result<SagaEvent, serde_json::Error> {
        Ok(match topic {
            Topic::TransferInitiated => {
                SagaEvent::TransferInitiated(serde_json::from_slice(payload)?)
            }
            Topic::TransferCompleted => {
                SagaEvent::TransferCompleted(serde_json::from_slice(payload)?)
            }
            Topic::TransferFailed => SagaEvent::TransferFailed(serde_json::from_slice(payload)?),
            Topic::WalletDebited => SagaEvent::WalletDebited(serde_json::from_slice(payload)?),
            Topic::WalletDebitFailed => {
                SagaEvent::WalletDebitFailed(serde_json::from_slice(payload)?)
            }
            Topic::WalletCredited => SagaEvent::WalletCredited(serde_json::from_slice(payload)?),
            Topic::WalletCreditFailed => {
                SagaEvent::WalletCreditFailed(serde_json::from_slice(payload)?)
            }
            Topic::WalletRefunded => SagaEvent::WalletRefunded(serde_json::from_slice(payload)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::new_id;

    #[test]
    fn test_topic_names_are_exact() {
        assert_eq!(Topic::TransferInitiated.as_str(), "transfer.initiated");
        assert_eq!(Topic::TransferCompleted.as_str(), "transfer.completed");
        assert_eq!(Topic::TransferFailed.as_str(), "transfer.failed");
        assert_eq!(Topic::WalletDebited.as_str(), "wallet.debited");
        assert_eq!(Topic::WalletDebitFailed.as_str(), "wallet.debit-failed");
        assert_eq!(Topic::WalletCredited.as_str(), "wallet.credited");
        assert_eq!(Topic::WalletCreditFailed.as_str(), "wallet.credit-failed");
        assert_eq!(Topic::WalletRefunded.as_str(), "wallet.refunded");
    }

    #[test]
    fn test_topic_parse_round_trip() {
        for topic in Topic::ALL {
            assert_eq!(Topic::parse(topic.as_str()), Some(topic));
        }
        assert_eq!(Topic::parse("wallet.unknown"), None);
    }

    #[test]
    fn test_payload_field_names_are_camel_case() {
        let event = SagaEvent::wallet_credit_failed(new_id(), new_id(), 5000, "no receiver");
        let json = event.payload_json().unwrap();

        assert!(json.get("transferId").is_some());
        assert!(json.get("senderWalletId").is_some());
        assert_eq!(json.get("amount").and_then(|v| v.as_i64()), Some(5000));
        assert!(json.get("timestamp").is_some());
        assert!(json.get("sender_wallet_id").is_none());
    }

    #[test]
    fn test_decode_dispatches_by_topic() {
        let transfer_id = new_id();
        let sender = new_id();
        let receiver = new_id();
        let event = SagaEvent::transfer_initiated(transfer_id, sender, receiver, 100);
        let bytes = serde_json::to_vec(&event.payload_json().unwrap()).unwrap();

        let decoded = SagaEvent::decode(Topic::TransferInitiated, &bytes).unwrap();
        match decoded {
            SagaEvent::TransferInitiated(p) => {
                assert_eq!(p.transfer_id, transfer_id);
                assert_eq!(p.sender_wallet_id, sender);
                assert_eq!(p.receiver_wallet_id, receiver);
                assert_eq!(p.amount, 100);
            }
            other => panic!("decoded wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_message_key_is_transfer_id() {
        let transfer_id = new_id();
        let event = SagaEvent::transfer_completed(transfer_id);
        assert_eq!(event.transfer_id(), transfer_id);
        assert_eq!(event.topic().aggregate_type(), "transfer");

        let event = SagaEvent::wallet_refunded(transfer_id, new_id(), 1);
        assert_eq!(event.transfer_id(), transfer_id);
        assert_eq!(event.topic().aggregate_type(), "wallet");
    }
}
