//! Dead-letter queue for exhausted refund attempts.
//!
//! Quarantined messages keep the consumer draining (the broker message is
//! still acknowledged) while preserving everything an operator needs to
//! replay. Replays are safe because the refund handler is idempotent via
//! its deterministic transaction id.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{error, info, warn};

use super::error::LedgerError;
use crate::core_types::{DeadLetterId, new_id};
use crate::events::Topic;

/// Dead letter lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeadLetterStatus {
    /// Awaiting an admin replay.
    Pending,
    /// Replay succeeded.
    Processed,
    /// Replay failed; may be replayed again.
    Failed,
}

impl DeadLetterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeadLetterStatus::Pending => "PENDING",
            DeadLetterStatus::Processed => "PROCESSED",
            DeadLetterStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(DeadLetterStatus::Pending),
            "PROCESSED" => Some(DeadLetterStatus::Processed),
            "FAILED" => Some(DeadLetterStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for DeadLetterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for DeadLetterStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        DeadLetterStatus::parse(&value)
            .ok_or_else(|| format!("Invalid dead letter status: {}", value))
    }
}

/// A quarantined message.
#[derive(Debug, Clone, FromRow)]
pub struct DeadLetter {
    pub id: DeadLetterId,
    pub original_topic: String,
    pub original_payload: serde_json::Value,
    pub error_message: String,
    pub error_stack: Option<String>,
    pub attempt_count: i32,
    #[sqlx(try_from = "String")]
    pub status: DeadLetterStatus,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

const DEAD_LETTER_COLUMNS: &str = "id, original_topic, original_payload, error_message, \
     error_stack, attempt_count, status, created_at, processed_at";

/// Dead-letter persistence.
pub struct DeadLetterStore {
    pool: PgPool,
}

impl DeadLetterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Quarantine a message after its retries were exhausted.
    pub async fn insert(
        &self,
        topic: Topic,
        payload: serde_json::Value,
        error: &LedgerError,
        attempts: u32,
    ) -> Result<DeadLetter, LedgerError> {
        let entry = sqlx::query_as::<_, DeadLetter>(&format!(
            r#"
            INSERT INTO dead_letter_queue
                (id, original_topic, original_payload, error_message, error_stack,
                 attempt_count, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'PENDING')
            RETURNING {DEAD_LETTER_COLUMNS}
            "#
        ))
        .bind(new_id())
        .bind(topic.as_str())
        .bind(&payload)
        .bind(error.to_string())
        .bind(format!("{:?}", error))
        .bind(attempts as i32)
        .fetch_one(&self.pool)
        .await?;

        warn!(
            id = %entry.id,
            topic = %topic,
            attempts = attempts,
            error = %error,
            "Message quarantined to dead letter queue"
        );

        Ok(entry)
    }

    /// List entries, optionally filtered by status, newest first.
    pub async fn list(
        &self,
        status: Option<DeadLetterStatus>,
    ) -> Result<Vec<DeadLetter>, LedgerError> {
        let entries = match status {
            Some(status) => {
                sqlx::query_as::<_, DeadLetter>(&format!(
                    r#"
                    SELECT {DEAD_LETTER_COLUMNS}
                    FROM dead_letter_queue
                    WHERE status = $1
                    ORDER BY created_at DESC
                    "#
                ))
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, DeadLetter>(&format!(
                    r#"
                    SELECT {DEAD_LETTER_COLUMNS}
                    FROM dead_letter_queue
                    ORDER BY created_at DESC
                    "#
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(entries)
    }

    /// Get one entry by id.
    pub async fn get(&self, id: DeadLetterId) -> Result<Option<DeadLetter>, LedgerError> {
        let entry = sqlx::query_as::<_, DeadLetter>(&format!(
            "SELECT {DEAD_LETTER_COLUMNS} FROM dead_letter_queue WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    pub async fn mark_processed(&self, id: DeadLetterId) -> Result<(), LedgerError> {
        sqlx::query(
            "UPDATE dead_letter_queue SET status = 'PROCESSED', processed_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn mark_failed(&self, id: DeadLetterId) -> Result<(), LedgerError> {
        sqlx::query("UPDATE dead_letter_queue SET status = 'FAILED' WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Outcome of an admin replay.
#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct ReplayOutcome {
    pub success: bool,
    pub message: String,
}

/// Admin replay of quarantined messages.
pub struct ReplayService {
    store: std::sync::Arc<DeadLetterStore>,
    engine: std::sync::Arc<super::engine::LedgerEngine>,
}

impl ReplayService {
    pub fn new(
        store: std::sync::Arc<DeadLetterStore>,
        engine: std::sync::Arc<super::engine::LedgerEngine>,
    ) -> Self {
        Self { store, engine }
    }

    /// Re-invoke the original handler for a quarantined message.
    ///
    /// Idempotent on already-PROCESSED entries. On success the entry moves
    /// to PROCESSED; on failure it moves to FAILED and can be replayed
    /// again later.
    pub async fn replay(&self, id: DeadLetterId) -> Result<ReplayOutcome, LedgerError> {
        let entry = self
            .store
            .get(id)
            .await?
            .ok_or(LedgerError::DeadLetterNotFound(id))?;

        if entry.status == DeadLetterStatus::Processed {
            return Ok(ReplayOutcome {
                success: true,
                message: "Entry already processed".to_string(),
            });
        }

        let result = self.invoke_handler(&entry).await;

        match result {
            Ok(()) => {
                self.store.mark_processed(id).await?;
                info!(id = %id, topic = %entry.original_topic, "Dead letter replayed");
                Ok(ReplayOutcome {
                    success: true,
                    message: "Replay succeeded".to_string(),
                })
            }
            Err(e) => {
                self.store.mark_failed(id).await?;
                error!(id = %id, topic = %entry.original_topic, error = %e, "Dead letter replay failed");
                Ok(ReplayOutcome {
                    success: false,
                    message: e.to_string(),
                })
            }
        }
    }

    async fn invoke_handler(&self, entry: &DeadLetter) -> Result<(), LedgerError> {
        let topic = Topic::parse(&entry.original_topic).ok_or_else(|| {
            LedgerError::Payload(format!("Unknown topic: {}", entry.original_topic))
        })?;

        match topic {
            Topic::WalletCreditFailed => {
                let payload = serde_json::from_value(entry.original_payload.clone())?;
                super::handlers::apply_refund(&self.engine, &payload).await?;
                Ok(())
            }
            other => Err(LedgerError::Payload(format!(
                "No replayable handler for topic: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            DeadLetterStatus::Pending,
            DeadLetterStatus::Processed,
            DeadLetterStatus::Failed,
        ] {
            assert_eq!(DeadLetterStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DeadLetterStatus::parse("RETRYING"), None);
    }
}
