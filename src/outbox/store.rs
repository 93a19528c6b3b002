//! Outbox row type and append operations.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::OutboxError;
use crate::core_types::new_id;
use crate::events::SagaEvent;

/// A captured domain event awaiting publication.
///
/// `published_at` is NULL until the broker accepts the event, then set
/// exactly once.
#[derive(Debug, Clone, FromRow)]
pub struct OutboxRecord {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Append an event inside the caller's open transaction.
///
/// Every domain mutation that produces an event MUST go through this with
/// the same transaction as the mutation; a failed append aborts the whole
/// unit of work.
pub async fn append(conn: &mut PgConnection, event: &SagaEvent) -> Result<Uuid, OutboxError> {
    let id = new_id();
    let payload = event.payload_json()?;

    sqlx::query(
        r#"
        INSERT INTO outbox (id, aggregate_type, aggregate_id, event_type, payload)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(event.topic().aggregate_type())
    .bind(event.transfer_id())
    .bind(event.topic().as_str())
    .bind(&payload)
    .execute(conn)
    .await?;

    Ok(id)
}

/// Append an event in its own transaction.
///
/// For handlers whose only domain effect is the event itself (e.g. a debit
/// failure produces `wallet.debit-failed` and nothing else).
pub async fn append_standalone(pool: &PgPool, event: &SagaEvent) -> Result<Uuid, OutboxError> {
    let mut tx = pool.begin().await?;
    let id = append(&mut tx, event).await?;
    tx.commit().await?;
    Ok(id)
}
