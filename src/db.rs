//! Database connection management.
//!
//! Each service owns exactly one PostgreSQL database; nothing in the other
//! service ever connects to it. The pool is shared by the HTTP handlers,
//! the event handlers, the outbox publisher and (on the coordinator) the
//! timeout scanner.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

const MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// PostgreSQL connection pool for one service's store.
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect and build the pool.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await?;

        tracing::info!("PostgreSQL connection pool established");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round-trip the store once; used at startup and by health probes.
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
