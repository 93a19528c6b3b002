//! Wallet ledger service entry point.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use fundflow::broker::{KafkaBroker, KafkaConsumer, KafkaConsumerConfig};
use fundflow::config::AppConfig;
use fundflow::db::Database;
use fundflow::events::Topic;
use fundflow::ledger::{
    DeadLetterStore, LedgerEngine, LedgerEventHandler, ReplayService, RetryPolicy, WalletDb, api,
};
use fundflow::outbox::{OutboxPublisher, PublisherConfig};
use fundflow::{logging, schema};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());
    let config = AppConfig::load("ledger", &env)
        .with_context(|| format!("Failed to load ledger config for env '{}'", env))?;

    let _guard = logging::init_logging(&config);
    info!(
        env = %env,
        git_hash = env!("GIT_HASH"),
        "Starting ledger service"
    );

    let database = Database::connect(config.require_database_url()?).await?;
    database.health_check().await?;
    schema::init_ledger_schema(database.pool()).await?;

    let wallets = Arc::new(WalletDb::new(database.pool().clone()));
    let engine = Arc::new(LedgerEngine::new(database.pool().clone()));
    let dlq = Arc::new(DeadLetterStore::new(database.pool().clone()));
    let replay = Arc::new(ReplayService::new(dlq.clone(), engine.clone()));

    // Outbox publisher: the only producer-side broker client.
    let broker = Arc::new(KafkaBroker::new(&config.broker.brokers)?);
    let publisher = OutboxPublisher::new(
        database.pool().clone(),
        broker,
        PublisherConfig {
            poll_interval: config.outbox.poll_interval(),
            batch_size: config.outbox.batch_size,
        },
    );
    tokio::spawn(async move { publisher.run().await });

    // Saga event consumer.
    let handler = Arc::new(LedgerEventHandler::new(
        engine,
        dlq.clone(),
        RetryPolicy::from(&config.refund_retry),
    ));
    let consumer = KafkaConsumer::new(
        KafkaConsumerConfig {
            bootstrap_servers: config.broker.brokers.clone(),
            group_id: config.broker.group_id.clone(),
            topics: Topic::LEDGER.to_vec(),
        },
        handler,
    )?;
    tokio::spawn(async move {
        if let Err(e) = consumer.run().await {
            tracing::error!(error = %e, "Ledger consumer terminated");
        }
    });

    api::serve(&config.http.host, config.http.port, wallets, dlq, replay).await
}
