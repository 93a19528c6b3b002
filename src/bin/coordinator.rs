//! Transaction coordinator service entry point.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use fundflow::broker::{KafkaBroker, KafkaConsumer, KafkaConsumerConfig};
use fundflow::config::AppConfig;
use fundflow::coordinator::{
    CoordinatorEventHandler, TimeoutWorker, TimeoutWorkerConfig, TransferDb, TransferService, api,
};
use fundflow::db::Database;
use fundflow::events::Topic;
use fundflow::outbox::{OutboxPublisher, PublisherConfig};
use fundflow::{logging, schema};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());
    let config = AppConfig::load("coordinator", &env)
        .with_context(|| format!("Failed to load coordinator config for env '{}'", env))?;

    let _guard = logging::init_logging(&config);
    info!(
        env = %env,
        git_hash = env!("GIT_HASH"),
        "Starting coordinator service"
    );

    let database = Database::connect(config.require_database_url()?).await?;
    database.health_check().await?;
    schema::init_coordinator_schema(database.pool()).await?;

    let transfer_db = Arc::new(TransferDb::new(database.pool().clone()));
    let service = Arc::new(TransferService::new(
        transfer_db.clone(),
        config.saga.timeout(),
    ));

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

    // Wallet event consumer.
    let handler = Arc::new(CoordinatorEventHandler::new(transfer_db.clone()));
    let consumer = KafkaConsumer::new(
        KafkaConsumerConfig {
            bootstrap_servers: config.broker.brokers.clone(),
            group_id: config.broker.group_id.clone(),
            topics: Topic::COORDINATOR.to_vec(),
        },
        handler,
    )?;
    tokio::spawn(async move {
        if let Err(e) = consumer.run().await {
            tracing::error!(error = %e, "Coordinator consumer terminated");
        }
    });

    // Timeout scanner for stuck sagas.
    let timeout_worker = TimeoutWorker::new(
        transfer_db,
        TimeoutWorkerConfig {
            scan_interval: config.timeout_scanner.period(),
            batch_size: config.timeout_scanner.batch_size,
        },
    );
    tokio::spawn(async move { timeout_worker.run().await });

    api::serve(&config.http.host, config.http.port, service).await
}
