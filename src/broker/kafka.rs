//! Kafka broker implementation.
//!
//! Topic names map 1:1 from the closed event enumeration; the message key
//! is the saga's `transfer_id`, so a key-stable partitioner serializes all
//! events of one saga.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::producer::{FutureProducer, FutureRecord};
use tracing::{debug, error, info, warn};

use super::{BrokerError, EventHandler, MessageBroker, Result};
use crate::events::Topic;

/// Kafka producer wrapper used by the outbox publisher.
pub struct KafkaBroker {
    producer: FutureProducer,
}

impl KafkaBroker {
    pub fn new(bootstrap_servers: &str) -> Result<Self> {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", bootstrap_servers);
        config.set("message.timeout.ms", "5000");
        config.set("acks", "all");
        config.set("enable.idempotence", "true");

        let producer: FutureProducer = config
            .create()
            .map_err(|e| BrokerError::Connection(format!("Failed to create Kafka producer: {}", e)))?;

        info!(bootstrap_servers = %bootstrap_servers, "Connected to Kafka");

        Ok(Self { producer })
    }
}

#[async_trait]
impl MessageBroker for KafkaBroker {
    async fn publish(&self, topic: Topic, key: &str, payload: &[u8]) -> Result<()> {
        let record = FutureRecord::to(topic.as_str()).key(key).payload(payload);

        self.producer
            .send(record, Duration::from_secs(5))
            .await
            .map_err(|(e, _)| BrokerError::Publish(format!("Failed to publish: {}", e)))?;

        debug!(topic = %topic, key = %key, "Published event to Kafka");
        Ok(())
    }
}

/// Consumer configuration for one service.
#[derive(Debug, Clone)]
pub struct KafkaConsumerConfig {
    /// Kafka bootstrap servers (comma-separated).
    pub bootstrap_servers: String,
    /// Consumer group id; each service runs its own group so both sides
    /// see every relevant event.
    pub group_id: String,
    /// Topic subscription set for this service.
    pub topics: Vec<Topic>,
}

/// Kafka consumer loop for one service.
///
/// Commits are manual and happen only after the handler returns `Ok`, so
/// a crash mid-handling redelivers the message. Undecodable payloads are
/// committed anyway: reprocessing cannot fix them, and the refund path has
/// its own quarantine (the DLQ).
pub struct KafkaConsumer {
    consumer: StreamConsumer,
    handler: Arc<dyn EventHandler>,
    topics: Vec<Topic>,
}

impl KafkaConsumer {
    pub fn new(config: KafkaConsumerConfig, handler: Arc<dyn EventHandler>) -> Result<Self> {
        let mut client_config = ClientConfig::new();
        client_config.set("bootstrap.servers", &config.bootstrap_servers);
        client_config.set("group.id", &config.group_id);
        client_config.set("enable.auto.commit", "false");
        client_config.set("auto.offset.reset", "earliest");

        let consumer: StreamConsumer = client_config
            .create()
            .map_err(|e| BrokerError::Connection(format!("Failed to create Kafka consumer: {}", e)))?;

        Ok(Self {
            consumer,
            handler,
            topics: config.topics,
        })
    }

    /// Subscribe and consume until the task is cancelled.
    pub async fn run(self) -> Result<()> {
        use futures::StreamExt;
        use rdkafka::message::Message as KafkaMessage;

        let topic_names: Vec<&str> = self.topics.iter().map(|t| t.as_str()).collect();
        self.consumer
            .subscribe(&topic_names)
            .map_err(|e| BrokerError::Subscribe(format!("Failed to subscribe to topics: {}", e)))?;

        info!(topics = ?topic_names, "Subscribed to Kafka topics");

        let mut stream = self.consumer.stream();

        while let Some(result) = stream.next().await {
            match result {
                Ok(message) => {
                    let Some(topic) = Topic::parse(message.topic()) else {
                        warn!(topic = %message.topic(), "Message on unexpected topic");
                        self.commit(&message);
                        continue;
                    };

                    let Some(payload) = message.payload() else {
                        warn!(topic = %topic, "Received message with no payload");
                        self.commit(&message);
                        continue;
                    };

                    debug!(
                        topic = %topic,
                        partition = message.partition(),
                        offset = message.offset(),
                        "Received event"
                    );

                    match self.handler.handle(topic, payload).await {
                        Ok(()) => self.commit(&message),
                        Err(e) => {
                            // Leave uncommitted: redelivery is the retry path
                            // for everything outside the refund handler.
                            error!(
                                topic = %topic,
                                partition = message.partition(),
                                offset = message.offset(),
                                error = %e,
                                "Event handling failed; message left uncommitted"
                            );
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "Kafka consumer error");
                }
            }
        }

        Ok(())
    }

    fn commit(&self, message: &rdkafka::message::BorrowedMessage<'_>) {
        if let Err(e) = self
            .consumer
            .commit_message(message, rdkafka::consumer::CommitMode::Async)
        {
            error!(error = %e, "Failed to commit offset");
        }
    }
}
