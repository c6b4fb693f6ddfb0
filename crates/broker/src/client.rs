use crate::admin;
use crate::consumer::{BoundedConsumer, ConsumptionResult, PartitionReader, ReaderConfig};
use crate::error::Result;
use crate::message::{Delivery, TopicSpec};
use crate::producer::{self, Record};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Timeouts applied to every broker operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokerSettings {
    /// Deadline covering a whole consumption call
    pub consume_deadline: Duration,
    /// Bound on a single produce, delivery report included
    pub send_timeout: Duration,
    /// Bound on metadata, controller and admin requests
    pub metadata_timeout: Duration,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            consume_deadline: crate::consumer::DEFAULT_CONSUME_DEADLINE,
            send_timeout: producer::DEFAULT_SEND_TIMEOUT,
            metadata_timeout: admin::DEFAULT_METADATA_TIMEOUT,
        }
    }
}

/// The broker operations exposed as tools.
///
/// Each call dials the broker on its own and releases everything it opened
/// before returning.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    async fn list_topics(&self, broker: &str) -> Result<BTreeSet<String>>;

    async fn create_topic(&self, broker: &str, spec: &TopicSpec) -> Result<()>;

    async fn produce(
        &self,
        broker: &str,
        topic: &str,
        key: Option<&str>,
        value: &str,
    ) -> Result<Delivery>;

    async fn consume(
        &self,
        broker: &str,
        topic: &str,
        max_count: usize,
        cancel: &CancellationToken,
    ) -> Result<ConsumptionResult>;
}

/// [`BrokerClient`] backed by librdkafka.
#[derive(Debug, Clone, Default)]
pub struct KafkaBroker {
    settings: BrokerSettings,
}

impl KafkaBroker {
    pub fn new(settings: BrokerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &BrokerSettings {
        &self.settings
    }
}

#[async_trait]
impl BrokerClient for KafkaBroker {
    async fn list_topics(&self, broker: &str) -> Result<BTreeSet<String>> {
        admin::list_topics(broker, self.settings.metadata_timeout).await
    }

    async fn create_topic(&self, broker: &str, spec: &TopicSpec) -> Result<()> {
        admin::create_topic(broker, spec, self.settings.metadata_timeout).await
    }

    async fn produce(
        &self,
        broker: &str,
        topic: &str,
        key: Option<&str>,
        value: &str,
    ) -> Result<Delivery> {
        let record = Record { topic, key, value };
        producer::produce(
            broker,
            &record,
            self.settings.send_timeout,
            self.settings.metadata_timeout,
        )
        .await
    }

    async fn consume(
        &self,
        broker: &str,
        topic: &str,
        max_count: usize,
        cancel: &CancellationToken,
    ) -> Result<ConsumptionResult> {
        let reader = PartitionReader::open(&ReaderConfig::new(broker, topic))?;
        let consumer = BoundedConsumer::new(max_count, self.settings.consume_deadline);
        let result = consumer.run(reader, cancel).await?;
        debug!(topic, read = result.len(), "consumption finished");
        Ok(result)
    }
}
