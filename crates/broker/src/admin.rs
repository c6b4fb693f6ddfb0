//! Cluster metadata and topic administration.
//!
//! Metadata reads use a short-lived `BaseConsumer` on a blocking task, since
//! librdkafka's metadata calls block the calling thread. Topic creation goes
//! through the controller: the controller id is resolved on the bootstrap
//! broker first, then the CreateTopics request is sent to that node only.

use crate::error::{Error, Result};
use crate::message::{BrokerEndpoint, TopicSpec};
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info};

/// Default bound on metadata, controller and admin requests.
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(10);

fn metadata_consumer(brokers: &str) -> Result<BaseConsumer> {
    ClientConfig::new()
        .set("bootstrap.servers", brokers)
        .create()
        .map_err(|e| Error::Connectivity {
            broker: brokers.to_string(),
            message: e.to_string(),
        })
}

/// Run a blocking metadata call against `brokers` off the async runtime.
async fn with_metadata_consumer<T, F>(brokers: &str, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&BaseConsumer) -> Result<T> + Send + 'static,
{
    let brokers = brokers.to_string();
    tokio::task::spawn_blocking(move || {
        let consumer = metadata_consumer(&brokers)?;
        f(&consumer)
    })
    .await
    .map_err(|e| Error::Join(e.to_string()))?
}

/// Names of every topic visible on the broker, deduplicated.
pub async fn list_topics(brokers: &str, timeout: Duration) -> Result<BTreeSet<String>> {
    let broker = brokers.to_string();
    with_metadata_consumer(brokers, move |consumer| {
        let metadata = consumer
            .fetch_metadata(None, timeout)
            .map_err(|e| Error::Connectivity {
                broker,
                message: format!("cannot read metadata: {e}"),
            })?;

        let topics: BTreeSet<String> = metadata
            .topics()
            .iter()
            .map(|topic| topic.name().to_string())
            .collect();

        debug!(count = topics.len(), "listed topics");
        Ok(topics)
    })
    .await
}

/// Number of partitions of `topic`.
pub async fn partition_count(brokers: &str, topic: &str, timeout: Duration) -> Result<usize> {
    let broker = brokers.to_string();
    let topic = topic.to_string();
    with_metadata_consumer(brokers, move |consumer| {
        let metadata = consumer
            .fetch_metadata(Some(&topic), timeout)
            .map_err(|e| Error::Connectivity {
                broker,
                message: format!("cannot read partitions: {e}"),
            })?;

        let entry = metadata
            .topics()
            .iter()
            .find(|t| t.name() == topic)
            .ok_or_else(|| Error::Protocol(format!("topic '{topic}' not found")))?;

        if let Some(err) = entry.error() {
            return Err(Error::Protocol(format!(
                "cannot read partitions of '{topic}': {}",
                rdkafka::types::RDKafkaErrorCode::from(err)
            )));
        }

        Ok(entry.partitions().len())
    })
    .await
}

/// Resolve the cluster controller through the bootstrap broker.
pub async fn resolve_controller(brokers: &str, timeout: Duration) -> Result<BrokerEndpoint> {
    let broker = brokers.to_string();
    with_metadata_consumer(brokers, move |consumer| {
        let metadata = consumer
            .fetch_metadata(None, timeout)
            .map_err(|e| Error::Connectivity {
                broker: broker.clone(),
                message: e.to_string(),
            })?;

        let controller_id = controller_id(consumer, timeout);
        if controller_id < 0 {
            return Err(Error::Protocol(
                "cannot get controller information".to_string(),
            ));
        }

        let endpoint = metadata
            .brokers()
            .iter()
            .find(|b| b.id() == controller_id)
            .map(|b| BrokerEndpoint {
                id: b.id(),
                host: b.host().to_string(),
                port: b.port(),
            })
            .ok_or_else(|| {
                Error::Protocol(format!(
                    "controller {controller_id} is not among the brokers reported by {broker}"
                ))
            })?;

        debug!(controller = %endpoint.address(), id = endpoint.id, "resolved controller");
        Ok(endpoint)
    })
    .await
}

fn controller_id(consumer: &BaseConsumer, timeout: Duration) -> i32 {
    let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
    // SAFETY: the native handle is owned by `consumer`, which outlives the call.
    unsafe { rdkafka::bindings::rd_kafka_controllerid(consumer.client().native_ptr(), timeout_ms) }
}

/// Create `spec` by sending CreateTopics to `controller`.
///
/// Every rejection is an error, "already exists" included.
pub async fn create_topic_on(
    controller: &BrokerEndpoint,
    spec: &TopicSpec,
    timeout: Duration,
) -> Result<()> {
    let address = controller.address();
    let admin_client: AdminClient<DefaultClientContext> = ClientConfig::new()
        .set("bootstrap.servers", &address)
        .create()
        .map_err(|e| Error::Connectivity {
            broker: address.clone(),
            message: format!("cannot connect to controller: {e}"),
        })?;

    let new_topic = NewTopic::new(
        &spec.name,
        spec.partitions,
        TopicReplication::Fixed(spec.replication),
    );
    let opts = AdminOptions::new()
        .operation_timeout(Some(timeout))
        .request_timeout(Some(timeout));

    let results = admin_client
        .create_topics(&[new_topic], &opts)
        .await
        .map_err(|e| Error::Protocol(format!("cannot create topic: {e}")))?;

    for result in results {
        if let Err((topic, code)) = result {
            return Err(Error::Protocol(format!(
                "cannot create topic '{topic}': {code}"
            )));
        }
    }

    info!(
        topic = %spec.name,
        partitions = spec.partitions,
        controller = %address,
        "topic created"
    );
    Ok(())
}

/// Resolve the controller via `brokers`, then create the topic on it.
pub async fn create_topic(brokers: &str, spec: &TopicSpec, timeout: Duration) -> Result<()> {
    let controller = resolve_controller(brokers, timeout).await?;
    create_topic_on(&controller, spec, timeout).await
}
