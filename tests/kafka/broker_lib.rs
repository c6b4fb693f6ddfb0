//! Broker client E2E test
//!
//! Test flow:
//! 1. Create a fresh topic through the controller
//! 2. Check it shows up in the topic list
//! 3. Consume it while empty
//! 4. Produce keyed and unkeyed messages and read them back in order

use std::time::Duration;

use chrono::Utc;
use kafka_mcp_broker::{
    admin, BrokerClient, BrokerSettings, ConsumptionResult, ErrorKind, KafkaBroker, TopicSpec,
};
use tokio_util::sync::CancellationToken;

/// Kafka broker address for testing
const KAFKA_BROKER: &str = "kafka:9092";

fn unique_topic(prefix: &str) -> String {
    format!("{prefix}-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

fn broker() -> KafkaBroker {
    tracing_subscriber::fmt()
        .with_env_filter("kafka_mcp_broker=debug")
        .try_init()
        .ok();

    KafkaBroker::new(BrokerSettings {
        consume_deadline: Duration::from_secs(5),
        ..BrokerSettings::default()
    })
}

#[tokio::test]
#[ignore = "requires a Kafka broker at kafka:9092"]
async fn test_create_list_produce_consume() -> Result<(), Box<dyn std::error::Error>> {
    let broker = broker();
    let topic = unique_topic("mcp-e2e");
    let cancel = CancellationToken::new();

    broker
        .create_topic(KAFKA_BROKER, &TopicSpec::new(topic.as_str(), 1))
        .await?;

    // Give Kafka a moment to propagate topic metadata
    tokio::time::sleep(Duration::from_millis(500)).await;

    let topics = broker.list_topics(KAFKA_BROKER).await?;
    assert!(topics.contains(&topic), "{topic} missing from {topics:?}");

    let empty = broker.consume(KAFKA_BROKER, &topic, 10, &cancel).await?;
    assert_eq!(empty, ConsumptionResult::Empty);

    let first = broker
        .produce(KAFKA_BROKER, &topic, Some("k1"), "first")
        .await?;
    let second = broker.produce(KAFKA_BROKER, &topic, None, "second").await?;
    assert_eq!(first.partition, 0);
    assert_eq!(second.offset, first.offset + 1);

    let read = broker.consume(KAFKA_BROKER, &topic, 10, &cancel).await?;
    let ConsumptionResult::Messages(messages) = read else {
        panic!("expected messages");
    };
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].key.as_deref(), Some(b"k1".as_slice()));
    assert_eq!(messages[0].value, b"first");
    assert!(messages[1].key.is_none());
    assert_eq!(messages[1].value, b"second");

    let one = broker.consume(KAFKA_BROKER, &topic, 1, &cancel).await?;
    assert_eq!(one.len(), 1);

    Ok(())
}

#[tokio::test]
#[ignore = "requires a Kafka broker at kafka:9092"]
async fn test_create_existing_topic_fails() -> Result<(), Box<dyn std::error::Error>> {
    let broker = broker();
    let topic = unique_topic("mcp-dup");

    broker
        .create_topic(KAFKA_BROKER, &TopicSpec::new(topic.as_str(), 1))
        .await?;
    let err = broker
        .create_topic(KAFKA_BROKER, &TopicSpec::new(topic.as_str(), 1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);

    Ok(())
}

#[tokio::test]
#[ignore = "requires a Kafka broker at kafka:9092"]
async fn test_unreachable_broker_is_connectivity_error() {
    let broker = KafkaBroker::new(BrokerSettings {
        metadata_timeout: Duration::from_secs(2),
        ..BrokerSettings::default()
    });

    let err = broker.list_topics("127.0.0.1:1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connectivity);
}

#[tokio::test]
#[ignore = "requires a Kafka broker at kafka:9092"]
async fn test_resolve_controller_returns_known_broker() -> Result<(), Box<dyn std::error::Error>> {
    let controller = admin::resolve_controller(KAFKA_BROKER, Duration::from_secs(10)).await?;

    assert!(controller.id >= 0);
    assert!(!controller.host.is_empty());
    assert!(controller.port > 0);
    Ok(())
}
