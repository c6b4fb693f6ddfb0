//! Kafka message types.
//!
//! Owned copies of records read from a partition. Everything the tool layer
//! needs to render a record lives here, so nothing borrowed from librdkafka
//! escapes the reader.

use chrono::{DateTime, Utc};
use rdkafka::message::{BorrowedMessage, Message as RdkafkaMessage};

/// A record read from a Kafka partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message key, absent when the producer did not set one
    pub key: Option<Vec<u8>>,
    /// Message value; a null payload is read as an empty value
    pub value: Vec<u8>,
    /// Record timestamp (Unix epoch when the record carries none)
    pub timestamp: DateTime<Utc>,
    /// Kafka partition
    pub partition: i32,
    /// Kafka offset within the partition
    pub offset: i64,
}

impl Message {
    pub(crate) fn from_borrowed(msg: &BorrowedMessage<'_>) -> Self {
        let timestamp = msg
            .timestamp()
            .to_millis()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        Self {
            key: msg.key().map(|k| k.to_vec()),
            value: msg.payload().map(|p| p.to_vec()).unwrap_or_default(),
            timestamp,
            partition: msg.partition(),
            offset: msg.offset(),
        }
    }
}

/// A broker node as reported by cluster metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerEndpoint {
    pub id: i32,
    pub host: String,
    pub port: i32,
}

impl BrokerEndpoint {
    /// `host:port`, suitable for `bootstrap.servers`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Settings for a topic to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSpec {
    pub name: String,
    pub partitions: i32,
    pub replication: i32,
}

impl TopicSpec {
    /// Replication is fixed at 1.
    pub fn new(name: impl Into<String>, partitions: i32) -> Self {
        Self {
            name: name.into(),
            partitions: partitions.max(1),
            replication: 1,
        }
    }
}

/// Where a produced record landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub partition: i32,
    pub offset: i64,
}
