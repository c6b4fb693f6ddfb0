//! Kafka transport for `kafka-mcp`.
//!
//! Features:
//!
//! - Bounded consumption: read up to N messages from partition 0 under one
//!   deadline, telling "nothing arrived" apart from a failed read
//! - Topic administration: metadata listing and controller-routed topic creation
//! - Single-record produce with least-bytes partition balancing

/// Cluster metadata and controller-routed topic creation
pub mod admin;

/// The `BrokerClient` seam and its librdkafka implementation
pub mod client;

/// Bounded consumer and the partition reader it drives
pub mod consumer;
pub mod error;
pub mod message;
pub mod producer;

// Re-export main types for easy access
pub use client::{BrokerClient, BrokerSettings, KafkaBroker};
pub use consumer::{
    BoundedConsumer, ConsumptionResult, MessageReader, PartitionReader, ReaderConfig,
    DEFAULT_CONSUME_DEADLINE, DEFAULT_MAX_COUNT,
};
pub use error::{Error, ErrorKind, Result};
pub use message::{BrokerEndpoint, Delivery, Message, TopicSpec};
pub use producer::{LeastBytes, Record, Writer, DEFAULT_SEND_TIMEOUT};
