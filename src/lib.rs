//! Kafka MCP Server
//!
//! An MCP tool server over stdio that lets a model client inspect and use a
//! Kafka cluster:
//!
//! - `list_topics` - topic names known to a broker
//! - `create_topic` - create a topic through the cluster controller
//! - `produce_message` - append one record, optionally keyed
//! - `consume_messages` - read a bounded batch from partition 0
//!
//! Every tool call names its broker; no connections are kept between calls.
//! The broker work lives in the `kafka-mcp-broker` crate.
//!
//! # CLI Usage
//!
//! ```bash
//! # Serve on stdio with default timeouts
//! kafka-mcp
//!
//! # Longer consumption window, JSON logs on stderr
//! RUST_LOG=debug kafka-mcp --consume-deadline 10s --log-format json
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use kafka_mcp_broker::{
    BrokerSettings, KafkaBroker, DEFAULT_CONSUME_DEADLINE, DEFAULT_MAX_COUNT, DEFAULT_SEND_TIMEOUT,
};
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod format;
pub mod mcp;

use config::parse_duration_arg;
use mcp::{McpRegistry, McpServer, ToolContext};

/// Log output format on stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "kafka-mcp", version, about = "Kafka tools for MCP clients over stdio")]
pub struct Config {
    /// Overall deadline for one consume_messages call (e.g. 500ms, 5s, 1m)
    #[arg(
        long,
        default_value = "5s",
        env = "KAFKA_MCP_CONSUME_DEADLINE",
        value_parser = parse_duration_arg
    )]
    pub consume_deadline: Duration,

    /// Deadline for delivering one produced message
    #[arg(
        long,
        default_value = "10s",
        env = "KAFKA_MCP_SEND_TIMEOUT",
        value_parser = parse_duration_arg
    )]
    pub send_timeout: Duration,

    /// Timeout for metadata, controller lookup and topic creation requests
    #[arg(
        long,
        default_value = "10s",
        env = "KAFKA_MCP_METADATA_TIMEOUT",
        value_parser = parse_duration_arg
    )]
    pub metadata_timeout: Duration,

    /// Messages read when consume_messages gets no positive count
    #[arg(long, default_value_t = DEFAULT_MAX_COUNT, env = "KAFKA_MCP_DEFAULT_COUNT")]
    pub default_count: usize,

    /// Log format for stderr
    #[arg(long, value_enum, default_value = "text", env = "KAFKA_MCP_LOG_FORMAT")]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            consume_deadline: DEFAULT_CONSUME_DEADLINE,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            metadata_timeout: kafka_mcp_broker::admin::DEFAULT_METADATA_TIMEOUT,
            default_count: DEFAULT_MAX_COUNT,
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    pub fn broker_settings(&self) -> BrokerSettings {
        BrokerSettings {
            consume_deadline: self.consume_deadline,
            send_timeout: self.send_timeout,
            metadata_timeout: self.metadata_timeout,
        }
    }

    /// The fallback count, never below one
    pub fn default_count(&self) -> usize {
        self.default_count.max(1)
    }
}

/// A registry holding all Kafka tools.
pub fn build_registry() -> McpRegistry {
    let mut registry = McpRegistry::new();
    mcp::tools::register_tools(&mut registry);
    registry
}

/// The stdio server wired to a librdkafka-backed broker client.
pub fn build_server(config: &Config) -> McpServer {
    let broker = Arc::new(KafkaBroker::new(config.broker_settings()));
    McpServer::new(
        build_registry(),
        ToolContext::new(broker, config.default_count()),
    )
}

/// Install the global subscriber. Logs go to stderr; stdout carries protocol
/// messages only.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
