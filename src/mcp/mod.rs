//! MCP (Model Context Protocol) server exposing Kafka tools.
//!
//! Speaks JSON-RPC 2.0 over newline-delimited stdio. Each tool is a thin
//! validation layer over [`kafka_mcp_broker::BrokerClient`].

pub mod context;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod tools;

pub use context::ToolContext;
pub use registry::McpRegistry;
pub use server::McpServer;
