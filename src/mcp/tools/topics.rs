//! Topic Tools
//!
//! `list_topics` and `create_topic`.

use kafka_mcp_broker::TopicSpec;
use serde_json::Value;
use tracing::info;

use super::{respond, Args, ToolError};
use crate::format;
use crate::mcp::context::ToolContext;
use crate::mcp::registry::{McpRegistry, RegisteredTool, ToolBuilder, ToolResult};

const MISSING_BROKER: &str = "Missing broker information";
const MISSING_TOPIC: &str = "Missing topic name";

/// Partitions used when `create_topic` gets none, or a non-positive count
pub const DEFAULT_PARTITIONS: usize = 1;

pub fn register_tools(registry: &mut McpRegistry) {
    registry.register_tool(list_topics_tool());
    registry.register_tool(create_topic_tool());
}

// ============================================================================
// list_topics
// ============================================================================

fn list_topics_tool() -> RegisteredTool {
    ToolBuilder::new("list_topics")
        .description("List all topics in Kafka broker")
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "broker": {
                    "type": "string",
                    "description": "Kafka broker address (e.g. localhost:9092)"
                }
            },
            "required": ["broker"]
        }))
        .build(list_topics_handler)
}

async fn list_topics_handler(ctx: ToolContext, params: Value) -> ToolResult {
    respond("list_topics", list_topics(&ctx, &params).await)
}

async fn list_topics(ctx: &ToolContext, params: &Value) -> Result<String, ToolError> {
    let args = Args::new(params)?;
    let broker = args.require_string("broker", MISSING_BROKER)?;

    let topics = tokio::select! {
        topics = ctx.broker.list_topics(broker) => {
            topics.map_err(ToolError::broker("Error listing topics"))?
        }
        _ = ctx.cancel.cancelled() => {
            return Err(ToolError::Cancelled);
        }
    };

    info!(broker, count = topics.len(), "listed topics");
    Ok(format::format_topics(&topics))
}

// ============================================================================
// create_topic
// ============================================================================

fn create_topic_tool() -> RegisteredTool {
    ToolBuilder::new("create_topic")
        .description("Create a new topic in Kafka")
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "broker": {
                    "type": "string",
                    "description": "Kafka broker address"
                },
                "topic": {
                    "type": "string",
                    "description": "Name of the topic to create"
                },
                "partitions": {
                    "type": "number",
                    "description": "Number of partitions (default: 1)"
                }
            },
            "required": ["broker", "topic"]
        }))
        .build(create_topic_handler)
}

async fn create_topic_handler(ctx: ToolContext, params: Value) -> ToolResult {
    respond("create_topic", create_topic(&ctx, &params).await)
}

async fn create_topic(ctx: &ToolContext, params: &Value) -> Result<String, ToolError> {
    let args = Args::new(params)?;
    let broker = args.require_string("broker", MISSING_BROKER)?;
    let topic = args.require_string("topic", MISSING_TOPIC)?;
    let partitions = args.positive_count("partitions", DEFAULT_PARTITIONS)?;
    let partitions = i32::try_from(partitions)
        .map_err(|_| ToolError::Validation(format!("Invalid partitions: {partitions}")))?;

    let spec = TopicSpec::new(topic, partitions);
    tokio::select! {
        created = ctx.broker.create_topic(broker, &spec) => {
            created.map_err(ToolError::broker("Error creating topic"))?;
        }
        _ = ctx.cancel.cancelled() => {
            return Err(ToolError::Cancelled);
        }
    }

    Ok(format::format_created(&spec.name, spec.partitions))
}
