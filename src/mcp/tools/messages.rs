//! Message Tools
//!
//! `produce_message` appends one record; `consume_messages` reads a bounded
//! batch from partition 0.

use serde_json::Value;
use tracing::info;

use super::{respond, Args, ToolError};
use crate::format;
use crate::mcp::context::ToolContext;
use crate::mcp::registry::{McpRegistry, RegisteredTool, ToolBuilder, ToolResult};

const MISSING_BROKER: &str = "Missing broker information";
const MISSING_TOPIC: &str = "Missing topic name";
const MISSING_MESSAGE: &str = "Missing message content";

pub fn register_tools(registry: &mut McpRegistry) {
    registry.register_tool(produce_message_tool());
    registry.register_tool(consume_messages_tool());
}

// ============================================================================
// produce_message
// ============================================================================

fn produce_message_tool() -> RegisteredTool {
    ToolBuilder::new("produce_message")
        .description("Send message to Kafka topic")
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "broker": {
                    "type": "string",
                    "description": "Kafka broker address"
                },
                "topic": {
                    "type": "string",
                    "description": "Topic name"
                },
                "message": {
                    "type": "string",
                    "description": "Message content"
                },
                "key": {
                    "type": "string",
                    "description": "Key for message (optional)"
                }
            },
            "required": ["broker", "topic", "message"]
        }))
        .build(produce_message_handler)
}

async fn produce_message_handler(ctx: ToolContext, params: Value) -> ToolResult {
    respond("produce_message", produce_message(&ctx, &params).await)
}

async fn produce_message(ctx: &ToolContext, params: &Value) -> Result<String, ToolError> {
    let args = Args::new(params)?;
    let broker = args.require_string("broker", MISSING_BROKER)?;
    let topic = args.require_string("topic", MISSING_TOPIC)?;
    let message = args.require_present_string("message", MISSING_MESSAGE)?;
    let key = args.optional_string("key")?;

    let delivery = tokio::select! {
        delivery = ctx.broker.produce(broker, topic, key, message) => {
            delivery.map_err(ToolError::broker("Error sending message"))?
        }
        _ = ctx.cancel.cancelled() => {
            return Err(ToolError::Cancelled);
        }
    };

    info!(
        topic,
        partition = delivery.partition,
        offset = delivery.offset,
        "message sent"
    );
    Ok(format::format_produced(topic, key, &delivery))
}

// ============================================================================
// consume_messages
// ============================================================================

fn consume_messages_tool() -> RegisteredTool {
    ToolBuilder::new("consume_messages")
        .description("Read messages from Kafka topic")
        .input_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "broker": {
                    "type": "string",
                    "description": "Kafka broker address"
                },
                "topic": {
                    "type": "string",
                    "description": "Topic name"
                },
                "count": {
                    "type": "number",
                    "description": "Number of messages to read (default: 10)"
                }
            },
            "required": ["broker", "topic"]
        }))
        .build(consume_messages_handler)
}

async fn consume_messages_handler(ctx: ToolContext, params: Value) -> ToolResult {
    respond("consume_messages", consume_messages(&ctx, &params).await)
}

async fn consume_messages(ctx: &ToolContext, params: &Value) -> Result<String, ToolError> {
    let args = Args::new(params)?;
    let broker = args.require_string("broker", MISSING_BROKER)?;
    let topic = args.require_string("topic", MISSING_TOPIC)?;
    let count = args.positive_count("count", ctx.default_count)?;

    // Cancellation is handled inside the consumer, which keeps what it read.
    let result = ctx
        .broker
        .consume(broker, topic, count, &ctx.cancel)
        .await
        .map_err(ToolError::broker("Error reading messages"))?;

    info!(topic, requested = count, read = result.len(), "messages read");
    Ok(format::format_consumed(topic, &result))
}
