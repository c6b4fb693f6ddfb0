//! MCP server E2E test
//!
//! Drives the full stdio protocol against a real broker: initialize, create a
//! topic, produce to it and read the message back as tool text.

use std::sync::Arc;

use chrono::Utc;
use kafka_mcp::{build_server, Config};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, BufReader};

/// Kafka broker address for testing
const KAFKA_BROKER: &str = "kafka:9092";

fn tool_call(id: i64, name: &str, arguments: Value) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
    .to_string()
}

#[tokio::test]
#[ignore = "requires a Kafka broker at kafka:9092"]
async fn test_stdio_session() -> Result<(), Box<dyn std::error::Error>> {
    let topic = format!("mcp-session-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default());
    let server = Arc::new(build_server(&Config::default()));

    // Calls run concurrently, so create and produce go in separate sessions
    // to keep their order.
    let sessions = [
        vec![
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "initialize",
                "params": {"protocolVersion": "2024-11-05", "capabilities": {}}
            })
            .to_string(),
            tool_call(2, "create_topic", json!({"broker": KAFKA_BROKER, "topic": topic})),
        ],
        vec![tool_call(
            3,
            "produce_message",
            json!({"broker": KAFKA_BROKER, "topic": topic, "message": "hello", "key": "greeting"}),
        )],
        vec![tool_call(
            4,
            "consume_messages",
            json!({"broker": KAFKA_BROKER, "topic": topic, "count": 5}),
        )],
    ];

    let mut responses = Vec::new();
    for session in sessions {
        let input = session.join("\n");
        let (writer, mut output) = tokio::io::duplex(64 * 1024);
        Arc::clone(&server)
            .serve(BufReader::new(input.as_bytes()), writer)
            .await?;

        let mut text = String::new();
        output.read_to_string(&mut text).await?;
        for line in text.lines() {
            responses.push(serde_json::from_str::<Value>(line)?);
        }
    }

    let text_of = |id: i64| -> String {
        responses
            .iter()
            .find(|r| r["id"] == id)
            .and_then(|r| r["result"]["content"][0]["text"].as_str())
            .unwrap_or_default()
            .to_string()
    };

    assert_eq!(
        text_of(2),
        format!("Successfully created topic '{topic}' with 1 partitions")
    );
    assert!(text_of(3).starts_with(&format!(
        "Successfully sent message to topic '{topic}' with key 'greeting'"
    )));
    let consumed = text_of(4);
    assert!(consumed.starts_with(&format!("Messages in topic '{topic}':")));
    assert!(consumed.contains("Key: greeting, Value: hello (Partition: 0, Offset: 0)"));

    Ok(())
}
