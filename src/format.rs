//! Text rendering of tool results.
//!
//! Every function here is pure: the same input always renders to the same
//! bytes. Timestamps are printed in UTC and bytes as lossy UTF-8, so nothing
//! depends on the host locale or time zone.

use kafka_mcp_broker::{ConsumptionResult, Delivery, Message};
use std::collections::BTreeSet;

/// Text returned when a consumption call saw no messages.
pub const EMPTY_TOPIC: &str = "Topic is empty or no new messages";

/// Text returned when the broker reports no topics.
pub const NO_TOPICS: &str = "No topics found in broker";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One line per message, numbered from 1, in read order.
pub fn format_consumption(result: &ConsumptionResult) -> String {
    match result {
        ConsumptionResult::Empty => EMPTY_TOPIC.to_string(),
        ConsumptionResult::Messages(messages) if messages.is_empty() => EMPTY_TOPIC.to_string(),
        ConsumptionResult::Messages(messages) => messages
            .iter()
            .enumerate()
            .map(|(i, message)| format!("{}. {}", i + 1, format_message(message)))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// `[timestamp] Key: k, Value: v (Partition: p, Offset: o)`, key part only when
/// the key has bytes.
pub fn format_message(message: &Message) -> String {
    let key = match &message.key {
        Some(key) if !key.is_empty() => format!("Key: {}, ", String::from_utf8_lossy(key)),
        _ => String::new(),
    };

    format!(
        "[{}] {}Value: {} (Partition: {}, Offset: {})",
        message.timestamp.format(TIMESTAMP_FORMAT),
        key,
        String::from_utf8_lossy(&message.value),
        message.partition,
        message.offset
    )
}

/// Tool payload for `consume_messages`.
pub fn format_consumed(topic: &str, result: &ConsumptionResult) -> String {
    if result.is_empty() {
        return format_consumption(result);
    }
    format!(
        "Messages in topic '{topic}':\n\n{}",
        format_consumption(result)
    )
}

/// Tool payload for `list_topics`.
pub fn format_topics(topics: &BTreeSet<String>) -> String {
    if topics.is_empty() {
        return NO_TOPICS.to_string();
    }

    let lines = topics
        .iter()
        .enumerate()
        .map(|(i, topic)| format!("{}. {topic}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");
    format!("List of topics:\n{lines}")
}

/// Tool payload for `create_topic`.
pub fn format_created(topic: &str, partitions: i32) -> String {
    format!("Successfully created topic '{topic}' with {partitions} partitions")
}

/// Tool payload for `produce_message`.
pub fn format_produced(topic: &str, key: Option<&str>, delivery: &Delivery) -> String {
    let key_info = match key {
        Some(key) if !key.is_empty() => format!(" with key '{key}'"),
        _ => String::new(),
    };
    format!(
        "Successfully sent message to topic '{topic}'{key_info} (Partition: {}, Offset: {})",
        delivery.partition, delivery.offset
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn message(key: Option<&str>, value: &str, offset: i64) -> Message {
        Message {
            key: key.map(|k| k.as_bytes().to_vec()),
            value: value.as_bytes().to_vec(),
            timestamp: DateTime::<Utc>::from_timestamp(1_718_454_645, 123_000_000).unwrap(),
            partition: 0,
            offset,
        }
    }

    #[test]
    fn test_empty_result_is_informational() {
        assert_eq!(format_consumption(&ConsumptionResult::Empty), EMPTY_TOPIC);
        assert_eq!(format_consumed("events", &ConsumptionResult::Empty), EMPTY_TOPIC);
    }

    #[test]
    fn test_message_lines_are_numbered_from_one() {
        let result = ConsumptionResult::Messages(vec![
            message(Some("user_001"), "login", 7),
            message(None, "logout", 8),
        ]);

        assert_eq!(
            format_consumption(&result),
            "1. [2024-06-15 12:30:45] Key: user_001, Value: login (Partition: 0, Offset: 7)\n\
             2. [2024-06-15 12:30:45] Value: logout (Partition: 0, Offset: 8)"
        );
    }

    #[test]
    fn test_formatting_is_deterministic() {
        let result = ConsumptionResult::Messages(vec![message(Some("k"), "v", 0)]);
        assert_eq!(format_consumption(&result), format_consumption(&result));
        assert_eq!(
            format_consumed("events", &result),
            "Messages in topic 'events':\n\n1. [2024-06-15 12:30:45] Key: k, Value: v (Partition: 0, Offset: 0)"
        );
    }

    #[test]
    fn test_empty_key_renders_like_no_key() {
        let empty_key = message(Some(""), "v", 1);
        assert_eq!(
            format_message(&empty_key),
            "[2024-06-15 12:30:45] Value: v (Partition: 0, Offset: 1)"
        );
        assert_eq!(format_message(&empty_key), format_message(&message(None, "v", 1)));
    }

    #[test]
    fn test_non_utf8_bytes_are_rendered_lossily() {
        let mut msg = message(None, "", 1);
        msg.value = vec![0x66, 0x6f, 0xff, 0x6f];
        assert!(format_message(&msg).contains("Value: fo\u{fffd}o"));
    }

    #[test]
    fn test_topic_list() {
        assert_eq!(format_topics(&BTreeSet::new()), NO_TOPICS);

        let topics: BTreeSet<String> = ["orders", "events"].iter().map(|s| s.to_string()).collect();
        assert_eq!(format_topics(&topics), "List of topics:\n1. events\n2. orders");
    }

    #[test]
    fn test_confirmations() {
        assert_eq!(
            format_created("events", 3),
            "Successfully created topic 'events' with 3 partitions"
        );

        let delivery = Delivery {
            partition: 0,
            offset: 42,
        };
        assert_eq!(
            format_produced("events", Some("k1"), &delivery),
            "Successfully sent message to topic 'events' with key 'k1' (Partition: 0, Offset: 42)"
        );
        assert_eq!(
            format_produced("events", None, &delivery),
            "Successfully sent message to topic 'events' (Partition: 0, Offset: 42)"
        );
    }
}
