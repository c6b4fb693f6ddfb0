use crate::error::{Error, Result};
use crate::message::Message;
use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer as RdkafkaConsumer, StreamConsumer as RdkafkaStreamConsumer};
use rdkafka::{Offset, TopicPartitionList};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Partition every consumption reads from.
pub const CONSUME_PARTITION: i32 = 0;

/// Default number of messages to read per call.
pub const DEFAULT_MAX_COUNT: usize = 10;

/// Default deadline covering a whole consumption call.
pub const DEFAULT_CONSUME_DEADLINE: Duration = Duration::from_secs(5);

/// Source of messages for [`BoundedConsumer`].
///
/// `next_message` waits until one message is available. It must be safe to
/// drop the returned future at any point, since the consumer abandons it when
/// the deadline passes or the call is cancelled.
#[async_trait]
pub trait MessageReader: Send {
    async fn next_message(&mut self) -> Result<Message>;
}

/// What a consumption call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumptionResult {
    /// Nothing arrived before the deadline
    Empty,
    /// Messages in read order, never more than the requested count
    Messages(Vec<Message>),
}

impl ConsumptionResult {
    pub fn len(&self) -> usize {
        match self {
            ConsumptionResult::Empty => 0,
            ConsumptionResult::Messages(messages) => messages.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Why a read stopped without a message or a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    DeadlineExceeded,
    Cancelled,
}

enum State {
    Reading(usize),
    Done,
    Empty,
    Failed(Error),
}

/// Reads up to `max_count` messages under one deadline shared by all reads.
#[derive(Debug, Clone, Copy)]
pub struct BoundedConsumer {
    max_count: usize,
    deadline: Duration,
}

impl Default for BoundedConsumer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_COUNT, DEFAULT_CONSUME_DEADLINE)
    }
}

impl BoundedConsumer {
    pub fn new(max_count: usize, deadline: Duration) -> Self {
        Self {
            max_count: max_count.max(1),
            deadline,
        }
    }

    pub fn max_count(&self) -> usize {
        self.max_count
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Drive `reader` until `max_count` messages are read, the deadline
    /// passes, `cancel` fires, or a read fails.
    ///
    /// Deadline and cancellation are not errors: with nothing read they give
    /// [`ConsumptionResult::Empty`], otherwise the messages read so far. Any
    /// other read failure is returned as is and the partial batch is dropped.
    /// The reader is dropped before returning on every path.
    pub async fn run<R: MessageReader>(
        &self,
        mut reader: R,
        cancel: &CancellationToken,
    ) -> Result<ConsumptionResult> {
        let deadline = Instant::now() + self.deadline;
        let mut messages = Vec::with_capacity(self.max_count.min(1024));
        let mut state = State::Reading(0);

        while let State::Reading(i) = state {
            if i >= self.max_count {
                state = State::Done;
                break;
            }

            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(Interrupt::Cancelled),
                read = tokio::time::timeout_at(deadline, reader.next_message()) => {
                    read.map_err(|_| Interrupt::DeadlineExceeded)
                }
            };

            state = match read {
                Ok(Ok(message)) => {
                    messages.push(message);
                    State::Reading(i + 1)
                }
                Ok(Err(e)) => State::Failed(e),
                Err(interrupt) if i == 0 => {
                    debug!(?interrupt, "no message before deadline");
                    State::Empty
                }
                Err(interrupt) => {
                    debug!(?interrupt, read = i, "stopping with partial batch");
                    State::Done
                }
            };
        }

        drop(reader);

        match state {
            State::Empty => Ok(ConsumptionResult::Empty),
            State::Failed(e) => Err(e),
            State::Done | State::Reading(_) => Ok(ConsumptionResult::Messages(messages)),
        }
    }
}

/// Fetch tuning for [`PartitionReader`].
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Kafka brokers (comma-separated list)
    pub brokers: String,
    /// Topic to read from
    pub topic: String,
    /// Partition to read from
    pub partition: i32,
    /// Longest time the broker may hold a fetch waiting for data
    pub fetch_wait_max: Duration,
    /// Minimum bytes the broker should return per fetch
    pub fetch_min_bytes: usize,
    /// Maximum bytes per partition per fetch
    pub max_partition_fetch_bytes: usize,
}

impl ReaderConfig {
    pub fn new(brokers: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            topic: topic.into(),
            partition: CONSUME_PARTITION,
            fetch_wait_max: Duration::from_secs(1),
            fetch_min_bytes: 1,
            max_partition_fetch_bytes: 10_000_000,
        }
    }
}

/// Reads one partition from its earliest offset, outside any consumer group
/// coordination. Nothing is committed, so every reader starts fresh.
pub struct PartitionReader {
    consumer: RdkafkaStreamConsumer,
    topic: String,
    partition: i32,
}

impl PartitionReader {
    pub fn open(config: &ReaderConfig) -> Result<Self> {
        let consumer: RdkafkaStreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", "kafka-mcp-reader")
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false")
            .set("enable.partition.eof", "false")
            .set(
                "fetch.wait.max.ms",
                config.fetch_wait_max.as_millis().to_string(),
            )
            .set("fetch.min.bytes", config.fetch_min_bytes.to_string())
            .set(
                "max.partition.fetch.bytes",
                config.max_partition_fetch_bytes.to_string(),
            )
            .create()
            .map_err(|e| Error::Connectivity {
                broker: config.brokers.clone(),
                message: format!("failed to create reader: {e}"),
            })?;

        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(&config.topic, config.partition, Offset::Beginning)
            .map_err(|e| Error::Protocol(format!("invalid partition assignment: {e}")))?;
        consumer
            .assign(&tpl)
            .map_err(|e| Error::Protocol(format!("cannot assign partition: {e}")))?;

        debug!(
            topic = %config.topic,
            partition = config.partition,
            "opened partition reader"
        );

        Ok(Self {
            consumer,
            topic: config.topic.clone(),
            partition: config.partition,
        })
    }
}

#[async_trait]
impl MessageReader for PartitionReader {
    async fn next_message(&mut self) -> Result<Message> {
        let msg = self.consumer.recv().await?;
        Ok(Message::from_borrowed(&msg))
    }
}

impl Drop for PartitionReader {
    fn drop(&mut self) {
        debug!(
            topic = %self.topic,
            partition = self.partition,
            "closing partition reader"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use rdkafka::error::KafkaError;
    use rdkafka::types::RDKafkaErrorCode;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Hands out scripted reads, then blocks forever like an idle partition.
    struct ScriptedReader {
        script: VecDeque<Result<Message>>,
        reads: Arc<AtomicUsize>,
        dropped: Arc<AtomicBool>,
    }

    impl ScriptedReader {
        fn new(script: Vec<Result<Message>>) -> Self {
            Self {
                script: script.into(),
                reads: Arc::new(AtomicUsize::new(0)),
                dropped: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    #[async_trait]
    impl MessageReader for ScriptedReader {
        async fn next_message(&mut self) -> Result<Message> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            match self.script.pop_front() {
                Some(read) => read,
                None => std::future::pending().await,
            }
        }
    }

    impl Drop for ScriptedReader {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    fn message(offset: i64) -> Message {
        Message {
            key: None,
            value: format!("value-{offset}").into_bytes(),
            timestamp: DateTime::<Utc>::from_timestamp(1_700_000_000 + offset, 0).unwrap(),
            partition: 0,
            offset,
        }
    }

    fn messages(n: i64) -> Vec<Result<Message>> {
        (0..n).map(|offset| Ok(message(offset))).collect()
    }

    fn transport_error() -> Error {
        Error::Kafka(KafkaError::MessageConsumption(
            RDKafkaErrorCode::BrokerTransportFailure,
        ))
    }

    #[tokio::test]
    async fn test_reads_exactly_max_count_when_enough_are_ready() {
        let reader = ScriptedReader::new(messages(5));
        let reads = Arc::clone(&reader.reads);
        let consumer = BoundedConsumer::new(3, Duration::from_secs(5));

        let started = std::time::Instant::now();
        let result = consumer
            .run(reader, &CancellationToken::new())
            .await
            .unwrap();

        let ConsumptionResult::Messages(read) = result else {
            panic!("expected messages, got {result:?}");
        };
        let offsets: Vec<i64> = read.iter().map(|m| m.offset).collect();
        assert_eq!(offsets, vec![0, 1, 2]);
        assert_eq!(reads.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_empty_partition_yields_empty_sentinel() {
        let reader = ScriptedReader::new(vec![]);
        let dropped = Arc::clone(&reader.dropped);
        let consumer = BoundedConsumer::new(1, Duration::from_millis(50));

        let result = consumer.run(reader, &CancellationToken::new()).await;

        tokio_test::assert_ok!(&result);
        assert_eq!(result.unwrap(), ConsumptionResult::Empty);
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_partial_batch_is_success_after_deadline() {
        let reader = ScriptedReader::new(messages(2));
        let consumer = BoundedConsumer::new(10, Duration::from_millis(50));

        let started = std::time::Instant::now();
        let result = consumer
            .run(reader, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_deadline_is_shared_across_reads() {
        struct SlowReader {
            next_offset: i64,
        }

        #[async_trait]
        impl MessageReader for SlowReader {
            async fn next_message(&mut self) -> Result<Message> {
                tokio::time::sleep(Duration::from_millis(40)).await;
                self.next_offset += 1;
                Ok(message(self.next_offset - 1))
            }
        }

        // Each read fits the deadline on its own; a per-read deadline would
        // collect all ten.
        let consumer = BoundedConsumer::new(10, Duration::from_millis(150));
        let result = consumer
            .run(SlowReader { next_offset: 0 }, &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.len() >= 1);
        assert!(result.len() <= 4, "read {} messages", result.len());
    }

    #[tokio::test]
    async fn test_read_failure_discards_partial_batch() {
        let mut script = messages(2);
        script.push(Err(transport_error()));
        let reader = ScriptedReader::new(script);
        let dropped = Arc::clone(&reader.dropped);
        let consumer = BoundedConsumer::new(10, Duration::from_secs(5));

        let result = consumer.run(reader, &CancellationToken::new()).await;

        tokio_test::assert_err!(&result);
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_first_read_failure_is_not_empty() {
        let reader = ScriptedReader::new(vec![Err(transport_error())]);
        let consumer = BoundedConsumer::new(1, Duration::from_secs(5));

        let result = consumer.run(reader, &CancellationToken::new()).await;

        assert!(matches!(result, Err(Error::Kafka(_))));
    }

    #[tokio::test]
    async fn test_cancellation_before_any_message_yields_empty() {
        let reader = ScriptedReader::new(vec![]);
        let consumer = BoundedConsumer::new(5, Duration::from_secs(30));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let result = consumer.run(reader, &cancel).await.unwrap();

        assert_eq!(result, ConsumptionResult::Empty);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_cancellation_keeps_partial_batch() {
        let reader = ScriptedReader::new(messages(1));
        let consumer = BoundedConsumer::new(5, Duration::from_secs(30));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = consumer.run(reader, &cancel).await.unwrap();
        assert_eq!(result, ConsumptionResult::Messages(vec![message(0)]));
    }

    #[test]
    fn test_zero_max_count_is_clamped() {
        let consumer = BoundedConsumer::new(0, DEFAULT_CONSUME_DEADLINE);
        assert_eq!(consumer.max_count(), 1);
        assert_eq!(BoundedConsumer::default().max_count(), DEFAULT_MAX_COUNT);
    }

    #[test]
    fn test_reader_config_defaults() {
        let config = ReaderConfig::new("localhost:9092", "events");
        assert_eq!(config.partition, CONSUME_PARTITION);
        assert_eq!(config.fetch_wait_max, Duration::from_secs(1));
        assert_eq!(config.fetch_min_bytes, 1);
        assert_eq!(config.max_partition_fetch_bytes, 10_000_000);
    }
}
