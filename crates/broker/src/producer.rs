use crate::admin;
use crate::error::{Error, Result};
use crate::message::Delivery;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use std::time::Duration;
use tracing::debug;

/// Default bound on a single send, delivery report included.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Picks the partition that has received the fewest bytes from this writer.
///
/// Ties go to the lowest partition index, so a fresh balancer starts at the
/// first partition and spreads writes in index order.
#[derive(Debug, Clone)]
pub struct LeastBytes {
    written: Vec<u64>,
}

impl LeastBytes {
    pub fn new(partitions: usize) -> Self {
        Self {
            written: vec![0; partitions.max(1)],
        }
    }

    /// Choose a partition for a record of `size` bytes and account for it.
    pub fn assign(&mut self, size: usize) -> i32 {
        let (partition, _) = self
            .written
            .iter()
            .enumerate()
            .min_by_key(|(index, bytes)| (**bytes, *index))
            .unwrap_or((0, &0));
        self.written[partition] += size as u64;
        partition as i32
    }

    pub fn partitions(&self) -> usize {
        self.written.len()
    }
}

/// A record to append.
#[derive(Debug, Clone)]
pub struct Record<'a> {
    pub topic: &'a str,
    pub key: Option<&'a str>,
    pub value: &'a str,
}

impl Record<'_> {
    fn size(&self) -> usize {
        self.key.map(str::len).unwrap_or(0) + self.value.len()
    }
}

/// Short-lived writer for a single topic.
pub struct Writer {
    producer: FutureProducer,
    balancer: LeastBytes,
    send_timeout: Duration,
}

impl Writer {
    /// Open a writer for `topic`, sizing the balancer from topic metadata.
    pub async fn open(
        brokers: &str,
        topic: &str,
        send_timeout: Duration,
        metadata_timeout: Duration,
    ) -> Result<Self> {
        let partitions = admin::partition_count(brokers, topic, metadata_timeout).await?;

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", send_timeout.as_millis().to_string())
            .create()
            .map_err(|e| Error::Connectivity {
                broker: brokers.to_string(),
                message: format!("failed to create producer: {e}"),
            })?;

        Ok(Self {
            producer,
            balancer: LeastBytes::new(partitions),
            send_timeout,
        })
    }

    /// Append one record and wait for its delivery report.
    pub async fn send(&mut self, record: &Record<'_>) -> Result<Delivery> {
        let partition = self.balancer.assign(record.size());

        let mut future_record = FutureRecord::<str, str>::to(record.topic)
            .payload(record.value)
            .partition(partition);
        if let Some(key) = record.key.filter(|k| !k.is_empty()) {
            future_record = future_record.key(key);
        }

        let send = self
            .producer
            .send(future_record, self.send_timeout);
        let (partition, offset) = tokio::time::timeout(self.send_timeout, send)
            .await
            .map_err(|_| Error::Timeout(self.send_timeout))?
            .map_err(|(err, _)| err)?;

        debug!(topic = record.topic, partition, offset, "record delivered");
        Ok(Delivery { partition, offset })
    }
}

/// Append exactly one record with a fresh writer, dropped before returning.
pub async fn produce(
    brokers: &str,
    record: &Record<'_>,
    send_timeout: Duration,
    metadata_timeout: Duration,
) -> Result<Delivery> {
    let mut writer = Writer::open(brokers, record.topic, send_timeout, metadata_timeout).await?;
    writer.send(record).await
}
