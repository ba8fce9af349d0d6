//! [`ConsumerHandle`] over an rdkafka `BaseConsumer`

use super::config::ConsumerConfig;
use super::error::ConsumerResult;
use super::handle::{
    CommitMode, CommitReportSink, CommitReportSinks, ConsumerHandle, TopicPartition,
    TopicPartitionOffset,
};
use crate::error::BrokerError;
use crate::event::RawRecord;
use crate::options::EffectiveProducerOptions;
use rdkafka::consumer::{BaseConsumer, Consumer, ConsumerContext};
use rdkafka::error::KafkaResult;
use rdkafka::{ClientConfig, ClientContext, Offset, TopicPartitionList};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Client context forwarding asynchronous commit outcomes to report sinks.
///
/// rdkafka invokes the callback from inside `poll`.
pub struct CommitReportContext {
    sinks: Arc<CommitReportSinks>,
}

impl ClientContext for CommitReportContext {}

impl ConsumerContext for CommitReportContext {
    fn commit_callback(&self, result: KafkaResult<()>, offsets: &TopicPartitionList) {
        let offsets = from_partition_list(offsets);
        let result = result.map_err(BrokerError::from);
        self.sinks.dispatch(&result, &offsets);
    }
}

/// Kafka consumer subscribed to the configured topics
pub struct KafkaConsumerHandle {
    consumer: BaseConsumer<CommitReportContext>,
    sinks: Arc<CommitReportSinks>,
}

impl KafkaConsumerHandle {
    /// Create the consumer and subscribe. Security settings come from the
    /// effective options.
    pub fn new(
        config: &ConsumerConfig,
        effective: &EffectiveProducerOptions,
    ) -> ConsumerResult<Self> {
        let props = config.client_properties_with(&effective.security_properties())?;

        let mut client_config = ClientConfig::new();
        for (key, value) in &props {
            client_config.set(key, value);
        }

        let sinks = Arc::new(CommitReportSinks::new());
        let consumer: BaseConsumer<CommitReportContext> = client_config
            .create_with_context(CommitReportContext {
                sinks: sinks.clone(),
            })
            .map_err(BrokerError::from)?;

        let topics: Vec<&str> = config.topics.iter().map(String::as_str).collect();
        consumer.subscribe(&topics).map_err(BrokerError::from)?;
        info!(topics = ?config.topics, group_id = %config.group_id, "Subscribed to topics");

        Ok(Self { consumer, sinks })
    }
}

impl ConsumerHandle for KafkaConsumerHandle {
    fn commit(
        &self,
        offsets: &[TopicPartitionOffset],
        mode: CommitMode,
    ) -> Result<(), BrokerError> {
        let tpl = to_partition_list(offsets)?;
        let mode = match mode {
            CommitMode::Sync => rdkafka::consumer::CommitMode::Sync,
            CommitMode::Async => rdkafka::consumer::CommitMode::Async,
        };
        debug!(count = offsets.len(), ?mode, "Committing offsets");
        self.consumer.commit(&tpl, mode)?;
        Ok(())
    }

    fn assignment(&self) -> Result<Vec<TopicPartition>, BrokerError> {
        let tpl = self.consumer.assignment()?;
        Ok(tpl
            .elements()
            .iter()
            .map(|e| TopicPartition::new(e.topic(), e.partition()))
            .collect())
    }

    fn add_commit_report_sink(&self, sink: &Arc<dyn CommitReportSink>) {
        self.sinks.register(sink);
    }

    fn poll(&self, timeout: Duration) -> Result<Option<RawRecord>, BrokerError> {
        match self.consumer.poll(timeout) {
            Some(Ok(message)) => Ok(Some(RawRecord::from(&message))),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }
}

fn to_partition_list(offsets: &[TopicPartitionOffset]) -> Result<TopicPartitionList, BrokerError> {
    let mut tpl = TopicPartitionList::with_capacity(offsets.len());
    for tpo in offsets {
        if tpo.offset < 0 {
            return Err(BrokerError::InvalidOffset {
                topic: tpo.topic.clone(),
                partition: tpo.partition,
                offset: tpo.offset,
            });
        }
        tpl.add_partition_offset(&tpo.topic, tpo.partition, Offset::Offset(tpo.offset))?;
    }
    Ok(tpl)
}

fn from_partition_list(tpl: &TopicPartitionList) -> Vec<TopicPartitionOffset> {
    tpl.elements()
        .iter()
        .filter_map(|e| match e.offset() {
            Offset::Offset(offset) => {
                Some(TopicPartitionOffset::new(e.topic(), e.partition(), offset))
            }
            other => {
                warn!(
                    topic = e.topic(),
                    partition = e.partition(),
                    offset = ?other,
                    "Skipping non-absolute offset in commit report"
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_list_round_trips_absolute_offsets() {
        let offsets = vec![
            TopicPartitionOffset::new("a", 0, 5),
            TopicPartitionOffset::new("b", 3, 11),
        ];
        let tpl = to_partition_list(&offsets).unwrap();
        assert_eq!(from_partition_list(&tpl), offsets);
    }

    #[test]
    fn negative_offsets_are_rejected() {
        let err = to_partition_list(&[TopicPartitionOffset::new("a", 0, -1)]).unwrap_err();
        assert!(matches!(err, BrokerError::InvalidOffset { offset: -1, .. }));
    }
}
