//! The broker consumer as seen by commit strategies
//!
//! Strategies never touch a concrete client type. They talk to a
//! [`ConsumerHandle`], which the Kafka adapter implements over rdkafka and
//! tests implement with a recorder.

use crate::error::BrokerError;
use crate::event::RawRecord;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// A topic and partition pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TopicPartition {
    /// Topic name
    pub topic: String,
    /// Partition number
    pub partition: i32,
}

impl TopicPartition {
    /// Create a new topic/partition pair
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }
}

/// Commit coordinate: the next offset the group should read from a partition
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TopicPartitionOffset {
    /// Topic name
    pub topic: String,
    /// Partition number
    pub partition: i32,
    /// Offset to commit
    pub offset: i64,
}

impl TopicPartitionOffset {
    /// Create a new commit coordinate
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
        }
    }
}

impl fmt::Display for TopicPartitionOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.topic, self.partition, self.offset)
    }
}

/// How the handle should issue a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitMode {
    /// Block until the group coordinator acknowledges
    Sync,
    /// Enqueue and return; the outcome arrives through a report sink
    Async,
}

/// Receiver of out-of-band commit outcomes.
///
/// Called from the broker client's polling thread, so implementations must
/// not block.
pub trait CommitReportSink: Send + Sync {
    /// One asynchronous commit completed
    fn on_commit(&self, result: &Result<(), BrokerError>, offsets: &[TopicPartitionOffset]);
}

/// Sinks registered on one consumer, held weakly.
///
/// A sink stops receiving reports once its owner drops the last strong
/// reference; dead entries are pruned on the next registration or dispatch.
#[derive(Default)]
pub struct CommitReportSinks {
    sinks: RwLock<Vec<Weak<dyn CommitReportSink>>>,
}

impl CommitReportSinks {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `sink` without taking ownership of it
    pub fn register(&self, sink: &Arc<dyn CommitReportSink>) {
        let mut sinks = self.sinks.write();
        sinks.retain(|s| s.strong_count() > 0);
        sinks.push(Arc::downgrade(sink));
    }

    /// Hand one commit outcome to every live sink
    pub fn dispatch(&self, result: &Result<(), BrokerError>, offsets: &[TopicPartitionOffset]) {
        let live: Vec<Arc<dyn CommitReportSink>> = {
            let mut sinks = self.sinks.write();
            sinks.retain(|s| s.strong_count() > 0);
            sinks.iter().filter_map(Weak::upgrade).collect()
        };
        for sink in live {
            sink.on_commit(result, offsets);
        }
    }

    /// Number of sinks still alive
    pub fn len(&self) -> usize {
        self.sinks.read().iter().filter(|s| s.strong_count() > 0).count()
    }

    /// Whether no live sink is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for CommitReportSinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitReportSinks").field("live", &self.len()).finish()
    }
}

/// A consumer bound to a set of partitions
pub trait ConsumerHandle: Send + Sync {
    /// Commit the given offsets. In [`CommitMode::Sync`] this returns only once
    /// the broker has answered.
    fn commit(&self, offsets: &[TopicPartitionOffset], mode: CommitMode) -> Result<(), BrokerError>;

    /// Partitions currently assigned to this consumer
    fn assignment(&self) -> Result<Vec<TopicPartition>, BrokerError>;

    /// Register interest in asynchronous commit outcomes. The handle keeps
    /// only a weak reference; the caller owns the sink.
    fn add_commit_report_sink(&self, sink: &Arc<dyn CommitReportSink>);

    /// Next available record, or `None` if nothing arrived within `timeout`
    fn poll(&self, timeout: Duration) -> Result<Option<RawRecord>, BrokerError>;
}
