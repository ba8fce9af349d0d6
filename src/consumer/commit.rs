//! Offset commit strategies
//!
//! A strategy owns one consumer handle for its whole life and decides how the
//! offsets it is given reach the group coordinator.

use super::handle::{CommitMode, CommitReportSink, ConsumerHandle, TopicPartitionOffset};
use crate::error::BrokerError;
use std::sync::Arc;
use tracing::{debug, error, info, Span};

/// Name of the blocking strategy
pub const SYNC: &str = "sync";

/// Name of the fire-and-forget strategy
pub const ASYNC: &str = "async";

/// What a successful [`CommitStrategy::commit`] call guarantees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The group coordinator recorded the offsets
    Durable,
    /// The request was sent; the outcome arrives through a [`CommitReportSink`]
    InFlight,
    /// The request never left the client; the offsets still need committing
    Dropped,
}

/// Durably advances consumer group offsets.
///
/// Offsets passed to [`commit`](CommitStrategy::commit) are the next offsets
/// to read, one past the last processed record of each partition.
pub trait CommitStrategy: Send + Sync {
    /// Registered name of this strategy
    fn name(&self) -> &'static str;

    /// Commit the given offsets
    fn commit(&self, offsets: &[TopicPartitionOffset]) -> Result<CommitOutcome, BrokerError>;
}

/// Blocks until the broker acknowledges every commit.
///
/// A successful return means the offsets are recorded by the group
/// coordinator. Broker errors are returned unchanged.
pub struct SyncCommitStrategy {
    consumer: Arc<dyn ConsumerHandle>,
    span: Span,
}

impl SyncCommitStrategy {
    /// Bind a strategy to a consumer. Performs no I/O.
    pub fn new(consumer: Arc<dyn ConsumerHandle>, span: Span) -> Self {
        Self { consumer, span }
    }
}

impl CommitStrategy for SyncCommitStrategy {
    fn name(&self) -> &'static str {
        SYNC
    }

    fn commit(&self, offsets: &[TopicPartitionOffset]) -> Result<CommitOutcome, BrokerError> {
        let _entered = self.span.enter();

        self.consumer.commit(offsets, CommitMode::Sync)?;

        for tpo in offsets {
            info!(
                topic = %tpo.topic,
                partition = tpo.partition,
                offset = tpo.offset,
                "Committed offset {}",
                tpo
            );
        }
        Ok(CommitOutcome::Durable)
    }
}

/// Enqueues commits without waiting for the broker.
///
/// Outcomes come back through the consumer's report channel and are logged
/// for as long as the strategy lives. A crash before acknowledgment can
/// replay records but never skips unacknowledged work.
pub struct AsyncCommitStrategy {
    consumer: Arc<dyn ConsumerHandle>,
    span: Span,
    _reports: Arc<dyn CommitReportSink>,
}

impl AsyncCommitStrategy {
    /// Bind a strategy to a consumer and register for commit reports.
    /// Performs no I/O.
    pub fn new(consumer: Arc<dyn ConsumerHandle>, span: Span) -> Self {
        let reports: Arc<dyn CommitReportSink> = Arc::new(LoggingReportSink {
            span: span.clone(),
        });
        consumer.add_commit_report_sink(&reports);
        Self {
            consumer,
            span,
            _reports: reports,
        }
    }
}

impl CommitStrategy for AsyncCommitStrategy {
    fn name(&self) -> &'static str {
        ASYNC
    }

    fn commit(&self, offsets: &[TopicPartitionOffset]) -> Result<CommitOutcome, BrokerError> {
        let _entered = self.span.enter();

        match self.consumer.commit(offsets, CommitMode::Async) {
            Ok(()) => {
                debug!(count = offsets.len(), "Issued asynchronous commit");
                Ok(CommitOutcome::InFlight)
            }
            Err(e) => {
                error!(error = %e, count = offsets.len(), "Failed to issue asynchronous commit");
                Ok(CommitOutcome::Dropped)
            }
        }
    }
}

struct LoggingReportSink {
    span: Span,
}

impl CommitReportSink for LoggingReportSink {
    fn on_commit(&self, result: &Result<(), BrokerError>, offsets: &[TopicPartitionOffset]) {
        let _entered = self.span.enter();

        match result {
            Ok(()) => {
                for tpo in offsets {
                    info!(
                        topic = %tpo.topic,
                        partition = tpo.partition,
                        offset = tpo.offset,
                        "Committed offset {}",
                        tpo
                    );
                }
            }
            Err(e) => {
                for tpo in offsets {
                    error!(
                        error = %e,
                        topic = %tpo.topic,
                        partition = tpo.partition,
                        offset = tpo.offset,
                        "Asynchronous commit failed for {}",
                        tpo
                    );
                }
            }
        }
    }
}
