//! Runs handler code over consumed records and commits what succeeded

use super::commit::{CommitOutcome, CommitStrategy};
use super::config::ConsumerConfig;
use super::error::{ConsumerError, ConsumerResult};
use super::factory::CommitStrategyFactory;
use super::handle::{CommitReportSink, ConsumerHandle, TopicPartition, TopicPartitionOffset};
use super::offset_manager::OffsetManager;
use crate::error::{BrokerError, ConfigError};
use crate::event::{EventData, EventRecord};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn, Instrument, Span};

/// Record type yielded by [`TopicBinding::poll_batch`]
pub type RawEventRecord = EventRecord<Option<Vec<u8>>, Option<Vec<u8>>>;

/// Handler code invoked once per record
#[async_trait]
pub trait EventHandler<R: Send + Sync>: Send + Sync {
    /// Error reported for a failed record
    type Error: std::error::Error + Send + Sync + 'static;

    /// Process one record. An error stops the batch at this record.
    async fn handle(&self, record: &R) -> Result<(), Self::Error>;
}

/// Settles in-flight offsets once the broker reports on them
struct OffsetReportSink {
    offsets: Arc<OffsetManager>,
}

impl CommitReportSink for OffsetReportSink {
    fn on_commit(&self, result: &Result<(), BrokerError>, offsets: &[TopicPartitionOffset]) {
        match result {
            Ok(()) => self.offsets.mark_committed(offsets),
            Err(_) => self.offsets.restore(offsets),
        }
    }
}

/// One consumer, one commit strategy, and the bookkeeping between them
pub struct TopicBinding {
    consumer: Arc<dyn ConsumerHandle>,
    strategy: Box<dyn CommitStrategy>,
    offsets: Arc<OffsetManager>,
    _reports: Arc<dyn CommitReportSink>,
    span: Span,
}

impl TopicBinding {
    /// Bind a consumer to the strategy named `strategy`.
    ///
    /// Fails fast on an absent or unknown strategy name.
    pub fn new(
        consumer: Arc<dyn ConsumerHandle>,
        strategy: Option<&str>,
        factory: &dyn CommitStrategyFactory,
        span: Span,
    ) -> Result<Self, ConfigError> {
        let strategy = factory.create(strategy, consumer.clone(), span.clone())?;

        span.in_scope(|| info!(strategy = strategy.name(), "Commit strategy selected"));

        let offsets = Arc::new(OffsetManager::new());
        let reports: Arc<dyn CommitReportSink> = Arc::new(OffsetReportSink {
            offsets: offsets.clone(),
        });
        consumer.add_commit_report_sink(&reports);

        Ok(Self {
            consumer,
            strategy,
            offsets,
            _reports: reports,
            span,
        })
    }

    /// Bind using a validated consumer configuration
    pub fn from_config(
        consumer: Arc<dyn ConsumerHandle>,
        config: &ConsumerConfig,
        factory: &dyn CommitStrategyFactory,
        span: Span,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Self::new(consumer, Some(&config.commit_strategy), factory, span)
    }

    /// Name of the active commit strategy
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Partitions currently assigned to the consumer
    pub fn assignment(&self) -> ConsumerResult<Vec<TopicPartition>> {
        Ok(self.consumer.assignment()?)
    }

    /// Offset bookkeeping for this binding
    pub fn offsets(&self) -> &OffsetManager {
        &self.offsets
    }

    /// Run `handler` over `records` in order, then commit.
    ///
    /// Processing stops at the first failing record. The offsets of the
    /// records before it are still committed, after which the handler error
    /// is returned. A commit error takes precedence over a handler error.
    pub async fn process_batch<R, H>(&self, records: &[R], handler: &H) -> ConsumerResult<usize>
    where
        R: EventData,
        H: EventHandler<R> + ?Sized,
    {
        let mut failure = None;
        let mut processed = 0;

        for record in records {
            match handler.handle(record).instrument(self.span.clone()).await {
                Ok(()) => {
                    self.offsets
                        .mark(record.topic(), record.partition(), record.offset());
                    processed += 1;
                }
                Err(e) => {
                    warn!(
                        parent: &self.span,
                        topic = %record.topic(),
                        partition = record.partition(),
                        offset = record.offset(),
                        error = %e,
                        "Handler failed, stopping batch"
                    );
                    failure = Some(ConsumerError::Handler {
                        topic: record.topic().to_string(),
                        partition: record.partition(),
                        offset: record.offset(),
                        source: Box::new(e),
                    });
                    break;
                }
            }
        }

        self.commit()?;

        match failure {
            Some(e) => Err(e),
            None => Ok(processed),
        }
    }

    /// Commit everything processed so far.
    ///
    /// Offsets count as committed only once the broker acknowledged them.
    /// A failed or unsent commit puts them back to pending so a later call
    /// retries them; for asynchronous commits that happens when the failure
    /// report arrives.
    pub fn commit(&self) -> ConsumerResult<()> {
        let offsets = self.offsets.take_pending();
        if offsets.is_empty() {
            return Ok(());
        }

        match self.strategy.commit(&offsets) {
            Ok(CommitOutcome::Durable) => {
                self.offsets.mark_committed(&offsets);
                Ok(())
            }
            Ok(CommitOutcome::InFlight) => Ok(()),
            Ok(CommitOutcome::Dropped) => {
                self.offsets.restore(&offsets);
                Ok(())
            }
            Err(e) => {
                self.offsets.restore(&offsets);
                Err(ConsumerError::Commit(e))
            }
        }
    }

    /// Poll up to `max` records, stopping early when a poll times out
    pub fn poll_batch(
        &self,
        max: usize,
        timeout: Duration,
    ) -> ConsumerResult<Vec<RawEventRecord>> {
        poll_records(self.consumer.as_ref(), max, timeout, || false)
    }

    /// Poll, handle and commit until `shutdown` flips to `true`.
    ///
    /// A handler or commit failure ends the run; pending offsets are
    /// committed first so a restart resumes right at the failed record.
    pub async fn run<H>(
        &self,
        handler: &H,
        config: &ConsumerConfig,
        mut shutdown: watch::Receiver<bool>,
    ) -> ConsumerResult<()>
    where
        H: EventHandler<RawEventRecord> + ?Sized,
    {
        info!(parent: &self.span, topics = ?config.topics, "Starting binding");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let consumer = self.consumer.clone();
            let stop = shutdown.clone();
            let max = config.max_batch_size;
            let timeout = config.poll_timeout();
            let poll = tokio::task::spawn_blocking(move || {
                poll_records(consumer.as_ref(), max, timeout, || *stop.borrow())
            });

            // An abandoned poll stops after its current call; whatever it
            // fetched is never handled or committed and is redelivered.
            let polled = tokio::select! {
                polled = poll => polled,
                _ = shutdown.changed() => break,
            };

            let batch = match polled {
                Ok(batch) => batch?,
                Err(e) => {
                    error!(parent: &self.span, error = %e, "Poll task failed");
                    break;
                }
            };

            if batch.is_empty() {
                continue;
            }

            debug!(parent: &self.span, count = batch.len(), "Processing batch");
            self.process_batch(&batch, handler).await?;
        }

        info!(parent: &self.span, "Shutting down binding");
        self.commit()
    }
}

fn poll_records(
    consumer: &dyn ConsumerHandle,
    max: usize,
    timeout: Duration,
    stopped: impl Fn() -> bool,
) -> ConsumerResult<Vec<RawEventRecord>> {
    let mut records = Vec::new();
    while records.len() < max && !stopped() {
        match consumer.poll(timeout)? {
            Some(raw) => records.push(EventRecord::from_broker_record(raw)),
            None => break,
        }
    }
    Ok(records)
}
