//! Shared test helpers: a recording consumer and a log-capturing layer

#![allow(dead_code)]

use kafka_bindings::consumer::{
    CommitMode, CommitReportSink, CommitReportSinks, ConsumerHandle, TopicPartition,
    TopicPartitionOffset,
};
use kafka_bindings::event::{ConsumedRecord, Header, RawRecord};
use kafka_bindings::BrokerError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// One recorded `commit` call
#[derive(Debug, Clone, PartialEq)]
pub struct CommitCall {
    pub offsets: Vec<TopicPartitionOffset>,
    pub mode: CommitMode,
}

/// Consumer stand-in that records commits instead of talking to a broker
#[derive(Default)]
pub struct RecordingConsumer {
    calls: Mutex<Vec<CommitCall>>,
    sinks: CommitReportSinks,
    failures: Mutex<VecDeque<BrokerError>>,
    records: Mutex<VecDeque<RawRecord>>,
    assignment: Mutex<Vec<TopicPartition>>,
}

impl RecordingConsumer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the next commit call fail with `error`
    pub fn fail_next_commit(&self, error: BrokerError) {
        self.failures.lock().push_back(error);
    }

    /// Queue records for `poll`
    pub fn enqueue(&self, records: impl IntoIterator<Item = RawRecord>) {
        self.records.lock().extend(records);
    }

    pub fn set_assignment(&self, assignment: Vec<TopicPartition>) {
        *self.assignment.lock() = assignment;
    }

    pub fn calls(&self) -> Vec<CommitCall> {
        self.calls.lock().clone()
    }

    /// Registered sinks that are still alive
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Deliver an out-of-band commit report to every live sink
    pub fn report(&self, result: Result<(), BrokerError>, offsets: &[TopicPartitionOffset]) {
        self.sinks.dispatch(&result, offsets);
    }
}

impl ConsumerHandle for RecordingConsumer {
    fn commit(
        &self,
        offsets: &[TopicPartitionOffset],
        mode: CommitMode,
    ) -> Result<(), BrokerError> {
        self.calls.lock().push(CommitCall {
            offsets: offsets.to_vec(),
            mode,
        });
        match self.failures.lock().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn assignment(&self) -> Result<Vec<TopicPartition>, BrokerError> {
        Ok(self.assignment.lock().clone())
    }

    fn add_commit_report_sink(&self, sink: &Arc<dyn CommitReportSink>) {
        self.sinks.register(sink);
    }

    fn poll(&self, _timeout: Duration) -> Result<Option<RawRecord>, BrokerError> {
        Ok(self.records.lock().pop_front())
    }
}

pub fn raw_record(topic: &str, partition: i32, offset: i64) -> RawRecord {
    ConsumedRecord {
        key: Some(format!("key-{offset}").into_bytes()),
        value: Some(format!("value-{offset}").into_bytes()),
        topic: topic.to_string(),
        partition,
        offset,
        timestamp_millis: Some(1_700_000_000_000 + offset),
        headers: None,
    }
}

pub fn raw_record_with_headers(
    topic: &str,
    partition: i32,
    offset: i64,
    headers: Vec<Header>,
) -> RawRecord {
    ConsumedRecord {
        headers: Some(headers),
        ..raw_record(topic, partition, offset)
    }
}

/// A captured log event
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone, Default)]
pub struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CaptureLayer {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().clone()
    }

    pub fn at_level(&self, level: Level) -> Vec<CapturedEvent> {
        self.events().into_iter().filter(|e| e.level == level).collect()
    }
}

struct FieldVisitor<'a> {
    message: &'a mut String,
    fields: &'a mut Vec<(String, String)>,
}

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = value.to_string();
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            *self.message = format!("{value:?}");
        } else {
            self.fields.push((field.name().to_string(), format!("{value:?}")));
        }
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = String::new();
        let mut fields = Vec::new();
        event.record(&mut FieldVisitor {
            message: &mut message,
            fields: &mut fields,
        });
        self.events.lock().push(CapturedEvent {
            level: *event.metadata().level(),
            message,
            fields,
        });
    }
}

/// Run `f` with a subscriber that captures every event
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, CaptureLayer) {
    let layer = CaptureLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, layer)
}
