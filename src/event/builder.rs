use super::{EventRecord, Header, HeaderCollection};
use chrono::{DateTime, Utc};

/// Builder for creating records outside the consume path
pub struct EventRecordBuilder<K, V> {
    key: K,
    value: V,
    topic: String,
    partition: i32,
    offset: i64,
    timestamp: DateTime<Utc>,
    headers: Vec<Header>,
}

impl<K, V> EventRecordBuilder<K, V> {
    /// Start a builder for the given key and value
    pub fn new(key: K, value: V) -> Self {
        Self {
            key,
            value,
            topic: String::new(),
            partition: 0,
            offset: 0,
            timestamp: DateTime::<Utc>::default(),
            headers: Vec::new(),
        }
    }

    /// Set the topic
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Set the partition
    pub fn partition(mut self, partition: i32) -> Self {
        self.partition = partition;
        self
    }

    /// Set the offset
    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    /// Set the timestamp
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Append a header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.headers.push(Header::new(key, value));
        self
    }

    /// Build the record. Headers are materialized only if any were added.
    pub fn build(self) -> EventRecord<K, V> {
        let headers = if self.headers.is_empty() {
            HeaderCollection::unmaterialized()
        } else {
            HeaderCollection::populated(self.headers)
        };
        EventRecord::from_parts(
            self.key,
            self.value,
            self.topic,
            self.partition,
            self.offset,
            self.timestamp,
            headers,
        )
    }
}
