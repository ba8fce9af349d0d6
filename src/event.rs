//! Event records handed to handler code
//!
//! An [`EventRecord`] is built once per consumed broker record. Its
//! positional fields (topic, partition, offset, timestamp) have no mutators;
//! only the header collection accepts writes, through interior mutability
//! that materializes its backing store exactly once.

use chrono::{DateTime, TimeZone, Utc};

pub use builder::EventRecordBuilder;
pub use headers::{Header, HeaderCollection};

/// Builder for outbound and test records
pub mod builder;

/// Lazily materialized record headers
pub mod headers;

/// A record as delivered by the broker client, before conversion.
///
/// `timestamp_millis` is milliseconds since the Unix epoch; `None` when the
/// broker did not supply one. `headers` is `None` when the record carried no
/// header block at all.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumedRecord<K, V> {
    /// Record key
    pub key: K,
    /// Record value
    pub value: V,
    /// Source topic
    pub topic: String,
    /// Source partition
    pub partition: i32,
    /// Offset within the partition
    pub offset: i64,
    /// Broker timestamp in epoch milliseconds
    pub timestamp_millis: Option<i64>,
    /// Raw headers
    pub headers: Option<Vec<Header>>,
}

/// Record with raw byte key and value, as produced by the Kafka adapter
pub type RawRecord = ConsumedRecord<Option<Vec<u8>>, Option<Vec<u8>>>;

/// Read access shared by keyed and key-less records.
///
/// The binding only needs coordinates and headers, so it works through this
/// trait instead of the concrete key/value types.
pub trait EventData: Send + Sync {
    /// Source topic
    fn topic(&self) -> &str;
    /// Source partition
    fn partition(&self) -> i32;
    /// Offset within the partition
    fn offset(&self) -> i64;
    /// Broker timestamp
    fn timestamp(&self) -> DateTime<Utc>;
    /// Record headers
    fn headers(&self) -> &HeaderCollection;
}

/// One consumed message
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord<K, V> {
    key: K,
    value: V,
    topic: String,
    partition: i32,
    offset: i64,
    timestamp: DateTime<Utc>,
    headers: HeaderCollection,
}

/// Record for handlers that ignore keys
pub type KeylessEventRecord<V> = EventRecord<(), V>;

impl<K, V> EventRecord<K, V> {
    /// Create an unpositioned record, typically for output bindings
    pub fn new(key: K, value: V) -> Self {
        Self {
            key,
            value,
            topic: String::new(),
            partition: 0,
            offset: 0,
            timestamp: DateTime::<Utc>::default(),
            headers: HeaderCollection::unmaterialized(),
        }
    }

    /// Convert a record delivered by the broker client.
    ///
    /// Headers are populated eagerly only when the broker supplied at least
    /// one; otherwise they stay unmaterialized.
    pub fn from_broker_record(raw: ConsumedRecord<K, V>) -> Self {
        Self {
            key: raw.key,
            value: raw.value,
            topic: raw.topic,
            partition: raw.partition,
            offset: raw.offset,
            timestamp: timestamp_from_millis(raw.timestamp_millis),
            headers: headers_from_broker(raw.headers),
        }
    }

    pub(crate) fn from_parts(
        key: K,
        value: V,
        topic: String,
        partition: i32,
        offset: i64,
        timestamp: DateTime<Utc>,
        headers: HeaderCollection,
    ) -> Self {
        Self {
            key,
            value,
            topic,
            partition,
            offset,
            timestamp,
            headers,
        }
    }

    /// Record key
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Record value
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Source topic
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Source partition
    pub fn partition(&self) -> i32 {
        self.partition
    }

    /// Offset within the partition
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Broker timestamp (UTC)
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Headers. Never absent: an empty, writable collection when the broker
    /// supplied none.
    pub fn headers(&self) -> &HeaderCollection {
        &self.headers
    }

    /// Take ownership of key and value
    pub fn into_key_value(self) -> (K, V) {
        (self.key, self.value)
    }

    /// Project into a key-less record, copying coordinates and headers
    pub fn without_key(&self) -> KeylessEventRecord<V>
    where
        V: Clone,
    {
        EventRecord {
            key: (),
            value: self.value.clone(),
            topic: self.topic.clone(),
            partition: self.partition,
            offset: self.offset,
            timestamp: self.timestamp,
            headers: self.headers.clone(),
        }
    }
}

impl<V> EventRecord<(), V> {
    /// Key-less record holding only a value
    pub fn from_value(value: V) -> Self {
        Self::new((), value)
    }

    /// Convert a broker record, discarding its key
    pub fn from_keyed_broker_record<K>(raw: ConsumedRecord<K, V>) -> Self {
        Self {
            key: (),
            value: raw.value,
            topic: raw.topic,
            partition: raw.partition,
            offset: raw.offset,
            timestamp: timestamp_from_millis(raw.timestamp_millis),
            headers: headers_from_broker(raw.headers),
        }
    }
}

impl<K, V> From<ConsumedRecord<K, V>> for EventRecord<K, V> {
    fn from(raw: ConsumedRecord<K, V>) -> Self {
        Self::from_broker_record(raw)
    }
}

impl<K: Send + Sync, V: Send + Sync> EventData for EventRecord<K, V> {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn partition(&self) -> i32 {
        self.partition
    }

    fn offset(&self) -> i64 {
        self.offset
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn headers(&self) -> &HeaderCollection {
        &self.headers
    }
}

fn timestamp_from_millis(millis: Option<i64>) -> DateTime<Utc> {
    millis
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_default()
}

fn headers_from_broker(headers: Option<Vec<Header>>) -> HeaderCollection {
    match headers {
        Some(headers) if !headers.is_empty() => HeaderCollection::populated(headers),
        _ => HeaderCollection::unmaterialized(),
    }
}

#[cfg(feature = "kafka")]
mod kafka {
    use super::{ConsumedRecord, Header, RawRecord};
    use rdkafka::message::{BorrowedMessage, Headers, Message, OwnedMessage};

    fn convert<M: Message>(message: &M) -> RawRecord {
        let headers = message.headers().map(|headers| {
            headers
                .iter()
                .map(|h| Header::new(h.key, h.value.map(<[u8]>::to_vec).unwrap_or_default()))
                .collect()
        });

        ConsumedRecord {
            key: message.key().map(<[u8]>::to_vec),
            value: message.payload().map(<[u8]>::to_vec),
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            timestamp_millis: message.timestamp().to_millis(),
            headers,
        }
    }

    impl From<&BorrowedMessage<'_>> for RawRecord {
        fn from(message: &BorrowedMessage<'_>) -> Self {
            convert(message)
        }
    }

    impl From<&OwnedMessage> for RawRecord {
        fn from(message: &OwnedMessage) -> Self {
            convert(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn raw(headers: Option<Vec<Header>>) -> ConsumedRecord<Option<String>, String> {
        ConsumedRecord {
            key: Some("user-1".to_string()),
            value: "payload".to_string(),
            topic: "orders".to_string(),
            partition: 3,
            offset: 42,
            timestamp_millis: Some(1_700_000_000_123),
            headers,
        }
    }

    #[test]
    fn copies_broker_fields() {
        let record = EventRecord::from_broker_record(raw(None));
        assert_eq!(record.key(), &Some("user-1".to_string()));
        assert_eq!(record.value(), "payload");
        assert_eq!(record.topic(), "orders");
        assert_eq!(record.partition(), 3);
        assert_eq!(record.offset(), 42);
        assert_eq!(record.timestamp().timestamp_millis(), 1_700_000_000_123);
    }

    #[test]
    fn absent_timestamp_maps_to_epoch() {
        let mut source = raw(None);
        source.timestamp_millis = None;
        let record = EventRecord::from_broker_record(source);
        assert_eq!(record.timestamp().timestamp_millis(), 0);
    }

    #[test]
    fn empty_header_block_stays_unmaterialized() {
        let record = EventRecord::from_broker_record(raw(Some(vec![])));
        assert!(!record.headers().is_materialized());
        assert!(record.headers().is_empty());
    }

    #[test]
    fn non_empty_headers_are_populated() {
        let headers = vec![Header::new("a", b"1".to_vec())];
        let record = EventRecord::from_broker_record(raw(Some(headers)));
        assert!(record.headers().is_materialized());
        assert_eq!(record.headers().len(), 1);
    }

    #[test]
    fn absent_key_passes_through() {
        let mut source = raw(None);
        source.key = None;
        let record = EventRecord::from_broker_record(source);
        assert_eq!(record.key(), &None);
    }

    #[test]
    fn new_keeps_key_and_value() {
        let record = EventRecord::new("k", 7);
        assert_eq!(record.key(), &"k");
        assert_eq!(record.value(), &7);
        assert!(!record.headers().is_materialized());
    }

    #[test]
    fn keyless_from_broker_drops_key() {
        let record = KeylessEventRecord::from_keyed_broker_record(raw(None));
        assert_eq!(record.key(), &());
        assert_eq!(record.offset(), 42);
        assert_eq!(record.topic(), "orders");
    }
}
