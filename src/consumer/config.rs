//! Consumer configuration structures

use super::commit::ASYNC;
use crate::error::ConfigError;
use crate::options::ClientProperties;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Extra librdkafka properties a binding may pass through untouched
pub const ALLOWED_KAFKA_PROPS: &[&str] = &[
    // Fetch settings
    "fetch.min.bytes",
    "fetch.wait.max.ms",
    "fetch.max.bytes",
    "max.partition.fetch.bytes",
    // Request settings
    "request.timeout.ms",
    "metadata.max.age.ms",
    "receive.buffer.bytes",
    "send.buffer.bytes",
    // Consumer settings
    "queued.min.messages",
    "queued.max.messages.kbytes",
    "fetch.error.backoff.ms",
    "fetch.message.max.bytes",
    "heartbeat.interval.ms",
    "partition.assignment.strategy",
    "client.id",
    // Connection settings
    "reconnect.backoff.ms",
    "reconnect.backoff.max.ms",
    "connections.max.idle.ms",
    "socket.keepalive.enable",
];

const AUTO_OFFSET_RESET_VALUES: &[&str] = &["earliest", "latest", "none"];

/// Kafka consumer configuration for one binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Kafka broker addresses (comma-separated)
    pub brokers: String,

    /// Consumer group ID
    pub group_id: String,

    /// Topics to consume from
    pub topics: Vec<String>,

    /// Session timeout in milliseconds
    pub session_timeout_ms: u32,

    /// Maximum poll interval in milliseconds
    pub max_poll_interval_ms: u32,

    /// Offset reset policy (earliest, latest, none)
    pub auto_offset_reset: String,

    /// Commit strategy name, resolved through the strategy factory
    pub commit_strategy: String,

    /// Maximum records handed to the handler per batch
    pub max_batch_size: usize,

    /// How long a single poll waits for a record, in milliseconds
    pub poll_timeout_ms: u64,

    /// Additional Kafka properties
    pub kafka_properties: HashMap<String, String>,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            group_id: "kafka-bindings".to_string(),
            topics: Vec::new(),
            session_timeout_ms: 30000,
            max_poll_interval_ms: 300000,
            auto_offset_reset: "earliest".to_string(),
            commit_strategy: ASYNC.to_string(),
            max_batch_size: 64,
            poll_timeout_ms: 100,
            kafka_properties: HashMap::new(),
        }
    }
}

/// Builder for ConsumerConfig
pub struct ConsumerConfigBuilder {
    config: ConsumerConfig,
}

impl ConsumerConfigBuilder {
    /// Create a new consumer config builder
    pub fn new() -> Self {
        Self {
            config: ConsumerConfig::default(),
        }
    }

    /// Set the broker addresses
    pub fn brokers(mut self, brokers: impl Into<String>) -> Self {
        self.config.brokers = brokers.into();
        self
    }

    /// Set the consumer group ID
    pub fn group_id(mut self, group_id: impl Into<String>) -> Self {
        self.config.group_id = group_id.into();
        self
    }

    /// Set the topics to consume
    pub fn topics(mut self, topics: Vec<String>) -> Self {
        self.config.topics = topics;
        self
    }

    /// Set the session timeout
    pub fn session_timeout_ms(mut self, timeout: u32) -> Self {
        self.config.session_timeout_ms = timeout;
        self
    }

    /// Set the offset reset policy
    pub fn auto_offset_reset(mut self, policy: impl Into<String>) -> Self {
        self.config.auto_offset_reset = policy.into();
        self
    }

    /// Set the commit strategy name
    pub fn commit_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.config.commit_strategy = strategy.into();
        self
    }

    /// Set the maximum batch size
    pub fn max_batch_size(mut self, size: usize) -> Self {
        self.config.max_batch_size = size;
        self
    }

    /// Set the poll timeout
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.config.poll_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Add a custom Kafka property
    pub fn kafka_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.kafka_properties.insert(key.into(), value.into());
        self
    }

    /// Build the consumer configuration
    pub fn build(self) -> ConsumerConfig {
        self.config
    }
}

impl Default for ConsumerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsumerConfig {
    /// Create a new consumer config builder
    pub fn builder() -> ConsumerConfigBuilder {
        ConsumerConfigBuilder::new()
    }

    /// Poll timeout as a duration
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    /// Validate the configuration.
    ///
    /// The commit strategy name is only checked for presence here; whether it
    /// is known is up to the strategy factory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.brokers.trim().is_empty() {
            return Err(ConfigError::InvalidArgument { name: "brokers" });
        }

        if self.group_id.trim().is_empty() {
            return Err(ConfigError::InvalidArgument { name: "group_id" });
        }

        if self.topics.is_empty() {
            return Err(ConfigError::Invalid("Topics cannot be empty".to_string()));
        }

        if self.commit_strategy.trim().is_empty() {
            return Err(ConfigError::InvalidArgument {
                name: "commit_strategy",
            });
        }

        if !AUTO_OFFSET_RESET_VALUES.contains(&self.auto_offset_reset.as_str()) {
            return Err(ConfigError::out_of_range(
                "auto_offset_reset",
                self.auto_offset_reset.clone(),
                "expected one of earliest, latest, none",
            ));
        }

        if self.max_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        if self.session_timeout_ms == 0 || self.max_poll_interval_ms < self.session_timeout_ms {
            return Err(ConfigError::Invalid(
                "Max poll interval must be at least the session timeout".to_string(),
            ));
        }

        for key in self.kafka_properties.keys() {
            if !ALLOWED_KAFKA_PROPS.contains(&key.as_str()) {
                return Err(ConfigError::out_of_range(
                    "kafka_properties",
                    key.clone(),
                    "Disallowed Kafka property",
                ));
            }
        }

        Ok(())
    }

    /// Consumer properties for librdkafka. Auto-commit is always disabled;
    /// offsets only move through a commit strategy.
    pub fn client_properties(&self) -> Result<BTreeMap<String, String>, ConfigError> {
        self.validate()?;

        let mut props = BTreeMap::new();
        props.insert("bootstrap.servers".to_string(), self.brokers.clone());
        props.insert("group.id".to_string(), self.group_id.clone());
        props.insert("enable.auto.commit".to_string(), "false".to_string());
        props.insert("enable.auto.offset.store".to_string(), "false".to_string());
        props.insert("session.timeout.ms".to_string(), self.session_timeout_ms.to_string());
        props.insert("max.poll.interval.ms".to_string(), self.max_poll_interval_ms.to_string());
        props.insert("auto.offset.reset".to_string(), self.auto_offset_reset.clone());

        for (key, value) in &self.kafka_properties {
            props.insert(key.clone(), value.clone());
        }

        Ok(props)
    }

    /// [`client_properties`](Self::client_properties) plus connection
    /// security settings
    pub fn client_properties_with(
        &self,
        security: &ClientProperties,
    ) -> Result<BTreeMap<String, String>, ConfigError> {
        let mut props = self.client_properties()?;
        for (key, value) in security {
            props.insert((*key).to_string(), value.clone());
        }
        Ok(props)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn valid() -> ConsumerConfig {
        ConsumerConfig::builder()
            .brokers("broker:9092")
            .group_id("orders-group")
            .topics(vec!["orders".to_string()])
            .build()
    }

    #[test]
    fn default_strategy_is_async() {
        assert_eq!(ConsumerConfig::default().commit_strategy, "async");
    }

    #[test]
    fn builder_config_is_valid() {
        assert_eq!(valid().validate(), Ok(()));
    }

    #[rstest]
    #[case::brokers(ConsumerConfig { brokers: " ".into(), ..valid() }, "brokers")]
    #[case::group(ConsumerConfig { group_id: String::new(), ..valid() }, "group_id")]
    #[case::strategy(
        ConsumerConfig { commit_strategy: String::new(), ..valid() },
        "commit_strategy"
    )]
    fn missing_required_values(#[case] config: ConsumerConfig, #[case] name: &str) {
        match config.validate() {
            Err(ConfigError::InvalidArgument { name: missing }) => assert_eq!(missing, name),
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_offset_reset() {
        let config = valid();
        let config = ConsumerConfig {
            auto_offset_reset: "smallest-ish".to_string(),
            ..config
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { name: "auto_offset_reset", .. })
        ));
    }

    #[test]
    fn rejects_disallowed_property() {
        let config = ConsumerConfig::builder()
            .brokers("b")
            .group_id("g")
            .topics(vec!["t".to_string()])
            .kafka_property("enable.auto.commit", "true")
            .build();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { name: "kafka_properties", .. })
        ));
    }

    #[test]
    fn client_properties_disable_auto_commit() {
        let config = ConsumerConfig::builder()
            .brokers("b:9092")
            .group_id("g")
            .topics(vec!["t".to_string()])
            .kafka_property("client.id", "svc-1")
            .build();
        let props = config.client_properties().unwrap();

        assert_eq!(props["enable.auto.commit"], "false");
        assert_eq!(props["bootstrap.servers"], "b:9092");
        assert_eq!(props["group.id"], "g");
        assert_eq!(props["client.id"], "svc-1");
    }

    #[test]
    fn security_properties_are_merged() {
        let mut security = ClientProperties::new();
        security.insert("security.protocol", "sasl_ssl".to_string());
        let props = valid().client_properties_with(&security).unwrap();
        assert_eq!(props["security.protocol"], "sasl_ssl");
    }
}
