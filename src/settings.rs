//! Binding settings loaded from YAML with `KAFKA_*` environment overrides
//!
//! ```yaml
//! consumer:
//!   brokers: broker-1:9092,broker-2:9092
//!   group_id: orders-consumer
//!   topics: [orders]
//!   commit_strategy: sync
//! producer:
//!   protocol: sasl_ssl
//!   authentication_mode: scram_sha512
//!   batch_size: 500
//! outputs:
//!   - broker_list: broker-1:9092
//!     topic: orders-enriched
//!     compression_type: zstd
//! ```

use crate::consumer::ConsumerConfig;
use crate::error::ConfigError;
use crate::options::{
    EffectiveProducerOptions, MergedProducerOptions, OutputBinding, ProducerOptions,
    ProducerOptionsLayer,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Everything needed to set up bindings on one host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingSettings {
    /// Consumer side
    pub consumer: ConsumerConfig,
    /// Host-level producer defaults, the lowest-precedence option layer
    pub producer: ProducerOptionsLayer,
    /// Output bindings, each with its own option overrides
    pub outputs: Vec<OutputBinding>,
}

impl BindingSettings {
    /// Parse settings from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Load(e.to_string()))
    }

    /// Read settings from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Loaded binding settings");
        Self::from_yaml_str(&contents)
    }

    /// Apply `KAFKA_*` overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Apply `KAFKA_*` overrides from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(brokers) = var("KAFKA_BROKERS") {
            self.consumer.brokers = brokers;
        }
        if let Some(group_id) = var("KAFKA_GROUP_ID") {
            self.consumer.group_id = group_id;
        }
        if let Some(topics) = var("KAFKA_TOPICS") {
            self.consumer.topics = topics
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(strategy) = var("KAFKA_COMMIT_STRATEGY") {
            self.consumer.commit_strategy = strategy;
        }
        if let Some(size) = var("KAFKA_MAX_BATCH_SIZE") {
            self.consumer.max_batch_size = parse("KAFKA_MAX_BATCH_SIZE", &size)?;
        }

        let producer = &mut self.producer;
        if let Some(mode) = var("KAFKA_AUTHENTICATION_MODE") {
            producer.authentication_mode = Some(mode.parse()?);
        }
        if let Some(protocol) = var("KAFKA_PROTOCOL") {
            producer.protocol = Some(protocol.parse()?);
        }
        if let Some(username) = var("KAFKA_USERNAME") {
            producer.username = Some(username);
        }
        if let Some(password) = var("KAFKA_PASSWORD") {
            producer.password = Some(password);
        }
        if let Some(location) = var("KAFKA_SSL_CA_LOCATION") {
            producer.ssl_ca_location = Some(location);
        }
        if let Some(codec) = var("KAFKA_COMPRESSION_TYPE") {
            producer.compression_type = Some(codec.parse()?);
        }
        if let Some(size) = var("KAFKA_BATCH_SIZE") {
            producer.batch_size = Some(parse("KAFKA_BATCH_SIZE", &size)?);
        }
        if let Some(enabled) = var("KAFKA_ENABLE_IDEMPOTENCE") {
            producer.enable_idempotence = Some(parse("KAFKA_ENABLE_IDEMPOTENCE", &enabled)?);
        }

        Ok(())
    }

    /// Host-level option layer
    pub fn host_options(&self) -> &dyn ProducerOptions {
        &self.producer
    }

    /// Effective options for consumer connections: host defaults only
    pub fn consumer_options(&self) -> EffectiveProducerOptions {
        MergedProducerOptions::new(vec![Some(self.host_options())]).resolve()
    }

    /// Effective options for an output binding, by topic
    pub fn output_options(&self, topic: &str) -> Option<EffectiveProducerOptions> {
        self.outputs
            .iter()
            .find(|output| output.topic == topic)
            .map(|output| output.effective_options(self.host_options()))
    }

    /// Validated consumer configuration
    pub fn consumer_config(&self) -> Result<&ConsumerConfig, ConfigError> {
        self.consumer.validate()?;
        Ok(&self.consumer)
    }
}

fn parse<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::out_of_range(name, value, "could not parse value"))
}
