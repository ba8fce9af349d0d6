//! Mapping of effective options onto librdkafka configuration properties

use super::EffectiveProducerOptions;
use std::collections::BTreeMap;

/// librdkafka properties keyed by their dotted names
pub type ClientProperties = BTreeMap<&'static str, String>;

impl EffectiveProducerOptions {
    /// Properties that authenticate and secure the connection.
    ///
    /// Shared by producers and consumers.
    pub fn security_properties(&self) -> ClientProperties {
        let mut props = ClientProperties::new();

        if let Some(mode) = self.authentication_mode {
            props.insert("sasl.mechanism", mode.as_librdkafka_value().to_string());
        }
        if let Some(protocol) = self.protocol {
            props.insert("security.protocol", protocol.as_librdkafka_value().to_string());
        }

        let strings = [
            ("sasl.username", &self.username),
            ("sasl.password", &self.password),
            ("ssl.ca.location", &self.ssl_ca_location),
            ("ssl.certificate.location", &self.ssl_certificate_location),
            ("ssl.key.location", &self.ssl_key_location),
            ("ssl.key.password", &self.ssl_key_password),
        ];
        for (key, value) in strings {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                props.insert(key, value.to_string());
            }
        }

        props
    }

    /// Full producer property set
    pub fn producer_properties(&self) -> ClientProperties {
        let mut props = self.security_properties();

        props.insert("batch.num.messages", self.batch_size.to_string());
        props.insert("enable.idempotence", self.enable_idempotence.to_string());
        props.insert("message.timeout.ms", self.message_timeout_ms.to_string());
        props.insert("message.max.bytes", self.max_message_bytes.to_string());
        props.insert("message.send.max.retries", self.max_retries.to_string());
        props.insert("metadata.max.age.ms", self.metadata_max_age_ms.to_string());
        props.insert("request.timeout.ms", self.request_timeout_ms.to_string());
        props.insert("socket.keepalive.enable", self.socket_keepalive_enable.to_string());

        if let Some(codec) = self.compression_type {
            props.insert("compression.codec", codec.as_librdkafka_value().to_string());
        }
        if self.compression_level != super::resolver::DEFAULT_COMPRESSION_LEVEL {
            props.insert("compression.level", self.compression_level.to_string());
        }

        props
    }

    /// Producer client configuration for the given broker list
    #[cfg(feature = "kafka")]
    pub fn to_client_config(&self, brokers: &str) -> rdkafka::ClientConfig {
        let mut client_config = rdkafka::ClientConfig::new();
        client_config.set("bootstrap.servers", brokers);
        for (key, value) in self.producer_properties() {
            client_config.set(key, value);
        }
        client_config
    }
}
