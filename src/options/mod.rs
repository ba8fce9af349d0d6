//! Broker client options
//!
//! Options arrive as partial layers: an output binding's own settings, then
//! host-level defaults. Every setting in a layer is an `Option`, so "unset"
//! stays distinct from an explicit `false` or `0` until
//! [`MergedProducerOptions`] picks the first layer that sets it.

pub mod client;
pub mod resolver;

pub use client::ClientProperties;
pub use resolver::{resolve, EffectiveProducerOptions, MergedProducerOptions};

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// SASL mechanism used to authenticate with the broker (`sasl.mechanism`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum BrokerAuthenticationMode {
    /// Kerberos
    Gssapi,
    /// Username and password in clear text
    Plain,
    /// SCRAM with SHA-256
    ScramSha256,
    /// SCRAM with SHA-512
    ScramSha512,
    /// OAuth bearer tokens
    OAuthBearer,
}

impl BrokerAuthenticationMode {
    /// librdkafka value
    pub fn as_librdkafka_value(&self) -> &'static str {
        match self {
            BrokerAuthenticationMode::Gssapi => "GSSAPI",
            BrokerAuthenticationMode::Plain => "PLAIN",
            BrokerAuthenticationMode::ScramSha256 => "SCRAM-SHA-256",
            BrokerAuthenticationMode::ScramSha512 => "SCRAM-SHA-512",
            BrokerAuthenticationMode::OAuthBearer => "OAUTHBEARER",
        }
    }
}

impl FromStr for BrokerAuthenticationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "gssapi" => Ok(BrokerAuthenticationMode::Gssapi),
            "plain" => Ok(BrokerAuthenticationMode::Plain),
            "scramsha256" => Ok(BrokerAuthenticationMode::ScramSha256),
            "scramsha512" => Ok(BrokerAuthenticationMode::ScramSha512),
            "oauthbearer" => Ok(BrokerAuthenticationMode::OAuthBearer),
            _ => Err(ConfigError::out_of_range(
                "authentication_mode",
                s,
                "Unknown authentication mode",
            )),
        }
    }
}

/// Security protocol used to talk to brokers (`security.protocol`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum BrokerProtocol {
    /// No encryption, no authentication
    Plaintext,
    /// TLS
    Ssl,
    /// SASL without TLS
    SaslPlaintext,
    /// SASL over TLS
    SaslSsl,
}

impl BrokerProtocol {
    /// librdkafka value
    pub fn as_librdkafka_value(&self) -> &'static str {
        match self {
            BrokerProtocol::Plaintext => "plaintext",
            BrokerProtocol::Ssl => "ssl",
            BrokerProtocol::SaslPlaintext => "sasl_plaintext",
            BrokerProtocol::SaslSsl => "sasl_ssl",
        }
    }
}

impl FromStr for BrokerProtocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "plaintext" => Ok(BrokerProtocol::Plaintext),
            "ssl" => Ok(BrokerProtocol::Ssl),
            "saslplaintext" => Ok(BrokerProtocol::SaslPlaintext),
            "saslssl" => Ok(BrokerProtocol::SaslSsl),
            _ => Err(ConfigError::out_of_range("protocol", s, "Unknown broker protocol")),
        }
    }
}

/// Codec for compressing message sets (`compression.codec`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum MessageCompressionType {
    /// No compression
    None,
    /// gzip
    Gzip,
    /// Snappy
    Snappy,
    /// LZ4
    Lz4,
    /// Zstandard
    Zstd,
}

impl MessageCompressionType {
    /// librdkafka value
    pub fn as_librdkafka_value(&self) -> &'static str {
        match self {
            MessageCompressionType::None => "none",
            MessageCompressionType::Gzip => "gzip",
            MessageCompressionType::Snappy => "snappy",
            MessageCompressionType::Lz4 => "lz4",
            MessageCompressionType::Zstd => "zstd",
        }
    }
}

impl FromStr for MessageCompressionType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "none" => Ok(MessageCompressionType::None),
            "gzip" => Ok(MessageCompressionType::Gzip),
            "snappy" => Ok(MessageCompressionType::Snappy),
            "lz4" => Ok(MessageCompressionType::Lz4),
            "zstd" => Ok(MessageCompressionType::Zstd),
            _ => Err(ConfigError::out_of_range(
                "compression_type",
                s,
                "Unknown compression type",
            )),
        }
    }
}

macro_rules! string_conversions {
    ($($ty:ty),*) => {
        $(
            impl TryFrom<String> for $ty {
                type Error = ConfigError;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    value.parse()
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_librdkafka_value())
                }
            }
        )*
    };
}

string_conversions!(BrokerAuthenticationMode, BrokerProtocol, MessageCompressionType);

// "SCRAM-SHA-256", "scram_sha_256" and "ScramSha256" all name the same mechanism.
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// A partial source of producer options.
///
/// `None` means "this source does not set it".
pub trait ProducerOptions {
    /// SASL mechanism
    fn authentication_mode(&self) -> Option<BrokerAuthenticationMode>;
    /// Maximum number of messages batched in one message set
    fn batch_size(&self) -> Option<i32>;
    /// Compression level for the selected codec
    fn compression_level(&self) -> Option<i32>;
    /// Compression codec
    fn compression_type(&self) -> Option<MessageCompressionType>;
    /// Idempotent producer
    fn enable_idempotence(&self) -> Option<bool>;
    /// Local delivery timeout, including retries
    fn message_timeout_ms(&self) -> Option<i32>;
    /// Maximum transmit message size
    fn max_message_bytes(&self) -> Option<i32>;
    /// Retries for a failing send
    fn max_retries(&self) -> Option<i32>;
    /// Metadata cache max age
    fn metadata_max_age_ms(&self) -> Option<i32>;
    /// SASL password
    fn password(&self) -> Option<&str>;
    /// Security protocol
    fn protocol(&self) -> Option<BrokerProtocol>;
    /// Ack timeout of a produce request
    fn request_timeout_ms(&self) -> Option<i32>;
    /// TCP keepalive on broker sockets
    fn socket_keepalive_enable(&self) -> Option<bool>;
    /// CA certificate path
    fn ssl_ca_location(&self) -> Option<&str>;
    /// Client certificate path
    fn ssl_certificate_location(&self) -> Option<&str>;
    /// Client private key path
    fn ssl_key_location(&self) -> Option<&str>;
    /// Client private key password
    fn ssl_key_password(&self) -> Option<&str>;
    /// SASL username
    fn username(&self) -> Option<&str>;
}

/// A deserializable option layer where every setting may be left unset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerOptionsLayer {
    /// SASL mechanism
    pub authentication_mode: Option<BrokerAuthenticationMode>,
    /// Maximum messages batched into one request
    pub batch_size: Option<i32>,
    /// Codec-specific compression level, -1 for the codec default
    pub compression_level: Option<i32>,
    /// Compression codec
    pub compression_type: Option<MessageCompressionType>,
    /// Produce each message exactly once and in order
    pub enable_idempotence: Option<bool>,
    /// Local delivery timeout
    pub message_timeout_ms: Option<i32>,
    /// Maximum request size
    pub max_message_bytes: Option<i32>,
    /// Send retries before a message fails
    pub max_retries: Option<i32>,
    /// Metadata refresh interval
    pub metadata_max_age_ms: Option<i32>,
    /// SASL password
    pub password: Option<String>,
    /// Security protocol
    pub protocol: Option<BrokerProtocol>,
    /// Broker acknowledgment timeout
    pub request_timeout_ms: Option<i32>,
    /// TCP keepalive on broker sockets
    pub socket_keepalive_enable: Option<bool>,
    /// CA certificate path
    pub ssl_ca_location: Option<String>,
    /// Client certificate path
    pub ssl_certificate_location: Option<String>,
    /// Client private key path
    pub ssl_key_location: Option<String>,
    /// Private key passphrase
    pub ssl_key_password: Option<String>,
    /// SASL username
    pub username: Option<String>,
}

impl ProducerOptions for ProducerOptionsLayer {
    fn authentication_mode(&self) -> Option<BrokerAuthenticationMode> {
        self.authentication_mode
    }
    fn batch_size(&self) -> Option<i32> {
        self.batch_size
    }
    fn compression_level(&self) -> Option<i32> {
        self.compression_level
    }
    fn compression_type(&self) -> Option<MessageCompressionType> {
        self.compression_type
    }
    fn enable_idempotence(&self) -> Option<bool> {
        self.enable_idempotence
    }
    fn message_timeout_ms(&self) -> Option<i32> {
        self.message_timeout_ms
    }
    fn max_message_bytes(&self) -> Option<i32> {
        self.max_message_bytes
    }
    fn max_retries(&self) -> Option<i32> {
        self.max_retries
    }
    fn metadata_max_age_ms(&self) -> Option<i32> {
        self.metadata_max_age_ms
    }
    fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
    fn protocol(&self) -> Option<BrokerProtocol> {
        self.protocol
    }
    fn request_timeout_ms(&self) -> Option<i32> {
        self.request_timeout_ms
    }
    fn socket_keepalive_enable(&self) -> Option<bool> {
        self.socket_keepalive_enable
    }
    fn ssl_ca_location(&self) -> Option<&str> {
        self.ssl_ca_location.as_deref()
    }
    fn ssl_certificate_location(&self) -> Option<&str> {
        self.ssl_certificate_location.as_deref()
    }
    fn ssl_key_location(&self) -> Option<&str> {
        self.ssl_key_location.as_deref()
    }
    fn ssl_key_password(&self) -> Option<&str> {
        self.ssl_key_password.as_deref()
    }
    fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }
}

/// An output binding to a topic, carrying its own option layer.
///
/// Its options take precedence over host-level defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputBinding {
    /// Broker list
    pub broker_list: String,
    /// Topic name
    pub topic: String,
    /// Avro schema, when a generic record should be produced
    #[serde(default)]
    pub avro_schema: Option<String>,
    /// Binding-level option overrides
    #[serde(default, flatten)]
    pub options: ProducerOptionsLayer,
}

impl OutputBinding {
    /// Create a binding with no option overrides
    pub fn new(broker_list: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            broker_list: broker_list.into(),
            topic: topic.into(),
            avro_schema: None,
            options: ProducerOptionsLayer::default(),
        }
    }

    /// Resolve this binding's options over the given host-level layer
    pub fn effective_options(&self, host: &dyn ProducerOptions) -> EffectiveProducerOptions {
        MergedProducerOptions::new(vec![Some(&self.options as &dyn ProducerOptions), Some(host)])
            .resolve()
    }
}

impl ProducerOptions for OutputBinding {
    fn authentication_mode(&self) -> Option<BrokerAuthenticationMode> {
        self.options.authentication_mode()
    }
    fn batch_size(&self) -> Option<i32> {
        self.options.batch_size()
    }
    fn compression_level(&self) -> Option<i32> {
        self.options.compression_level()
    }
    fn compression_type(&self) -> Option<MessageCompressionType> {
        self.options.compression_type()
    }
    fn enable_idempotence(&self) -> Option<bool> {
        self.options.enable_idempotence()
    }
    fn message_timeout_ms(&self) -> Option<i32> {
        self.options.message_timeout_ms()
    }
    fn max_message_bytes(&self) -> Option<i32> {
        self.options.max_message_bytes()
    }
    fn max_retries(&self) -> Option<i32> {
        self.options.max_retries()
    }
    fn metadata_max_age_ms(&self) -> Option<i32> {
        self.options.metadata_max_age_ms()
    }
    fn password(&self) -> Option<&str> {
        self.options.password()
    }
    fn protocol(&self) -> Option<BrokerProtocol> {
        self.options.protocol()
    }
    fn request_timeout_ms(&self) -> Option<i32> {
        self.options.request_timeout_ms()
    }
    fn socket_keepalive_enable(&self) -> Option<bool> {
        self.options.socket_keepalive_enable()
    }
    fn ssl_ca_location(&self) -> Option<&str> {
        self.options.ssl_ca_location()
    }
    fn ssl_certificate_location(&self) -> Option<&str> {
        self.options.ssl_certificate_location()
    }
    fn ssl_key_location(&self) -> Option<&str> {
        self.options.ssl_key_location()
    }
    fn ssl_key_password(&self) -> Option<&str> {
        self.options.ssl_key_password()
    }
    fn username(&self) -> Option<&str> {
        self.options.username()
    }
}
