//! Layered option resolution
//!
//! For each setting the sources are scanned in precedence order and the first
//! one that sets it wins. When none does, the setting's documented default
//! applies. Absent sources are skipped and no source is ever mutated.
//!
//! Each setting is looked up through its own accessor on every source.

use super::{BrokerAuthenticationMode, BrokerProtocol, MessageCompressionType, ProducerOptions};
use crate::error::ConfigError;
use serde::Serialize;

/// Default maximum number of messages batched in one message set
pub const DEFAULT_BATCH_SIZE: i32 = 10_000;
/// Default compression level; `-1` leaves the codec default in place
pub const DEFAULT_COMPRESSION_LEVEL: i32 = -1;
/// Default idempotence
pub const DEFAULT_ENABLE_IDEMPOTENCE: bool = false;
/// Default local message timeout
pub const DEFAULT_MESSAGE_TIMEOUT_MS: i32 = 300_000;
/// Default maximum transmit message size
pub const DEFAULT_MAX_MESSAGE_BYTES: i32 = 1_000_000;
/// Default retry count
pub const DEFAULT_MAX_RETRIES: i32 = 2;
/// Default metadata cache max age
pub const DEFAULT_METADATA_MAX_AGE_MS: i32 = 180_000;
/// Default produce request ack timeout
pub const DEFAULT_REQUEST_TIMEOUT_MS: i32 = 5_000;
/// Default TCP keepalive
pub const DEFAULT_SOCKET_KEEPALIVE_ENABLE: bool = true;

/// Ordered view over partial option sources, highest precedence first
pub struct MergedProducerOptions<'a> {
    sources: Vec<Option<&'a dyn ProducerOptions>>,
}

impl<'a> MergedProducerOptions<'a> {
    /// Merge the given sources. `None` entries are skipped.
    pub fn new(sources: Vec<Option<&'a dyn ProducerOptions>>) -> Self {
        Self { sources }
    }

    /// Merge a source list that may itself be absent
    pub fn try_new(
        sources: Option<Vec<Option<&'a dyn ProducerOptions>>>,
    ) -> Result<Self, ConfigError> {
        sources
            .map(Self::new)
            .ok_or(ConfigError::InvalidArgument { name: "providers" })
    }

    fn first_set<T>(&self, get: impl Fn(&'a dyn ProducerOptions) -> Option<T>) -> Option<T> {
        self.sources.iter().flatten().find_map(|source| get(*source))
    }

    /// Collapse into concrete values
    pub fn resolve(&self) -> EffectiveProducerOptions {
        EffectiveProducerOptions {
            authentication_mode: self.first_set(|s| s.authentication_mode()),
            batch_size: self.first_set(|s| s.batch_size()).unwrap_or(DEFAULT_BATCH_SIZE),
            compression_level: self
                .first_set(|s| s.compression_level())
                .unwrap_or(DEFAULT_COMPRESSION_LEVEL),
            compression_type: self.first_set(|s| s.compression_type()),
            enable_idempotence: self
                .first_set(|s| s.enable_idempotence())
                .unwrap_or(DEFAULT_ENABLE_IDEMPOTENCE),
            message_timeout_ms: self
                .first_set(|s| s.message_timeout_ms())
                .unwrap_or(DEFAULT_MESSAGE_TIMEOUT_MS),
            max_message_bytes: self
                .first_set(|s| s.max_message_bytes())
                .unwrap_or(DEFAULT_MAX_MESSAGE_BYTES),
            max_retries: self.first_set(|s| s.max_retries()).unwrap_or(DEFAULT_MAX_RETRIES),
            metadata_max_age_ms: self
                .first_set(|s| s.metadata_max_age_ms())
                .unwrap_or(DEFAULT_METADATA_MAX_AGE_MS),
            password: self.first_set(|s| s.password()).map(str::to_owned),
            protocol: self.first_set(|s| s.protocol()),
            request_timeout_ms: self
                .first_set(|s| s.request_timeout_ms())
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
            socket_keepalive_enable: self
                .first_set(|s| s.socket_keepalive_enable())
                .unwrap_or(DEFAULT_SOCKET_KEEPALIVE_ENABLE),
            ssl_ca_location: self.first_set(|s| s.ssl_ca_location()).map(str::to_owned),
            ssl_certificate_location: self
                .first_set(|s| s.ssl_certificate_location())
                .map(str::to_owned),
            ssl_key_location: self.first_set(|s| s.ssl_key_location()).map(str::to_owned),
            ssl_key_password: self.first_set(|s| s.ssl_key_password()).map(str::to_owned),
            username: self.first_set(|s| s.username()).map(str::to_owned),
        }
    }
}

/// A merged view is itself a source, so merges nest. Settings with a
/// documented default always report a value.
impl ProducerOptions for MergedProducerOptions<'_> {
    fn authentication_mode(&self) -> Option<BrokerAuthenticationMode> {
        self.first_set(|s| s.authentication_mode())
    }
    fn batch_size(&self) -> Option<i32> {
        Some(self.first_set(|s| s.batch_size()).unwrap_or(DEFAULT_BATCH_SIZE))
    }
    fn compression_level(&self) -> Option<i32> {
        Some(
            self.first_set(|s| s.compression_level())
                .unwrap_or(DEFAULT_COMPRESSION_LEVEL),
        )
    }
    fn compression_type(&self) -> Option<MessageCompressionType> {
        self.first_set(|s| s.compression_type())
    }
    fn enable_idempotence(&self) -> Option<bool> {
        Some(
            self.first_set(|s| s.enable_idempotence())
                .unwrap_or(DEFAULT_ENABLE_IDEMPOTENCE),
        )
    }
    fn message_timeout_ms(&self) -> Option<i32> {
        Some(
            self.first_set(|s| s.message_timeout_ms())
                .unwrap_or(DEFAULT_MESSAGE_TIMEOUT_MS),
        )
    }
    fn max_message_bytes(&self) -> Option<i32> {
        Some(
            self.first_set(|s| s.max_message_bytes())
                .unwrap_or(DEFAULT_MAX_MESSAGE_BYTES),
        )
    }
    fn max_retries(&self) -> Option<i32> {
        Some(self.first_set(|s| s.max_retries()).unwrap_or(DEFAULT_MAX_RETRIES))
    }
    fn metadata_max_age_ms(&self) -> Option<i32> {
        Some(
            self.first_set(|s| s.metadata_max_age_ms())
                .unwrap_or(DEFAULT_METADATA_MAX_AGE_MS),
        )
    }
    fn password(&self) -> Option<&str> {
        self.first_set(|s| s.password())
    }
    fn protocol(&self) -> Option<BrokerProtocol> {
        self.first_set(|s| s.protocol())
    }
    fn request_timeout_ms(&self) -> Option<i32> {
        Some(
            self.first_set(|s| s.request_timeout_ms())
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
        )
    }
    fn socket_keepalive_enable(&self) -> Option<bool> {
        Some(
            self.first_set(|s| s.socket_keepalive_enable())
                .unwrap_or(DEFAULT_SOCKET_KEEPALIVE_ENABLE),
        )
    }
    fn ssl_ca_location(&self) -> Option<&str> {
        self.first_set(|s| s.ssl_ca_location())
    }
    fn ssl_certificate_location(&self) -> Option<&str> {
        self.first_set(|s| s.ssl_certificate_location())
    }
    fn ssl_key_location(&self) -> Option<&str> {
        self.first_set(|s| s.ssl_key_location())
    }
    fn ssl_key_password(&self) -> Option<&str> {
        self.first_set(|s| s.ssl_key_password())
    }
    fn username(&self) -> Option<&str> {
        self.first_set(|s| s.username())
    }
}

/// Resolve a source list, failing if the list itself is absent
pub fn resolve(
    sources: Option<&[Option<&dyn ProducerOptions>]>,
) -> Result<EffectiveProducerOptions, ConfigError> {
    let sources = sources.ok_or(ConfigError::InvalidArgument { name: "providers" })?;
    Ok(MergedProducerOptions::new(sources.to_vec()).resolve())
}

/// Final settings used to construct a broker client.
///
/// Enum settings and credentials stay `None` when no source sets them;
/// the client library's own default then applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveProducerOptions {
    /// SASL mechanism
    pub authentication_mode: Option<BrokerAuthenticationMode>,
    /// Maximum messages batched into one request
    pub batch_size: i32,
    /// Codec-specific compression level, -1 for the codec default
    pub compression_level: i32,
    /// Compression codec
    pub compression_type: Option<MessageCompressionType>,
    /// Produce each message exactly once and in order
    pub enable_idempotence: bool,
    /// Local delivery timeout
    pub message_timeout_ms: i32,
    /// Maximum request size
    pub max_message_bytes: i32,
    /// Send retries before a message fails
    pub max_retries: i32,
    /// Metadata refresh interval
    pub metadata_max_age_ms: i32,
    #[serde(skip_serializing)]
    /// SASL password
    pub password: Option<String>,
    /// Security protocol
    pub protocol: Option<BrokerProtocol>,
    /// Broker acknowledgment timeout
    pub request_timeout_ms: i32,
    /// TCP keepalive on broker sockets
    pub socket_keepalive_enable: bool,
    /// CA certificate path
    pub ssl_ca_location: Option<String>,
    /// Client certificate path
    pub ssl_certificate_location: Option<String>,
    /// Client private key path
    pub ssl_key_location: Option<String>,
    #[serde(skip_serializing)]
    /// Private key passphrase
    pub ssl_key_password: Option<String>,
    /// SASL username
    pub username: Option<String>,
}

impl Default for EffectiveProducerOptions {
    fn default() -> Self {
        MergedProducerOptions::new(Vec::new()).resolve()
    }
}
