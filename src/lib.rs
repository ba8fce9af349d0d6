//! Kafka trigger and output bindings
//!
//! This library binds handler code to Kafka topics:
//! - [`event`]: consumed records with lazily materialized headers
//! - [`options`]: layered producer options resolved to librdkafka settings
//! - [`consumer`]: commit strategies, the strategy factory and the topic binding
//! - [`settings`]: YAML plus environment configuration
//!
//! # Example
//!
//! ```
//! use kafka_bindings::options::{MergedProducerOptions, ProducerOptions, ProducerOptionsLayer};
//!
//! let binding = ProducerOptionsLayer {
//!     batch_size: Some(500),
//!     ..Default::default()
//! };
//! let host = ProducerOptionsLayer {
//!     batch_size: Some(2000),
//!     enable_idempotence: Some(true),
//!     ..Default::default()
//! };
//!
//! let effective = MergedProducerOptions::new(vec![
//!     Some(&binding as &dyn ProducerOptions),
//!     Some(&host as &dyn ProducerOptions),
//! ])
//! .resolve();
//!
//! assert_eq!(effective.batch_size, 500);
//! assert!(effective.enable_idempotence);
//! assert_eq!(effective.request_timeout_ms, 5000);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]

pub use consumer::{
    CommitStrategy, CommitStrategyFactory, ConsumerHandle, DefaultCommitStrategyFactory,
    TopicBinding, TopicPartitionOffset,
};
pub use error::{BrokerError, ConfigError, Result};
pub use event::{EventData, EventRecord, Header, HeaderCollection, KeylessEventRecord};
pub use options::{EffectiveProducerOptions, MergedProducerOptions, ProducerOptions};
pub use settings::BindingSettings;

/// Offset commit coordination
pub mod consumer;

/// Error types
pub mod error;

/// Consumed records
pub mod event;

/// Producer options
pub mod options;

/// Settings loading
pub mod settings;

/// Initialize tracing with JSON output, filtered by `RUST_LOG`
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}
