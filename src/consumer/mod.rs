//! Offset commit coordination for Kafka consumers
//!
//! This module provides:
//! - A [`ConsumerHandle`] boundary over the broker client
//! - Pluggable [`CommitStrategy`] implementations (`sync`, `async`)
//! - A name-keyed [`CommitStrategyFactory`]
//! - Per-partition offset bookkeeping
//! - A [`TopicBinding`] that runs handler code and commits what succeeded
//!
//! # Example
//!
//! ```no_run
//! use kafka_bindings::consumer::{
//!     ConsumerConfig, DefaultCommitStrategyFactory, EventHandler, RawEventRecord, TopicBinding,
//! };
//! # use kafka_bindings::consumer::ConsumerHandle;
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! #[async_trait]
//! impl EventHandler<RawEventRecord> for Printer {
//!     type Error = std::io::Error;
//!
//!     async fn handle(&self, record: &RawEventRecord) -> Result<(), Self::Error> {
//!         println!("{} / {} / {}", record.topic(), record.partition(), record.offset());
//!         Ok(())
//!     }
//! }
//!
//! # async fn example(consumer: Arc<dyn ConsumerHandle>) -> anyhow::Result<()> {
//! let config = ConsumerConfig::builder()
//!     .brokers("localhost:9092")
//!     .group_id("orders-consumer")
//!     .topics(vec!["orders".to_string()])
//!     .commit_strategy("sync")
//!     .build();
//!
//! let factory = DefaultCommitStrategyFactory::new();
//! let span = tracing::info_span!("orders");
//! let binding = TopicBinding::from_config(consumer, &config, &factory, span)?;
//!
//! let batch = binding.poll_batch(config.max_batch_size, config.poll_timeout())?;
//! binding.process_batch(&batch, &Printer).await?;
//! # Ok(())
//! # }
//! ```

pub mod binding;
pub mod commit;
pub mod config;
pub mod error;
pub mod factory;
pub mod handle;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod offset_manager;

pub use binding::{EventHandler, RawEventRecord, TopicBinding};
pub use commit::{AsyncCommitStrategy, CommitOutcome, CommitStrategy, SyncCommitStrategy};
pub use config::{ConsumerConfig, ConsumerConfigBuilder};
pub use error::{ConsumerError, ConsumerResult};
pub use factory::{CommitStrategyFactory, DefaultCommitStrategyFactory, StrategyConstructor};
pub use handle::{
    CommitMode, CommitReportSink, CommitReportSinks, ConsumerHandle, TopicPartition,
    TopicPartitionOffset,
};
#[cfg(feature = "kafka")]
pub use kafka::{CommitReportContext, KafkaConsumerHandle};
pub use offset_manager::OffsetManager;
