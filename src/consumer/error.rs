//! Consumer error types

use crate::error::{BrokerError, ConfigError};
use thiserror::Error;

/// Result type for consumer operations
pub type ConsumerResult<T> = Result<T, ConsumerError>;

/// Errors surfaced by a running binding
#[derive(Error, Debug)]
pub enum ConsumerError {
    /// Setup failed
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A synchronous commit was rejected
    #[error("Commit error: {0}")]
    Commit(#[from] BrokerError),

    /// The handler failed on a record
    #[error("Handler failed at {topic} / {partition} / {offset}: {source}")]
    Handler {
        /// Topic of the failing record
        topic: String,
        /// Partition of the failing record
        partition: i32,
        /// Offset of the failing record
        offset: i64,
        /// Handler error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ConsumerError {
    /// Check if retrying the same batch could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ConsumerError::Config(_) => false,
            ConsumerError::Commit(BrokerError::Gone) => false,
            ConsumerError::Commit(_) => true,
            ConsumerError::Handler { .. } => true,
        }
    }
}
