//! Error types shared by the option resolver, the commit strategies and the
//! broker handle boundary.

use thiserror::Error;

/// Result type for binding setup
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Binding setup errors. These are fatal to setup and never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required input was absent
    #[error("invalid argument: {name} must be provided")]
    InvalidArgument {
        /// Name of the missing argument
        name: &'static str,
    },

    /// A value was present but outside the recognized set
    #[error("{name} out of range: {message}: {value}")]
    OutOfRange {
        /// Name of the argument
        name: &'static str,
        /// The offending value, verbatim
        value: String,
        /// Human readable description
        message: String,
    },

    /// Configuration failed validation
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Settings could not be read or parsed
    #[error("failed to load settings: {0}")]
    Load(String),
}

impl ConfigError {
    pub(crate) fn out_of_range(
        name: &'static str,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ConfigError::OutOfRange {
            name,
            value: value.into(),
            message: message.into(),
        }
    }
}

/// Errors reported by a broker consumer handle.
///
/// Commit strategies hand these back to their caller untouched.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The broker rejected the request
    #[error("broker error {code}: {message}")]
    Broker {
        /// Broker or client error code
        code: i32,
        /// Error description
        message: String,
    },

    /// An offset could not be expressed to the broker client
    #[error("invalid offset {offset} for {topic} [{partition}]")]
    InvalidOffset {
        /// Topic name
        topic: String,
        /// Partition number
        partition: i32,
        /// Rejected offset
        offset: i64,
    },

    /// The consumer behind the handle has been closed
    #[error("consumer gone")]
    Gone,

    /// Kafka client errors
    #[cfg(feature = "kafka")]
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_names_the_value() {
        let err = ConfigError::out_of_range("strategy", "exactly-once", "Unknown commit strategy");
        assert!(err.to_string().contains("exactly-once"));
        assert!(err.to_string().contains("strategy"));
    }

    #[test]
    fn invalid_argument_names_the_argument() {
        let err = ConfigError::InvalidArgument { name: "providers" };
        assert_eq!(err.to_string(), "invalid argument: providers must be provided");
    }
}
