//! Commit strategy selection by name

use super::commit::{AsyncCommitStrategy, CommitStrategy, SyncCommitStrategy, ASYNC, SYNC};
use super::handle::ConsumerHandle;
use crate::error::ConfigError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::Span;

/// Constructor registered under a strategy name
pub type StrategyConstructor =
    Box<dyn Fn(Arc<dyn ConsumerHandle>, Span) -> Box<dyn CommitStrategy> + Send + Sync>;

/// Produces a commit strategy from its configured name.
///
/// Bindings hold a `dyn CommitStrategyFactory`, so a host can replace the
/// whole name-to-strategy mapping.
pub trait CommitStrategyFactory: Send + Sync {
    /// Create the strategy named `strategy`, bound to `consumer`.
    ///
    /// An absent name is an invalid argument; an unrecognized one is out of
    /// range. Creating a strategy performs no network I/O.
    fn create(
        &self,
        strategy: Option<&str>,
        consumer: Arc<dyn ConsumerHandle>,
        span: Span,
    ) -> Result<Box<dyn CommitStrategy>, ConfigError>;
}

/// Registry of strategy constructors keyed by lowercase name.
///
/// Starts out with `sync` and `async`.
pub struct DefaultCommitStrategyFactory {
    registry: HashMap<String, StrategyConstructor>,
}

impl DefaultCommitStrategyFactory {
    /// Factory with the built-in strategies
    pub fn new() -> Self {
        Self {
            registry: HashMap::new(),
        }
        .with_strategy(SYNC, |consumer, span| {
            Box::new(SyncCommitStrategy::new(consumer, span))
        })
        .with_strategy(ASYNC, |consumer, span| {
            Box::new(AsyncCommitStrategy::new(consumer, span))
        })
    }

    /// Register a strategy, replacing any existing one with the same name
    pub fn with_strategy<F>(mut self, name: &str, constructor: F) -> Self
    where
        F: Fn(Arc<dyn ConsumerHandle>, Span) -> Box<dyn CommitStrategy> + Send + Sync + 'static,
    {
        self.registry.insert(name.to_lowercase(), Box::new(constructor));
        self
    }

    /// Whether `name` resolves to a registered strategy
    pub fn is_registered(&self, name: &str) -> bool {
        self.registry.contains_key(&name.to_lowercase())
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.registry.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for DefaultCommitStrategyFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DefaultCommitStrategyFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultCommitStrategyFactory")
            .field("strategies", &self.names())
            .finish()
    }
}

impl CommitStrategyFactory for DefaultCommitStrategyFactory {
    fn create(
        &self,
        strategy: Option<&str>,
        consumer: Arc<dyn ConsumerHandle>,
        span: Span,
    ) -> Result<Box<dyn CommitStrategy>, ConfigError> {
        let name = strategy.ok_or(ConfigError::InvalidArgument { name: "strategy" })?;

        let constructor = self.registry.get(&name.to_lowercase()).ok_or_else(|| {
            ConfigError::out_of_range("strategy", name, "Unknown commit strategy")
        })?;

        Ok(constructor(consumer, span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered() {
        let factory = DefaultCommitStrategyFactory::new();
        assert!(factory.is_registered("sync"));
        assert!(factory.is_registered("ASYNC"));
        assert!(!factory.is_registered("exactly-once"));
        assert_eq!(factory.names(), vec!["async", "sync"]);
    }

    #[test]
    fn registration_is_case_insensitive() {
        let factory = DefaultCommitStrategyFactory::new()
            .with_strategy("Batched", |consumer, span| {
                Box::new(SyncCommitStrategy::new(consumer, span))
            });
        assert!(factory.is_registered("batched"));
        assert!(factory.is_registered("BATCHED"));
    }
}
