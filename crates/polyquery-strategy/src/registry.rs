use indexmap::IndexMap;
use polyquery_core::{QueryError, QueryIntent, Result, Rows, StrategyInfo};
use tracing::debug;

use crate::document::DocumentStrategy;
use crate::relational::RelationalStrategy;
use crate::strategy::QueryStrategy;

/// The closed set of backend strategies.
#[derive(Debug, Clone)]
pub enum Strategy {
    Relational(RelationalStrategy),
    Document(DocumentStrategy),
}

impl Strategy {
    fn inner(&self) -> &dyn QueryStrategy {
        match self {
            Self::Relational(strategy) => strategy,
            Self::Document(strategy) => strategy,
        }
    }
}

impl QueryStrategy for Strategy {
    fn info(&self) -> StrategyInfo {
        self.inner().info()
    }

    fn schema_representation(&self) -> String {
        self.inner().schema_representation()
    }

    fn build_prompt(&self, question: &str, schema: &str) -> String {
        self.inner().build_prompt(question, schema)
    }

    fn clean_query(&self, raw: &str) -> String {
        self.inner().clean_query(raw)
    }

    fn is_safe(&self, query: &str) -> bool {
        self.inner().is_safe(query)
    }

    fn classify(&self, query: &str) -> QueryIntent {
        self.inner().classify(query)
    }

    fn execute_query(&self, query: &str) -> Result<Rows> {
        self.inner().execute_query(query)
    }
}

impl From<RelationalStrategy> for Strategy {
    fn from(strategy: RelationalStrategy) -> Self {
        Self::Relational(strategy)
    }
}

impl From<DocumentStrategy> for Strategy {
    fn from(strategy: DocumentStrategy) -> Self {
        Self::Document(strategy)
    }
}

/// Backend identifier to strategy map, built once at startup.
///
/// Lookups are case-insensitive. The registry is never mutated after it has
/// been shared, so it can sit behind an `Arc` across threads.
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    strategies: IndexMap<&'static str, Strategy>,
}

impl StrategyRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a strategy under its own backend identifier, replacing any
    /// earlier one for the same backend.
    #[must_use]
    pub fn with_strategy(mut self, strategy: impl Into<Strategy>) -> Self {
        let strategy = strategy.into();
        let backend = strategy.backend();
        debug!(backend, "registering strategy");
        self.strategies.insert(backend, strategy);
        self
    }

    #[must_use]
    pub fn get(&self, backend: &str) -> Option<&Strategy> {
        let key = backend.trim().to_ascii_lowercase();
        self.strategies.get(key.as_str())
    }

    /// # Errors
    ///
    /// Returns `StrategyNotFound` if no strategy is registered for `backend`.
    pub fn resolve(&self, backend: &str) -> Result<&Strategy> {
        self.get(backend)
            .ok_or_else(|| QueryError::strategy_not_found(backend))
    }

    /// Capability records in registration order.
    pub fn infos(&self) -> impl Iterator<Item = StrategyInfo> + '_ {
        self.strategies.values().map(|strategy| strategy.info())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}
