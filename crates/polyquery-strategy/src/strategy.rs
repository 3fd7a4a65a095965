use polyquery_core::{QueryIntent, Result, Rows, StrategyInfo};

use crate::clean::strip_generation_artifacts;

/// Backend-specific handling of generated queries.
pub trait QueryStrategy {
    fn info(&self) -> StrategyInfo;

    fn backend(&self) -> &'static str {
        self.info().backend
    }

    /// Summary of the backend's schema for the generator prompt.
    ///
    /// Never fails: introspection errors degrade to a placeholder text.
    fn schema_representation(&self) -> String;

    fn build_prompt(&self, question: &str, schema: &str) -> String;

    fn clean_query(&self, raw: &str) -> String {
        strip_generation_artifacts(raw)
    }

    fn is_safe(&self, query: &str) -> bool;

    fn classify(&self, query: &str) -> QueryIntent;

    /// Runs a cleaned query against the backend.
    ///
    /// # Errors
    ///
    /// Fails with `UnsafeQuery` if the query does not pass [`Self::is_safe`],
    /// and with the driver's classified error if execution fails.
    fn execute_query(&self, query: &str) -> Result<Rows>;
}
