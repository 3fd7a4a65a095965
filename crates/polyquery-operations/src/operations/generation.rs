use polyquery_core::Result;
use polyquery_strategy::QueryStrategy;
use tracing::debug;

use crate::traits::QueryGenerator;

/// The question asked to obtain a compensation for `forward`.
#[must_use]
pub fn compensation_question(forward: &str) -> String {
    format!(
        "Generate the compensation (rollback) query for reversing this operation:\n{forward}\nReturn only the query."
    )
}

/// Generates a cleaned query for `question` in the strategy's notation.
///
/// # Errors
///
/// Returns an `LlmError` naming the strategy's backend if generation fails.
pub fn generate_query<S, G>(strategy: &S, generator: &G, question: &str) -> Result<String>
where
    S: QueryStrategy + ?Sized,
    G: QueryGenerator + ?Sized,
{
    let schema = strategy.schema_representation();
    let prompt = strategy.build_prompt(question, &schema);
    let raw = generator
        .generate(&prompt)
        .map_err(|err| err.into_query_error(strategy.backend()))?;
    let query = strategy.clean_query(&raw);
    debug!(backend = strategy.backend(), query = %query, "generated query");
    Ok(query)
}

/// Generates the query that reverses `forward`, through the same prompt
/// path as any other question.
///
/// # Errors
///
/// Returns an `LlmError` if generation fails.
pub fn generate_compensation<S, G>(strategy: &S, generator: &G, forward: &str) -> Result<String>
where
    S: QueryStrategy + ?Sized,
    G: QueryGenerator + ?Sized,
{
    generate_query(strategy, generator, &compensation_question(forward))
}
