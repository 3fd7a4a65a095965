use std::sync::Arc;

use polyquery_core::{AccessMode, ErrorKind, QueryError, QueryIntent, Result, Rows};
use polyquery_strategy::{QueryStrategy, StrategyRegistry};
use serde::Serialize;
use tracing::info;

use super::generation::generate_query;
use crate::traits::QueryGenerator;

#[derive(Debug, Clone, Default)]
pub struct QueryInput {
    pub question: String,
    /// Backend identifier; the operation's default when `None`.
    pub backend: Option<String>,
}

impl QueryInput {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            backend: None,
        }
    }

    #[must_use]
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryOutput {
    pub backend: &'static str,
    pub query: String,
    pub intent: QueryIntent,
    pub rows: Rows,
}

/// Answers one question against one backend.
pub struct QueryOperation<G> {
    registry: Arc<StrategyRegistry>,
    generator: Arc<G>,
    default_backend: String,
}

impl<G> QueryOperation<G>
where
    G: QueryGenerator,
{
    pub fn new(
        registry: Arc<StrategyRegistry>,
        generator: Arc<G>,
        default_backend: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            generator,
            default_backend: default_backend.into(),
        }
    }

    /// Runs a question that must classify as a read.
    ///
    /// # Errors
    ///
    /// Fails with `UnsupportedOperation` before execution if the generated
    /// query writes, and otherwise as [`Self::execute`] does.
    pub fn read(&self, input: &QueryInput) -> Result<QueryOutput> {
        self.execute(input, AccessMode::ReadOnly)
    }

    /// Runs a question that must classify as a write.
    ///
    /// # Errors
    ///
    /// Fails with `UnsupportedOperation` before execution if the generated
    /// query only reads, and otherwise as [`Self::execute`] does.
    pub fn write(&self, input: &QueryInput) -> Result<QueryOutput> {
        self.execute(input, AccessMode::WriteOnly)
    }

    /// # Errors
    ///
    /// Returns `StrategyNotFound` for an unknown backend, `LlmError` if
    /// generation fails, `UnsafeQuery` if the generated query is rejected,
    /// `UnsupportedOperation` if `access` forbids its intent, and the
    /// backend's error if execution fails.
    pub fn execute(&self, input: &QueryInput, access: AccessMode) -> Result<QueryOutput> {
        let backend = input.backend.as_deref().unwrap_or(&self.default_backend);
        let strategy = self.registry.resolve(backend)?;

        let query = generate_query(strategy, self.generator.as_ref(), &input.question)?;
        let intent = check_query(strategy, &query, access)?;

        info!(backend = strategy.backend(), %intent, "executing generated query");
        let rows = strategy.execute_query(&query)?;

        Ok(QueryOutput {
            backend: strategy.backend(),
            query,
            intent,
            rows,
        })
    }
}

/// Applies the safety policy and the caller's access mode to a generated
/// query.
pub(crate) fn check_query<S>(strategy: &S, query: &str, access: AccessMode) -> Result<QueryIntent>
where
    S: QueryStrategy + ?Sized,
{
    if !strategy.is_safe(query) {
        return Err(QueryError::unsafe_query(strategy.backend(), query));
    }

    let intent = strategy.classify(query);
    if !access.permits(intent) {
        let message = match intent {
            QueryIntent::Write => "write queries are not allowed here; use the write entry point",
            QueryIntent::Read => "read queries are not allowed here; use the query entry point",
        };
        return Err(QueryError::new(ErrorKind::UnsupportedOperation, message)
            .with_backend(strategy.backend())
            .with_query(query));
    }
    Ok(intent)
}

#[cfg(test)]
mod tests {
    use polyquery_core::{MONGODB, POSTGRES, single_row};
    use polyquery_strategy::{DocumentStrategy, RelationalStrategy};
    use serde_json::json;

    use super::*;
    use crate::mocks::{MockDocumentDriver, MockGenerator, MockRelationalDriver};

    struct Fixture {
        relational: Arc<MockRelationalDriver>,
        document: Arc<MockDocumentDriver>,
        generator: Arc<MockGenerator>,
    }

    impl Fixture {
        fn new(generator: MockGenerator) -> Self {
            let row = json!({"name": "Ada"}).as_object().cloned().expect("object");
            Self {
                relational: Arc::new(MockRelationalDriver::new().with_rows(vec![row])),
                document: Arc::new(MockDocumentDriver::new()),
                generator: Arc::new(generator),
            }
        }

        fn operation(&self) -> QueryOperation<MockGenerator> {
            let registry = StrategyRegistry::new()
                .with_strategy(RelationalStrategy::new(self.relational.clone()))
                .with_strategy(DocumentStrategy::new(self.document.clone()));
            QueryOperation::new(Arc::new(registry), self.generator.clone(), POSTGRES)
        }
    }

    #[test]
    fn read_uses_default_backend() {
        let fixture = Fixture::new(MockGenerator::new().then_return("SELECT name FROM users"));

        let output = fixture
            .operation()
            .read(&QueryInput::new("names?"))
            .expect("read should succeed");

        assert_eq!(output.backend, POSTGRES);
        assert_eq!(output.intent, QueryIntent::Read);
        assert_eq!(output.rows.len(), 1);
        assert_eq!(fixture.relational.statements(), vec!["SELECT name FROM users"]);
    }

    #[test]
    fn read_rejects_write_before_execution() {
        let fixture =
            Fixture::new(MockGenerator::new().then_return("DELETE FROM users WHERE id = 1"));

        let err = fixture
            .operation()
            .read(&QueryInput::new("remove user 1"))
            .expect_err("write on read path");

        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
        assert!(fixture.relational.statements().is_empty());
    }

    #[test]
    fn write_rejects_read_before_execution() {
        let fixture = Fixture::new(MockGenerator::new().then_return("store.users.find({})"));

        let err = fixture
            .operation()
            .write(&QueryInput::new("list users").with_backend(MONGODB))
            .expect_err("read on write path");

        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
        assert!(fixture.document.operations().is_empty());
    }

    #[test]
    fn write_runs_document_insert() {
        let fixture =
            Fixture::new(MockGenerator::new().then_return(r#"store.users.insertOne({name: "Ada"})"#));

        let output = fixture
            .operation()
            .write(&QueryInput::new("add Ada").with_backend("MongoDB"))
            .expect("write should succeed");

        assert_eq!(output.backend, MONGODB);
        assert_eq!(output.intent, QueryIntent::Write);
        assert_eq!(fixture.document.operations(), vec!["insertOne users"]);
    }

    #[test]
    fn unsafe_generation_is_rejected() {
        let fixture = Fixture::new(MockGenerator::new().then_return("DROP TABLE users"));

        let err = fixture
            .operation()
            .write(&QueryInput::new("wipe everything"))
            .expect_err("drop is unsafe");

        assert_eq!(err.kind(), ErrorKind::UnsafeQuery);
        assert_eq!(err.query(), Some("DROP TABLE users"));
        assert!(fixture.relational.statements().is_empty());
    }

    #[test]
    fn unknown_backend_is_reported_before_generation() {
        let fixture = Fixture::new(MockGenerator::new());

        let err = fixture
            .operation()
            .read(&QueryInput::new("anything").with_backend("oracle"))
            .expect_err("oracle is unknown");

        assert_eq!(err.kind(), ErrorKind::StrategyNotFound);
        assert!(fixture.generator.prompts().is_empty());
    }

    #[test]
    fn write_reports_affected_rows() {
        let fixture =
            Fixture::new(MockGenerator::new().then_return("UPDATE users SET name = 'A' WHERE id = 9"));

        let output = fixture
            .operation()
            .write(&QueryInput::new("rename user 9"))
            .expect("write should succeed");

        assert_eq!(output.rows, vec![single_row("rows_affected", 1)]);
    }
}
