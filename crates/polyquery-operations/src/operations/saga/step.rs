use std::fmt;
use std::marker::PhantomData;

use polyquery_core::{QueryError, Rows};
use polyquery_saga::{Compensation, SagaStep};
use polyquery_strategy::QueryStrategy;
use serde::Serialize;
use tracing::{debug, warn};

use super::context::QueryContext;
use crate::operations::generation::{generate_compensation, generate_query};
use crate::operations::query::check_query;
use crate::traits::QueryGenerator;

/// Lifecycle of a step: `Pending -> Generated -> Executed -> Compensated`,
/// or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStepStatus {
    Pending,
    Generated,
    Executed,
    Compensated,
    Failed,
}

impl fmt::Display for QueryStepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Generated => "generated",
            Self::Executed => "executed",
            Self::Compensated => "compensated",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// One question answered against one backend inside a saga.
///
/// The forward query is recorded once generated; the compensation query is
/// recorded only after the forward query executed.
pub struct QueryStep<G> {
    position: usize,
    question: String,
    backend: String,
    forward_query: Option<String>,
    compensation_query: Option<String>,
    status: QueryStepStatus,
    _marker: PhantomData<G>,
}

impl<G> QueryStep<G> {
    pub fn new(position: usize, question: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            position,
            question: question.into(),
            backend: backend.into(),
            forward_query: None,
            compensation_query: None,
            status: QueryStepStatus::Pending,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn backend(&self) -> &str {
        &self.backend
    }

    #[must_use]
    pub fn forward_query(&self) -> Option<&str> {
        self.forward_query.as_deref()
    }

    #[must_use]
    pub fn compensation_query(&self) -> Option<&str> {
        self.compensation_query.as_deref()
    }

    #[must_use]
    pub fn status(&self) -> QueryStepStatus {
        self.status
    }
}

impl<G> QueryStep<G>
where
    G: QueryGenerator,
{
    fn run(&mut self, ctx: &QueryContext<G>) -> Result<Rows, QueryError> {
        let strategy = ctx.registry().resolve(&self.backend)?;

        let forward = generate_query(strategy, ctx.generator(), &self.question)?;
        self.forward_query = Some(forward.clone());
        self.status = QueryStepStatus::Generated;

        check_query(strategy, &forward, ctx.access())?;
        let rows = strategy.execute_query(&forward)?;
        self.status = QueryStepStatus::Executed;

        self.compensation_query =
            match generate_compensation(strategy, ctx.generator(), &forward) {
                Ok(compensation) if !compensation.is_empty() => Some(compensation),
                Ok(_) => {
                    warn!(
                        position = self.position,
                        backend = %self.backend,
                        "empty compensation generated; step cannot be rolled back"
                    );
                    None
                }
                Err(err) => {
                    warn!(
                        position = self.position,
                        backend = %self.backend,
                        error = %err,
                        "compensation generation failed; step cannot be rolled back"
                    );
                    None
                }
            };

        Ok(rows)
    }
}

impl<G> SagaStep for QueryStep<G>
where
    G: QueryGenerator,
{
    type Output = Rows;
    type Context = QueryContext<G>;
    type Error = QueryError;

    fn name(&self) -> String {
        format!("step {} ({})", self.position, self.backend)
    }

    fn execute(&mut self, ctx: &Self::Context) -> Result<Self::Output, Self::Error> {
        let result = self.run(ctx);
        if result.is_err() {
            self.status = QueryStepStatus::Failed;
        }
        result
    }

    fn compensate(&mut self, ctx: &Self::Context) -> Result<Compensation, Self::Error> {
        let Some(compensation) = self.compensation_query.as_deref() else {
            return Ok(Compensation::Skipped);
        };
        if compensation.trim().is_empty() {
            return Ok(Compensation::Skipped);
        }

        let strategy = ctx.registry().resolve(&self.backend)?;
        // Compensations are generated text too; they get the same access
        // check as the forward query.
        check_query(strategy, compensation, ctx.access())?;
        debug!(
            position = self.position,
            backend = strategy.backend(),
            query = %compensation,
            "running compensation"
        );
        strategy.execute_query(compensation)?;
        self.status = QueryStepStatus::Compensated;
        Ok(Compensation::Applied)
    }

    fn compensation_description(&self) -> String {
        match &self.compensation_query {
            Some(query) => format!("run '{query}' on {}", self.backend),
            None => format!("nothing recorded to undo on {}", self.backend),
        }
    }
}
