use std::sync::Arc;

use chrono::{DateTime, Utc};
use polyquery_core::{
    AccessMode, CompensationFailure, ErrorKind, QueryError, Result, RollbackSummary, Rows,
};
use polyquery_saga::{RollbackReport, Saga, SagaError};
use polyquery_strategy::StrategyRegistry;
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use super::context::QueryContext;
use super::step::{QueryStep, QueryStepStatus};
use crate::traits::QueryGenerator;

#[derive(Debug, Clone)]
pub struct StepRequest {
    pub question: String,
    pub backend: String,
}

impl StepRequest {
    pub fn new(backend: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            backend: backend.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SagaInput {
    pub steps: Vec<StepRequest>,
    /// Allows write queries; without it every step must read.
    pub write: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepSummary {
    pub position: usize,
    pub backend: String,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compensation_query: Option<String>,
    pub status: QueryStepStatus,
}

impl<G> From<&QueryStep<G>> for StepSummary {
    fn from(step: &QueryStep<G>) -> Self {
        Self {
            position: step.position(),
            backend: step.backend().to_string(),
            question: step.question().to_string(),
            forward_query: step.forward_query().map(str::to_string),
            compensation_query: step.compensation_query().map(str::to_string),
            status: step.status(),
        }
    }
}

/// Result of a saga whose steps all executed.
#[derive(Debug, Clone, Serialize)]
pub struct SagaOutcome {
    pub saga_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub step_count: usize,
    /// Rows of every step, concatenated in step order.
    pub rows: Rows,
    pub steps: Vec<StepSummary>,
}

/// Runs an ordered list of questions as one saga.
///
/// Rollback is best-effort: compensations are generated, so a step may have
/// none, and a compensation may fail. Either way rollback visits every
/// committed step and the original failure is the one reported.
pub struct SagaOperation<G> {
    registry: Arc<StrategyRegistry>,
    generator: Arc<G>,
}

impl<G> SagaOperation<G>
where
    G: QueryGenerator,
{
    pub fn new(registry: Arc<StrategyRegistry>, generator: Arc<G>) -> Self {
        Self {
            registry,
            generator,
        }
    }

    /// # Errors
    ///
    /// Returns an error naming the failed step's position and backend,
    /// carrying its forward query and the rollback summary. The kind is
    /// `StrategyNotFound` when the step's backend is unknown,
    /// `UnsupportedOperation` when the step's query is not allowed by the
    /// saga's access mode, and `ExecutionError` otherwise.
    pub fn execute(&self, input: &SagaInput) -> Result<SagaOutcome> {
        let access = if input.write {
            AccessMode::ReadWrite
        } else {
            AccessMode::ReadOnly
        };
        let ctx = QueryContext::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.generator),
            access,
        );

        let steps = input
            .steps
            .iter()
            .enumerate()
            .map(|(index, request)| {
                QueryStep::new(index + 1, request.question.clone(), request.backend.clone())
            })
            .collect();
        let mut saga = Saga::from_steps(steps);

        let (result, audit) = saga.execute_with_audit(&ctx);
        info!(saga_id = %saga.id(), state = %saga.state(), "saga finished\n{}", audit.summary());

        match result {
            Ok(outputs) => Ok(SagaOutcome {
                saga_id: saga.id(),
                started_at: saga.started_at(),
                step_count: saga.len(),
                rows: outputs.into_iter().flatten().collect(),
                steps: saga.steps().iter().map(StepSummary::from).collect(),
            }),
            Err(err) => Err(saga_failure(err, saga.steps())),
        }
    }
}

fn saga_failure<G>(err: SagaError<QueryError>, steps: &[QueryStep<G>]) -> QueryError {
    let (position, cause, report) = match err {
        SagaError::StepFailed {
            position,
            source,
            rollback,
            ..
        } => (position, source, rollback),
        SagaError::CompensationFailed {
            position,
            step_error,
            rollback,
            ..
        } => (position, step_error, rollback),
        other => return QueryError::new(ErrorKind::ExecutionError, other.to_string()),
    };

    let rollback = rollback_summary(report);
    for failure in &rollback.failed {
        error!(step = %failure.step, error = %failure.message, "compensation failed");
    }

    let kind = match cause.kind() {
        kind @ (ErrorKind::StrategyNotFound | ErrorKind::UnsupportedOperation) => kind,
        _ => ErrorKind::ExecutionError,
    };
    let step = position.checked_sub(1).and_then(|index| steps.get(index));
    let backend = step.map_or_else(
        || cause.backend().unwrap_or_default().to_string(),
        |step| step.backend().to_string(),
    );

    let mut error = QueryError::new(
        kind,
        format!("saga failed at step {position} ({backend}): {cause}"),
    )
    .with_backend(backend)
    .with_rollback(rollback);
    if let Some(query) = step.and_then(QueryStep::forward_query) {
        error = error.with_query(query);
    }
    error.with_source(cause)
}

fn rollback_summary(report: RollbackReport<QueryError>) -> RollbackSummary {
    RollbackSummary {
        attempted: report.attempted,
        compensated: report.compensated,
        skipped: report.skipped,
        failed: report
            .failed
            .into_iter()
            .map(|failure| CompensationFailure {
                step: failure.step,
                message: failure.error.to_string(),
            })
            .collect(),
    }
}
