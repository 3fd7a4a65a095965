use std::fmt::{self, Debug};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::audit::{SagaAuditLog, StepStatus};
use crate::error::{CompensationError, RollbackReport, SagaError};
use crate::step::{Compensation, SagaStep};

/// Lifecycle of a saga: `Pending -> Running -> Succeeded | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl fmt::Display for SagaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// An ordered sequence of steps executed at most once.
///
/// Steps run in insertion order and never concurrently. If any step fails,
/// previously completed steps are compensated in reverse order (LIFO) and
/// rollback always visits every committed step, even when a compensation
/// fails. Compensation is best-effort: no state is persisted, so a crash
/// mid-saga leaves committed steps in place.
pub struct Saga<S> {
    id: Uuid,
    started_at: DateTime<Utc>,
    state: SagaState,
    steps: Vec<S>,
}

impl<S> Saga<S>
where
    S: SagaStep,
    S::Error: Debug,
{
    #[must_use]
    pub fn new() -> Self {
        Self::from_steps(Vec::new())
    }

    #[must_use]
    pub fn from_steps(steps: Vec<S>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            state: SagaState::Pending,
            steps,
        }
    }

    /// Append a step; insertion order is execution order.
    #[must_use]
    pub fn with_step(mut self, step: S) -> Self {
        self.steps.push(step);
        self
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn state(&self) -> SagaState {
        self.state
    }

    #[must_use]
    pub fn steps(&self) -> &[S] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Execute the saga, returning every step's output in step order.
    ///
    /// On failure, compensates all previously completed steps in reverse order.
    ///
    /// # Errors
    ///
    /// Returns `SagaError::StepFailed` if a step fails and no compensation fails.
    /// Returns `SagaError::CompensationFailed` if a step fails and some compensations also fail.
    /// Returns `SagaError::AlreadyExecuted` if the saga has run before.
    pub fn execute(&mut self, ctx: &S::Context) -> Result<Vec<S::Output>, SagaError<S::Error>> {
        let (result, _audit_log) = self.execute_internal(ctx);
        result
    }

    /// Execute the saga and return both the result and an audit log.
    ///
    /// The audit log tracks all step executions and compensations.
    pub fn execute_with_audit(
        &mut self,
        ctx: &S::Context,
    ) -> (Result<Vec<S::Output>, SagaError<S::Error>>, SagaAuditLog) {
        self.execute_internal(ctx)
    }

    fn execute_internal(
        &mut self,
        ctx: &S::Context,
    ) -> (Result<Vec<S::Output>, SagaError<S::Error>>, SagaAuditLog) {
        let mut audit_log = SagaAuditLog::new();
        if self.state != SagaState::Pending {
            return (
                Err(SagaError::AlreadyExecuted { saga_id: self.id }),
                audit_log,
            );
        }

        self.state = SagaState::Running;
        info!(saga_id = %self.id, steps = self.steps.len(), "saga started");

        let mut outputs = Vec::with_capacity(self.steps.len());
        let mut executed: Vec<usize> = Vec::new();

        for index in 0..self.steps.len() {
            let position = index + 1;
            let step = &mut self.steps[index];
            let name = step.name();
            audit_log.record_start(position, name.clone());
            debug!(saga_id = %self.id, position, step = %name, "executing step");

            match step.execute(ctx) {
                Ok(output) => {
                    audit_log.record_success(step.compensation_description());
                    executed.push(index);
                    outputs.push(output);
                }
                Err(step_error) => {
                    audit_log.record_failure();
                    warn!(saga_id = %self.id, position, step = %name, "step failed, rolling back");
                    let rollback = self.roll_back(ctx, &mut audit_log, executed);
                    self.state = SagaState::Failed;
                    let saga_error = if rollback.is_clean() {
                        SagaError::StepFailed {
                            step: name,
                            position,
                            source: step_error,
                            rollback,
                        }
                    } else {
                        SagaError::CompensationFailed {
                            failed_step: name,
                            position,
                            step_error,
                            rollback,
                        }
                    };
                    return (Err(saga_error), audit_log);
                }
            }
        }

        self.state = SagaState::Succeeded;
        info!(saga_id = %self.id, "saga succeeded");
        (Ok(outputs), audit_log)
    }

    fn roll_back(
        &mut self,
        ctx: &S::Context,
        audit_log: &mut SagaAuditLog,
        mut executed: Vec<usize>,
    ) -> RollbackReport<S::Error> {
        let mut report = RollbackReport::default();

        while let Some(index) = executed.pop() {
            let position = index + 1;
            let step = &mut self.steps[index];
            let name = step.name();
            report.attempted += 1;

            match step.compensate(ctx) {
                Ok(Compensation::Applied) => {
                    debug!(saga_id = %self.id, position, step = %name, "step compensated");
                    audit_log.record_compensation(position, StepStatus::Compensated);
                    report.compensated.push(name);
                }
                Ok(Compensation::Skipped) => {
                    warn!(saga_id = %self.id, position, step = %name, "no compensation for step");
                    audit_log.record_compensation(position, StepStatus::CompensationSkipped);
                    report.skipped.push(name);
                }
                Err(err) => {
                    error!(saga_id = %self.id, position, step = %name, error = ?err, "compensation failed");
                    audit_log.record_compensation(position, StepStatus::CompensationFailed);
                    report.failed.push(CompensationError {
                        description: step.compensation_description(),
                        step: name,
                        position,
                        error: err,
                    });
                }
            }
        }

        report
    }
}

impl<S> Default for Saga<S>
where
    S: SagaStep,
    S::Error: Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Debug for Saga<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Saga")
            .field("id", &self.id)
            .field("started_at", &self.started_at)
            .field("state", &self.state)
            .field("steps", &self.steps.len())
            .finish()
    }
}
