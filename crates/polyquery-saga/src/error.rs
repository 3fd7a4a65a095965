use std::fmt::Debug;

use thiserror::Error;
use uuid::Uuid;

/// Error from a failed compensation operation.
#[derive(Debug, Error)]
#[error("compensation failed for step '{step}': {description}")]
pub struct CompensationError<E> {
    /// Name of the step whose compensation failed.
    pub step: String,
    /// One-based position of the step in the saga.
    pub position: usize,
    /// Description of what the compensation was trying to do.
    pub description: String,
    /// The underlying error.
    #[source]
    pub error: E,
}

/// What happened while rolling back a failed saga.
#[derive(Debug)]
pub struct RollbackReport<E> {
    /// Number of committed steps rollback visited.
    pub attempted: usize,
    /// Names of steps whose compensation was applied, in rollback order.
    pub compensated: Vec<String>,
    /// Names of steps that had nothing to compensate, in rollback order.
    pub skipped: Vec<String>,
    pub failed: Vec<CompensationError<E>>,
}

impl<E> Default for RollbackReport<E> {
    fn default() -> Self {
        Self {
            attempted: 0,
            compensated: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<E> RollbackReport<E> {
    /// True when no compensation failed. Skipped steps do not count: they
    /// had nothing recorded to run.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Error from saga execution.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SagaError<E: Debug> {
    /// A step failed and no compensation failed.
    #[error("step {position} '{step}' failed")]
    StepFailed {
        /// Name of the step that failed.
        step: String,
        /// One-based position of the failed step.
        position: usize,
        /// The error that caused the step to fail.
        #[source]
        source: E,
        rollback: RollbackReport<E>,
    },

    /// A step failed and some compensations also failed.
    #[error("step {position} '{failed_step}' failed, and {} compensation(s) also failed", .rollback.failed.len())]
    CompensationFailed {
        /// Name of the step that originally failed.
        failed_step: String,
        /// One-based position of the failed step.
        position: usize,
        /// The error from the failed step.
        #[source]
        step_error: E,
        /// Rollback outcome, including the failed compensations.
        rollback: RollbackReport<E>,
    },

    /// The saga was already run; a saga runs at most once.
    #[error("saga {saga_id} has already been executed")]
    AlreadyExecuted { saga_id: Uuid },
}

impl<E: Debug> SagaError<E> {
    /// Name of the step that failed, if a step failed.
    #[must_use]
    pub fn failed_step(&self) -> Option<&str> {
        match self {
            Self::StepFailed { step, .. } => Some(step),
            Self::CompensationFailed { failed_step, .. } => Some(failed_step),
            Self::AlreadyExecuted { .. } => None,
        }
    }

    #[must_use]
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::StepFailed { position, .. } | Self::CompensationFailed { position, .. } => {
                Some(*position)
            }
            Self::AlreadyExecuted { .. } => None,
        }
    }

    #[must_use]
    pub fn rollback(&self) -> Option<&RollbackReport<E>> {
        match self {
            Self::StepFailed { rollback, .. } | Self::CompensationFailed { rollback, .. } => {
                Some(rollback)
            }
            Self::AlreadyExecuted { .. } => None,
        }
    }
}
