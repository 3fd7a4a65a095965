//! Saga pattern for multi-step operations with best-effort rollback.
//!
//! A [`Saga`] runs its steps strictly in order. When a step fails, every
//! step that already committed is compensated in reverse order (LIFO) and
//! the saga fails with a [`SagaError`] carrying the original error and a
//! [`RollbackReport`].
//!
//! Rollback is best-effort. State lives in memory only, nothing is persisted
//! across process restarts, and a compensation may itself fail or be absent.
//! The engine guarantees ordering and that rollback runs to completion, not
//! atomicity or isolation across the stores the steps touch.

mod audit;
mod error;
mod saga;
mod step;

pub use audit::{SagaAuditLog, StepRecord, StepStatus};
pub use error::{CompensationError, RollbackReport, SagaError};
pub use saga::{Saga, SagaState};
pub use step::{Compensation, SagaStep};
