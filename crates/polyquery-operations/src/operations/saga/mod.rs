mod context;
mod operation;
mod step;

pub use context::QueryContext;
pub use operation::{SagaInput, SagaOperation, SagaOutcome, StepRequest, StepSummary};
pub use step::{QueryStep, QueryStepStatus};
