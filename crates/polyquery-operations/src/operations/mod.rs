mod generation;
mod query;
mod saga;

pub use generation::{compensation_question, generate_compensation, generate_query};
pub use query::{QueryInput, QueryOperation, QueryOutput};
pub use saga::{
    QueryContext, QueryStep, QueryStepStatus, SagaInput, SagaOperation, SagaOutcome,
    StepRequest, StepSummary,
};
