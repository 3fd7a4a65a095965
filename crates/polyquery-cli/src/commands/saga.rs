use std::path::Path;

use polyquery_operations::operations::{SagaInput, SagaOperation, StepRequest};

use crate::environment::{build_generator, load_config, require_registry};
use crate::error::Result;
use crate::output::print_json;

pub(crate) fn run(config_path: Option<&Path>, steps: Vec<StepRequest>, write: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let registry = require_registry(&config)?;
    let generator = build_generator(&config)?;

    let operation = SagaOperation::new(registry, generator);
    let outcome = operation.execute(&SagaInput { steps, write })?;

    print_json(&outcome)
}
