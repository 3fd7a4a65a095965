use std::path::Path;

use polyquery_operations::operations::{QueryInput, QueryOperation};

use crate::environment::{build_generator, load_config, require_registry};
use crate::error::Result;
use crate::output::print_json;

pub(crate) fn run(
    config_path: Option<&Path>,
    question: String,
    backend: Option<String>,
    write: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let registry = require_registry(&config)?;
    let generator = build_generator(&config)?;

    let operation = QueryOperation::new(registry, generator, config.default_backend());
    let input = QueryInput {
        question,
        backend,
    };
    let output = if write {
        operation.write(&input)?
    } else {
        operation.read(&input)?
    };

    print_json(&output)
}
