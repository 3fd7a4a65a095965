use std::path::Path;

use serde::Serialize;

use crate::environment::{build_registry, load_config};
use crate::error::Result;
use crate::output::print_json;

#[derive(Serialize)]
struct BackendEntry {
    backend: &'static str,
    dialect: &'static str,
    default: bool,
}

pub(crate) fn run(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let registry = build_registry(&config);

    let entries: Vec<BackendEntry> = registry
        .infos()
        .map(|info| BackendEntry {
            backend: info.backend,
            dialect: info.dialect,
            default: info.backend == config.default_backend(),
        })
        .collect();

    print_json(&entries)
}
