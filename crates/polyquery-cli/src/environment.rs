use std::path::Path;
use std::sync::Arc;

use polyquery_config::{DEFAULT_CONFIG_FILE, LlmConfig, PolyqueryConfig};
use polyquery_operations::GenerationError;
use polyquery_operations::providers::{
    GeminiGenerator, GeminiSettings, MongoDriver, PostgresDriver,
};
use polyquery_strategy::{DocumentStrategy, RelationalStrategy, StrategyRegistry};
use tracing::debug;

use crate::error::{CliError, Result};

/// Loads the explicit config file, else `polyquery.toml` if it exists, else
/// defaults plus environment overrides.
pub(crate) fn load_config(path: Option<&Path>) -> Result<PolyqueryConfig> {
    let config = match path {
        Some(path) => PolyqueryConfig::load(path)?,
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.is_file() {
                PolyqueryConfig::load(default)?
            } else {
                debug!("no config file found, using defaults");
                PolyqueryConfig::from_env()?
            }
        }
    };
    Ok(config)
}

/// Registers a strategy for every configured backend. Drivers connect lazily,
/// so this never touches the network.
pub(crate) fn build_registry(config: &PolyqueryConfig) -> StrategyRegistry {
    let mut registry = StrategyRegistry::new();

    if let Some(postgres) = config.postgres() {
        let driver = Arc::new(PostgresDriver::new(postgres.url()));
        registry = registry.with_strategy(RelationalStrategy::new(driver));
    }
    if let Some(mongodb) = config.mongodb() {
        let driver = Arc::new(MongoDriver::new(mongodb.uri(), mongodb.database()));
        registry = registry.with_strategy(DocumentStrategy::new(driver));
    }

    registry
}

/// Like [`build_registry`], but fails when nothing could answer a question.
pub(crate) fn require_registry(config: &PolyqueryConfig) -> Result<Arc<StrategyRegistry>> {
    let registry = build_registry(config);
    if registry.is_empty() {
        return Err(CliError::NoBackends);
    }
    Ok(Arc::new(registry))
}

pub(crate) fn build_generator(config: &PolyqueryConfig) -> Result<Arc<GeminiGenerator>> {
    let settings = generator_settings(config.llm(), |name| std::env::var(name).ok())?;
    Ok(Arc::new(GeminiGenerator::new(settings)?))
}

fn generator_settings(
    llm: &LlmConfig,
    env: impl Fn(&str) -> Option<String>,
) -> std::result::Result<GeminiSettings, GenerationError> {
    let api_key = env(llm.api_key_env())
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| GenerationError::MissingApiKey(llm.api_key_env().to_string()))?;

    Ok(GeminiSettings {
        endpoint: llm.endpoint().to_string(),
        model: llm.model().to_string(),
        api_key,
        max_retries: llm.max_retries(),
        timeout: llm.timeout(),
    })
}
