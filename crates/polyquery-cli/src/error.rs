use polyquery_config::ConfigError;
use polyquery_core::{ErrorReport, QueryError};
use polyquery_operations::GenerationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error")]
    Config(#[from] ConfigError),

    #[error("query failed")]
    Query(#[from] QueryError),

    #[error("query generator unavailable")]
    Generator(#[from] GenerationError),

    #[error("no backends configured (add a [postgres] or [mongodb] section)")]
    NoBackends,

    #[error("failed to render output")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    /// Machine-readable report for failures of a query or saga.
    pub(crate) fn report(&self) -> Option<ErrorReport> {
        match self {
            Self::Query(err) => Some(err.report()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
