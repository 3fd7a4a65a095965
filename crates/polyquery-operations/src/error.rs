use polyquery_core::{ErrorKind, QueryError};
use thiserror::Error;

/// Failure of the natural-language-to-query generator.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generator request failed")]
    Request(#[source] reqwest::Error),

    #[error("generator returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("generator response contained no text")]
    EmptyResponse,

    #[error("generator API key is not set (expected in ${0})")]
    MissingApiKey(String),

    #[error("generator failed after {attempts} attempt(s)")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<GenerationError>,
    },

    #[error("{0}")]
    Other(String),
}

impl GenerationError {
    /// Whether another attempt may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Converts into an `LlmError` attributed to `backend`.
    #[must_use]
    pub fn into_query_error(self, backend: &str) -> QueryError {
        QueryError::new(
            ErrorKind::LlmError,
            format!("query generation failed: {self}"),
        )
        .with_backend(backend)
        .with_source(self)
    }
}
