use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::types::RollbackSummary;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

const QUERY_PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    StrategyNotFound,
    UnsafeQuery,
    ParsingError,
    ConnectionError,
    ExecutionError,
    LlmError,
    UnsupportedOperation,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StrategyNotFound => "STRATEGY_NOT_FOUND",
            Self::UnsafeQuery => "UNSAFE_QUERY",
            Self::ParsingError => "PARSING_ERROR",
            Self::ConnectionError => "CONNECTION_ERROR",
            Self::ExecutionError => "EXECUTION_ERROR",
            Self::LlmError => "LLM_ERROR",
            Self::UnsupportedOperation => "UNSUPPORTED_OPERATION",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a data-store driver.
///
/// Drivers classify their own failures so callers never have to inspect
/// message text to tell a dead connection from a rejected statement.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("connection to the data store failed: {0}")]
    Connection(#[source] BoxError),

    #[error("the data store rejected the operation: {0}")]
    Execution(#[source] BoxError),
}

impl DriverError {
    pub fn connection(error: impl Into<BoxError>) -> Self {
        Self::Connection(error.into())
    }

    pub fn execution(error: impl Into<BoxError>) -> Self {
        Self::Execution(error.into())
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_) => ErrorKind::ConnectionError,
            Self::Execution(_) => ErrorKind::ExecutionError,
        }
    }
}

/// The error returned across every component boundary.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct QueryError {
    kind: ErrorKind,
    backend: Option<String>,
    query: Option<String>,
    message: String,
    #[source]
    source: Option<BoxError>,
    rollback: Option<RollbackSummary>,
}

impl QueryError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            backend: None,
            query: None,
            message: message.into(),
            source: None,
            rollback: None,
        }
    }

    #[must_use]
    pub fn strategy_not_found(backend: &str) -> Self {
        Self::new(
            ErrorKind::StrategyNotFound,
            format!("unsupported database strategy: {backend}"),
        )
        .with_backend(backend)
    }

    #[must_use]
    pub fn unsafe_query(backend: &str, query: &str) -> Self {
        Self::new(
            ErrorKind::UnsafeQuery,
            "generated query is not safe to execute",
        )
        .with_backend(backend)
        .with_query(query)
    }

    #[must_use]
    pub fn from_driver(error: DriverError, backend: &str, query: &str) -> Self {
        let message = match &error {
            DriverError::Connection(_) => format!("database connection error on {backend}"),
            DriverError::Execution(_) => format!("execution error on {backend}"),
        };
        Self::new(error.kind(), message)
            .with_backend(backend)
            .with_query(query)
            .with_source(error)
    }

    #[must_use]
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_rollback(mut self, rollback: RollbackSummary) -> Self {
        self.rollback = Some(rollback);
        self
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn backend(&self) -> Option<&str> {
        self.backend.as_deref()
    }

    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn rollback(&self) -> Option<&RollbackSummary> {
        self.rollback.as_ref()
    }

    /// The offending query shortened for display.
    #[must_use]
    pub fn query_preview(&self) -> Option<String> {
        self.query.as_deref().map(|query| {
            if query.chars().count() > QUERY_PREVIEW_CHARS {
                let head: String = query.chars().take(QUERY_PREVIEW_CHARS).collect();
                format!("{head}...")
            } else {
                query.to_string()
            }
        })
    }

    #[must_use]
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind,
            backend: self.backend.clone(),
            query: self.query_preview(),
            message: self.message.clone(),
            rollback: self.rollback.clone(),
        }
    }
}

/// Serializable view of a [`QueryError`] handed to callers.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback: Option<RollbackSummary>,
}

pub type Result<T> = std::result::Result<T, QueryError>;
