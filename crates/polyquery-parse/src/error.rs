use polyquery_core::{ErrorKind, QueryError};
use thiserror::Error;

pub(crate) const EXPECTED_FORMAT: &str = "store.<collection>.<verb>(<args>)";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("query must start with 'store.' (expected format: {})", EXPECTED_FORMAT)]
    MissingPrefix,

    #[error("query names no collection (expected format: {})", EXPECTED_FORMAT)]
    MissingCollection,

    #[error("query names no operation after the collection (expected format: {})", EXPECTED_FORMAT)]
    MissingOperation,

    #[error(
        "unsupported operation '{0}' (expected one of find, count, insertOne, updateOne, deleteOne)"
    )]
    UnsupportedVerb(String),

    #[error("arguments of '{verb}' are not enclosed in parentheses")]
    MissingParenthesis { verb: &'static str },

    #[error("'{verb}' expects {expected} JSON argument(s), found {found}")]
    ArgumentCount {
        verb: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("invalid JSON argument '{fragment}'")]
    InvalidJson {
        fragment: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("argument '{fragment}' is not a JSON object")]
    NotAnObject { fragment: String },
}

impl From<ParseError> for QueryError {
    fn from(err: ParseError) -> Self {
        QueryError::new(ErrorKind::ParsingError, format!("query parsing error: {err}"))
            .with_source(err)
    }
}
