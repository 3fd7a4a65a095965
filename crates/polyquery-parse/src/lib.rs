//! Parser for the document-store query notation.
//!
//! Generated document queries arrive as a single method-call-like string,
//! `store.<collection>.<verb>(<args>)`, whose arguments are relaxed JSON
//! objects. This crate turns that text into a [`ParsedOperation`].

mod error;
mod normalize;
mod parse;

pub use error::ParseError;
pub use normalize::{coerce_numeric_regex, normalize_regex_literals};
pub use parse::{ParsedOperation, STORE_PREFIX, Verb, parse_operation};
