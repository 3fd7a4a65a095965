mod backends;
mod query;
mod saga;

use std::path::Path;

use clap::Subcommand;
use polyquery_operations::operations::StepRequest;

use crate::error::Result;

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Answer a question with a read-only query
    Query {
        /// The question, in natural language
        question: String,

        /// Backend to ask (default: `default_backend` from the config)
        #[arg(long, short = 'b')]
        backend: Option<String>,
    },
    /// Carry out a change described in natural language
    Write {
        /// The change, in natural language
        question: String,

        /// Backend to change (default: `default_backend` from the config)
        #[arg(long, short = 'b')]
        backend: Option<String>,
    },
    /// Run several questions as one saga, rolling back on failure
    Saga {
        /// A step as BACKEND=QUESTION; repeat for each step, in order
        #[arg(
            long = "step",
            short = 's',
            value_name = "BACKEND=QUESTION",
            value_parser = parse_step,
            required = true
        )]
        steps: Vec<StepRequest>,

        /// Allow steps that modify data
        #[arg(long)]
        write: bool,
    },
    /// List the configured backends
    Backends,
}

impl Commands {
    pub(crate) fn execute(self, config_path: Option<&Path>) -> Result<()> {
        match self {
            Self::Query { question, backend } => query::run(config_path, question, backend, false),
            Self::Write { question, backend } => query::run(config_path, question, backend, true),
            Self::Saga { steps, write } => saga::run(config_path, steps, write),
            Self::Backends => backends::run(config_path),
        }
    }
}

fn parse_step(value: &str) -> std::result::Result<StepRequest, String> {
    let (backend, question) = value
        .split_once('=')
        .ok_or_else(|| format!("expected BACKEND=QUESTION, got '{value}'"))?;
    let (backend, question) = (backend.trim(), question.trim());
    if backend.is_empty() {
        return Err("step backend must not be empty".to_string());
    }
    if question.is_empty() {
        return Err("step question must not be empty".to_string());
    }
    Ok(StepRequest::new(backend, question))
}

#[cfg(test)]
mod tests {
    use super::parse_step;

    #[test]
    fn step_splits_at_first_equals_sign() {
        let step = parse_step("postgres=set total = 5 where id = 1").expect("valid step");

        assert_eq!(step.backend, "postgres");
        assert_eq!(step.question, "set total = 5 where id = 1");
    }

    #[test]
    fn step_without_separator_is_rejected() {
        let err = parse_step("postgres").expect_err("no separator");

        assert!(err.contains("BACKEND=QUESTION"));
    }

    #[test]
    fn step_with_blank_parts_is_rejected() {
        assert!(parse_step("=how many users").is_err());
        assert!(parse_step("mongodb=  ").is_err());
    }
}
