use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single result row, keyed by column or field name.
pub type Row = Map<String, Value>;

/// Rows returned by a backend.
pub type Rows = Vec<Row>;

/// Identifier of the relational backend.
pub const POSTGRES: &str = "postgres";

/// Identifier of the document backend.
pub const MONGODB: &str = "mongodb";

/// Every backend identifier the registry knows how to build.
pub const KNOWN_BACKENDS: [&str; 2] = [POSTGRES, MONGODB];

/// Builds a one-column row, used for counts and affected-row results.
#[must_use]
pub fn single_row(key: &str, value: impl Into<Value>) -> Row {
    let mut row = Map::new();
    row.insert(key.to_string(), value.into());
    row
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryIntent {
    Read,
    Write,
}

impl fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
        }
    }
}

/// Which query intents a caller is allowed to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    #[default]
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    #[must_use]
    pub fn permits(self, intent: QueryIntent) -> bool {
        match self {
            Self::ReadOnly => intent == QueryIntent::Read,
            Self::WriteOnly => intent == QueryIntent::Write,
            Self::ReadWrite => true,
        }
    }
}

/// Capability record of a strategy, fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StrategyInfo {
    pub backend: &'static str,
    pub dialect: &'static str,
}

/// A compensation that failed while rolling back a saga.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompensationFailure {
    pub step: String,
    pub message: String,
}

/// Outcome of the rollback that followed a failed saga.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RollbackSummary {
    /// Number of committed steps rollback visited.
    pub attempted: usize,
    pub compensated: Vec<String>,
    /// Steps committed without a recorded compensation query.
    pub skipped: Vec<String>,
    pub failed: Vec<CompensationFailure>,
}

impl RollbackSummary {
    /// True when every committed step was undone: nothing skipped, nothing
    /// failed.
    #[must_use]
    pub fn fully_compensated(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_rejects_writes() {
        assert!(AccessMode::ReadOnly.permits(QueryIntent::Read));
        assert!(!AccessMode::ReadOnly.permits(QueryIntent::Write));
    }

    #[test]
    fn write_only_rejects_reads() {
        assert!(AccessMode::WriteOnly.permits(QueryIntent::Write));
        assert!(!AccessMode::WriteOnly.permits(QueryIntent::Read));
    }

    #[test]
    fn read_write_permits_both() {
        assert!(AccessMode::ReadWrite.permits(QueryIntent::Read));
        assert!(AccessMode::ReadWrite.permits(QueryIntent::Write));
    }

    #[test]
    fn single_row_holds_one_entry() {
        let row = single_row("count", 3);

        assert_eq!(row.len(), 1);
        assert_eq!(row.get("count"), Some(&Value::from(3)));
    }

    #[test]
    fn rollback_summary_with_skips_is_not_fully_compensated() {
        let summary = RollbackSummary {
            attempted: 1,
            skipped: vec!["step 1 (postgres)".to_string()],
            ..RollbackSummary::default()
        };

        assert!(!summary.fully_compensated());
        assert!(RollbackSummary::default().fully_compensated());
    }
}
