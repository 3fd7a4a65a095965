use std::fmt::Write as _;
use std::sync::Arc;

use indexmap::IndexMap;
use polyquery_core::{
    ErrorKind, POSTGRES, QueryError, QueryIntent, Result, Rows, StrategyInfo, single_row,
};
use tracing::{debug, warn};

use crate::driver::{ColumnInfo, RelationalDriver};
use crate::safety::{SafetyPolicy, leading_keyword};
use crate::strategy::QueryStrategy;

pub(crate) const SCHEMA_PLACEHOLDER: &str = "Error retrieving PostgreSQL schema.";

const INFO: StrategyInfo = StrategyInfo {
    backend: POSTGRES,
    dialect: "PostgreSQL",
};

/// Strategy for SQL statements against a relational store.
#[derive(Clone)]
pub struct RelationalStrategy {
    driver: Arc<dyn RelationalDriver>,
}

impl RelationalStrategy {
    pub fn new(driver: Arc<dyn RelationalDriver>) -> Self {
        Self { driver }
    }

    fn execute_read(&self, sql: &str) -> Result<Rows> {
        self.driver
            .query(sql)
            .map_err(|err| QueryError::from_driver(err, POSTGRES, sql))
    }

    fn execute_write(&self, sql: &str) -> Result<Rows> {
        let affected = self
            .driver
            .update(sql)
            .map_err(|err| QueryError::from_driver(err, POSTGRES, sql))?;
        Ok(vec![single_row("rows_affected", affected)])
    }
}

impl std::fmt::Debug for RelationalStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationalStrategy").finish_non_exhaustive()
    }
}

impl QueryStrategy for RelationalStrategy {
    fn info(&self) -> StrategyInfo {
        INFO
    }

    fn schema_representation(&self) -> String {
        match self.driver.columns() {
            Ok(columns) => format_schema(&columns),
            Err(err) => {
                warn!(backend = POSTGRES, error = %err, "schema introspection failed");
                SCHEMA_PLACEHOLDER.to_string()
            }
        }
    }

    fn build_prompt(&self, question: &str, schema: &str) -> String {
        format!(
            "Given the PostgreSQL schema:\n{schema}\n---\n\
             Translate the question into a single valid SQL statement. \
             Use SELECT for reads. If the intent is to insert, update or delete data, \
             generate one safe INSERT, UPDATE or DELETE statement. \
             Never use DROP, TRUNCATE, ALTER or other schema-changing statements.\n\
             Return only the SQL query, with no markdown and no explanation.\n\
             Question: \"{question}\""
        )
    }

    fn is_safe(&self, query: &str) -> bool {
        SafetyPolicy::Relational.is_safe(query)
    }

    fn classify(&self, query: &str) -> QueryIntent {
        SafetyPolicy::Relational.classify(query)
    }

    fn execute_query(&self, query: &str) -> Result<Rows> {
        if !self.is_safe(query) {
            return Err(QueryError::unsafe_query(POSTGRES, query));
        }

        let keyword = leading_keyword(query).to_ascii_lowercase();
        debug!(backend = POSTGRES, keyword = %keyword, "executing statement");
        match keyword.as_str() {
            "select" => self.execute_read(query),
            "insert" | "update" | "delete" => self.execute_write(query),
            _ => Err(QueryError::new(
                ErrorKind::UnsupportedOperation,
                format!("unsupported SQL statement '{keyword}'"),
            )
            .with_backend(POSTGRES)
            .with_query(query)),
        }
    }
}

/// Renders `table(col, col); ` per table, tables in first-seen order.
fn format_schema(columns: &[ColumnInfo]) -> String {
    let mut tables: IndexMap<&str, Vec<&str>> = IndexMap::new();
    for column in columns {
        tables
            .entry(column.table.as_str())
            .or_default()
            .push(column.column.as_str());
    }

    let mut schema = String::new();
    for (table, columns) in tables {
        let _ = write!(schema, "{table}({}); ", columns.join(", "));
    }
    schema
}
