use std::fmt::Write as _;
use std::sync::Arc;

use indexmap::IndexSet;
use polyquery_core::{
    DriverError, ErrorKind, MONGODB, QueryError, QueryIntent, Result, Row, Rows, StrategyInfo,
    single_row,
};
use polyquery_parse::{ParsedOperation, Verb, parse_operation};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::driver::DocumentDriver;
use crate::safety::SafetyPolicy;
use crate::strategy::QueryStrategy;

/// Maximum number of documents a `find` returns.
pub const FIND_LIMIT: usize = 100;

pub(crate) const SCHEMA_PLACEHOLDER: &str = "Error retrieving MongoDB schema.";
pub(crate) const NO_COLLECTIONS: &str = "No collections found.";

const SAMPLE_SIZE: usize = 3;
const SYSTEM_PREFIX: &str = "system.";

const INFO: StrategyInfo = StrategyInfo {
    backend: MONGODB,
    dialect: "MongoDB",
};

/// Strategy for `store.<collection>.<verb>(...)` queries against a document
/// store.
#[derive(Clone)]
pub struct DocumentStrategy {
    driver: Arc<dyn DocumentDriver>,
}

impl DocumentStrategy {
    pub fn new(driver: Arc<dyn DocumentDriver>) -> Self {
        Self { driver }
    }

    fn describe_collections(&self) -> std::result::Result<String, DriverError> {
        let mut schema = String::new();
        for collection in self.driver.collections()? {
            if collection.starts_with(SYSTEM_PREFIX) {
                continue;
            }
            let samples = self.driver.sample(&collection, SAMPLE_SIZE)?;
            let fields: IndexSet<&str> = samples
                .iter()
                .flat_map(|document| document.keys().map(String::as_str))
                .collect();
            if fields.is_empty() {
                continue;
            }
            let fields: Vec<&str> = fields.into_iter().collect();
            let _ = write!(schema, "{collection}({}); ", fields.join(", "));
        }

        if schema.is_empty() {
            Ok(NO_COLLECTIONS.to_string())
        } else {
            Ok(schema)
        }
    }

    fn dispatch(&self, operation: &ParsedOperation) -> std::result::Result<Rows, DriverError> {
        let collection = operation.collection();
        let first = operation.first();
        match operation.verb() {
            Verb::Find => self.driver.find(collection, first, FIND_LIMIT),
            Verb::Count => {
                let count = self.driver.count(collection, first)?;
                Ok(vec![single_row("count", count)])
            }
            Verb::InsertOne => {
                let mut document = first.clone();
                let id = document
                    .entry("_id")
                    .or_insert_with(|| Value::String(Uuid::new_v4().simple().to_string()))
                    .clone();
                self.driver.insert_one(collection, &document)?;
                Ok(vec![single_row("inserted_id", id)])
            }
            Verb::UpdateOne => {
                let update = operation.second().map(wrap_in_set).unwrap_or_default();
                let modified = self.driver.update_one(collection, first, &update)?;
                Ok(vec![single_row("modified_count", modified)])
            }
            Verb::DeleteOne => {
                let deleted = self.driver.delete_one(collection, first)?;
                Ok(vec![single_row("deleted_count", deleted)])
            }
        }
    }
}

impl std::fmt::Debug for DocumentStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStrategy").finish_non_exhaustive()
    }
}

impl QueryStrategy for DocumentStrategy {
    fn info(&self) -> StrategyInfo {
        INFO
    }

    fn schema_representation(&self) -> String {
        self.describe_collections().unwrap_or_else(|err| {
            warn!(backend = MONGODB, error = %err, "schema introspection failed");
            SCHEMA_PLACEHOLDER.to_string()
        })
    }

    fn build_prompt(&self, question: &str, schema: &str) -> String {
        format!(
            "Given the MongoDB collections and their example fields:\n{schema}\n---\n\
             Translate the question into exactly one query using this syntax:\n\
             store.<collection>.find({{filter}}) or store.<collection>.count({{filter}}) \
             or store.<collection>.insertOne({{document}}) \
             or store.<collection>.updateOne({{filter}}, {{update}}) \
             or store.<collection>.deleteOne({{filter}}).\n\n\
             Rules:\n\
             - Use valid JSON for filters, documents and updates.\n\
             - For string matching use {{ field: {{ \"$regex\": \"pattern\", \"$options\": \"i\" }} }}.\n\
             - For numeric fields such as ids, ages or counts use direct equality, e.g. {{ field: 9 }}.\n\
             - Use field names exactly as shown in the schema.\n\
             - Never use eval, $where, mapReduce, runCommand or drop.\n\n\
             Return only the query, with no markdown and no explanation.\n\
             Question: \"{question}\""
        )
    }

    fn is_safe(&self, query: &str) -> bool {
        SafetyPolicy::Document.is_safe(query)
    }

    fn classify(&self, query: &str) -> QueryIntent {
        SafetyPolicy::Document.classify(query)
    }

    fn execute_query(&self, query: &str) -> Result<Rows> {
        if !self.is_safe(query) {
            return Err(QueryError::unsafe_query(MONGODB, query));
        }

        let operation = parse_operation(query)
            .map_err(|err| QueryError::from(err).with_backend(MONGODB).with_query(query))?;
        debug!(
            backend = MONGODB,
            collection = operation.collection(),
            verb = %operation.verb(),
            "executing document operation"
        );

        if operation.verb() == Verb::UpdateOne && operation.second().is_none() {
            return Err(QueryError::new(
                ErrorKind::ParsingError,
                "updateOne requires an update document",
            )
            .with_backend(MONGODB)
            .with_query(query));
        }

        self.dispatch(&operation)
            .map_err(|err| QueryError::from_driver(err, MONGODB, query))
    }
}

/// Wraps a plain field document in `$set`; documents that already use
/// top-level operators pass through unchanged.
fn wrap_in_set(update: &Row) -> Row {
    if update.keys().any(|key| key.starts_with('$')) {
        return update.clone();
    }
    single_row("$set", Value::Object(update.clone()))
}
