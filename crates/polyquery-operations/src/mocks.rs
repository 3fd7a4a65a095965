use std::collections::VecDeque;
use std::sync::Mutex;

use polyquery_core::{DriverError, Row, Rows};
use polyquery_strategy::{ColumnInfo, DocumentDriver, RelationalDriver};

use crate::GenerationError;
use crate::traits::QueryGenerator;

/// Generator that replays scripted responses in call order.
#[derive(Default)]
pub struct MockGenerator {
    responses: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn then_return(self, text: &str) -> Self {
        self.responses
            .lock()
            .expect("lock poisoned")
            .push_back(Ok(text.to_string()));
        self
    }

    #[must_use]
    pub fn then_fail(self, message: &str) -> Self {
        self.responses
            .lock()
            .expect("lock poisoned")
            .push_back(Err(message.to_string()));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("lock poisoned").clone()
    }
}

impl QueryGenerator for MockGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts
            .lock()
            .expect("lock poisoned")
            .push(prompt.to_string());
        match self.responses.lock().expect("lock poisoned").pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(GenerationError::Other(message)),
            None => Err(GenerationError::Other("no scripted response left".to_string())),
        }
    }
}

/// Relational driver that records every statement it receives.
#[derive(Default)]
pub struct MockRelationalDriver {
    rows: Rows,
    failures: Vec<(String, fn() -> DriverError)>,
    statements: Mutex<Vec<String>>,
}

impl MockRelationalDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_rows(mut self, rows: Rows) -> Self {
        self.rows = rows;
        self
    }

    /// Fails every statement containing `needle`.
    #[must_use]
    pub fn failing_on(mut self, needle: &str, failure: fn() -> DriverError) -> Self {
        self.failures.push((needle.to_string(), failure));
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().expect("lock poisoned").clone()
    }

    fn run(&self, sql: &str) -> Result<(), DriverError> {
        self.statements
            .lock()
            .expect("lock poisoned")
            .push(sql.to_string());
        match self.failures.iter().find(|(needle, _)| sql.contains(needle)) {
            Some((_, failure)) => Err(failure()),
            None => Ok(()),
        }
    }
}

impl RelationalDriver for MockRelationalDriver {
    fn query(&self, sql: &str) -> Result<Rows, DriverError> {
        self.run(sql)?;
        Ok(self.rows.clone())
    }

    fn update(&self, sql: &str) -> Result<u64, DriverError> {
        self.run(sql)?;
        Ok(1)
    }

    fn columns(&self) -> Result<Vec<ColumnInfo>, DriverError> {
        Ok(vec![ColumnInfo {
            table: "users".to_string(),
            column: "name".to_string(),
            data_type: "text".to_string(),
        }])
    }
}

/// Document driver that records operations as `verb collection` strings.
#[derive(Default)]
pub struct MockDocumentDriver {
    operations: Mutex<Vec<String>>,
}

impl MockDocumentDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operations(&self) -> Vec<String> {
        self.operations.lock().expect("lock poisoned").clone()
    }

    fn record(&self, verb: &str, collection: &str) {
        self.operations
            .lock()
            .expect("lock poisoned")
            .push(format!("{verb} {collection}"));
    }
}

impl DocumentDriver for MockDocumentDriver {
    fn find(&self, collection: &str, _filter: &Row, _limit: usize) -> Result<Rows, DriverError> {
        self.record("find", collection);
        Ok(Vec::new())
    }

    fn count(&self, collection: &str, _filter: &Row) -> Result<u64, DriverError> {
        self.record("count", collection);
        Ok(0)
    }

    fn insert_one(&self, collection: &str, _document: &Row) -> Result<(), DriverError> {
        self.record("insertOne", collection);
        Ok(())
    }

    fn update_one(
        &self,
        collection: &str,
        _filter: &Row,
        _update: &Row,
    ) -> Result<u64, DriverError> {
        self.record("updateOne", collection);
        Ok(1)
    }

    fn delete_one(&self, collection: &str, _filter: &Row) -> Result<u64, DriverError> {
        self.record("deleteOne", collection);
        Ok(1)
    }

    fn collections(&self) -> Result<Vec<String>, DriverError> {
        Ok(vec!["users".to_string()])
    }

    fn sample(&self, _collection: &str, _limit: usize) -> Result<Rows, DriverError> {
        Ok(Vec::new())
    }
}
