use std::sync::Mutex;

use polyquery_core::{DriverError, Row, Rows};

use crate::driver::{ColumnInfo, DocumentDriver, RelationalDriver};

type Failure = fn() -> DriverError;

#[derive(Default)]
pub struct FakeRelational {
    rows: Rows,
    affected: u64,
    columns: Vec<ColumnInfo>,
    failure: Option<Failure>,
    reads: Mutex<Vec<String>>,
    writes: Mutex<Vec<String>>,
}

impl FakeRelational {
    pub fn with_rows(mut self, rows: Rows) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_affected(mut self, affected: u64) -> Self {
        self.affected = affected;
        self
    }

    pub fn with_columns(mut self, columns: Vec<ColumnInfo>) -> Self {
        self.columns = columns;
        self
    }

    pub fn failing_with(mut self, failure: Failure) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().expect("lock poisoned").clone()
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().expect("lock poisoned").clone()
    }

    fn check(&self) -> Result<(), DriverError> {
        self.failure.map_or(Ok(()), |failure| Err(failure()))
    }
}

impl RelationalDriver for FakeRelational {
    fn query(&self, sql: &str) -> Result<Rows, DriverError> {
        self.check()?;
        self.reads.lock().expect("lock poisoned").push(sql.to_string());
        Ok(self.rows.clone())
    }

    fn update(&self, sql: &str) -> Result<u64, DriverError> {
        self.check()?;
        self.writes.lock().expect("lock poisoned").push(sql.to_string());
        Ok(self.affected)
    }

    fn columns(&self) -> Result<Vec<ColumnInfo>, DriverError> {
        self.check()?;
        Ok(self.columns.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DocumentCall {
    Find {
        collection: String,
        filter: Row,
        limit: usize,
    },
    Count {
        collection: String,
        filter: Row,
    },
    InsertOne {
        collection: String,
        document: Row,
    },
    UpdateOne {
        collection: String,
        filter: Row,
        update: Row,
    },
    DeleteOne {
        collection: String,
        filter: Row,
    },
}

#[derive(Default)]
pub struct FakeDocument {
    collections: Vec<(String, Rows)>,
    count: u64,
    modified: u64,
    deleted: u64,
    failure: Option<Failure>,
    calls: Mutex<Vec<DocumentCall>>,
}

impl FakeDocument {
    pub fn with_collection(mut self, name: &str, documents: Rows) -> Self {
        self.collections.push((name.to_string(), documents));
        self
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    pub fn with_modified(mut self, modified: u64) -> Self {
        self.modified = modified;
        self
    }

    pub fn with_deleted(mut self, deleted: u64) -> Self {
        self.deleted = deleted;
        self
    }

    pub fn failing_with(mut self, failure: Failure) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn calls(&self) -> Vec<DocumentCall> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    fn record(&self, call: DocumentCall) -> Result<(), DriverError> {
        if let Some(failure) = self.failure {
            return Err(failure());
        }
        self.calls.lock().expect("lock poisoned").push(call);
        Ok(())
    }

    fn documents(&self, collection: &str) -> Rows {
        self.collections
            .iter()
            .find(|(name, _)| name == collection)
            .map(|(_, documents)| documents.clone())
            .unwrap_or_default()
    }
}

impl DocumentDriver for FakeDocument {
    fn find(&self, collection: &str, filter: &Row, limit: usize) -> Result<Rows, DriverError> {
        self.record(DocumentCall::Find {
            collection: collection.to_string(),
            filter: filter.clone(),
            limit,
        })?;
        Ok(self.documents(collection).into_iter().take(limit).collect())
    }

    fn count(&self, collection: &str, filter: &Row) -> Result<u64, DriverError> {
        self.record(DocumentCall::Count {
            collection: collection.to_string(),
            filter: filter.clone(),
        })?;
        Ok(self.count)
    }

    fn insert_one(&self, collection: &str, document: &Row) -> Result<(), DriverError> {
        self.record(DocumentCall::InsertOne {
            collection: collection.to_string(),
            document: document.clone(),
        })
    }

    fn update_one(
        &self,
        collection: &str,
        filter: &Row,
        update: &Row,
    ) -> Result<u64, DriverError> {
        self.record(DocumentCall::UpdateOne {
            collection: collection.to_string(),
            filter: filter.clone(),
            update: update.clone(),
        })?;
        Ok(self.modified)
    }

    fn delete_one(&self, collection: &str, filter: &Row) -> Result<u64, DriverError> {
        self.record(DocumentCall::DeleteOne {
            collection: collection.to_string(),
            filter: filter.clone(),
        })?;
        Ok(self.deleted)
    }

    fn collections(&self) -> Result<Vec<String>, DriverError> {
        if let Some(failure) = self.failure {
            return Err(failure());
        }
        Ok(self.collections.iter().map(|(name, _)| name.clone()).collect())
    }

    fn sample(&self, collection: &str, limit: usize) -> Result<Rows, DriverError> {
        Ok(self.documents(collection).into_iter().take(limit).collect())
    }
}
