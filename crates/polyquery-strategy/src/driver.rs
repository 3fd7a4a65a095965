use polyquery_core::{DriverError, Row, Rows};

/// One column of the relational schema, as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub table: String,
    pub column: String,
    pub data_type: String,
}

/// Blocking access to a relational store.
pub trait RelationalDriver: Send + Sync {
    /// Runs a read statement and returns its rows.
    ///
    /// # Errors
    ///
    /// Returns a connection error if the store is unreachable, or an
    /// execution error if the statement is rejected.
    fn query(&self, sql: &str) -> Result<Rows, DriverError>;

    /// Runs a write statement and returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns a connection error if the store is unreachable, or an
    /// execution error if the statement is rejected.
    fn update(&self, sql: &str) -> Result<u64, DriverError>;

    /// Lists the user-visible columns in catalog order.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read.
    fn columns(&self) -> Result<Vec<ColumnInfo>, DriverError>;
}

/// Blocking access to a document store.
pub trait DocumentDriver: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or rejects the filter.
    fn find(&self, collection: &str, filter: &Row, limit: usize) -> Result<Rows, DriverError>;

    /// # Errors
    ///
    /// Returns an error if the store is unreachable or rejects the filter.
    fn count(&self, collection: &str, filter: &Row) -> Result<u64, DriverError>;

    /// Inserts a document that already carries its `_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or rejects the document.
    fn insert_one(&self, collection: &str, document: &Row) -> Result<(), DriverError>;

    /// Applies `update` to the first match and returns the modified count.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or rejects the update.
    fn update_one(&self, collection: &str, filter: &Row, update: &Row)
    -> Result<u64, DriverError>;

    /// Deletes the first match and returns the deleted count.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or rejects the filter.
    fn delete_one(&self, collection: &str, filter: &Row) -> Result<u64, DriverError>;

    /// # Errors
    ///
    /// Returns an error if the collection list cannot be read.
    fn collections(&self) -> Result<Vec<String>, DriverError>;

    /// Returns up to `limit` documents of a collection for schema sampling.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    fn sample(&self, collection: &str, limit: usize) -> Result<Rows, DriverError>;
}
