use std::sync::Mutex;

use mongodb::bson::{self, Bson, Document, doc};
use mongodb::error::ErrorKind as MongoErrorKind;
use mongodb::sync::{Client, Collection, Database};
use polyquery_core::{DriverError, Row, Rows};
use polyquery_strategy::DocumentDriver;
use serde_json::Value;
use tracing::debug;

/// [`DocumentDriver`] for MongoDB, using the driver's synchronous API.
///
/// The client is created on first use and shared afterwards.
pub struct MongoDriver {
    uri: String,
    database: String,
    handle: Mutex<Option<Database>>,
}

impl MongoDriver {
    #[must_use]
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            handle: Mutex::new(None),
        }
    }

    fn database(&self) -> Result<Database, DriverError> {
        let mut handle = self
            .handle
            .lock()
            .map_err(|_| DriverError::connection("mongodb client lock poisoned"))?;
        if let Some(database) = handle.as_ref() {
            return Ok(database.clone());
        }

        debug!(database = %self.database, "creating mongodb client");
        let client = Client::with_uri_str(&self.uri).map_err(DriverError::connection)?;
        let database = client.database(&self.database);
        *handle = Some(database.clone());
        Ok(database)
    }

    fn collection(&self, name: &str) -> Result<Collection<Document>, DriverError> {
        Ok(self.database()?.collection::<Document>(name))
    }
}

impl DocumentDriver for MongoDriver {
    fn find(&self, collection: &str, filter: &Row, limit: usize) -> Result<Rows, DriverError> {
        let cursor = self
            .collection(collection)?
            .find(to_document(filter)?)
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .run()
            .map_err(classify)?;
        cursor
            .map(|document| document.map(to_row).map_err(classify))
            .collect()
    }

    fn count(&self, collection: &str, filter: &Row) -> Result<u64, DriverError> {
        self.collection(collection)?
            .count_documents(to_document(filter)?)
            .run()
            .map_err(classify)
    }

    fn insert_one(&self, collection: &str, document: &Row) -> Result<(), DriverError> {
        self.collection(collection)?
            .insert_one(to_document(document)?)
            .run()
            .map_err(classify)?;
        Ok(())
    }

    fn update_one(
        &self,
        collection: &str,
        filter: &Row,
        update: &Row,
    ) -> Result<u64, DriverError> {
        let result = self
            .collection(collection)?
            .update_one(to_document(filter)?, to_document(update)?)
            .run()
            .map_err(classify)?;
        Ok(result.modified_count)
    }

    fn delete_one(&self, collection: &str, filter: &Row) -> Result<u64, DriverError> {
        let result = self
            .collection(collection)?
            .delete_one(to_document(filter)?)
            .run()
            .map_err(classify)?;
        Ok(result.deleted_count)
    }

    fn collections(&self) -> Result<Vec<String>, DriverError> {
        self.database()?
            .list_collection_names()
            .run()
            .map_err(classify)
    }

    fn sample(&self, collection: &str, limit: usize) -> Result<Rows, DriverError> {
        let cursor = self
            .collection(collection)?
            .find(doc! {})
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .run()
            .map_err(classify)?;
        cursor
            .map(|document| document.map(to_row).map_err(classify))
            .collect()
    }
}

/// Unreachable servers, failed lookups and rejected credentials are
/// connection failures; everything else was rejected by the server.
fn classify(err: mongodb::error::Error) -> DriverError {
    match *err.kind {
        MongoErrorKind::Io(_)
        | MongoErrorKind::ServerSelection { .. }
        | MongoErrorKind::DnsResolve { .. }
        | MongoErrorKind::Authentication { .. } => DriverError::connection(err),
        _ => DriverError::execution(err),
    }
}

fn to_document(row: &Row) -> Result<Document, DriverError> {
    bson::to_document(row).map_err(DriverError::execution)
}

fn to_row(document: Document) -> Row {
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn filters_convert_to_bson_documents() {
        let filter = row(json!({"age": 30, "name": {"$regex": "jo", "$options": "i"}}));

        let document = to_document(&filter).expect("convert filter");

        assert!(matches!(
            document.get("age"),
            Some(Bson::Int32(30) | Bson::Int64(30))
        ));
        let name = document.get_document("name").expect("nested operator");
        assert_eq!(name.get_str("$regex").ok(), Some("jo"));
    }

    #[test]
    fn documents_convert_to_relaxed_json() {
        let document = doc! {"_id": "abc", "count": 3_i32, "tags": ["a", "b"]};

        assert_eq!(
            to_row(document),
            row(json!({"_id": "abc", "count": 3, "tags": ["a", "b"]}))
        );
    }

    #[test]
    fn malformed_uri_is_a_connection_error() {
        let driver = MongoDriver::new("definitely-not-mongodb", "app");

        let err = driver.collections().expect_err("uri cannot be parsed");

        assert_eq!(err.kind(), polyquery_core::ErrorKind::ConnectionError);
    }
}
