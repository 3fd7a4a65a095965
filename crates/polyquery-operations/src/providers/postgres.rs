use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use polyquery_core::{DriverError, Row, Rows};
use polyquery_strategy::{ColumnInfo, RelationalDriver};
use postgres::types::Type;
use postgres::{Client, NoTls};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

const COLUMNS_QUERY: &str = "SELECT table_name::text, column_name::text, data_type::text \
     FROM information_schema.columns \
     WHERE table_schema = 'public' \
     ORDER BY table_name, ordinal_position";

/// [`RelationalDriver`] for PostgreSQL.
///
/// The connection is opened on first use and reopened after it drops.
pub struct PostgresDriver {
    url: String,
    client: Mutex<Option<Client>>,
}

impl PostgresDriver {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: Mutex::new(None),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Client>>, DriverError> {
        self.client
            .lock()
            .map_err(|_| DriverError::connection("postgres connection lock poisoned"))
    }

    fn with_client<T>(
        &self,
        f: impl FnOnce(&mut Client) -> Result<T, postgres::Error>,
    ) -> Result<T, DriverError> {
        let mut guard = self.lock()?;
        if guard.as_ref().is_none_or(Client::is_closed) {
            debug!("opening postgres connection");
            *guard = Some(Client::connect(&self.url, NoTls).map_err(DriverError::connection)?);
        }
        let Some(client) = guard.as_mut() else {
            return Err(DriverError::connection("postgres connection unavailable"));
        };

        f(client).map_err(|err| {
            if err.as_db_error().is_some() {
                DriverError::execution(err)
            } else {
                DriverError::connection(err)
            }
        })
    }
}

impl RelationalDriver for PostgresDriver {
    fn query(&self, sql: &str) -> Result<Rows, DriverError> {
        let rows = self.with_client(|client| client.query(sql, &[]))?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    fn update(&self, sql: &str) -> Result<u64, DriverError> {
        self.with_client(|client| client.execute(sql, &[]))
    }

    fn columns(&self) -> Result<Vec<ColumnInfo>, DriverError> {
        let rows = self.with_client(|client| client.query(COLUMNS_QUERY, &[]))?;
        rows.iter()
            .map(|row| {
                Ok(ColumnInfo {
                    table: row.try_get(0).map_err(DriverError::execution)?,
                    column: row.try_get(1).map_err(DriverError::execution)?,
                    data_type: row.try_get(2).map_err(DriverError::execution)?,
                })
            })
            .collect()
    }
}

fn row_to_json(row: &postgres::Row) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| (column.name().to_string(), cell_to_json(row, idx, column.type_())))
        .collect()
}

/// Reads one cell as JSON. Types without a mapping fall back to text and
/// then to `null`.
fn cell_to_json(row: &postgres::Row, idx: usize, pg_type: &Type) -> Value {
    fn get<'a, T>(row: &'a postgres::Row, idx: usize) -> Option<T>
    where
        T: postgres::types::FromSql<'a>,
    {
        row.try_get::<_, Option<T>>(idx).ok().flatten()
    }

    let value = match *pg_type {
        Type::BOOL => get::<bool>(row, idx).map(Value::from),
        Type::INT2 => get::<i16>(row, idx).map(Value::from),
        Type::INT4 => get::<i32>(row, idx).map(Value::from),
        Type::INT8 => get::<i64>(row, idx).map(Value::from),
        Type::OID => get::<u32>(row, idx).map(Value::from),
        Type::FLOAT4 => get::<f32>(row, idx).map(Value::from),
        Type::FLOAT8 => get::<f64>(row, idx).map(Value::from),
        Type::TEXT | Type::VARCHAR | Type::NAME | Type::BPCHAR => {
            get::<String>(row, idx).map(Value::from)
        }
        Type::BYTEA => get::<Vec<u8>>(row, idx).map(|bytes| Value::from(hex(&bytes))),
        Type::UUID => get::<Uuid>(row, idx).map(|id| Value::from(id.to_string())),
        Type::DATE => get::<NaiveDate>(row, idx).map(|date| Value::from(date.to_string())),
        Type::TIME => get::<NaiveTime>(row, idx).map(|time| Value::from(time.to_string())),
        Type::TIMESTAMP => get::<NaiveDateTime>(row, idx).map(|ts| Value::from(ts.to_string())),
        Type::TIMESTAMPTZ => {
            get::<DateTime<Utc>>(row, idx).map(|ts| Value::from(ts.to_rfc3339()))
        }
        Type::JSON | Type::JSONB => get::<Value>(row, idx),
        _ => get::<String>(row, idx).map(Value::from),
    };
    value.unwrap_or(Value::Null)
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;

    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use polyquery_core::ErrorKind;

    use super::*;

    #[test]
    fn bytea_renders_as_postgres_hex() {
        assert_eq!(hex(&[0xde, 0xad, 0x01]), "\\xdead01");
        assert_eq!(hex(&[]), "\\x");
    }

    #[test]
    fn unreachable_server_is_a_connection_error() {
        let driver = PostgresDriver::new("postgres://nobody@127.0.0.1:1/none?connect_timeout=1");

        let err = driver.query("SELECT 1").expect_err("nothing listens on port 1");

        assert_eq!(err.kind(), ErrorKind::ConnectionError);
    }

    #[test]
    fn malformed_url_is_a_connection_error() {
        let driver = PostgresDriver::new("not a url");

        let err = driver.columns().expect_err("url cannot be parsed");

        assert_eq!(err.kind(), ErrorKind::ConnectionError);
    }
}
