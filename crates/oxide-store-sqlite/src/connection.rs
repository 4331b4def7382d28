//! rusqlite-backed driver and connection.

use std::ops::ControlFlow;

use oxide_store::{
    Connection, DataRow, Dialect, Driver, DriverError, DriverResult, Parameter, SqlValue,
    SqliteDialect, StoreError, StoreResult,
};
use rusqlite::types::{Value, ValueRef};
use tracing::{debug, info};

use crate::config::{ConnectionConfig, OpenMode};
use crate::error::{driver_error, SqliteError};

static DIALECT: SqliteDialect = SqliteDialect::new();

/// Opens [`SqliteConnection`]s from connection strings.
///
/// See [`ConnectionConfig`] for the accepted keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDriver;

impl SqliteDriver {
    /// Creates the driver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Driver for SqliteDriver {
    type Connection = SqliteConnection;

    fn open(&self, connection_string: &str) -> DriverResult<SqliteConnection> {
        let config = ConnectionConfig::parse(connection_string).map_err(SqliteError::from)?;
        Ok(SqliteConnection::open(&config)?)
    }

    fn dialect(&self) -> &'static dyn Dialect {
        &DIALECT
    }
}

/// One SQLite database connection.
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    /// Opens a connection with `config`.
    ///
    /// # Errors
    ///
    /// Returns an error when the database cannot be opened or configured.
    pub fn open(config: &ConnectionConfig) -> Result<Self, SqliteError> {
        let conn = match config.mode {
            OpenMode::Memory => rusqlite::Connection::open_in_memory()?,
            _ => rusqlite::Connection::open_with_flags(&config.data_source, config.open_flags())?,
        };
        conn.busy_timeout(config.busy_timeout)?;
        let pragma = if config.foreign_keys {
            "PRAGMA foreign_keys = ON;"
        } else {
            "PRAGMA foreign_keys = OFF;"
        };
        conn.execute_batch(pragma)?;

        info!(
            data_source = %config.data_source,
            mode = ?config.mode,
            "sqlite connection opened"
        );
        Ok(Self { conn })
    }

    /// Wraps an already open rusqlite connection.
    #[must_use]
    pub const fn from_connection(conn: rusqlite::Connection) -> Self {
        Self { conn }
    }

    fn prepare(&self, sql: &str, params: &[Parameter]) -> Result<rusqlite::Statement<'_>, SqliteError> {
        let mut stmt = self.conn.prepare(sql)?;
        for param in params {
            let name = DIALECT.placeholder(&param.name);
            let index = stmt
                .parameter_index(&name)?
                .ok_or_else(|| SqliteError::UnknownParameter(name.clone()))?;
            stmt.raw_bind_parameter(index, to_value(&param.value))?;
        }
        Ok(stmt)
    }
}

impl Connection for SqliteConnection {
    fn begin(&mut self) -> DriverResult<()> {
        debug!("BEGIN");
        self.conn.execute_batch("BEGIN").map_err(driver_error)
    }

    fn commit(&mut self) -> DriverResult<()> {
        debug!("COMMIT");
        self.conn.execute_batch("COMMIT").map_err(driver_error)
    }

    fn rollback(&mut self) -> DriverResult<()> {
        debug!("ROLLBACK");
        self.conn.execute_batch("ROLLBACK").map_err(driver_error)
    }

    fn execute(&mut self, sql: &str, params: &[Parameter]) -> DriverResult<u64> {
        let mut stmt = self.prepare(sql, params)?;
        let changed = stmt.raw_execute().map_err(driver_error)?;
        Ok(changed as u64)
    }

    fn query_scalar(&mut self, sql: &str, params: &[Parameter]) -> DriverResult<SqlValue> {
        let mut stmt = self.prepare(sql, params)?;
        let mut rows = stmt.raw_query();
        match rows.next().map_err(driver_error)? {
            Some(row) => from_value_ref(row.get_ref(0).map_err(driver_error)?),
            None => Ok(SqlValue::Null),
        }
    }

    fn query_rows(
        &mut self,
        sql: &str,
        params: &[Parameter],
        visitor: &mut dyn FnMut(&dyn DataRow) -> StoreResult<ControlFlow<()>>,
    ) -> StoreResult<()> {
        let mut stmt = self
            .prepare(sql, params)
            .map_err(|err| StoreError::Driver(err.into()))?;
        let mut rows = stmt.raw_query();
        while let Some(row) = rows
            .next()
            .map_err(|err| StoreError::Driver(driver_error(err)))?
        {
            if visitor(&SqliteRow { row })?.is_break() {
                break;
            }
        }
        Ok(())
    }
}

struct SqliteRow<'r, 's> {
    row: &'r rusqlite::Row<'s>,
}

impl DataRow for SqliteRow<'_, '_> {
    fn get(&self, column: &str) -> DriverResult<Option<SqlValue>> {
        match self.row.get_ref(column) {
            Ok(value) => from_value_ref(value).map(Some),
            Err(rusqlite::Error::InvalidColumnName(_)) => Ok(None),
            Err(err) => Err(driver_error(err)),
        }
    }
}

fn to_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => Value::Integer(i64::from(*b)),
        SqlValue::Int(n) => Value::Integer(*n),
        SqlValue::Float(f) => Value::Real(*f),
        SqlValue::Text(s) => Value::Text(s.clone()),
        SqlValue::Blob(b) => Value::Blob(b.clone()),
    }
}

/// Text cells must hold valid UTF-8; anything else is reported, not repaired.
fn from_value_ref(value: ValueRef<'_>) -> DriverResult<SqlValue> {
    let value = match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(n) => SqlValue::Int(n),
        ValueRef::Real(f) => SqlValue::Float(f),
        ValueRef::Text(bytes) => {
            let text = std::str::from_utf8(bytes).map_err(DriverError::new)?;
            SqlValue::Text(text.to_string())
        }
        ValueRef::Blob(bytes) => SqlValue::Blob(bytes.to_vec()),
    };
    Ok(value)
}
