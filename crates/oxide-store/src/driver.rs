//! The command-provider boundary implemented by database drivers.
//!
//! The core never talks to a database directly. A [`Driver`] opens a
//! [`Connection`], which executes statements with named parameters inside
//! transactions the storage context controls. Rows are handed to a visitor
//! one at a time, so a driver's reader never outlives the call that
//! created it.

use std::error::Error as StdError;
use std::ops::ControlFlow;

use thiserror::Error;

use crate::dialect::Dialect;
use crate::error::StoreResult;
use crate::statement::Parameter;
use crate::value::SqlValue;

/// Error reported by a driver.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct DriverError {
    source: Box<dyn StdError + Send + Sync + 'static>,
}

impl DriverError {
    /// Wraps a driver-specific error or message.
    pub fn new(source: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Returns the driver-specific error.
    #[must_use]
    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.source.as_ref()
    }
}

/// Result type for driver primitives.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Opens physical connections.
pub trait Driver {
    /// The connection type this driver produces.
    type Connection: Connection + 'static;

    /// Opens a connection from a driver-specific connection string.
    fn open(&self, connection_string: &str) -> DriverResult<Self::Connection>;

    /// Returns the SQL dialect spoken by this driver's connections.
    fn dialect(&self) -> &'static dyn Dialect;
}

/// A single physical connection.
///
/// At most one transaction is open at a time; the storage context decides
/// when to begin, commit and roll back.
pub trait Connection {
    /// Begins a transaction.
    fn begin(&mut self) -> DriverResult<()>;

    /// Commits the open transaction.
    fn commit(&mut self) -> DriverResult<()>;

    /// Rolls back the open transaction.
    fn rollback(&mut self) -> DriverResult<()>;

    /// Executes a statement that returns no rows and reports affected rows.
    fn execute(&mut self, sql: &str, params: &[Parameter]) -> DriverResult<u64>;

    /// Executes a statement and returns the first column of the first row.
    ///
    /// Returns `SqlValue::Null` when the statement yields no rows.
    fn query_scalar(&mut self, sql: &str, params: &[Parameter]) -> DriverResult<SqlValue>;

    /// Executes a row-returning statement, feeding each row to `visitor`
    /// until the rows run out or the visitor breaks.
    fn query_rows(
        &mut self,
        sql: &str,
        params: &[Parameter],
        visitor: &mut dyn FnMut(&dyn DataRow) -> StoreResult<ControlFlow<()>>,
    ) -> StoreResult<()>;
}

/// One row of a result set.
pub trait DataRow {
    /// Reads a column by name.
    ///
    /// Returns `None` when the result set has no such column and
    /// `Some(SqlValue::Null)` when the cell is NULL.
    fn get(&self, column: &str) -> DriverResult<Option<SqlValue>>;
}
