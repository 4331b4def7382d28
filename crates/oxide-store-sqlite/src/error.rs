//! Error type for the SQLite driver.

use oxide_store::DriverError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while opening or using a SQLite connection.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// The connection string could not be parsed.
    #[error("invalid connection string: {0}")]
    Config(#[from] ConfigError),

    /// A statement refers to a parameter the SQL text does not declare.
    #[error("statement has no parameter named '{0}'")]
    UnknownParameter(String),

    /// Error reported by SQLite.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl From<SqliteError> for DriverError {
    fn from(err: SqliteError) -> Self {
        Self::new(err)
    }
}

/// Wraps a rusqlite error for the core.
pub(crate) fn driver_error(err: rusqlite::Error) -> DriverError {
    SqliteError::from(err).into()
}
