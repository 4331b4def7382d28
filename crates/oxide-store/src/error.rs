//! Error types for storage operations.

use thiserror::Error;

use crate::driver::DriverError;
use crate::value::ValueError;

/// Errors raised by registration, query building and execution.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No bound field of the entity carries a primary-key marker.
    #[error("no primary key defined in '{entity}'")]
    MissingPrimaryKey {
        /// Entity type name.
        entity: &'static str,
    },

    /// More than one bound field carries a primary-key marker.
    #[error("'{entity}' marks both '{first}' and '{second}' as primary key")]
    MultiplePrimaryKeys {
        /// Entity type name.
        entity: &'static str,
        /// First marked field.
        first: &'static str,
        /// Second marked field.
        second: &'static str,
    },

    /// A descriptor names a field the entity does not expose.
    #[error("'{entity}' has no field named '{field}'")]
    UnknownField {
        /// Entity type name.
        entity: &'static str,
        /// The unresolved field name.
        field: String,
    },

    /// Two descriptors use the same field key.
    #[error("field key {key} is bound twice in '{entity}'")]
    DuplicateFieldKey {
        /// Entity type name.
        entity: &'static str,
        /// Debug form of the key.
        key: String,
    },

    /// A descriptor could not be constructed.
    #[error("invalid field descriptor: {0}")]
    InvalidDescriptor(String),

    /// The process-wide registry has not been set up yet.
    #[error("bindings have not been initialized")]
    RegistryNotInitialized,

    /// The entity type has no binding in the registry.
    #[error("no table binding registered for '{entity}'")]
    NotRegistered {
        /// Entity type name.
        entity: &'static str,
    },

    /// A filter, sort key or assignment refers to a field key that is not bound.
    #[error("field key {key} is not bound in table '{table}'")]
    UnboundField {
        /// Table name.
        table: String,
        /// Debug form of the key.
        key: String,
    },

    /// `order_by` was called while a sort key already exists.
    #[error("chaining of order_by is not supported, use then_by")]
    AlreadyOrdered,

    /// `then_by` was called before `order_by`.
    #[error("order_by must be used before then_by")]
    NoPrimaryOrder,

    /// The operation is declared but not available.
    #[error("{0} is not supported")]
    NotSupported(&'static str),

    /// An update has nothing to assign.
    #[error("update requires at least one assignment")]
    EmptyAssignment,

    /// A single-row read matched no rows.
    #[error("requested record was not found")]
    NotFound,

    /// A single-row read matched more than one row.
    #[error("more than one record found when a single record was requested")]
    AmbiguousResult,

    /// An update tried to assign the primary key.
    #[error("updating primary key '{field}' is not allowed")]
    PrimaryKeyImmutable {
        /// Entity-side name of the primary-key field.
        field: &'static str,
    },

    /// A cell could not be converted into its entity field.
    #[error("column '{column}': {source}")]
    Conversion {
        /// Column being read.
        column: String,
        /// Underlying conversion failure.
        #[source]
        source: ValueError,
    },

    /// The context has been disposed.
    #[error("connection is closed")]
    ConnectionClosed,

    /// Another command is still holding the connection.
    #[error("connection is busy with another command")]
    ConnectionBusy,

    /// Failure reported by the database driver.
    #[error("database error: {0}")]
    Driver(#[from] DriverError),
}

/// Result type alias for storage operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
