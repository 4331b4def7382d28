//! # oxide-store-sqlite
//!
//! SQLite driver for `oxide-store`, built on `rusqlite`.
//!
//! # How SQLite runs the generated SQL
//!
//! - **Identifiers**: SQLite accepts the `[bracket]` quoting the query
//!   builder emits. See [SQLite keywords].
//! - **Parameters**: `@name` placeholders are bound by name.
//! - **Row caps**: SQLite has no `TOP(n)`, so contexts opened through
//!   [`SqliteDriver`] render a trailing `LIMIT n` instead.
//! - **Generated keys**: `last_insert_rowid()` is read back on the same
//!   connection right after an insert.
//! - **Transactions**: the context's implicit transaction maps onto
//!   `BEGIN` / `COMMIT` / `ROLLBACK`. DDL is transactional too.
//!
//! [SQLite keywords]: https://www.sqlite.org/lang_keywords.html
//!
//! ## Example
//!
//! ```rust
//! use oxide_store::{BindingRegistry, StorageContext};
//! use oxide_store_sqlite::SqliteDriver;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(BindingRegistry::builder().build());
//! let ctx = StorageContext::with_registry(
//!     &SqliteDriver::new(),
//!     "Data Source=:memory:;Foreign Keys=true",
//!     registry,
//! )
//! .unwrap();
//! ctx.save_changes().unwrap();
//! ```

mod config;
mod connection;
mod error;

pub use config::{ConfigError, ConnectionConfig, OpenMode};
pub use connection::{SqliteConnection, SqliteDriver};
pub use error::SqliteError;
