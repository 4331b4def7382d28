//! # oxide-store
//!
//! A small storage layer mapping entity types onto single tables.
//!
//! This crate provides:
//! - `Entity` and `FieldAccessor` describing the storable fields of a type
//! - a binding registry tying each entity to its table, columns and primary key
//! - `Query`, a fluent builder rendering parameterized SQL
//! - `StorageContext`, which owns one connection and one implicit transaction
//!
//! ## Quick Start
//!
//! ```ignore
//! use oxide_store::{bindings, QueryFilter, StorageContext, TableFieldDescriptor};
//! use oxide_store_derive::Entity;
//! use oxide_store_sqlite::SqliteDriver;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum ContactField {
//!     Id,
//!     Name,
//!     Age,
//! }
//!
//! #[derive(Debug, Default, Entity)]
//! #[storage(key = ContactField)]
//! struct Contact {
//!     #[primary_key(identity)]
//!     id: i64,
//!     name: String,
//!     age: i32,
//! }
//!
//! fn example() -> oxide_store::StoreResult<()> {
//!     bindings::initialize(|builder| {
//!         builder.register::<Contact, _>(
//!             "Contact",
//!             [
//!                 TableFieldDescriptor::new(ContactField::Id, "id")?,
//!                 TableFieldDescriptor::new(ContactField::Name, "name")?,
//!                 TableFieldDescriptor::new(ContactField::Age, "age")?,
//!             ],
//!         )?;
//!         Ok(())
//!     })?;
//!
//!     let ctx = StorageContext::open(&SqliteDriver::new(), "Data Source=contacts.db")?;
//!     let mut ann = Contact { name: "Ann".into(), age: 41, ..Contact::default() };
//!     ctx.query::<Contact>()?.insert(&mut ann)?;
//!
//!     let adults = ctx
//!         .query::<Contact>()?
//!         .where_all([QueryFilter::gte(ContactField::Age, 18)])
//!         .order_by(ContactField::Name, true)?
//!         .select_many()?;
//!
//!     ctx.save_changes()?;
//!     Ok(())
//! }
//! ```

pub mod bindings;
mod context;
mod descriptor;
mod dialect;
mod driver;
mod entity;
mod error;
mod query;
mod statement;
#[cfg(test)]
mod test_support;
mod value;

pub use bindings::{BindingRegistry, BoundField, RegistryBuilder, TableBinding};
pub use context::{Command, CommandProvider, StorageContext};
pub use descriptor::{FilterOperator, QueryFilter, TableFieldDescriptor};
pub use dialect::{Dialect, SqlCeDialect, SqliteDialect};
pub use driver::{Connection, DataRow, Driver, DriverError, DriverResult};
pub use entity::{Entity, FieldAccessor, FieldKey, Getter, PrimaryKey, Setter};
pub use error::{StoreError, StoreResult};
pub use query::Query;
pub use statement::{Parameter, Statement, StatementBuilder};
pub use value::{parse_text_enum, FromSqlValue, SqlValue, ToSqlValue, ValueError};
