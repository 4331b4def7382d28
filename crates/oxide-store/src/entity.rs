//! Entity trait and the explicit accessor table behind it.
//!
//! An entity exposes its storable fields as a list of [`FieldAccessor`]s:
//! a name, a getter, a setter and an optional primary-key marker. The
//! binding registry resolves descriptor names against this list once, at
//! registration, so row materialization never looks fields up by name.
//!
//! The list is normally generated by `#[derive(Entity)]` from
//! `oxide-store-derive`, but it can be written by hand:
//!
//! ```rust
//! use oxide_store::{Entity, FieldAccessor, FromSqlValue, ToSqlValue};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum TagField {
//!     Id,
//!     Label,
//! }
//!
//! #[derive(Default)]
//! struct Tag {
//!     id: i64,
//!     label: String,
//! }
//!
//! impl Entity for Tag {
//!     type Key = TagField;
//!
//!     fn accessors() -> Vec<FieldAccessor<Self>> {
//!         vec![
//!             FieldAccessor::new(
//!                 "id",
//!                 |t: &Tag| t.id.to_sql_value(),
//!                 |t: &mut Tag, v| {
//!                     t.id = FromSqlValue::from_sql_value(v)?;
//!                     Ok(())
//!                 },
//!             )
//!             .primary_key(true),
//!             FieldAccessor::new(
//!                 "label",
//!                 |t: &Tag| t.label.clone().to_sql_value(),
//!                 |t: &mut Tag, v| {
//!                     t.label = FromSqlValue::from_sql_value(v)?;
//!                     Ok(())
//!                 },
//!             ),
//!         ]
//!     }
//! }
//! ```

use std::fmt;
use std::hash::Hash;

use crate::value::{SqlValue, ValueError};

/// Application-chosen identifier for a logical field.
///
/// Implemented for every small, comparable value type; a fieldless enum
/// is the usual choice.
pub trait FieldKey: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> FieldKey for T where T: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// Reads a field's current value.
pub type Getter<E> = fn(&E) -> SqlValue;

/// Writes a non-null cell into a field.
pub type Setter<E> = fn(&mut E, SqlValue) -> Result<(), ValueError>;

/// Primary-key marker carried by one accessor of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryKey {
    /// The caller assigns the key before insert.
    Assigned,
    /// The database generates the key on insert.
    Identity,
}

impl PrimaryKey {
    /// Returns true when the database generates the key.
    #[must_use]
    pub const fn is_identity(self) -> bool {
        matches!(self, Self::Identity)
    }
}

/// Getter/setter pair for one named entity field.
pub struct FieldAccessor<E> {
    name: &'static str,
    get: Getter<E>,
    set: Setter<E>,
    primary_key: Option<PrimaryKey>,
}

impl<E> FieldAccessor<E> {
    /// Creates an accessor for the field called `name`.
    #[must_use]
    pub fn new(name: &'static str, get: Getter<E>, set: Setter<E>) -> Self {
        Self {
            name,
            get,
            set,
            primary_key: None,
        }
    }

    /// Marks the field as the primary key.
    #[must_use]
    pub const fn primary_key(mut self, identity: bool) -> Self {
        self.primary_key = Some(if identity {
            PrimaryKey::Identity
        } else {
            PrimaryKey::Assigned
        });
        self
    }

    /// Returns the entity-side field name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the primary-key marker, if any.
    #[must_use]
    pub const fn primary_key_marker(&self) -> Option<PrimaryKey> {
        self.primary_key
    }

    /// Reads the field from `entity`.
    pub fn get(&self, entity: &E) -> SqlValue {
        (self.get)(entity)
    }

    /// Writes `value` into the field of `entity`.
    pub fn set(&self, entity: &mut E, value: SqlValue) -> Result<(), ValueError> {
        (self.set)(entity, value)
    }
}

// Manual impls: fn pointers are Copy whatever E is.
impl<E> Clone for FieldAccessor<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for FieldAccessor<E> {}

impl<E> fmt::Debug for FieldAccessor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldAccessor")
            .field("name", &self.name)
            .field("primary_key", &self.primary_key)
            .finish_non_exhaustive()
    }
}

/// A record type stored in one table.
///
/// `Default` supplies the zero-value instance rows are materialized into;
/// fields whose column is absent or NULL keep their default.
pub trait Entity: Default + 'static {
    /// Field key type naming this entity's logical fields.
    type Key: FieldKey;

    /// Returns the accessor table of every storable field.
    fn accessors() -> Vec<FieldAccessor<Self>>;

    /// Returns the type name used in error messages.
    fn entity_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}
