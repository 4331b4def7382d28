//! Binding registry: which table, columns and primary key belong to an entity.
//!
//! # Initialization order
//!
//! Every entity must be registered before any query runs. Applications do
//! this with a single call to [`initialize`] at startup; the setup closure
//! runs exactly once per process even when several threads race to call
//! it, and the resulting registry is immutable. Tests and embedded uses
//! can skip the global and build a [`BindingRegistry`] directly.
//!
//! ```rust
//! use oxide_store::bindings;
//!
//! let registry = bindings::initialize(|_builder| {
//!     // builder.register::<Person, _>("Person", descriptors)?;
//!     Ok(())
//! })
//! .unwrap();
//! assert!(registry.is_empty());
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::descriptor::TableFieldDescriptor;
use crate::entity::{Entity, FieldAccessor};
use crate::error::{StoreError, StoreResult};

static GLOBAL_REGISTRY: OnceCell<Arc<BindingRegistry>> = OnceCell::new();

/// One bound field: its descriptor joined with the entity accessor.
pub struct BoundField<E: Entity> {
    descriptor: TableFieldDescriptor<E::Key>,
    accessor: FieldAccessor<E>,
}

impl<E: Entity> BoundField<E> {
    /// Returns the field key.
    #[must_use]
    pub fn key(&self) -> E::Key {
        self.descriptor.field_key()
    }

    /// Returns the table-side column name.
    #[must_use]
    pub fn column(&self) -> &str {
        self.descriptor.column_name()
    }

    /// Returns the descriptor.
    #[must_use]
    pub const fn descriptor(&self) -> &TableFieldDescriptor<E::Key> {
        &self.descriptor
    }

    /// Returns the accessor.
    #[must_use]
    pub const fn accessor(&self) -> &FieldAccessor<E> {
        &self.accessor
    }
}

/// Table binding of one entity type.
pub struct TableBinding<E: Entity> {
    table_name: String,
    fields: Vec<BoundField<E>>,
    index: HashMap<E::Key, usize>,
    primary_index: usize,
    identity: bool,
}

impl<E: Entity> TableBinding<E> {
    /// Resolves `descriptors` against the entity's accessors.
    ///
    /// # Errors
    /// - `DuplicateFieldKey` when two descriptors share a key.
    /// - `UnknownField` when a descriptor names a field the entity lacks.
    /// - `MultiplePrimaryKeys` when more than one bound field is marked.
    /// - `MissingPrimaryKey` when no bound field is marked.
    pub fn new<I>(table_name: &str, descriptors: I) -> StoreResult<Self>
    where
        I: IntoIterator<Item = TableFieldDescriptor<E::Key>>,
    {
        let entity = E::entity_name();
        let accessors = E::accessors();

        let mut fields: Vec<BoundField<E>> = Vec::new();
        let mut index = HashMap::new();
        let mut primary: Option<(usize, bool)> = None;

        for descriptor in descriptors {
            let key = descriptor.field_key();
            if index.contains_key(&key) {
                return Err(StoreError::DuplicateFieldKey {
                    entity,
                    key: format!("{key:?}"),
                });
            }

            let accessor = accessors
                .iter()
                .find(|a| a.name() == descriptor.field_name())
                .copied()
                .ok_or_else(|| StoreError::UnknownField {
                    entity,
                    field: descriptor.field_name().to_string(),
                })?;

            if let Some(marker) = accessor.primary_key_marker() {
                if let Some((existing, _)) = primary {
                    return Err(StoreError::MultiplePrimaryKeys {
                        entity,
                        first: fields[existing].accessor.name(),
                        second: accessor.name(),
                    });
                }
                primary = Some((fields.len(), marker.is_identity()));
            }

            index.insert(key, fields.len());
            fields.push(BoundField {
                descriptor,
                accessor,
            });
        }

        let (primary_index, identity) = primary.ok_or(StoreError::MissingPrimaryKey { entity })?;

        Ok(Self {
            table_name: table_name.to_string(),
            fields,
            index,
            primary_index,
            identity,
        })
    }

    /// Returns the table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Returns the bound fields in registration order.
    #[must_use]
    pub fn fields(&self) -> &[BoundField<E>] {
        &self.fields
    }

    /// Returns the bound field for `key`, if any.
    #[must_use]
    pub fn field(&self, key: E::Key) -> Option<&BoundField<E>> {
        self.index.get(&key).map(|&i| &self.fields[i])
    }

    /// Returns the bound field for `key` or an `UnboundField` error.
    pub fn require(&self, key: E::Key) -> StoreResult<&BoundField<E>> {
        self.field(key).ok_or_else(|| StoreError::UnboundField {
            table: self.table_name.clone(),
            key: format!("{key:?}"),
        })
    }

    /// Returns the primary-key field.
    #[must_use]
    pub fn primary_field(&self) -> &BoundField<E> {
        &self.fields[self.primary_index]
    }

    /// Returns the primary-key field key.
    #[must_use]
    pub fn primary_key(&self) -> E::Key {
        self.primary_field().key()
    }

    /// Returns the primary-key column name.
    #[must_use]
    pub fn primary_column(&self) -> &str {
        self.primary_field().column()
    }

    /// Returns true when the database generates the primary key.
    #[must_use]
    pub const fn is_identity(&self) -> bool {
        self.identity
    }
}

/// Immutable set of table bindings keyed by entity type.
#[derive(Default)]
pub struct BindingRegistry {
    tables: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl BindingRegistry {
    /// Starts building a registry.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Returns the binding of `E`.
    pub fn binding<E: Entity>(&self) -> StoreResult<&TableBinding<E>> {
        self.tables
            .get(&TypeId::of::<E>())
            .and_then(|b| b.downcast_ref::<TableBinding<E>>())
            .ok_or(StoreError::NotRegistered {
                entity: E::entity_name(),
            })
    }

    /// Returns true when `E` has a binding.
    #[must_use]
    pub fn contains<E: Entity>(&self) -> bool {
        self.tables.contains_key(&TypeId::of::<E>())
    }

    /// Returns the number of bound entity types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true when nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Collects bindings before the registry is frozen.
#[derive(Default)]
pub struct RegistryBuilder {
    registry: BindingRegistry,
}

impl RegistryBuilder {
    /// Registers `E` against `table_name`.
    ///
    /// Registering the same entity again replaces its binding.
    pub fn register<E, I>(&mut self, table_name: &str, descriptors: I) -> StoreResult<&mut Self>
    where
        E: Entity,
        I: IntoIterator<Item = TableFieldDescriptor<E::Key>>,
    {
        let binding = TableBinding::<E>::new(table_name, descriptors)?;
        debug!(
            entity = E::entity_name(),
            table = table_name,
            fields = binding.fields().len(),
            identity = binding.is_identity(),
            "registered table binding"
        );
        self.registry
            .tables
            .insert(TypeId::of::<E>(), Box::new(binding));
        Ok(self)
    }

    /// Freezes the registry.
    #[must_use]
    pub fn build(self) -> BindingRegistry {
        self.registry
    }
}

/// Runs `setup` once per process and publishes the resulting registry.
///
/// Concurrent callers block until the first setup finishes; later calls
/// return the published registry without running their closure. A failed
/// setup publishes nothing, so a later call may retry.
pub fn initialize<F>(setup: F) -> StoreResult<Arc<BindingRegistry>>
where
    F: FnOnce(&mut RegistryBuilder) -> StoreResult<()>,
{
    GLOBAL_REGISTRY
        .get_or_try_init(|| -> StoreResult<Arc<BindingRegistry>> {
            let mut builder = BindingRegistry::builder();
            setup(&mut builder)?;
            let registry = builder.build();
            info!(entities = registry.len(), "bindings initialized");
            Ok(Arc::new(registry))
        })
        .cloned()
}

/// Returns the process-wide registry.
pub fn global() -> StoreResult<Arc<BindingRegistry>> {
    GLOBAL_REGISTRY
        .get()
        .cloned()
        .ok_or(StoreError::RegistryNotInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{descriptors, Person, PersonField};

    #[test]
    fn test_binding_resolves_primary_key() {
        let binding = TableBinding::<Person>::new("Person", descriptors()).unwrap();
        assert_eq!(binding.table_name(), "Person");
        assert_eq!(binding.primary_key(), PersonField::Id);
        assert_eq!(binding.primary_column(), "person_id");
        assert!(binding.is_identity());
        assert_eq!(binding.fields().len(), 4);
        assert_eq!(binding.require(PersonField::Age).unwrap().column(), "Age");
    }

    #[test]
    fn test_missing_primary_key() {
        let without_id = descriptors().into_iter().skip(1);
        let err = TableBinding::<Person>::new("Person", without_id)
            .err()
            .unwrap();
        assert!(matches!(err, StoreError::MissingPrimaryKey { .. }));
    }

    #[test]
    fn test_unknown_field() {
        let mut d = descriptors();
        d.push(TableFieldDescriptor::new(PersonField::Age, "Birthday").unwrap());
        d.remove(2);
        let err = TableBinding::<Person>::new("Person", d).err().unwrap();
        assert!(matches!(err, StoreError::UnknownField { field, .. } if field == "Birthday"));
    }

    #[test]
    fn test_duplicate_field_key() {
        let mut d = descriptors();
        d.push(TableFieldDescriptor::new(PersonField::Name, "Age").unwrap());
        let err = TableBinding::<Person>::new("Person", d).err().unwrap();
        assert!(matches!(err, StoreError::DuplicateFieldKey { .. }));
    }

    #[test]
    fn test_registry_lookup() {
        let mut builder = BindingRegistry::builder();
        builder.register::<Person, _>("Person", descriptors()).unwrap();
        let registry = builder.build();

        assert_eq!(registry.len(), 1);
        assert!(registry.contains::<Person>());
        assert_eq!(registry.binding::<Person>().unwrap().table_name(), "Person");
    }

    #[test]
    fn test_unregistered_entity() {
        let registry = BindingRegistry::builder().build();
        let err = registry.binding::<Person>().err().unwrap();
        assert!(matches!(err, StoreError::NotRegistered { .. }));
    }
}
