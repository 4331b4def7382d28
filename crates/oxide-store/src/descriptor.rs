//! Field descriptors and query filters keyed by application field keys.

use std::fmt;

use crate::entity::FieldKey;
use crate::error::{StoreError, StoreResult};
use crate::value::{SqlValue, ToSqlValue};

/// Maps a field key to an entity-side field name and a table column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFieldDescriptor<K> {
    field_key: K,
    field_name: String,
    column_name: String,
}

impl<K: FieldKey> TableFieldDescriptor<K> {
    /// Creates a descriptor whose column is named like the field.
    ///
    /// Fails with `InvalidDescriptor` when `field_name` is empty.
    pub fn new(field_key: K, field_name: &str) -> StoreResult<Self> {
        Self::with_column(field_key, field_name, None)
    }

    /// Creates a descriptor with an explicit column name.
    ///
    /// A `None` or empty column falls back to `field_name`.
    pub fn with_column(
        field_key: K,
        field_name: &str,
        column_name: Option<&str>,
    ) -> StoreResult<Self> {
        let field_name = field_name.trim();
        if field_name.is_empty() {
            return Err(StoreError::InvalidDescriptor(format!(
                "field key {field_key:?} has no entity-side field name"
            )));
        }
        let column_name = column_name
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(field_name);

        Ok(Self {
            field_key,
            field_name: field_name.to_string(),
            column_name: column_name.to_string(),
        })
    }

    /// Returns the field key.
    #[must_use]
    pub const fn field_key(&self) -> K {
        self.field_key
    }

    /// Returns the entity-side field name.
    #[must_use]
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Returns the table-side column name.
    #[must_use]
    pub fn column_name(&self) -> &str {
        &self.column_name
    }
}

/// Comparison operators usable in a [`QueryFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal (=)
    Equals,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal (>=)
    GreaterThanOrEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal (<=)
    LessThanOrEqual,
    /// Substring match (LIKE %value%)
    Contains,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals => write!(f, "="),
            Self::GreaterThan => write!(f, ">"),
            Self::GreaterThanOrEqual => write!(f, ">="),
            Self::LessThan => write!(f, "<"),
            Self::LessThanOrEqual => write!(f, "<="),
            Self::Contains => write!(f, "LIKE"),
        }
    }
}

/// One WHERE predicate: field, operator and operand.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFilter<K> {
    field: K,
    operator: FilterOperator,
    value: SqlValue,
}

impl<K: FieldKey> QueryFilter<K> {
    /// Creates a filter.
    pub fn new<V: ToSqlValue>(field: K, operator: FilterOperator, value: V) -> Self {
        Self {
            field,
            operator,
            value: value.to_sql_value(),
        }
    }

    /// Creates an equality filter (field = value).
    pub fn eq<V: ToSqlValue>(field: K, value: V) -> Self {
        Self::new(field, FilterOperator::Equals, value)
    }

    /// Creates a greater-than filter (field > value).
    pub fn gt<V: ToSqlValue>(field: K, value: V) -> Self {
        Self::new(field, FilterOperator::GreaterThan, value)
    }

    /// Creates a greater-than-or-equal filter (field >= value).
    pub fn gte<V: ToSqlValue>(field: K, value: V) -> Self {
        Self::new(field, FilterOperator::GreaterThanOrEqual, value)
    }

    /// Creates a less-than filter (field < value).
    pub fn lt<V: ToSqlValue>(field: K, value: V) -> Self {
        Self::new(field, FilterOperator::LessThan, value)
    }

    /// Creates a less-than-or-equal filter (field <= value).
    pub fn lte<V: ToSqlValue>(field: K, value: V) -> Self {
        Self::new(field, FilterOperator::LessThanOrEqual, value)
    }

    /// Creates a substring filter (field LIKE %value%).
    pub fn contains<V: ToSqlValue>(field: K, value: V) -> Self {
        Self::new(field, FilterOperator::Contains, value)
    }

    /// Returns the filtered field key.
    #[must_use]
    pub const fn field(&self) -> K {
        self.field
    }

    /// Returns the operator.
    #[must_use]
    pub const fn operator(&self) -> FilterOperator {
        self.operator
    }

    /// Returns the operand.
    #[must_use]
    pub const fn value(&self) -> &SqlValue {
        &self.value
    }
}
