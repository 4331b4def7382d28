//! Fluent query builder and SQL generation.
//!
//! A [`Query`] accumulates filters, sort keys and a row cap in memory.
//! Nothing touches the database until a terminal operation
//! (`select_many`, `count`, `insert`, ...) renders a [`Statement`] and runs
//! it through a command handle taken from the context.
//!
//! Every value is bound as a named parameter. Parameters are named after
//! their column plus a counter that only grows for the lifetime
//! of the builder, so two columns or filters never share a placeholder.

use std::cell::Cell;
use std::ops::ControlFlow;

use tracing::debug;

use crate::bindings::TableBinding;
use crate::context::CommandProvider;
use crate::descriptor::{FilterOperator, QueryFilter};
use crate::dialect::Dialect;
use crate::driver::DataRow;
use crate::entity::Entity;
use crate::error::{StoreError, StoreResult};
use crate::statement::{Statement, StatementBuilder};
use crate::value::{FromSqlValue, SqlValue, ToSqlValue, ValueError};

/// Parameter carrying the primary-key value of `update_single`.
const PRIMARY_KEY_PARAM: &str = "PK";

/// Rows fetched by single-row reads: enough to detect a second match.
const SINGLE_ROW_PROBE: u64 = 2;

/// A sort key: field and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SortKey<K> {
    field: K,
    ascending: bool,
}

/// Query builder for one entity type.
///
/// # Example
///
/// ```ignore
/// let adults = ctx
///     .query::<Person>()?
///     .where_all([QueryFilter::gte(PersonField::Age, 18)])
///     .order_by(PersonField::Name, true)?
///     .take(10)
///     .select_many()?;
/// ```
pub struct Query<'a, E: Entity> {
    provider: &'a dyn CommandProvider,
    binding: &'a TableBinding<E>,
    /// Filters combined with AND
    filters_all: Vec<QueryFilter<E::Key>>,
    /// Filters combined with OR
    filters_any: Vec<QueryFilter<E::Key>>,
    ordering: Vec<SortKey<E::Key>>,
    take: Option<u64>,
    parameter_counter: Cell<u32>,
}

impl<'a, E: Entity> Query<'a, E> {
    /// Creates an empty query over `binding`.
    pub fn new(provider: &'a dyn CommandProvider, binding: &'a TableBinding<E>) -> Self {
        Self {
            provider,
            binding,
            filters_all: Vec::new(),
            filters_any: Vec::new(),
            ordering: Vec::new(),
            take: None,
            parameter_counter: Cell::new(0),
        }
    }

    /// Returns the table binding the query runs against.
    #[must_use]
    pub const fn binding(&self) -> &'a TableBinding<E> {
        self.binding
    }

    // ==================== Builder ====================

    /// Replaces the filters that must all hold.
    #[must_use]
    pub fn where_all<I>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = QueryFilter<E::Key>>,
    {
        self.filters_all = filters.into_iter().collect();
        self
    }

    /// Replaces the filters of which at least one must hold.
    #[must_use]
    pub fn where_any<I>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = QueryFilter<E::Key>>,
    {
        self.filters_any = filters.into_iter().collect();
        self
    }

    /// Sets the primary sort key.
    ///
    /// Fails with `AlreadyOrdered` when a sort key exists; use
    /// [`then_by`](Self::then_by) for secondary keys.
    pub fn order_by(mut self, field: E::Key, ascending: bool) -> StoreResult<Self> {
        if !self.ordering.is_empty() {
            return Err(StoreError::AlreadyOrdered);
        }
        self.binding.require(field)?;
        self.ordering.push(SortKey { field, ascending });
        Ok(self)
    }

    /// Appends a secondary sort key.
    ///
    /// Fails with `NoPrimaryOrder` unless [`order_by`](Self::order_by) ran first.
    pub fn then_by(mut self, field: E::Key, ascending: bool) -> StoreResult<Self> {
        if self.ordering.is_empty() {
            return Err(StoreError::NoPrimaryOrder);
        }
        self.binding.require(field)?;
        self.ordering.push(SortKey { field, ascending });
        Ok(self)
    }

    /// Caps the number of rows returned by [`select_many`](Self::select_many).
    ///
    /// Zero removes the cap.
    #[must_use]
    pub fn take(mut self, count: u64) -> Self {
        self.take = (count > 0).then_some(count);
        self
    }

    /// Row offsets are not available.
    pub fn skip(self, _count: u64) -> StoreResult<Self> {
        Err(StoreError::NotSupported("skip"))
    }

    // ==================== Rendering ====================

    /// Renders `SELECT [TOP(n) ]* FROM [table] [WHERE ...] [ORDER BY ...]`.
    pub fn build_select_many(&self) -> StoreResult<Statement> {
        self.build_select(self.take, true)
    }

    /// Renders the two-row probe used by the single-row reads.
    ///
    /// The row cap ignores [`take`](Self::take) and no ORDER BY is emitted.
    pub fn build_select_single(&self) -> StoreResult<Statement> {
        self.build_select(Some(SINGLE_ROW_PROBE), false)
    }

    /// Renders `SELECT COUNT(*) FROM [table] [WHERE ...]`.
    pub fn build_count(&self) -> StoreResult<Statement> {
        let mut builder = StatementBuilder::new(self.dialect());
        let table = builder.quote(self.binding.table_name());
        builder.push_clause(format!("SELECT COUNT(*) FROM {table}"));
        self.render_where(&mut builder)?;
        Ok(builder.build())
    }

    /// Renders `DELETE FROM [table] [WHERE ...]`.
    pub fn build_delete(&self) -> StoreResult<Statement> {
        let mut builder = StatementBuilder::new(self.dialect());
        let table = builder.quote(self.binding.table_name());
        builder.push_clause(format!("DELETE FROM {table}"));
        self.render_where(&mut builder)?;
        Ok(builder.build())
    }

    /// Renders the INSERT for `entity`.
    ///
    /// Null fields are left to the column default, as is an identity key.
    pub fn build_insert(&self, entity: &E) -> StoreResult<Statement> {
        let mut builder = StatementBuilder::new(self.dialect());
        let table = builder.quote(self.binding.table_name());
        let primary_key = self.binding.primary_key();

        let mut columns = Vec::new();
        let mut values = Vec::new();
        for field in self.binding.fields() {
            if self.binding.is_identity() && field.key() == primary_key {
                continue;
            }
            let value = field.accessor().get(entity);
            if value.is_null() {
                continue;
            }
            columns.push(builder.quote(field.column()));
            values.push(builder.bind(self.next_parameter(field.column()), value));
        }

        if columns.is_empty() {
            builder.push_clause(format!("INSERT INTO {table} DEFAULT VALUES"));
        } else {
            builder.push_clause(format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                columns.join(", "),
                values.join(", ")
            ));
        }
        Ok(builder.build())
    }

    /// Renders an UPDATE of `fields`, taken from `entity`, for the row with
    /// the entity's primary key.
    pub fn build_update_single(&self, entity: &E, fields: &[E::Key]) -> StoreResult<Statement> {
        let assignments = fields
            .iter()
            .map(|&key| {
                let field = self.binding.require(key)?;
                Ok((key, field.accessor().get(entity)))
            })
            .collect::<StoreResult<Vec<_>>>()?;

        let mut builder = StatementBuilder::new(self.dialect());
        self.render_update_head(&mut builder, &assignments)?;

        let primary = self.binding.primary_field();
        let column = builder.quote(primary.column());
        let placeholder = builder.bind(PRIMARY_KEY_PARAM, primary.accessor().get(entity));
        builder.push_clause(format!("WHERE {column} = {placeholder}"));
        Ok(builder.build())
    }

    /// Renders an UPDATE assigning `values` to every row matching the filters.
    pub fn build_update_many(&self, values: &[(E::Key, SqlValue)]) -> StoreResult<Statement> {
        let mut builder = StatementBuilder::new(self.dialect());
        self.render_update_head(&mut builder, values)?;
        self.render_where(&mut builder)?;
        Ok(builder.build())
    }

    fn build_select(&self, cap: Option<u64>, ordered: bool) -> StoreResult<Statement> {
        let dialect = self.dialect();
        let mut builder = StatementBuilder::new(dialect);
        let table = builder.quote(self.binding.table_name());
        let top = cap.and_then(|n| dialect.top_clause(n)).unwrap_or_default();
        builder.push_clause(format!("SELECT {top}* FROM {table}"));
        self.render_where(&mut builder)?;
        if ordered {
            self.render_order_by(&mut builder)?;
        }
        if let Some(limit) = cap.and_then(|n| dialect.limit_clause(n)) {
            builder.push_clause(limit);
        }
        Ok(builder.build())
    }

    fn render_update_head(
        &self,
        builder: &mut StatementBuilder<'_>,
        assignments: &[(E::Key, SqlValue)],
    ) -> StoreResult<()> {
        if assignments.is_empty() {
            return Err(StoreError::EmptyAssignment);
        }

        let primary = self.binding.primary_field();
        let mut set = Vec::with_capacity(assignments.len());
        for (key, value) in assignments {
            let field = self.binding.require(*key)?;
            if field.key() == primary.key() {
                return Err(StoreError::PrimaryKeyImmutable {
                    field: primary.accessor().name(),
                });
            }
            let column = builder.quote(field.column());
            let placeholder = builder.bind(self.next_parameter(field.column()), value.clone());
            set.push(format!("{column} = {placeholder}"));
        }

        let table = builder.quote(self.binding.table_name());
        builder.push_clause(format!("UPDATE {table} SET {}", set.join(", ")));
        Ok(())
    }

    fn render_where(&self, builder: &mut StatementBuilder<'_>) -> StoreResult<()> {
        let all = self.render_conditions(builder, &self.filters_all, " AND ")?;
        let any = self.render_conditions(builder, &self.filters_any, " OR ")?;
        let clause = match (all, any) {
            (Some(all), Some(any)) => format!("WHERE ({all}) AND ({any})"),
            (Some(group), None) | (None, Some(group)) => format!("WHERE {group}"),
            (None, None) => return Ok(()),
        };
        builder.push_clause(clause);
        Ok(())
    }

    fn render_conditions(
        &self,
        builder: &mut StatementBuilder<'_>,
        filters: &[QueryFilter<E::Key>],
        separator: &str,
    ) -> StoreResult<Option<String>> {
        if filters.is_empty() {
            return Ok(None);
        }

        let mut conditions = Vec::with_capacity(filters.len());
        for filter in filters {
            let field = self.binding.require(filter.field())?;
            let column = builder.quote(field.column());
            let name = self.next_parameter(field.column());
            let condition = match filter.operator() {
                FilterOperator::Contains => {
                    let needle = filter.value().to_text().ok_or_else(|| StoreError::Conversion {
                        column: field.column().to_string(),
                        source: ValueError::TypeMismatch {
                            expected: "text",
                            found: filter.value().kind(),
                        },
                    })?;
                    let placeholder = builder.bind(name, SqlValue::Text(format!("%{needle}%")));
                    format!("{column} LIKE {placeholder}")
                }
                operator => {
                    let placeholder = builder.bind(name, filter.value().clone());
                    format!("{column} {operator} {placeholder}")
                }
            };
            conditions.push(condition);
        }
        Ok(Some(conditions.join(separator)))
    }

    fn render_order_by(&self, builder: &mut StatementBuilder<'_>) -> StoreResult<()> {
        if self.ordering.is_empty() {
            return Ok(());
        }
        let keys = self
            .ordering
            .iter()
            .map(|sort| {
                let field = self.binding.require(sort.field)?;
                let direction = if sort.ascending { "ASC" } else { "DESC" };
                Ok(format!("{} {direction}", builder.quote(field.column())))
            })
            .collect::<StoreResult<Vec<_>>>()?;
        builder.push_clause(format!("ORDER BY {}", keys.join(", ")));
        Ok(())
    }

    fn next_parameter(&self, column: &str) -> String {
        let index = self.parameter_counter.get();
        self.parameter_counter.set(index + 1);
        format!("{}{index}", parameter_name(column))
    }

    fn dialect(&self) -> &'static dyn Dialect {
        self.provider.dialect()
    }

    // ==================== Execution ====================

    /// Returns every matching row.
    pub fn select_many(&self) -> StoreResult<Vec<E>> {
        let statement = self.build_select_many()?;
        let mut command = self.provider.create_command()?;
        command.load(statement);

        let mut records = Vec::new();
        command.execute_reader(|row| {
            records.push(materialize(self.binding, row)?);
            Ok(ControlFlow::Continue(()))
        })?;
        debug!(table = self.binding.table_name(), rows = records.len(), "selected rows");
        Ok(records)
    }

    /// Returns the only matching row.
    ///
    /// Fails with `NotFound` for no match and `AmbiguousResult` for more
    /// than one.
    pub fn select_single(&self) -> StoreResult<E> {
        self.select_single_or_default()?
            .ok_or(StoreError::NotFound)
    }

    /// Returns the only matching row, or `None` when nothing matches.
    ///
    /// Fails with `AmbiguousResult` for more than one match.
    pub fn select_single_or_default(&self) -> StoreResult<Option<E>> {
        let statement = self.build_select_single()?;
        let mut command = self.provider.create_command()?;
        command.load(statement);

        let mut found = None;
        let mut ambiguous = false;
        command.execute_reader(|row| {
            if found.is_some() {
                ambiguous = true;
                return Ok(ControlFlow::Break(()));
            }
            found = Some(materialize(self.binding, row)?);
            Ok(ControlFlow::Continue(()))
        })?;

        if ambiguous {
            return Err(StoreError::AmbiguousResult);
        }
        Ok(found)
    }

    /// Counts matching rows.
    pub fn count(&self) -> StoreResult<i64> {
        let statement = self.build_count()?;
        let mut command = self.provider.create_command()?;
        command.load(statement);

        let value = command.execute_scalar()?;
        let count = match value {
            SqlValue::Null => 0,
            value => i64::from_sql_value(value).map_err(|source| StoreError::Conversion {
                column: "COUNT(*)".to_string(),
                source,
            })?,
        };
        Ok(count)
    }

    /// Deletes matching rows and returns how many were removed.
    ///
    /// Without filters every row of the table is deleted.
    pub fn delete(&self) -> StoreResult<u64> {
        let statement = self.build_delete()?;
        let mut command = self.provider.create_command()?;
        command.load(statement);
        command.execute_non_query()
    }

    /// Inserts `entity`.
    ///
    /// For an identity key the generated value is read back on the same
    /// command and written into the entity.
    pub fn insert(&self, entity: &mut E) -> StoreResult<()> {
        let statement = self.build_insert(entity)?;
        let mut command = self.provider.create_command()?;
        command.load(statement);
        command.execute_non_query()?;

        if !self.binding.is_identity() {
            return Ok(());
        }

        command.set_text(self.dialect().last_identity_sql());
        command.clear_parameters();
        let identity = normalize_identity(command.execute_scalar()?);
        debug!(table = self.binding.table_name(), identity = %identity, "generated key");

        let primary = self.binding.primary_field();
        primary
            .accessor()
            .set(entity, identity)
            .map_err(|source| StoreError::Conversion {
                column: primary.column().to_string(),
                source,
            })
    }

    /// Writes `fields` of `entity` to the row with the entity's primary key.
    ///
    /// Returns the number of rows changed; zero means no row has that key.
    pub fn update_single(&self, entity: &E, fields: &[E::Key]) -> StoreResult<u64> {
        let statement = self.build_update_single(entity, fields)?;
        let mut command = self.provider.create_command()?;
        command.load(statement);
        command.execute_non_query()
    }

    /// Assigns `values` to every matching row and returns how many changed.
    ///
    /// Assigning the primary key fails with `PrimaryKeyImmutable` before
    /// any command is created.
    pub fn update_many<I, V>(&self, values: I) -> StoreResult<u64>
    where
        I: IntoIterator<Item = (E::Key, V)>,
        V: ToSqlValue,
    {
        let values: Vec<(E::Key, SqlValue)> = values
            .into_iter()
            .map(|(key, value)| (key, value.to_sql_value()))
            .collect();
        let statement = self.build_update_many(&values)?;
        let mut command = self.provider.create_command()?;
        command.load(statement);
        command.execute_non_query()
    }
}

/// Builds an entity from one row.
///
/// Absent and NULL columns keep the entity's default; text is trimmed.
fn materialize<E: Entity>(binding: &TableBinding<E>, row: &dyn DataRow) -> StoreResult<E> {
    let mut entity = E::default();
    for field in binding.fields() {
        let Some(value) = row.get(field.column())? else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        field
            .accessor()
            .set(&mut entity, value.trimmed())
            .map_err(|source| StoreError::Conversion {
                column: field.column().to_string(),
                source,
            })?;
    }
    Ok(entity)
}

/// Identity queries may report the key as a float or numeric text.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn normalize_identity(value: SqlValue) -> SqlValue {
    match value {
        SqlValue::Float(f) if f.fract() == 0.0 => SqlValue::Int(f as i64),
        SqlValue::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_or(SqlValue::Text(s), SqlValue::Int),
        other => other,
    }
}

/// Parameter names keep only identifier characters of the column.
fn parameter_name(column: &str) -> String {
    column
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
