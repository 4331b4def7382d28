//! Storage context: one connection, one implicit transaction.
//!
//! A [`StorageContext`] opens its physical connection on construction and
//! keeps it until disposed. The first command begins a transaction that
//! every later command shares until [`StorageContext::save_changes`]
//! commits it. Disposing (explicitly or on drop) rolls back whatever was
//! not saved.
//!
//! The context keeps its connection in a `RefCell`, so it is not `Sync`:
//! sharing one context between threads does not compile.

use std::cell::{Cell, RefCell, RefMut};
use std::ops::ControlFlow;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::bindings::{self, BindingRegistry};
use crate::dialect::Dialect;
use crate::driver::{Connection, DataRow, Driver};
use crate::entity::Entity;
use crate::error::{StoreError, StoreResult};
use crate::query::Query;
use crate::statement::{Parameter, Statement};
use crate::value::{SqlValue, ToSqlValue};

/// Supplies command handles and the dialect to query builders.
pub trait CommandProvider {
    /// Returns a command bound to the shared connection and transaction.
    fn create_command(&self) -> StoreResult<Command<'_>>;

    /// Returns the dialect statements are rendered in.
    fn dialect(&self) -> &'static dyn Dialect;
}

/// A command handle: SQL text and parameters bound to the context's
/// connection and open transaction.
///
/// The handle holds the connection exclusively until it is dropped.
pub struct Command<'a> {
    connection: RefMut<'a, dyn Connection + 'static>,
    text: String,
    params: Vec<Parameter>,
}

impl Command<'_> {
    /// Returns the command text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the command text.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Returns the bound parameters.
    #[must_use]
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Adds a named parameter.
    pub fn add_parameter(&mut self, name: impl Into<String>, value: impl ToSqlValue) {
        self.params
            .push(Parameter::new(name, value.to_sql_value()));
    }

    /// Removes every parameter.
    pub fn clear_parameters(&mut self) {
        self.params.clear();
    }

    /// Replaces text and parameters with a rendered statement.
    pub fn load(&mut self, statement: Statement) {
        let (text, params) = statement.into_parts();
        self.text = text;
        self.params = params;
    }

    /// Executes the command and returns the number of affected rows.
    pub fn execute_non_query(&mut self) -> StoreResult<u64> {
        debug!(sql = %self.text, params = self.params.len(), "executing non-query");
        Ok(self.connection.execute(&self.text, &self.params)?)
    }

    /// Executes the command and returns the first cell of the first row.
    pub fn execute_scalar(&mut self) -> StoreResult<SqlValue> {
        debug!(sql = %self.text, params = self.params.len(), "executing scalar");
        Ok(self.connection.query_scalar(&self.text, &self.params)?)
    }

    /// Executes the command and feeds each row to `visitor` until it breaks.
    pub fn execute_reader<F>(&mut self, mut visitor: F) -> StoreResult<()>
    where
        F: FnMut(&dyn DataRow) -> StoreResult<ControlFlow<()>>,
    {
        debug!(sql = %self.text, params = self.params.len(), "executing reader");
        self.connection
            .query_rows(&self.text, &self.params, &mut visitor)
    }
}

/// Owns one physical connection and the transaction spanning its commands.
pub struct StorageContext<C: Connection + 'static> {
    connection_string: String,
    dialect: &'static dyn Dialect,
    registry: Arc<BindingRegistry>,
    /// `None` once disposed.
    connection: RefCell<Option<C>>,
    transaction_open: Cell<bool>,
}

impl<C: Connection + 'static> StorageContext<C> {
    /// Opens a context with the process-wide bindings.
    ///
    /// Fails with `RegistryNotInitialized` unless [`bindings::initialize`]
    /// has run.
    pub fn open<D>(driver: &D, connection_string: &str) -> StoreResult<Self>
    where
        D: Driver<Connection = C>,
    {
        let registry = bindings::global()?;
        Self::with_registry(driver, connection_string, registry)
    }

    /// Opens a context with an explicit registry.
    pub fn with_registry<D>(
        driver: &D,
        connection_string: &str,
        registry: Arc<BindingRegistry>,
    ) -> StoreResult<Self>
    where
        D: Driver<Connection = C>,
    {
        let connection = driver.open(connection_string)?;
        info!(dialect = driver.dialect().name(), "storage context opened");
        let mut context = Self::from_connection(connection, driver.dialect(), registry);
        context.connection_string = connection_string.to_string();
        Ok(context)
    }

    /// Wraps an already open connection.
    pub fn from_connection(
        connection: C,
        dialect: &'static dyn Dialect,
        registry: Arc<BindingRegistry>,
    ) -> Self {
        Self {
            connection_string: String::new(),
            dialect,
            registry,
            connection: RefCell::new(Some(connection)),
            transaction_open: Cell::new(false),
        }
    }

    /// Returns the connection string the context was opened with.
    #[must_use]
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// Returns a query builder for `E`.
    pub fn query<E: Entity>(&self) -> StoreResult<Query<'_, E>> {
        let binding = self.registry.binding::<E>()?;
        Ok(Query::new(self, binding))
    }

    /// Returns true while a transaction is open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.transaction_open.get()
    }

    /// Returns true once the context has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        // A live command keeps the connection borrowed, so the context is open.
        self.connection
            .try_borrow()
            .is_ok_and(|connection| connection.is_none())
    }

    /// Commits the open transaction, if any.
    ///
    /// The next command starts a fresh transaction.
    pub fn save_changes(&self) -> StoreResult<()> {
        let mut guard = self.lock()?;
        let Some(connection) = guard.as_mut() else {
            return Err(StoreError::ConnectionClosed);
        };
        if self.transaction_open.get() {
            connection.commit()?;
            self.transaction_open.set(false);
            info!("transaction committed");
        }
        Ok(())
    }

    /// Rolls back unsaved work and releases the connection.
    ///
    /// Calling it again is a no-op.
    pub fn dispose(&self) -> StoreResult<()> {
        let mut guard = self.lock()?;
        let Some(mut connection) = guard.take() else {
            return Ok(());
        };
        drop(guard);
        let open = self.transaction_open.replace(false);
        let result = if open {
            debug!("rolling back unsaved transaction");
            connection.rollback().map_err(StoreError::from)
        } else {
            Ok(())
        };
        drop(connection);
        debug!("storage context disposed");
        result
    }

    fn lock(&self) -> StoreResult<RefMut<'_, Option<C>>> {
        self.connection
            .try_borrow_mut()
            .map_err(|_| StoreError::ConnectionBusy)
    }
}

impl<C: Connection + 'static> CommandProvider for StorageContext<C> {
    fn create_command(&self) -> StoreResult<Command<'_>> {
        let mut guard = self.lock()?;
        let Some(connection) = guard.as_mut() else {
            return Err(StoreError::ConnectionClosed);
        };
        if !self.transaction_open.get() {
            connection.begin()?;
            self.transaction_open.set(true);
            debug!("transaction started");
        }

        let connection = RefMut::filter_map(guard, connection_of::<C>)
            .map_err(|_| StoreError::ConnectionClosed)?;
        Ok(Command {
            connection,
            text: String::new(),
            params: Vec::new(),
        })
    }

    fn dialect(&self) -> &'static dyn Dialect {
        self.dialect
    }
}

impl<C: Connection + 'static> Drop for StorageContext<C> {
    fn drop(&mut self) {
        if let Err(err) = self.dispose() {
            warn!(error = %err, "rollback failed while disposing storage context");
        }
    }
}

fn connection_of<C: Connection + 'static>(
    slot: &mut Option<C>,
) -> Option<&mut (dyn Connection + 'static)> {
    slot.as_mut()
        .map(|c| c as &mut (dyn Connection + 'static))
}
