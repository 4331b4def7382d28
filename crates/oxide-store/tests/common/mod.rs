//! In-memory connection that records every call and replays scripted results.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::rc::Rc;

use oxide_store::{
    Connection, DataRow, Dialect, Driver, DriverError, DriverResult, Parameter, SqlCeDialect,
    SqlValue, StoreResult,
};

static DIALECT: SqlCeDialect = SqlCeDialect::new();

/// One scripted row: column name and value pairs.
#[derive(Debug, Clone, Default)]
pub struct Row(pub Vec<(&'static str, SqlValue)>);

impl DataRow for Row {
    fn get(&self, column: &str) -> DriverResult<Option<SqlValue>> {
        Ok(self
            .0
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value.clone()))
    }
}

/// Everything the connection saw, plus what it will answer next.
#[derive(Debug, Default)]
pub struct Script {
    pub log: Vec<String>,
    pub params: Vec<Vec<Parameter>>,
    pub result_sets: VecDeque<Vec<Row>>,
    pub scalars: VecDeque<SqlValue>,
    pub affected: u64,
    pub rows_read: usize,
    pub fail_rollback: bool,
}

pub type Shared = Rc<RefCell<Script>>;

#[derive(Debug, Default)]
pub struct RecordingDriver {
    pub script: Shared,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> Vec<String> {
        self.script.borrow().log.clone()
    }
}

impl Driver for RecordingDriver {
    type Connection = RecordingConnection;

    fn open(&self, connection_string: &str) -> DriverResult<RecordingConnection> {
        if connection_string.is_empty() {
            return Err(DriverError::new("empty connection string"));
        }
        Ok(RecordingConnection {
            script: Rc::clone(&self.script),
        })
    }

    fn dialect(&self) -> &'static dyn Dialect {
        &DIALECT
    }
}

pub struct RecordingConnection {
    script: Shared,
}

impl RecordingConnection {
    fn record(&self, sql: &str, params: &[Parameter]) {
        let mut script = self.script.borrow_mut();
        script.log.push(sql.to_string());
        script.params.push(params.to_vec());
    }
}

impl Connection for RecordingConnection {
    fn begin(&mut self) -> DriverResult<()> {
        self.record("BEGIN", &[]);
        Ok(())
    }

    fn commit(&mut self) -> DriverResult<()> {
        self.record("COMMIT", &[]);
        Ok(())
    }

    fn rollback(&mut self) -> DriverResult<()> {
        self.record("ROLLBACK", &[]);
        if self.script.borrow().fail_rollback {
            return Err(DriverError::new("rollback refused"));
        }
        Ok(())
    }

    fn execute(&mut self, sql: &str, params: &[Parameter]) -> DriverResult<u64> {
        self.record(sql, params);
        Ok(self.script.borrow().affected)
    }

    fn query_scalar(&mut self, sql: &str, params: &[Parameter]) -> DriverResult<SqlValue> {
        self.record(sql, params);
        Ok(self
            .script
            .borrow_mut()
            .scalars
            .pop_front()
            .unwrap_or(SqlValue::Null))
    }

    fn query_rows(
        &mut self,
        sql: &str,
        params: &[Parameter],
        visitor: &mut dyn FnMut(&dyn DataRow) -> StoreResult<ControlFlow<()>>,
    ) -> StoreResult<()> {
        self.record(sql, params);
        let rows = self
            .script
            .borrow_mut()
            .result_sets
            .pop_front()
            .unwrap_or_default();
        for row in &rows {
            self.script.borrow_mut().rows_read += 1;
            if visitor(row)?.is_break() {
                break;
            }
        }
        Ok(())
    }
}
