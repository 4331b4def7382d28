//! Rendered statements: SQL text plus named parameters.
//!
//! Query builders assemble a [`Statement`] clause by clause through a
//! [`StatementBuilder`], binding every value as a named parameter. The
//! result can be inspected in tests without touching a database.

use crate::dialect::Dialect;
use crate::value::SqlValue;

/// A named parameter bound to a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Name without the dialect prefix.
    pub name: String,
    /// Bound value.
    pub value: SqlValue,
}

impl Parameter {
    /// Creates a named parameter.
    pub fn new(name: impl Into<String>, value: SqlValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// SQL text with its parameters, ready to hand to a command.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<Parameter>,
}

impl Statement {
    /// Creates a statement without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Returns the SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Returns the parameters in binding order.
    #[must_use]
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Looks up a parameter value by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&SqlValue> {
        self.params
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    /// Splits the statement into text and parameters.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<Parameter>) {
        (self.sql, self.params)
    }
}

/// Accumulates clauses and parameters for one statement.
pub struct StatementBuilder<'d> {
    dialect: &'d dyn Dialect,
    clauses: Vec<String>,
    params: Vec<Parameter>,
}

impl<'d> StatementBuilder<'d> {
    /// Starts an empty statement for `dialect`.
    #[must_use]
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self {
            dialect,
            clauses: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Returns the dialect used for quoting and placeholders.
    #[must_use]
    pub fn dialect(&self) -> &'d dyn Dialect {
        self.dialect
    }

    /// Appends a clause. Clauses are joined with single spaces.
    pub fn push_clause(&mut self, clause: impl Into<String>) -> &mut Self {
        let clause = clause.into();
        if !clause.is_empty() {
            self.clauses.push(clause);
        }
        self
    }

    /// Binds a value under `name` and returns its placeholder text.
    pub fn bind(&mut self, name: impl Into<String>, value: SqlValue) -> String {
        let name = name.into();
        let placeholder = self.dialect.placeholder(&name);
        self.params.push(Parameter::new(name, value));
        placeholder
    }

    /// Quotes an identifier with the dialect's quotes.
    #[must_use]
    pub fn quote(&self, identifier: &str) -> String {
        self.dialect.quote_identifier(identifier)
    }

    /// Finishes the statement.
    #[must_use]
    pub fn build(self) -> Statement {
        Statement {
            sql: self.clauses.join(" "),
            params: self.params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::SqlCeDialect;

    #[test]
    fn test_clauses_join_and_bind() {
        let dialect = SqlCeDialect::new();
        let mut builder = StatementBuilder::new(&dialect);
        let table = builder.quote("Person");
        builder.push_clause(format!("DELETE FROM {table}"));
        let placeholder = builder.bind("Age0", SqlValue::Int(30));
        builder.push_clause(format!("WHERE [Age] > {placeholder}"));
        let statement = builder.build();

        assert_eq!(statement.sql(), "DELETE FROM [Person] WHERE [Age] > @Age0");
        assert_eq!(statement.params().len(), 1);
        assert_eq!(statement.param("Age0"), Some(&SqlValue::Int(30)));
    }

    #[test]
    fn test_empty_clauses_are_skipped() {
        let dialect = SqlCeDialect::new();
        let mut builder = StatementBuilder::new(&dialect);
        builder.push_clause("SELECT 1").push_clause("");
        assert_eq!(builder.build().sql(), "SELECT 1");
    }
}
