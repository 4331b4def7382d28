//! SQL dialect support.
//!
//! Statements are generated with bracket-quoted identifiers and `@name`
//! placeholders. The dialect decides how a row cap is written and how the
//! last generated identity is fetched after an insert.

/// Trait for SQL dialect-specific behavior.
pub trait Dialect: Send + Sync {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Returns the opening and closing identifier quotes.
    fn identifier_quotes(&self) -> (char, char) {
        ('[', ']')
    }

    /// Returns the parameter placeholder prefix.
    fn parameter_prefix(&self) -> char {
        '@'
    }

    /// Quotes an identifier.
    fn quote_identifier(&self, name: &str) -> String {
        let (open, close) = self.identifier_quotes();
        format!("{open}{name}{close}")
    }

    /// Renders a placeholder for a named parameter.
    fn placeholder(&self, name: &str) -> String {
        format!("{}{name}", self.parameter_prefix())
    }

    /// Text inserted right after `SELECT` to cap the row count, if any.
    fn top_clause(&self, limit: u64) -> Option<String> {
        Some(format!("TOP({limit}) "))
    }

    /// Text appended after `ORDER BY` to cap the row count, if any.
    fn limit_clause(&self, _limit: u64) -> Option<String> {
        None
    }

    /// Query returning the identity generated by the last insert.
    fn last_identity_sql(&self) -> &'static str {
        "SELECT @@IDENTITY"
    }
}

/// SQL Server Compact style dialect: `TOP(n)` and `@@IDENTITY`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlCeDialect;

impl SqlCeDialect {
    /// Creates the dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqlCeDialect {
    fn name(&self) -> &'static str {
        "sqlce"
    }
}

/// SQLite dialect: trailing `LIMIT n` and `last_insert_rowid()`.
///
/// SQLite accepts bracket-quoted identifiers and `@name` parameters, so
/// only the row cap and identity query differ.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates the dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn top_clause(&self, _limit: u64) -> Option<String> {
        None
    }

    fn limit_clause(&self, limit: u64) -> Option<String> {
        Some(format!("LIMIT {limit}"))
    }

    fn last_identity_sql(&self) -> &'static str {
        "SELECT last_insert_rowid()"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlce_dialect() {
        let dialect = SqlCeDialect::new();
        assert_eq!(dialect.name(), "sqlce");
        assert_eq!(dialect.quote_identifier("Person"), "[Person]");
        assert_eq!(dialect.placeholder("Name0"), "@Name0");
        assert_eq!(dialect.top_clause(2).as_deref(), Some("TOP(2) "));
        assert!(dialect.limit_clause(2).is_none());
        assert_eq!(dialect.last_identity_sql(), "SELECT @@IDENTITY");
    }

    #[test]
    fn test_sqlite_dialect() {
        let dialect = SqliteDialect::new();
        assert_eq!(dialect.quote_identifier("Person"), "[Person]");
        assert!(dialect.top_clause(5).is_none());
        assert_eq!(dialect.limit_clause(5).as_deref(), Some("LIMIT 5"));
        assert_eq!(dialect.last_identity_sql(), "SELECT last_insert_rowid()");
    }
}
