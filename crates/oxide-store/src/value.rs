//! SQL values and conversions between Rust fields and statement parameters.
//!
//! Every value that crosses the storage boundary (entity getters, filter
//! operands, bound parameters and row cells) travels as a [`SqlValue`].

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// A SQL value that can be bound as a parameter or read from a row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary blob value.
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Returns true for [`SqlValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the name of the variant, used in conversion errors.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
        }
    }

    /// Returns the textual form of a scalar value.
    ///
    /// Blobs and NULL have no textual form.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Int(n) => Some(n.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Null | Self::Blob(_) => None,
        }
    }

    /// Trims surrounding whitespace from text values; other values pass through.
    #[must_use]
    pub fn trimmed(self) -> Self {
        match self {
            Self::Text(s) => {
                let trimmed = s.trim();
                if trimmed.len() == s.len() {
                    Self::Text(s)
                } else {
                    Self::Text(trimmed.to_string())
                }
            }
            other => other,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "'{s}'"),
            Self::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// Failure to convert a [`SqlValue`] into a Rust field type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The value has a different SQL kind than the field accepts.
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        /// What the field accepts.
        expected: &'static str,
        /// What the value was.
        found: &'static str,
    },

    /// An integer does not fit the target type.
    #[error("integer {value} out of range for {target}")]
    OutOfRange {
        /// The rejected value.
        value: i64,
        /// The target Rust type.
        target: &'static str,
    },

    /// A textual value could not be parsed.
    #[error("cannot parse `{text}` as {target}")]
    Parse {
        /// The rejected text.
        text: String,
        /// The target Rust type.
        target: &'static str,
    },
}

/// Trait for types that can be converted to SQL values.
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(self) -> SqlValue;
}

/// Trait for types that can be read back from SQL values.
pub trait FromSqlValue: Sized {
    /// Converts a non-null cell into the field type.
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError>;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl FromSqlValue for SqlValue {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        Ok(value)
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bool(self)
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Bool(b) => Ok(b),
            SqlValue::Int(n) => Ok(n != 0),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl ToSqlValue for i64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(self)
    }
}

impl FromSqlValue for i64 {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Int(n) => Ok(n),
            SqlValue::Bool(b) => Ok(Self::from(b)),
            other => Err(mismatch("integer", &other)),
        }
    }
}

macro_rules! impl_narrow_int {
    ($($ty:ty),+) => {
        $(
            impl ToSqlValue for $ty {
                fn to_sql_value(self) -> SqlValue {
                    SqlValue::Int(i64::from(self))
                }
            }

            impl FromSqlValue for $ty {
                fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
                    let n = i64::from_sql_value(value)?;
                    <$ty>::try_from(n).map_err(|_| ValueError::OutOfRange {
                        value: n,
                        target: stringify!($ty),
                    })
                }
            }
        )+
    };
}

impl_narrow_int!(i32, i16, i8, u32, u16, u8);

impl ToSqlValue for f64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(self)
    }
}

impl FromSqlValue for f64 {
    #[allow(clippy::cast_precision_loss)]
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Float(f) => Ok(f),
            SqlValue::Int(n) => Ok(n as Self),
            other => Err(mismatch("float", &other)),
        }
    }
}

impl ToSqlValue for f32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(f64::from(self))
    }
}

impl FromSqlValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        f64::from_sql_value(value).map(|f| f as Self)
    }
}

impl ToSqlValue for String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self)
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

impl FromSqlValue for String {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Text(s) => Ok(s),
            other => Err(mismatch("text", &other)),
        }
    }
}

impl ToSqlValue for Vec<u8> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self)
    }
}

impl ToSqlValue for &[u8] {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self.to_vec())
    }
}

impl FromSqlValue for Vec<u8> {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Blob(b) => Ok(b),
            other => Err(mismatch("blob", &other)),
        }
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Null => Ok(None),
            other => T::from_sql_value(other).map(Some),
        }
    }
}

impl ToSqlValue for NaiveDateTime {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self.format(DATETIME_FORMAT).to_string())
    }
}

impl FromSqlValue for NaiveDateTime {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        let text = String::from_sql_value(value)?;
        Self::parse_from_str(&text, DATETIME_FORMAT)
            .or_else(|_| Self::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f"))
            .map_err(|_| ValueError::Parse {
                text,
                target: "NaiveDateTime",
            })
    }
}

impl ToSqlValue for NaiveDate {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self.format(DATE_FORMAT).to_string())
    }
}

impl FromSqlValue for NaiveDate {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        let text = String::from_sql_value(value)?;
        Self::parse_from_str(&text, DATE_FORMAT).map_err(|_| ValueError::Parse {
            text,
            target: "NaiveDate",
        })
    }
}

impl ToSqlValue for DateTime<Utc> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self.to_rfc3339())
    }
}

impl FromSqlValue for DateTime<Utc> {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        let text = String::from_sql_value(value)?;
        DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| ValueError::Parse {
                text,
                target: "DateTime<Utc>",
            })
    }
}

/// Reads an optional enum from its textual form.
///
/// Used by fields marked `#[storage(text_enum)]`: the cell may hold the
/// variant name or its numeric discriminant as stored by the writer, and
/// both are fed to `T::from_str`. Writes go through the field's own
/// [`ToSqlValue`] impl.
pub fn parse_text_enum<T: std::str::FromStr>(value: SqlValue) -> Result<Option<T>, ValueError> {
    if value.is_null() {
        return Ok(None);
    }
    let found = value.kind();
    let text = value.to_text().ok_or(ValueError::TypeMismatch {
        expected: "text",
        found,
    })?;
    text.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| ValueError::Parse {
            text,
            target: std::any::type_name::<T>(),
        })
}

const fn mismatch(expected: &'static str, found: &SqlValue) -> ValueError {
    ValueError::TypeMismatch {
        expected,
        found: found.kind(),
    }
}
