//! Connection-string parsing.
//!
//! Connection strings are `key=value` pairs separated by semicolons, with
//! case-insensitive keys:
//!
//! | key            | value                                              | default           |
//! |----------------|----------------------------------------------------|-------------------|
//! | `Data Source`  | database file path, or `:memory:`                  | required          |
//! | `Mode`         | `ReadWriteCreate`, `ReadWrite`, `ReadOnly`, `Memory` | `ReadWriteCreate` |
//! | `Busy Timeout` | milliseconds to wait on a locked database          | `5000`            |
//! | `Foreign Keys` | `true`/`false` (also `on`/`off`, `yes`/`no`, `1`/`0`) | `true`            |

use std::time::Duration;

use rusqlite::OpenFlags;
use thiserror::Error;

const MEMORY_SOURCE: &str = ":memory:";

/// Errors raised while parsing a connection string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A segment has no `=`.
    #[error("expected key=value, got '{0}'")]
    Malformed(String),

    /// The key is not recognized.
    #[error("unknown connection string key '{0}'")]
    UnknownKey(String),

    /// The key appears more than once.
    #[error("connection string key '{0}' is given twice")]
    DuplicateKey(String),

    /// The value cannot be parsed for its key.
    #[error("invalid value '{value}' for '{key}'")]
    InvalidValue {
        /// Normalized key.
        key: &'static str,
        /// The rejected value.
        value: String,
    },

    /// No data source was given for a file-backed mode.
    #[error("connection string has no Data Source")]
    MissingDataSource,
}

/// How the database file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Read-write, creating the file if needed.
    #[default]
    ReadWriteCreate,
    /// Read-write; the file must exist.
    ReadWrite,
    /// Read-only; the file must exist.
    ReadOnly,
    /// A private in-memory database.
    Memory,
}

impl OpenMode {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "readwritecreate" => Some(Self::ReadWriteCreate),
            "readwrite" => Some(Self::ReadWrite),
            "readonly" => Some(Self::ReadOnly),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Parsed connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Database file path; `:memory:` for in-memory databases.
    pub data_source: String,
    /// Open mode.
    pub mode: OpenMode,
    /// How long to wait for a locked database.
    pub busy_timeout: Duration,
    /// Whether `PRAGMA foreign_keys` is switched on.
    pub foreign_keys: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            data_source: String::new(),
            mode: OpenMode::default(),
            busy_timeout: Duration::from_millis(5000),
            foreign_keys: true,
        }
    }
}

impl ConnectionConfig {
    /// Settings for a private in-memory database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            data_source: MEMORY_SOURCE.to_string(),
            mode: OpenMode::Memory,
            ..Self::default()
        }
    }

    /// Parses a connection string.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for malformed segments, unknown or repeated
    /// keys, unparsable values, or a missing data source.
    pub fn parse(connection_string: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let mut seen: Vec<&'static str> = Vec::new();
        let mut data_source = None;

        for segment in connection_string.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| ConfigError::Malformed(segment.to_string()))?;
            let key = normalize_key(key)?;
            if seen.contains(&key) {
                return Err(ConfigError::DuplicateKey(key.to_string()));
            }
            seen.push(key);

            let value = value.trim();
            match key {
                "Data Source" => data_source = Some(value.to_string()),
                "Mode" => {
                    config.mode = OpenMode::parse(value).ok_or_else(|| invalid(key, value))?;
                }
                "Busy Timeout" => {
                    let millis: u64 = value.parse().map_err(|_| invalid(key, value))?;
                    config.busy_timeout = Duration::from_millis(millis);
                }
                _ => config.foreign_keys = parse_bool(value).ok_or_else(|| invalid(key, value))?,
            }
        }

        match data_source.filter(|s| !s.is_empty()) {
            Some(source) if source == MEMORY_SOURCE => {
                config.mode = OpenMode::Memory;
                config.data_source = source;
            }
            Some(source) => config.data_source = source,
            None if config.mode == OpenMode::Memory => {
                config.data_source = MEMORY_SOURCE.to_string();
            }
            None => return Err(ConfigError::MissingDataSource),
        }
        Ok(config)
    }

    /// Returns the rusqlite open flags for the configured mode.
    #[must_use]
    pub fn open_flags(&self) -> OpenFlags {
        let access = match self.mode {
            OpenMode::ReadWriteCreate | OpenMode::Memory => {
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
            }
            OpenMode::ReadWrite => OpenFlags::SQLITE_OPEN_READ_WRITE,
            OpenMode::ReadOnly => OpenFlags::SQLITE_OPEN_READ_ONLY,
        };
        access | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX
    }
}

fn normalize_key(key: &str) -> Result<&'static str, ConfigError> {
    let compact: String = key
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    match compact.as_str() {
        "datasource" => Ok("Data Source"),
        "mode" => Ok("Mode"),
        "busytimeout" => Ok("Busy Timeout"),
        "foreignkeys" => Ok("Foreign Keys"),
        _ => Err(ConfigError::UnknownKey(key.trim().to_string())),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConnectionConfig::parse("Data Source=app.db").unwrap();
        assert_eq!(config.data_source, "app.db");
        assert_eq!(config.mode, OpenMode::ReadWriteCreate);
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
        assert!(config.foreign_keys);
    }

    #[test]
    fn test_all_keys_case_and_spacing_insensitive() {
        let config = ConnectionConfig::parse(
            " data source = /tmp/x.db ; MODE=ReadOnly;BusyTimeout=250; foreign keys=off;",
        )
        .unwrap();
        assert_eq!(config.data_source, "/tmp/x.db");
        assert_eq!(config.mode, OpenMode::ReadOnly);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert!(!config.foreign_keys);
    }

    #[test]
    fn test_memory_source() {
        let config = ConnectionConfig::parse("Data Source=:memory:").unwrap();
        assert_eq!(config, ConnectionConfig::in_memory());

        let config = ConnectionConfig::parse("Mode=Memory").unwrap();
        assert_eq!(config.data_source, ":memory:");
    }

    #[test]
    fn test_rejections() {
        assert_eq!(
            ConnectionConfig::parse("Data Source=a.db;Pooling=true"),
            Err(ConfigError::UnknownKey("Pooling".into()))
        );
        assert_eq!(
            ConnectionConfig::parse("Data Source=a.db;Data Source=b.db"),
            Err(ConfigError::DuplicateKey("Data Source".into()))
        );
        assert_eq!(
            ConnectionConfig::parse("a.db"),
            Err(ConfigError::Malformed("a.db".into()))
        );
        assert_eq!(
            ConnectionConfig::parse("Data Source=a.db;Busy Timeout=soon"),
            Err(ConfigError::InvalidValue {
                key: "Busy Timeout",
                value: "soon".into(),
            })
        );
        assert_eq!(
            ConnectionConfig::parse("Mode=ReadWrite"),
            Err(ConfigError::MissingDataSource)
        );
        assert_eq!(ConnectionConfig::parse(""), Err(ConfigError::MissingDataSource));
    }

    #[test]
    fn test_open_flags() {
        let read_only = ConnectionConfig {
            mode: OpenMode::ReadOnly,
            ..ConnectionConfig::default()
        };
        assert!(read_only
            .open_flags()
            .contains(OpenFlags::SQLITE_OPEN_READ_ONLY));
        assert!(!read_only.open_flags().contains(OpenFlags::SQLITE_OPEN_CREATE));
    }
}
