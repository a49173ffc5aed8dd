//! Configuration type definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::{MigrateError, Result};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database rows are read from.
    pub source: ConnectionDescriptor,

    /// Database rows are written to.
    pub target: ConnectionDescriptor,

    /// Table copy settings. Only required by `run`.
    #[serde(default)]
    pub migration: Option<MigrationSettings>,
}

/// Structured connection parameters for one database.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    /// Dialect tag: mysql, postgresql, sqlserver, oracle or hana.
    #[serde(alias = "type")]
    pub dialect: String,

    /// Database host.
    #[serde(default)]
    pub host: String,

    /// Port (default: the dialect's standard port).
    #[serde(default)]
    pub port: Option<u16>,

    /// Database (or service) name.
    #[serde(default)]
    pub database: String,

    /// Username.
    #[serde(default, alias = "user")]
    pub username: String,

    /// Password; applied only when non-empty.
    #[serde(default)]
    pub password: Option<String>,

    /// Pre-built connection string used instead of the dialect template.
    #[serde(default)]
    pub connection_string: Option<String>,

    /// PostgreSQL TLS mode (default: "disable").
    #[serde(default)]
    pub ssl_mode: Option<String>,
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("dialect", &self.dialect)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field(
                "connection_string",
                &self.connection_string.as_ref().map(|_| "[REDACTED]"),
            )
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

impl ConnectionDescriptor {
    /// Create a descriptor using the dialect's default port.
    pub fn new(
        dialect: impl Into<String>,
        host: impl Into<String>,
        database: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            dialect: dialect.into(),
            host: host.into(),
            port: None,
            database: database.into(),
            username: username.into(),
            password: None,
            connection_string: None,
            ssl_mode: None,
        }
    }

    /// Set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Use a pre-built connection string.
    pub fn with_connection_string(mut self, connection_string: impl Into<String>) -> Self {
        self.connection_string = Some(connection_string.into());
        self
    }

    /// Resolve the dialect tag.
    pub fn dialect(&self) -> Result<Dialect> {
        self.dialect.parse()
    }

    /// Port to connect to.
    pub fn effective_port(&self, dialect: Dialect) -> u16 {
        self.port.unwrap_or_else(|| dialect.default_port())
    }

    /// Password when one is set and non-empty.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    /// The override connection string when one is set and non-blank.
    pub fn override_string(&self) -> Option<&str> {
        self.connection_string
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }

    /// Connection string for this descriptor.
    ///
    /// The override is used verbatim; otherwise the dialect template is filled
    /// from host, port and database. Fails with `UnsupportedDialect` for an
    /// unknown tag.
    pub fn connection_string(&self) -> Result<String> {
        let dialect = self.dialect()?;
        if let Some(cs) = self.override_string() {
            return Ok(cs.to_string());
        }
        Ok(dialect.connection_string(&self.host, self.effective_port(dialect), &self.database))
    }

    /// Parsed TLS mode.
    pub fn ssl_mode(&self) -> Result<SslMode> {
        SslMode::parse(self.ssl_mode.as_deref().unwrap_or_default())
    }
}

/// TLS modes for PostgreSQL connections, matching libpq's `sslmode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    /// Plain TCP.
    #[default]
    Disable,
    /// TLS without certificate verification.
    Require,
    /// TLS with certificate verification.
    VerifyCa,
    /// TLS with certificate and hostname verification.
    VerifyFull,
}

impl SslMode {
    /// Parse an SSL mode from a string.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "disable" | "" => Ok(SslMode::Disable),
            "require" => Ok(SslMode::Require),
            "verify-ca" => Ok(SslMode::VerifyCa),
            "verify-full" => Ok(SslMode::VerifyFull),
            other => Err(MigrateError::Config(format!(
                "Invalid ssl_mode '{}'. Valid values: disable, require, verify-ca, verify-full",
                other
            ))),
        }
    }

    /// Check if this mode requires TLS.
    pub fn requires_tls(&self) -> bool {
        !matches!(self, SslMode::Disable)
    }
}

/// Table copy settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MigrationSettings {
    /// Table to read.
    pub source_table: String,

    /// Table to write (default: same as `source_table`).
    #[serde(default)]
    pub target_table: Option<String>,

    /// Columns to copy, in order. Empty means all source columns.
    #[serde(default)]
    pub columns: Vec<String>,

    /// Native boolean expression appended after WHERE, verbatim.
    #[serde(default)]
    pub filter: Option<String>,

    /// Create the target table from the source definition.
    #[serde(default)]
    pub create_target_table: bool,

    /// Empty the target table before copying.
    #[serde(default)]
    pub truncate_target_table: bool,

    /// Rows per committed batch (default: 1000).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl MigrationSettings {
    /// Settings for copying `table` onto a table of the same name.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            source_table: table.into(),
            target_table: None,
            columns: Vec::new(),
            filter: None,
            create_target_table: false,
            truncate_target_table: false,
            batch_size: default_batch_size(),
        }
    }
}

/// Default rows per committed batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
