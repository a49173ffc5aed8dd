//! Error types for the migration library.

use serde::Serialize;
use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Host unreachable, credentials rejected, or driver unavailable.
    #[error("Connection error ({dialect}): {message}")]
    Connection { dialect: String, message: String },

    /// Dialect tag outside the supported set.
    #[error("Unsupported database type: {0}")]
    UnsupportedDialect(String),

    /// Metadata query failed (after any dialect fallback).
    #[error("Schema lookup failed for table {table}: {message}")]
    SchemaLookup { table: String, message: String },

    /// CREATE TABLE or TRUNCATE failed on the target.
    #[error("DDL execution failed: {message}\n  Statement: {statement}")]
    DdlExecution { statement: String, message: String },

    /// A batch insert or its commit failed; terminates the copy loop.
    #[error("Batch execution failed for table {table}: {message}")]
    BatchExecution { table: String, message: String },

    /// A single row could not be decoded or bound. Recoverable.
    #[error("Row conversion failed: {message}")]
    RowConversion { message: String },

    /// MySQL driver error
    #[error("MySQL error: {0}")]
    Mysql(#[from] sqlx::Error),

    /// PostgreSQL driver error
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// SQL Server driver error
    #[error("SQL Server error: {0}")]
    Mssql(#[from] tiberius::error::Error),

    /// ODBC driver error (Oracle, HANA)
    #[cfg(feature = "odbc")]
    #[error("ODBC error: {0}")]
    Odbc(#[from] odbc_api::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of a [`MigrateError`], kept on failed results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Connection,
    UnsupportedDialect,
    SchemaLookup,
    DdlExecution,
    BatchExecution,
    RowConversion,
    Database,
    Io,
}

impl ErrorKind {
    /// Process exit code used by the CLI.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Config => 1,
            ErrorKind::Connection => 2,
            ErrorKind::UnsupportedDialect => 3,
            ErrorKind::SchemaLookup => 4,
            ErrorKind::DdlExecution => 5,
            ErrorKind::BatchExecution => 6,
            ErrorKind::Io => 7,
            ErrorKind::RowConversion | ErrorKind::Database => 8,
        }
    }
}

impl MigrateError {
    /// Create a Connection error for a dialect.
    pub fn connection(dialect: impl Into<String>, message: impl ToString) -> Self {
        MigrateError::Connection {
            dialect: dialect.into(),
            message: message.to_string(),
        }
    }

    /// Create a SchemaLookup error
    pub fn schema_lookup(table: impl Into<String>, message: impl ToString) -> Self {
        MigrateError::SchemaLookup {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create a DdlExecution error
    pub fn ddl(statement: impl Into<String>, message: impl ToString) -> Self {
        MigrateError::DdlExecution {
            statement: statement.into(),
            message: message.to_string(),
        }
    }

    /// Create a BatchExecution error
    pub fn batch(table: impl Into<String>, message: impl ToString) -> Self {
        MigrateError::BatchExecution {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create a RowConversion error
    pub fn row_conversion(message: impl ToString) -> Self {
        MigrateError::RowConversion {
            message: message.to_string(),
        }
    }

    /// Only single-row failures are absorbed by the copy loop.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MigrateError::RowConversion { .. })
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) => ErrorKind::Config,
            MigrateError::Connection { .. } => ErrorKind::Connection,
            MigrateError::UnsupportedDialect(_) => ErrorKind::UnsupportedDialect,
            MigrateError::SchemaLookup { .. } => ErrorKind::SchemaLookup,
            MigrateError::DdlExecution { .. } => ErrorKind::DdlExecution,
            MigrateError::BatchExecution { .. } => ErrorKind::BatchExecution,
            MigrateError::RowConversion { .. } => ErrorKind::RowConversion,
            MigrateError::Io(_) => ErrorKind::Io,
            _ => ErrorKind::Database,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        self.kind().exit_code()
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_row_conversion_is_recoverable() {
        assert!(MigrateError::row_conversion("bad date").is_recoverable());
        assert!(!MigrateError::batch("orders", "duplicate key").is_recoverable());
        assert!(!MigrateError::ddl("CREATE TABLE t (a INT)", "exists").is_recoverable());
        assert!(!MigrateError::connection("mysql", "refused").is_recoverable());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(MigrateError::Config("x".into()).exit_code(), 1);
        assert_eq!(MigrateError::connection("hana", "x").exit_code(), 2);
        assert_eq!(MigrateError::UnsupportedDialect("db2".into()).exit_code(), 3);
        assert_eq!(MigrateError::schema_lookup("t", "x").exit_code(), 4);
        assert_eq!(MigrateError::ddl("TRUNCATE TABLE t", "x").exit_code(), 5);
        assert_eq!(MigrateError::batch("t", "x").exit_code(), 6);
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(MigrateError::from(io).exit_code(), 7);
    }

    #[test]
    fn test_messages_carry_underlying_cause() {
        let err = MigrateError::schema_lookup("orders", "table or view does not exist");
        let msg = err.to_string();
        assert!(msg.contains("orders"));
        assert!(msg.contains("table or view does not exist"));
    }

    #[test]
    fn test_format_detailed_includes_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "config.yaml");
        let detailed = MigrateError::from(io).format_detailed();
        assert!(detailed.starts_with("Error: IO error"));
        assert!(detailed.contains("Caused by"));
    }
}
