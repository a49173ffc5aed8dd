//! Database driver implementations.
//!
//! Each driver module implements [`Connection`] for one engine:
//!
//! - [`mysql`]: MySQL/MariaDB via SQLx
//! - [`postgres`]: PostgreSQL via tokio-postgres (rustls for TLS)
//! - [`mssql`]: SQL Server via Tiberius
//! - `odbc`: Oracle and SAP HANA via odbc-api (feature `odbc`)
//! - [`common`]: value coercion shared by the typed-parameter drivers
//!
//! [`DriverProvider`] is the production [`ConnectionProvider`]; it picks the
//! driver from the descriptor's dialect tag.

pub mod common;
pub mod mssql;
pub mod mysql;
#[cfg(feature = "odbc")]
pub mod odbc;
pub mod postgres;

use async_trait::async_trait;
use tracing::debug;

use crate::config::ConnectionDescriptor;
use crate::core::traits::{Connection, ConnectionProvider};
use crate::dialect::Dialect;
use crate::error::{MigrateError, Result};

/// Opens real database sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverProvider;

impl DriverProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ConnectionProvider for DriverProvider {
    async fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn Connection>> {
        let dialect = descriptor.dialect()?;
        debug!(
            "Opening {} session ({})",
            dialect,
            dialect.driver_name()
        );

        let result: Result<Box<dyn Connection>> = match dialect {
            Dialect::Mysql => mysql::MysqlConnection::connect(descriptor)
                .await
                .map(|c| Box::new(c) as Box<dyn Connection>),
            Dialect::Postgresql => postgres::PostgresConnection::connect(descriptor)
                .await
                .map(|c| Box::new(c) as Box<dyn Connection>),
            Dialect::Sqlserver => mssql::MssqlConnection::connect(descriptor)
                .await
                .map(|c| Box::new(c) as Box<dyn Connection>),
            Dialect::Oracle | Dialect::Hana => connect_odbc(dialect, descriptor).await,
        };

        result.map_err(|e| match e {
            e @ (MigrateError::Connection { .. }
            | MigrateError::UnsupportedDialect(_)
            | MigrateError::Config(_)) => e,
            other => MigrateError::connection(dialect.as_str(), other),
        })
    }
}

#[cfg(feature = "odbc")]
async fn connect_odbc(
    dialect: Dialect,
    descriptor: &ConnectionDescriptor,
) -> Result<Box<dyn Connection>> {
    let conn = odbc::OdbcConnection::connect(dialect, descriptor).await?;
    Ok(Box::new(conn))
}

#[cfg(not(feature = "odbc"))]
async fn connect_odbc(
    dialect: Dialect,
    _descriptor: &ConnectionDescriptor,
) -> Result<Box<dyn Connection>> {
    Err(MigrateError::connection(
        dialect.as_str(),
        format!(
            "{} is reached through ODBC; rebuild with `--features odbc`",
            dialect
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_dialect_is_rejected_before_connecting() {
        let descriptor = ConnectionDescriptor::new("db2", "localhost", "app", "user");
        let err = DriverProvider::new().connect(&descriptor).await.err().unwrap();
        assert!(matches!(err, MigrateError::UnsupportedDialect(_)));
    }

    #[tokio::test]
    #[ignore] // Opens a real TCP connection; run with --ignored
    async fn test_unreachable_host_is_connection_error() {
        let descriptor =
            ConnectionDescriptor::new("postgresql", "127.0.0.1", "app", "user").with_port(1);
        let err = DriverProvider::new().connect(&descriptor).await.err().unwrap();
        assert!(matches!(err, MigrateError::Connection { .. }));
    }

    #[cfg(not(feature = "odbc"))]
    #[tokio::test]
    async fn test_odbc_dialects_need_feature() {
        let descriptor = ConnectionDescriptor::new("hana", "localhost", "HXE", "SYSTEM");
        let err = DriverProvider::new().connect(&descriptor).await.err().unwrap();
        assert!(err.to_string().contains("odbc"));
    }
}
