//! # table-migrate
//!
//! Single-table data migration between heterogeneous relational databases.
//!
//! Supported engines: MySQL/MariaDB, PostgreSQL, SQL Server, and (with the
//! `odbc` feature) Oracle and SAP HANA. The library provides:
//!
//! - **Schema inspection** through each engine's catalog, with HANA `SYS` fallbacks
//! - **Type mapping** between every pair of dialects
//! - **Batched copy** with one commit per batch and per-row failure isolation
//!
//! ## Example
//!
//! ```rust,no_run
//! use table_migrate::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> table_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let request = config.into_request()?;
//!     let result = Orchestrator::new().migrate(&request).await;
//!     println!("Migrated {} of {} rows", result.migrated, result.total);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod dialect;
pub mod drivers;
pub mod error;
pub mod inspector;
pub mod orchestrator;

#[cfg(test)]
mod testing;

// Re-exports for convenient access
pub use config::{Config, ConnectionDescriptor, MigrationSettings, SslMode};
pub use crate::core::{ColumnDescriptor, Connection, ConnectionProvider, SqlValue, TableDescriptor};
pub use dialect::{convert_type, map_type, Dialect};
pub use drivers::DriverProvider;
pub use error::{ErrorKind, MigrateError, Result};
pub use orchestrator::{MigrationRequest, MigrationResult, Orchestrator};
