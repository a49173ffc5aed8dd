//! SQL dialects and the dialect type mapper.
//!
//! The supported products form a closed set, so [`Dialect`] is a plain enum
//! and every dialect-specific detail (connection string template, parameter
//! placeholder, catalog SQL, type table) is selected with a `match` on it.
//!
//! - [`catalog`]: metadata queries and the HANA catalog fallbacks
//! - [`typemap`]: `convert_type` and the static type tables

pub mod catalog;
pub mod typemap;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MigrateError;

pub use typemap::{convert_type, map_type, Resolution, TypeMapping};

/// A supported database product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Mysql,
    Postgresql,
    Sqlserver,
    Oracle,
    Hana,
}

impl Dialect {
    /// Every supported dialect.
    pub const ALL: [Dialect; 5] = [
        Dialect::Mysql,
        Dialect::Postgresql,
        Dialect::Sqlserver,
        Dialect::Oracle,
        Dialect::Hana,
    ];

    /// Canonical lower-case tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Mysql => "mysql",
            Dialect::Postgresql => "postgresql",
            Dialect::Sqlserver => "sqlserver",
            Dialect::Oracle => "oracle",
            Dialect::Hana => "hana",
        }
    }

    /// Default listener port.
    pub fn default_port(&self) -> u16 {
        match self {
            Dialect::Mysql => 3306,
            Dialect::Postgresql => 5432,
            Dialect::Sqlserver => 1433,
            Dialect::Oracle => 1521,
            Dialect::Hana => 30015,
        }
    }

    /// Identifier of the driver that serves this dialect.
    pub fn driver_name(&self) -> &'static str {
        match self {
            Dialect::Mysql => "sqlx-mysql",
            Dialect::Postgresql => "tokio-postgres",
            Dialect::Sqlserver => "tiberius",
            Dialect::Oracle => "odbc:Oracle",
            Dialect::Hana => "odbc:HDBODBC",
        }
    }

    /// Whether this dialect is reached through ODBC.
    pub fn uses_odbc(&self) -> bool {
        matches!(self, Dialect::Oracle | Dialect::Hana)
    }

    /// Build the connection string for a host/port/database triple.
    ///
    /// Credentials are not part of the template; drivers apply them separately.
    pub fn connection_string(&self, host: &str, port: u16, database: &str) -> String {
        match self {
            Dialect::Mysql => format!("mysql://{}:{}/{}", host, port, database),
            Dialect::Postgresql => format!("postgresql://{}:{}/{}", host, port, database),
            Dialect::Sqlserver => format!(
                "server=tcp:{},{};database={};TrustServerCertificate=true",
                host, port, database
            ),
            Dialect::Oracle => format!("Driver={{Oracle}};Dbq=//{}:{}/{};", host, port, database),
            Dialect::Hana => format!(
                "Driver={{HDBODBC}};ServerNode={}:{};DatabaseName={};",
                host, port, database
            ),
        }
    }

    /// Positional parameter placeholder, `index` starting at 1.
    pub fn param_placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Postgresql => format!("${}", index),
            Dialect::Sqlserver => format!("@P{}", index),
            Dialect::Mysql | Dialect::Oracle | Dialect::Hana => "?".to_string(),
        }
    }

    /// Cheapest query that proves the session works.
    pub fn probe_sql(&self) -> &'static str {
        match self {
            Dialect::Oracle => "SELECT 1 FROM DUAL",
            Dialect::Hana => "SELECT 1 FROM DUMMY",
            _ => "SELECT 1",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mysql" => Ok(Dialect::Mysql),
            "postgresql" | "postgres" => Ok(Dialect::Postgresql),
            "sqlserver" | "mssql" => Ok(Dialect::Sqlserver),
            "oracle" => Ok(Dialect::Oracle),
            "hana" | "saphana" => Ok(Dialect::Hana),
            _ => Err(MigrateError::UnsupportedDialect(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dialect_tags() {
        assert_eq!("mysql".parse::<Dialect>().unwrap(), Dialect::Mysql);
        assert_eq!("PostgreSQL".parse::<Dialect>().unwrap(), Dialect::Postgresql);
        assert_eq!("mssql".parse::<Dialect>().unwrap(), Dialect::Sqlserver);
        assert_eq!("hana".parse::<Dialect>().unwrap(), Dialect::Hana);
        for d in Dialect::ALL {
            assert_eq!(d.as_str().parse::<Dialect>().unwrap(), d);
        }
    }

    #[test]
    fn test_unknown_tag_is_unsupported() {
        let err = "db2".parse::<Dialect>().unwrap_err();
        assert!(matches!(err, MigrateError::UnsupportedDialect(ref t) if t == "db2"));
    }

    #[test]
    fn test_connection_string_templates() {
        assert_eq!(
            Dialect::Mysql.connection_string("db.local", 3306, "shop"),
            "mysql://db.local:3306/shop"
        );
        assert_eq!(
            Dialect::Postgresql.connection_string("db.local", 5432, "shop"),
            "postgresql://db.local:5432/shop"
        );
        assert_eq!(
            Dialect::Sqlserver.connection_string("db.local", 1433, "shop"),
            "server=tcp:db.local,1433;database=shop;TrustServerCertificate=true"
        );
        assert_eq!(
            Dialect::Oracle.connection_string("db.local", 1521, "ORCL"),
            "Driver={Oracle};Dbq=//db.local:1521/ORCL;"
        );
        assert_eq!(
            Dialect::Hana.connection_string("db.local", 30015, "HXE"),
            "Driver={HDBODBC};ServerNode=db.local:30015;DatabaseName=HXE;"
        );
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(Dialect::Postgresql.param_placeholder(2), "$2");
        assert_eq!(Dialect::Sqlserver.param_placeholder(1), "@P1");
        assert_eq!(Dialect::Hana.param_placeholder(3), "?");
    }
}
