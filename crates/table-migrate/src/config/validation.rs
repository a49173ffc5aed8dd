//! Configuration validation.

use std::collections::HashSet;

use super::{Config, ConnectionDescriptor, MigrationSettings};
use crate::error::{MigrateError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    validate_descriptor("source", &config.source)?;
    validate_descriptor("target", &config.target)?;

    if let Some(migration) = &config.migration {
        validate_migration(migration)?;
    }

    Ok(())
}

/// Validate one connection block.
pub fn validate_descriptor(section: &str, descriptor: &ConnectionDescriptor) -> Result<()> {
    if descriptor.dialect.trim().is_empty() {
        return Err(MigrateError::Config(format!("{}.dialect is required", section)));
    }
    // Unknown tags keep their own error kind.
    descriptor.dialect()?;

    if descriptor.override_string().is_none() {
        if descriptor.host.trim().is_empty() {
            return Err(MigrateError::Config(format!("{}.host is required", section)));
        }
        if descriptor.database.trim().is_empty() {
            return Err(MigrateError::Config(format!(
                "{}.database is required",
                section
            )));
        }
    }

    if let Some(0) = descriptor.port {
        return Err(MigrateError::Config(format!(
            "{}.port must be between 1 and 65535",
            section
        )));
    }

    descriptor
        .ssl_mode()
        .map_err(|e| MigrateError::Config(format!("{}: {}", section, e)))?;

    Ok(())
}

/// Validate the table copy settings.
pub fn validate_migration(migration: &MigrationSettings) -> Result<()> {
    if migration.source_table.trim().is_empty() {
        return Err(MigrateError::Config(
            "migration.source_table is required".into(),
        ));
    }
    if let Some(target) = &migration.target_table {
        if target.trim().is_empty() {
            return Err(MigrateError::Config(
                "migration.target_table must not be blank".into(),
            ));
        }
    }
    if migration.batch_size == 0 {
        return Err(MigrateError::Config(
            "migration.batch_size must be at least 1".into(),
        ));
    }

    let mut seen = HashSet::new();
    for column in &migration.columns {
        if column.trim().is_empty() {
            return Err(MigrateError::Config(
                "migration.columns must not contain blank names".into(),
            ));
        }
        if !seen.insert(column.as_str()) {
            return Err(MigrateError::Config(format!(
                "migration.columns lists '{}' more than once",
                column
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            source: ConnectionDescriptor::new("mysql", "localhost", "shop", "root")
                .with_password("password"),
            target: ConnectionDescriptor::new("hana", "hana.local", "HXE", "SYSTEM")
                .with_port(39015)
                .with_password("password"),
            migration: Some(MigrationSettings::new("orders")),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_migration_section_is_optional() {
        let mut config = valid_config();
        config.migration = None;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_missing_source_host() {
        let mut config = valid_config();
        config.source.host = "".to_string();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("source.host"));
    }

    #[test]
    fn test_override_string_replaces_host_and_database() {
        let mut config = valid_config();
        config.target.host = String::new();
        config.target.database = String::new();
        config.target.connection_string =
            Some("Driver={HDBODBC};ServerNode=h:30015;".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_unknown_dialect_is_unsupported() {
        let mut config = valid_config();
        config.target.dialect = "db2".to_string();
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, MigrateError::UnsupportedDialect(_)));
    }

    #[test]
    fn test_invalid_ssl_mode() {
        let mut config = valid_config();
        config.source.ssl_mode = Some("sometimes".to_string());
        assert!(matches!(validate(&config), Err(MigrateError::Config(_))));
    }

    #[test]
    fn test_zero_batch_size() {
        let mut config = valid_config();
        if let Some(m) = config.migration.as_mut() {
            m.batch_size = 0;
        }
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn test_duplicate_columns() {
        let mut config = valid_config();
        if let Some(m) = config.migration.as_mut() {
            m.columns = vec!["id".into(), "total".into(), "id".into()];
        }
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_source_table() {
        let mut config = valid_config();
        if let Some(m) = config.migration.as_mut() {
            m.source_table = " ".into();
        }
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_descriptor_debug_redacts_password() {
        let mut config = valid_config();
        config.source.password = Some("super_secret_password_123".to_string());
        config.source.connection_string =
            Some("mysql://root:super_secret_password_123@db/shop".to_string());
        let debug_output = format!("{:?}", config.source);
        assert!(
            debug_output.contains("[REDACTED]"),
            "Debug output should contain [REDACTED]"
        );
        assert!(
            !debug_output.contains("super_secret_password_123"),
            "Debug output should not contain actual password value"
        );
    }
}
