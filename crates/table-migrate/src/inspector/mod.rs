//! Schema inspector: table listings and column metadata.
//!
//! Works against any [`Connection`]. HANA gets raw `SYS` catalog fallbacks
//! because its ODBC metadata calls come back empty for some schema setups.

use tracing::{debug, warn};

use crate::core::schema::TableDescriptor;
use crate::core::traits::{column_from_row, Connection};
use crate::core::value::SqlValue;
use crate::dialect::{catalog, Dialect};
use crate::error::{MigrateError, Result};

/// Base tables in the connection's current schema.
pub async fn list_tables(conn: &mut dyn Connection) -> Result<Vec<String>> {
    let mut tables = conn.metadata_tables().await?;

    if tables.is_empty() && conn.dialect() == Dialect::Hana {
        warn!("HANA metadata returned no tables, falling back to SYS.TABLES");
        let rows = conn.query_rows(catalog::HANA_FALLBACK_TABLES).await?;
        tables = rows
            .iter()
            .filter_map(|row| row.first().and_then(SqlValue::to_text))
            .collect();
    }

    debug!("Found {} tables", tables.len());
    Ok(tables)
}

/// Describe `table`: columns in ordinal order with nullability and primary
/// key membership.
///
/// A table without columns is returned as an empty descriptor, not an error.
/// Catalog failures surface as [`MigrateError::SchemaLookup`]; lost
/// connections stay [`MigrateError::Connection`].
pub async fn describe_table(conn: &mut dyn Connection, table: &str) -> Result<TableDescriptor> {
    describe(conn, table).await.map_err(|e| match e {
        e @ (MigrateError::Connection { .. } | MigrateError::SchemaLookup { .. }) => e,
        other => MigrateError::schema_lookup(table, other),
    })
}

async fn describe(conn: &mut dyn Connection, table: &str) -> Result<TableDescriptor> {
    let mut columns = conn.metadata_columns(table).await?;

    if columns.is_empty() && conn.dialect() == Dialect::Hana {
        warn!(
            "HANA metadata returned no columns for {}, falling back to SYS.TABLE_COLUMNS",
            table
        );
        let rows = conn
            .query_rows(&catalog::hana_fallback_columns_sql(table))
            .await?;
        columns = rows.iter().filter_map(column_from_row).collect();
    }

    let primary_key = conn.metadata_primary_keys(table).await?;
    for column in &mut columns {
        column.is_primary_key = primary_key
            .iter()
            .any(|pk| pk == &column.name || pk.eq_ignore_ascii_case(&column.name));
    }

    debug!(
        "{}: {} columns, primary key [{}]",
        table,
        columns.len(),
        primary_key.join(", ")
    );
    Ok(TableDescriptor::new(table, columns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::ColumnDescriptor;
    use crate::core::traits::ConnectionProvider;
    use crate::testing::{MemoryDatabase, MemoryProvider, MemoryTable};

    fn orders() -> MemoryTable {
        MemoryTable::new(vec![
            ColumnDescriptor::new("id", "INT", false),
            ColumnDescriptor::new("total", "DECIMAL(10,2)", true),
            ColumnDescriptor::new("note", "VARCHAR(200)", true),
        ])
        .with_primary_key(&["id"])
    }

    #[tokio::test]
    async fn test_describe_marks_primary_key() {
        let db = MemoryDatabase::new("mysql").with_table("orders", orders());
        let provider = MemoryProvider::new().with_database("shop", db);
        let mut conn = provider.connect(&provider.descriptor("mysql", "shop")).await.unwrap();

        let table = describe_table(conn.as_mut(), "orders").await.unwrap();
        assert_eq!(table.column_names(), vec!["id", "total", "note"]);
        assert_eq!(table.primary_key(), vec!["id"]);
        assert!(!table.columns[0].is_nullable);
        assert_eq!(table.columns[1].data_type, "DECIMAL(10,2)");
    }

    #[tokio::test]
    async fn test_missing_table_is_empty_not_error() {
        let provider =
            MemoryProvider::new().with_database("shop", MemoryDatabase::new("postgresql"));
        let mut conn = provider
            .connect(&provider.descriptor("postgresql", "shop"))
            .await
            .unwrap();

        let table = describe_table(conn.as_mut(), "nope").await.unwrap();
        assert!(table.columns.is_empty());
    }

    #[tokio::test]
    async fn test_catalog_failure_is_schema_lookup() {
        let db = MemoryDatabase::new("mysql")
            .with_table("orders", orders())
            .fail_metadata();
        let provider = MemoryProvider::new().with_database("shop", db);
        let mut conn = provider.connect(&provider.descriptor("mysql", "shop")).await.unwrap();

        let err = describe_table(conn.as_mut(), "orders").await.unwrap_err();
        match err {
            MigrateError::SchemaLookup { table, message } => {
                assert_eq!(table, "orders");
                assert!(message.contains("catalog unavailable"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_hana_falls_back_to_sys_catalog() {
        let db = MemoryDatabase::new("hana")
            .with_table(
                "ORDERS",
                MemoryTable::new(vec![
                    ColumnDescriptor::new("ID", "INTEGER", false),
                    ColumnDescriptor::new("NOTE", "NVARCHAR(200)", true),
                ])
                .with_primary_key(&["ID"]),
            )
            .empty_driver_metadata();
        let provider = MemoryProvider::new().with_database("HXE", db.clone());
        let mut conn = provider.connect(&provider.descriptor("hana", "HXE")).await.unwrap();

        let table = describe_table(conn.as_mut(), "ORDERS").await.unwrap();
        assert_eq!(table.column_names(), vec!["ID", "NOTE"]);
        assert!(!table.columns[0].is_nullable);
        assert!(table.columns[0].is_primary_key);
        assert!(table.columns[1].is_nullable);

        let tables = list_tables(conn.as_mut()).await.unwrap();
        assert_eq!(tables, vec!["ORDERS"]);
        assert!(db.statements().iter().any(|s| s.contains("SYS.TABLE_COLUMNS")));
        assert!(db.statements().iter().any(|s| s.contains("SYS.TABLES")));
    }

    #[tokio::test]
    async fn test_no_fallback_for_other_dialects() {
        let db = MemoryDatabase::new("mysql")
            .with_table("orders", orders())
            .empty_driver_metadata();
        let provider = MemoryProvider::new().with_database("shop", db.clone());
        let mut conn = provider.connect(&provider.descriptor("mysql", "shop")).await.unwrap();

        let table = describe_table(conn.as_mut(), "orders").await.unwrap();
        assert!(table.columns.is_empty());
        assert!(list_tables(conn.as_mut()).await.unwrap().is_empty());
        assert!(db.statements().is_empty());
    }
}
