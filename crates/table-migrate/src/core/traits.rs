//! Connection seams.
//!
//! All I/O goes through two traits:
//!
//! - [`ConnectionProvider`]: opens a session from a [`ConnectionDescriptor`]
//! - [`Connection`]: one live session (catalog queries, statement execution,
//!   forward-only row streaming, and manual-transaction batch writes)
//!
//! The inspector and engine only see these traits, so tests can swap in an
//! in-memory provider.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;

use crate::config::ConnectionDescriptor;
use crate::dialect::{catalog, Dialect};
use crate::error::{MigrateError, Result};

use super::schema::ColumnDescriptor;
use super::value::{Row, SqlValue};

/// Forward-only stream of source rows.
///
/// Items that fail with [`MigrateError::RowConversion`] affect only that row;
/// any other error ends the stream.
pub type RowStream<'a> = BoxStream<'a, Result<Row>>;

/// One live database session.
///
/// Sessions are scoped to a single operation. Callers finish with
/// [`Connection::close`]; dropping the box also releases the session.
#[async_trait]
pub trait Connection: Send {
    /// Dialect spoken by this session.
    fn dialect(&self) -> Dialect;

    /// Run a query and stream its rows without buffering the result set.
    async fn stream_rows<'a>(&'a mut self, sql: &'a str) -> Result<RowStream<'a>>;

    /// Run a query and collect every row.
    async fn query_rows(&mut self, sql: &str) -> Result<Vec<Row>> {
        let mut stream = self.stream_rows(sql).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await {
            rows.push(row?);
        }
        Ok(rows)
    }

    /// Execute a statement, returning the affected row count.
    async fn execute(&mut self, sql: &str) -> Result<u64>;

    /// Prove the session works.
    async fn ping(&mut self) -> Result<()> {
        let probe = self.dialect().probe_sql();
        self.query_rows(probe).await.map(|_| ())
    }

    /// Base tables visible in the current schema.
    async fn metadata_tables(&mut self) -> Result<Vec<String>> {
        let dialect = self.dialect();
        let sql = catalog::list_tables_sql(dialect).ok_or_else(|| {
            MigrateError::connection(dialect.as_str(), "no catalog query for table listing")
        })?;
        let rows = self.query_rows(sql).await?;
        Ok(rows.iter().filter_map(first_text).collect())
    }

    /// Column definitions of a table in ordinal order, without key flags.
    async fn metadata_columns(&mut self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let dialect = self.dialect();
        let sql = catalog::columns_sql(dialect, table).ok_or_else(|| {
            MigrateError::schema_lookup(table, format!("no column catalog query for {}", dialect))
        })?;
        let rows = self.query_rows(&sql).await?;
        Ok(rows.iter().filter_map(column_from_row).collect())
    }

    /// Primary key column names in key order.
    async fn metadata_primary_keys(&mut self, table: &str) -> Result<Vec<String>> {
        let sql = catalog::primary_keys_sql(self.dialect(), table);
        let rows = self.query_rows(&sql).await?;
        Ok(rows.iter().filter_map(first_text).collect())
    }

    /// Disable auto-commit and prepare the INSERT used by [`execute_batch`].
    ///
    /// [`execute_batch`]: Connection::execute_batch
    async fn begin_batches(&mut self, insert_sql: &str) -> Result<()>;

    /// Coerce one row for the prepared INSERT.
    ///
    /// Fails with [`MigrateError::RowConversion`] when a value cannot be
    /// bound; the row is then skipped by the caller.
    fn bind_row(&self, row: Row) -> Result<Row> {
        Ok(row)
    }

    /// Execute the prepared INSERT once per row; returns per-row affected counts.
    async fn execute_batch(&mut self, rows: Vec<Row>) -> Result<Vec<u64>>;

    /// Commit the open transaction.
    async fn commit(&mut self) -> Result<()>;

    /// Roll back the open transaction.
    async fn rollback(&mut self) -> Result<()>;

    /// Release the session.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Opens sessions from connection descriptors.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Open a session. Failures are reported as [`MigrateError::Connection`].
    async fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn Connection>>;
}

fn first_text(row: &Row) -> Option<String> {
    row.first().and_then(SqlValue::to_text)
}

/// Build a column from a `(name, type, nullable)` catalog row.
pub(crate) fn column_from_row(row: &Row) -> Option<ColumnDescriptor> {
    let name = row.first().and_then(SqlValue::to_text)?;
    let data_type = row.get(1).and_then(SqlValue::to_text).unwrap_or_default();
    let nullable = row
        .get(2)
        .and_then(SqlValue::to_text)
        .map(|flag| catalog::parse_nullable(&flag))
        .unwrap_or(true);
    Some(ColumnDescriptor::new(name, data_type.trim(), nullable))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::SqlNullType;

    #[test]
    fn test_column_from_catalog_row() {
        let row: Row = vec!["note".into(), "varchar(200)".into(), "YES".into()];
        let col = column_from_row(&row).unwrap();
        assert_eq!(col.name, "note");
        assert_eq!(col.data_type, "varchar(200)");
        assert!(col.is_nullable);
        assert!(!col.is_primary_key);

        let row: Row = vec!["ID".into(), "INTEGER".into(), "FALSE".into()];
        assert!(!column_from_row(&row).unwrap().is_nullable);
    }

    #[test]
    fn test_column_row_without_name_is_skipped() {
        let row: Row = vec![SqlValue::Null(SqlNullType::String), "INT".into()];
        assert!(column_from_row(&row).is_none());
    }
}
