//! ODBC driver for Oracle and SAP HANA.
//!
//! `odbc-api` is synchronous, so every call runs on the blocking pool with the
//! session behind a mutex. Result sets are fetched in text row sets on a
//! blocking thread and handed to the async side through a bounded channel,
//! which keeps memory flat for large tables.
//!
//! Requires a driver manager (unixODBC on Linux) plus the vendor driver:
//! `{Oracle}` for Oracle, `{HDBODBC}` for HANA.

use std::borrow::Cow;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use async_trait::async_trait;
use futures::StreamExt;
use odbc_api::buffers::TextRowSet;
use odbc_api::parameter::{InputParameter, VarBinaryBox, VarCharBox};
use odbc_api::{ConnectionOptions, Cursor, DataType, Environment, ResultSetMetadata};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::{redact_connection_string, ConnectionDescriptor};
use crate::core::schema::ColumnDescriptor;
use crate::core::traits::{Connection, RowStream};
use crate::core::value::{Row, SqlNullType, SqlValue};
use crate::dialect::{catalog, Dialect};
use crate::drivers::common::coerce;
use crate::error::{MigrateError, Result};

/// Rows fetched per ODBC round trip.
const FETCH_BATCH_ROWS: usize = 1000;
/// Upper bound for a single text cell; longer values are truncated by the driver.
const MAX_TEXT_BYTES: usize = 65536;
/// Rows buffered between the fetch thread and the consumer.
const STREAM_CHANNEL_ROWS: usize = 4096;

// SQLColumns result set positions.
const COL_COLUMN_NAME: usize = 3;
const COL_TYPE_NAME: usize = 5;
const COL_COLUMN_SIZE: usize = 6;
const COL_DECIMAL_DIGITS: usize = 8;
const COL_NULLABLE: usize = 10;
// SQLTables result set position.
const COL_TABLE_NAME: usize = 2;

static ENVIRONMENT: OnceLock<Environment> = OnceLock::new();

fn environment() -> Result<&'static Environment> {
    if let Some(env) = ENVIRONMENT.get() {
        return Ok(env);
    }
    let env = Environment::new()?;
    Ok(ENVIRONMENT.get_or_init(|| env))
}

type SharedConnection = Arc<Mutex<odbc_api::Connection<'static>>>;

/// One ODBC session.
pub struct OdbcConnection {
    dialect: Dialect,
    /// Catalog schema pattern: the upper-cased user name.
    schema: String,
    conn: SharedConnection,
    insert_sql: Option<String>,
}

impl OdbcConnection {
    /// Connect through the driver manager. `UID`/`PWD` are appended to the
    /// connection string when set.
    pub async fn connect(dialect: Dialect, descriptor: &ConnectionDescriptor) -> Result<Self> {
        let base = descriptor.connection_string()?;
        let conn_str = with_credentials(&base, &descriptor.username, descriptor.password());

        let conn = tokio::task::spawn_blocking(move || {
            let env = environment()?;
            env.connect_with_connection_string(&conn_str, ConnectionOptions::default())
                .map_err(|e| MigrateError::connection(dialect.as_str(), e))
        })
        .await
        .map_err(|e| MigrateError::connection(dialect.as_str(), e))?
        .map_err(|e| match e {
            e @ MigrateError::Connection { .. } => e,
            other => MigrateError::connection(dialect.as_str(), other),
        })?;

        info!(
            "Connected to {} via ODBC: {}",
            dialect,
            redact_connection_string(&base)
        );

        Ok(Self {
            dialect,
            schema: descriptor.username.to_uppercase(),
            conn: Arc::new(Mutex::new(conn)),
            insert_sql: None,
        })
    }

    /// Run `f` against the session on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&odbc_api::Connection<'static>) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let dialect = self.dialect;
        tokio::task::spawn_blocking(move || {
            let guard = lock(&conn, dialect)?;
            f(&guard)
        })
        .await
        .map_err(|e| MigrateError::connection(dialect.as_str(), e))?
    }
}

fn lock(
    conn: &Mutex<odbc_api::Connection<'static>>,
    dialect: Dialect,
) -> Result<MutexGuard<'_, odbc_api::Connection<'static>>> {
    conn.lock()
        .map_err(|_| MigrateError::connection(dialect.as_str(), "ODBC session lock poisoned"))
}

fn with_credentials(base: &str, username: &str, password: Option<&str>) -> String {
    let mut conn_str = base.trim_end().to_string();
    if !conn_str.is_empty() && !conn_str.ends_with(';') {
        conn_str.push(';');
    }
    if !username.is_empty() {
        conn_str.push_str(&format!("UID={};", username));
    }
    if let Some(password) = password {
        conn_str.push_str(&format!("PWD={};", password));
    }
    conn_str
}

#[async_trait]
impl Connection for OdbcConnection {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn stream_rows<'a>(&'a mut self, sql: &'a str) -> Result<RowStream<'a>> {
        debug!("{} query: {}", self.dialect, sql);
        let (tx, rx) = mpsc::channel::<Result<Row>>(STREAM_CHANNEL_ROWS);
        let conn = Arc::clone(&self.conn);
        let dialect = self.dialect;
        let sql = sql.to_string();

        tokio::task::spawn_blocking(move || {
            if let Err(e) = fetch_into(&conn, dialect, &sql, &tx) {
                // The receiver may already be gone.
                let _ = tx.blocking_send(Err(e));
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(stream.boxed())
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        debug!("{} execute: {}", self.dialect, sql);
        let sql = sql.to_string();
        self.blocking(move |conn| {
            let mut statement = conn.preallocate()?;
            statement.execute(&sql, ())?;
            Ok(statement.row_count()?.map_or(0, |n| n as u64))
        })
        .await
    }

    async fn metadata_tables(&mut self) -> Result<Vec<String>> {
        let schema = self.schema.clone();
        self.blocking(move |conn| {
            let cursor = conn.tables("", &schema, "", "TABLE")?;
            let rows = collect_text(cursor)?;
            Ok(rows
                .into_iter()
                .filter_map(|mut row| row.get_mut(COL_TABLE_NAME).and_then(Option::take))
                .collect())
        })
        .await
    }

    async fn metadata_columns(&mut self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let schema = self.schema.clone();
        let table = table.to_string();
        self.blocking(move |conn| {
            let cursor = conn.columns("", &schema, &table, "")?;
            let rows = collect_text(cursor)?;
            Ok(rows.iter().filter_map(|row| column_from_odbc(row)).collect())
        })
        .await
    }

    async fn begin_batches(&mut self, insert_sql: &str) -> Result<()> {
        debug!("{} prepare: {}", self.dialect, insert_sql);
        self.blocking(|conn| Ok(conn.set_autocommit(false)?)).await?;
        self.insert_sql = Some(insert_sql.to_string());
        Ok(())
    }

    async fn execute_batch(&mut self, rows: Vec<Row>) -> Result<Vec<u64>> {
        let sql = self
            .insert_sql
            .clone()
            .ok_or_else(|| MigrateError::Config("begin_batches was not called".into()))?;
        self.blocking(move |conn| {
            let mut prepared = conn.prepare(&sql)?;
            let mut counts = Vec::with_capacity(rows.len());
            for row in rows {
                let params: Vec<Box<dyn InputParameter>> = row.into_iter().map(to_param).collect();
                prepared.execute(params.as_slice())?;
                counts.push(prepared.row_count()?.map_or(1, |n| n as u64));
            }
            Ok(counts)
        })
        .await
    }

    async fn commit(&mut self) -> Result<()> {
        self.blocking(|conn| Ok(conn.commit()?)).await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.blocking(|conn| Ok(conn.rollback()?)).await
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let Self { dialect, conn, .. } = *self;
        // The session disconnects on drop; do that off the async thread.
        tokio::task::spawn_blocking(move || drop(conn))
            .await
            .map_err(|e| MigrateError::connection(dialect.as_str(), e))
    }
}

fn fetch_into(
    conn: &Mutex<odbc_api::Connection<'static>>,
    dialect: Dialect,
    sql: &str,
    tx: &mpsc::Sender<Result<Row>>,
) -> Result<()> {
    let conn = lock(conn, dialect)?;
    let Some(mut cursor) = conn.execute(sql, ())? else {
        return Ok(());
    };

    let num_cols = u16::try_from(cursor.num_result_cols()?).unwrap_or(0);
    let mut types = Vec::with_capacity(usize::from(num_cols));
    for col in 1..=num_cols {
        types.push(cursor.col_data_type(col)?);
    }

    let mut buffers = TextRowSet::for_cursor(FETCH_BATCH_ROWS, &mut cursor, Some(MAX_TEXT_BYTES))?;
    let mut row_cursor = cursor.bind_buffer(&mut buffers)?;
    while let Some(batch) = row_cursor.fetch()? {
        for row_idx in 0..batch.num_rows() {
            let row = types
                .iter()
                .enumerate()
                .map(|(col_idx, ty)| decode_text(batch.at(col_idx, row_idx), ty))
                .collect::<Result<Row>>();
            if tx.blocking_send(row).is_err() {
                debug!("{} row stream dropped by consumer", dialect);
                return Ok(());
            }
        }
    }
    Ok(())
}

/// Drain a catalog cursor as text.
fn collect_text(mut cursor: impl Cursor) -> Result<Vec<Vec<Option<String>>>> {
    let num_cols = usize::try_from(cursor.num_result_cols()?).unwrap_or(0);
    let mut buffers = TextRowSet::for_cursor(FETCH_BATCH_ROWS, &mut cursor, Some(4096))?;
    let mut row_cursor = cursor.bind_buffer(&mut buffers)?;

    let mut rows = Vec::new();
    while let Some(batch) = row_cursor.fetch()? {
        for row_idx in 0..batch.num_rows() {
            rows.push(
                (0..num_cols)
                    .map(|col_idx| {
                        batch
                            .at(col_idx, row_idx)
                            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                    })
                    .collect(),
            );
        }
    }
    Ok(rows)
}

fn column_from_odbc(row: &[Option<String>]) -> Option<ColumnDescriptor> {
    let text = |idx: usize| row.get(idx).cloned().flatten();
    let number = |idx: usize| text(idx).and_then(|v| v.trim().parse::<i64>().ok());

    let name = text(COL_COLUMN_NAME)?;
    let type_name = text(COL_TYPE_NAME).unwrap_or_default();
    let data_type = catalog::compose_type(
        &type_name,
        number(COL_COLUMN_SIZE),
        number(COL_DECIMAL_DIGITS),
    );
    // SQL_NO_NULLS = 0, SQL_NULLABLE = 1, SQL_NULLABLE_UNKNOWN = 2.
    let nullable = number(COL_NULLABLE).map_or(true, |n| n != 0);
    Some(ColumnDescriptor::new(name, data_type, nullable))
}

fn null_type_for(ty: &DataType) -> SqlNullType {
    match ty {
        DataType::Bit => SqlNullType::Bool,
        DataType::TinyInt | DataType::SmallInt => SqlNullType::I16,
        DataType::Integer => SqlNullType::I32,
        DataType::BigInt => SqlNullType::I64,
        DataType::Real => SqlNullType::F32,
        DataType::Float { .. } | DataType::Double => SqlNullType::F64,
        DataType::Numeric { .. } | DataType::Decimal { .. } => SqlNullType::Decimal,
        DataType::Date => SqlNullType::Date,
        DataType::Time { .. } => SqlNullType::Time,
        DataType::Timestamp { .. } => SqlNullType::DateTime,
        DataType::Binary { .. } | DataType::Varbinary { .. } | DataType::LongVarbinary { .. } => {
            SqlNullType::Bytes
        }
        _ => SqlNullType::String,
    }
}

/// Decode one text cell by the column's reported SQL type.
fn decode_text(cell: Option<&[u8]>, ty: &DataType) -> Result<SqlValue<'static>> {
    let Some(bytes) = cell else {
        return Ok(SqlValue::Null(null_type_for(ty)));
    };
    let text = String::from_utf8_lossy(bytes).into_owned();
    let value = SqlValue::Text(Cow::Owned(text));

    Ok(match ty {
        DataType::Bit => SqlValue::Bool(coerce::to_bool(&value)?),
        DataType::TinyInt | DataType::SmallInt => SqlValue::I16(coerce::to_i16(&value)?),
        DataType::Integer => SqlValue::I32(coerce::to_i32(&value)?),
        DataType::BigInt => SqlValue::I64(coerce::to_i64(&value)?),
        DataType::Real => SqlValue::F32(coerce::to_f64(&value)? as f32),
        DataType::Float { .. } | DataType::Double => SqlValue::F64(coerce::to_f64(&value)?),
        DataType::Numeric { .. } | DataType::Decimal { .. } => {
            SqlValue::Decimal(coerce::to_decimal(&value)?)
        }
        DataType::Date => SqlValue::Date(coerce::to_date(&value)?),
        DataType::Time { .. } => SqlValue::Time(coerce::to_time(&value)?),
        DataType::Timestamp { .. } => SqlValue::DateTime(coerce::to_datetime(&value)?),
        // Text buffers carry binary columns hex encoded.
        DataType::Binary { .. } | DataType::Varbinary { .. } | DataType::LongVarbinary { .. } => {
            let hex_text = value.to_string();
            let bytes = hex::decode(hex_text.trim()).map_err(|e| {
                MigrateError::row_conversion(format!("invalid binary value: {}", e))
            })?;
            SqlValue::Bytes(Cow::Owned(bytes))
        }
        _ => value,
    })
}

/// ODBC drivers convert character parameters to the column type server-side.
fn to_param(value: SqlValue<'static>) -> Box<dyn InputParameter> {
    match value {
        SqlValue::Null(SqlNullType::Bytes) => Box::new(VarBinaryBox::null()),
        SqlValue::Null(_) => Box::new(VarCharBox::null()),
        SqlValue::Bytes(b) => Box::new(VarBinaryBox::from_vec(b.into_owned())),
        SqlValue::Bool(v) => Box::new(VarCharBox::from_string(if v { "1" } else { "0" }.to_string())),
        SqlValue::Text(s) => Box::new(VarCharBox::from_string(s.into_owned())),
        other => Box::new(VarCharBox::from_string(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_are_appended() {
        let s = with_credentials("Driver={HDBODBC};ServerNode=h:30015", "app", Some("pw"));
        assert_eq!(s, "Driver={HDBODBC};ServerNode=h:30015;UID=app;PWD=pw;");
        let s = with_credentials("Driver={Oracle};Dbq=//h:1521/XE;", "app", None);
        assert_eq!(s, "Driver={Oracle};Dbq=//h:1521/XE;UID=app;");
    }

    #[test]
    fn test_column_from_sqlcolumns_row() {
        let mut row: Vec<Option<String>> = vec![None; 18];
        row[COL_COLUMN_NAME] = Some("PRICE".into());
        row[COL_TYPE_NAME] = Some("DECIMAL".into());
        row[COL_COLUMN_SIZE] = Some("10".into());
        row[COL_DECIMAL_DIGITS] = Some("2".into());
        row[COL_NULLABLE] = Some("0".into());
        let col = column_from_odbc(&row).unwrap();
        assert_eq!(col.data_type, "DECIMAL(10,2)");
        assert!(!col.is_nullable);
    }

    #[test]
    fn test_decode_text_cells() {
        assert_eq!(
            decode_text(Some(b"42"), &DataType::Integer).unwrap(),
            SqlValue::I32(42)
        );
        assert_eq!(
            decode_text(Some(b"1"), &DataType::Bit).unwrap(),
            SqlValue::Bool(true)
        );
        assert!(decode_text(None, &DataType::Date).unwrap().is_null());
        assert!(decode_text(Some(b"x"), &DataType::BigInt)
            .unwrap_err()
            .is_recoverable());
    }
}
