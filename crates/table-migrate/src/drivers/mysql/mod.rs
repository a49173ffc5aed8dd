//! MySQL/MariaDB driver (SQLx).
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+
//!
//! # Connection String
//!
//! Uses SQLx connection format; credentials are applied as connect options:
//! ```text
//! mysql://host:port/database
//! ```

use std::borrow::Cow;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use sqlx::mysql::{MySql, MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column as _, ConnectOptions, Connection as _, Executor, Row as _, TypeInfo, ValueRef};
use tracing::{debug, info};

use crate::config::{redact_connection_string, ConnectionDescriptor};
use crate::core::traits::{Connection, RowStream};
use crate::core::value::{Row, SqlNullType, SqlValue};
use crate::dialect::Dialect;
use crate::error::{MigrateError, Result};

/// One MySQL session.
pub struct MysqlConnection {
    conn: MySqlConnection,
    insert_sql: Option<String>,
}

impl MysqlConnection {
    /// Connect using the descriptor's connection string and credentials.
    pub async fn connect(descriptor: &ConnectionDescriptor) -> Result<Self> {
        let conn_str = descriptor.connection_string()?;
        let mut options = MySqlConnectOptions::from_str(&conn_str).map_err(connection_error)?;
        if !descriptor.username.is_empty() {
            options = options.username(&descriptor.username);
        }
        if let Some(password) = descriptor.password() {
            options = options.password(password);
        }

        let conn = options.connect().await.map_err(connection_error)?;

        info!(
            "Connected to MySQL: {}",
            redact_connection_string(&conn_str)
        );

        Ok(Self {
            conn,
            insert_sql: None,
        })
    }
}

fn connection_error(e: sqlx::Error) -> MigrateError {
    MigrateError::connection(Dialect::Mysql.as_str(), e)
}

#[async_trait]
impl Connection for MysqlConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Mysql
    }

    async fn stream_rows<'a>(&'a mut self, sql: &'a str) -> Result<RowStream<'a>> {
        debug!("MySQL query: {}", sql);
        let rows = sqlx::query(sql).fetch(&mut self.conn);
        Ok(rows
            .map(|row| match row {
                Ok(row) => decode_row(&row),
                Err(e) => Err(MigrateError::from(e)),
            })
            .boxed())
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        debug!("MySQL execute: {}", sql);
        let result = self.conn.execute(sql).await?;
        Ok(result.rows_affected())
    }

    async fn begin_batches(&mut self, insert_sql: &str) -> Result<()> {
        debug!("MySQL prepare: {}", insert_sql);
        self.conn.execute("SET autocommit = 0").await?;
        // SQLx caches the server-side prepared statement on first execution.
        self.conn.prepare(insert_sql).await?;
        self.insert_sql = Some(insert_sql.to_string());
        Ok(())
    }

    async fn execute_batch(&mut self, rows: Vec<Row>) -> Result<Vec<u64>> {
        let sql = self
            .insert_sql
            .as_deref()
            .ok_or_else(|| MigrateError::Config("begin_batches was not called".into()))?;

        let mut counts = Vec::with_capacity(rows.len());
        for row in rows {
            let mut query = sqlx::query(sql);
            for value in row {
                query = bind_value(query, value);
            }
            let result = query.execute(&mut self.conn).await?;
            counts.push(result.rows_affected());
        }
        Ok(counts)
    }

    async fn commit(&mut self) -> Result<()> {
        self.conn.execute("COMMIT").await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.conn.execute("ROLLBACK").await?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }
}

/// Decode every column of a result row by its reported type.
fn decode_row(row: &MySqlRow) -> Result<Row> {
    (0..row.len()).map(|i| decode_value(row, i)).collect()
}

fn decode_value(row: &MySqlRow, i: usize) -> Result<SqlValue<'static>> {
    let type_name = row.column(i).type_info().name().to_ascii_uppercase();

    let is_null = row.try_get_raw(i).map(|r| r.is_null()).unwrap_or(true);
    if is_null {
        return Ok(SqlValue::Null(null_type_for(&type_name)));
    }

    let value = match type_name.as_str() {
        "BOOLEAN" => SqlValue::Bool(get::<bool>(row, i)?),
        "TINYINT" => SqlValue::I16(i16::from(get::<i8>(row, i)?)),
        "TINYINT UNSIGNED" => SqlValue::I16(i16::from(get::<u8>(row, i)?)),
        "SMALLINT" => SqlValue::I16(get::<i16>(row, i)?),
        "SMALLINT UNSIGNED" => SqlValue::I32(i32::from(get::<u16>(row, i)?)),
        "MEDIUMINT" | "INT" => SqlValue::I32(get::<i32>(row, i)?),
        "MEDIUMINT UNSIGNED" | "INT UNSIGNED" => SqlValue::I64(i64::from(get::<u32>(row, i)?)),
        "BIGINT" => SqlValue::I64(get::<i64>(row, i)?),
        "BIGINT UNSIGNED" => {
            let v = get::<u64>(row, i)?;
            i64::try_from(v)
                .map(SqlValue::I64)
                .unwrap_or_else(|_| SqlValue::Decimal(rust_decimal::Decimal::from(v)))
        }
        "YEAR" => SqlValue::I16(get_unchecked::<u16>(row, i)? as i16),
        "FLOAT" => SqlValue::F32(get::<f32>(row, i)?),
        "DOUBLE" => SqlValue::F64(get::<f64>(row, i)?),
        "DECIMAL" => SqlValue::Decimal(get::<rust_decimal::Decimal>(row, i)?),
        "DATE" => SqlValue::Date(get::<chrono::NaiveDate>(row, i)?),
        "TIME" => SqlValue::Time(get::<chrono::NaiveTime>(row, i)?),
        "DATETIME" | "TIMESTAMP" => SqlValue::DateTime(get::<chrono::NaiveDateTime>(row, i)?),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            SqlValue::Bytes(Cow::Owned(get::<Vec<u8>>(row, i)?))
        }
        "BIT" | "GEOMETRY" => SqlValue::Bytes(Cow::Owned(get_unchecked::<Vec<u8>>(row, i)?)),
        // CHAR/VARCHAR/TEXT, ENUM, SET, JSON and anything newer travel as text.
        _ => SqlValue::Text(Cow::Owned(get_unchecked::<String>(row, i)?)),
    };
    Ok(value)
}

fn get<'r, T>(row: &'r MySqlRow, i: usize) -> Result<T>
where
    T: sqlx::Decode<'r, MySql> + sqlx::Type<MySql>,
{
    row.try_get::<T, _>(i).map_err(|e| decode_error(row, i, e))
}

/// Decode without the SQLx type compatibility check.
fn get_unchecked<'r, T>(row: &'r MySqlRow, i: usize) -> Result<T>
where
    T: sqlx::Decode<'r, MySql>,
{
    row.try_get_unchecked::<T, _>(i)
        .map_err(|e| decode_error(row, i, e))
}

fn decode_error(row: &MySqlRow, i: usize, e: sqlx::Error) -> MigrateError {
    MigrateError::row_conversion(format!("column {}: {}", row.column(i).name(), e))
}

/// Map a MySQL type name to a null type hint.
fn null_type_for(type_name: &str) -> SqlNullType {
    match type_name {
        "BOOLEAN" => SqlNullType::Bool,
        "TINYINT" | "TINYINT UNSIGNED" | "SMALLINT" | "YEAR" => SqlNullType::I16,
        "SMALLINT UNSIGNED" | "MEDIUMINT" | "INT" => SqlNullType::I32,
        "MEDIUMINT UNSIGNED" | "INT UNSIGNED" | "BIGINT" | "BIGINT UNSIGNED" => SqlNullType::I64,
        "FLOAT" => SqlNullType::F32,
        "DOUBLE" => SqlNullType::F64,
        "DECIMAL" => SqlNullType::Decimal,
        "DATE" => SqlNullType::Date,
        "TIME" => SqlNullType::Time,
        "DATETIME" | "TIMESTAMP" => SqlNullType::DateTime,
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT"
        | "GEOMETRY" => SqlNullType::Bytes,
        _ => SqlNullType::String,
    }
}

/// Bind one value; MySQL converts between compatible types server-side.
fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: SqlValue<'static>,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        SqlValue::Null(t) => match t {
            SqlNullType::Bool => query.bind(None::<bool>),
            SqlNullType::I16 => query.bind(None::<i16>),
            SqlNullType::I32 => query.bind(None::<i32>),
            SqlNullType::I64 => query.bind(None::<i64>),
            SqlNullType::F32 => query.bind(None::<f32>),
            SqlNullType::F64 => query.bind(None::<f64>),
            SqlNullType::Bytes => query.bind(None::<Vec<u8>>),
            SqlNullType::Decimal => query.bind(None::<rust_decimal::Decimal>),
            SqlNullType::DateTime | SqlNullType::DateTimeOffset => {
                query.bind(None::<chrono::NaiveDateTime>)
            }
            SqlNullType::Date => query.bind(None::<chrono::NaiveDate>),
            SqlNullType::Time => query.bind(None::<chrono::NaiveTime>),
            SqlNullType::String | SqlNullType::Uuid => query.bind(None::<String>),
        },
        SqlValue::Bool(v) => query.bind(v),
        SqlValue::I16(v) => query.bind(v),
        SqlValue::I32(v) => query.bind(v),
        SqlValue::I64(v) => query.bind(v),
        SqlValue::F32(v) => query.bind(v),
        SqlValue::F64(v) => query.bind(v),
        SqlValue::Text(s) => query.bind(s.into_owned()),
        SqlValue::Bytes(b) => query.bind(b.into_owned()),
        SqlValue::Uuid(u) => query.bind(u.to_string()),
        SqlValue::Decimal(d) => query.bind(d),
        SqlValue::DateTime(dt) => query.bind(dt),
        SqlValue::DateTimeOffset(dt) => query.bind(dt.with_timezone(&Utc)),
        SqlValue::Date(d) => query.bind(d),
        SqlValue::Time(t) => query.bind(t),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_type_for() {
        assert_eq!(null_type_for("INT"), SqlNullType::I32);
        assert_eq!(null_type_for("BIGINT UNSIGNED"), SqlNullType::I64);
        assert_eq!(null_type_for("DECIMAL"), SqlNullType::Decimal);
        assert_eq!(null_type_for("LONGBLOB"), SqlNullType::Bytes);
        assert_eq!(null_type_for("VARCHAR"), SqlNullType::String);
        assert_eq!(null_type_for("JSON"), SqlNullType::String);
    }
}
