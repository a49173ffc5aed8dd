//! Microsoft SQL Server driver (Tiberius).
//!
//! Tiberius speaks TDS 7.3 over a Tokio TCP stream wrapped with
//! `tokio-util`'s compat layer. Row values are decoded straight from
//! [`ColumnData`], so variable-width types (`intn`, `floatn`) keep the width
//! the server sent.

use std::borrow::Cow;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use futures::{StreamExt, TryStreamExt};
use rust_decimal::Decimal;
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, FromSql, Query};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};

use crate::config::{redact_connection_string, ConnectionDescriptor, SslMode};
use crate::core::traits::{Connection, RowStream};
use crate::core::value::{Row, SqlNullType, SqlValue};
use crate::dialect::Dialect;
use crate::error::{MigrateError, Result};

type TdsClient = Client<Compat<TcpStream>>;

/// One SQL Server session.
pub struct MssqlConnection {
    client: TdsClient,
    insert_sql: Option<String>,
    in_transaction: bool,
}

impl MssqlConnection {
    /// Connect using the descriptor's ADO connection string and credentials.
    pub async fn connect(descriptor: &ConnectionDescriptor) -> Result<Self> {
        let conn_str = descriptor.connection_string()?;
        let mut config = Config::from_ado_string(&conn_str).map_err(connection_error)?;

        if !descriptor.username.is_empty() {
            config.authentication(AuthMethod::sql_server(
                &descriptor.username,
                descriptor.password().unwrap_or_default(),
            ));
        }

        let ssl_mode = descriptor.ssl_mode()?;
        if ssl_mode.requires_tls() {
            config.encryption(EncryptionLevel::Required);
            if ssl_mode == SslMode::Require {
                config.trust_cert();
            }
        }

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| MigrateError::connection(Dialect::Sqlserver.as_str(), e))?;
        tcp.set_nodelay(true).ok();

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(connection_error)?;

        info!(
            "Connected to SQL Server: {}",
            redact_connection_string(&conn_str)
        );

        Ok(Self {
            client,
            insert_sql: None,
            in_transaction: false,
        })
    }

    async fn run(&mut self, sql: &str) -> Result<u64> {
        let result = Query::new(sql).execute(&mut self.client).await?;
        Ok(result.total())
    }
}

fn connection_error(e: tiberius::error::Error) -> MigrateError {
    MigrateError::connection(Dialect::Sqlserver.as_str(), e)
}

#[async_trait]
impl Connection for MssqlConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlserver
    }

    async fn stream_rows<'a>(&'a mut self, sql: &'a str) -> Result<RowStream<'a>> {
        debug!("SQL Server query: {}", sql);
        let stream = Query::new(sql).query(&mut self.client).await?;
        Ok(stream
            .into_row_stream()
            .map_err(MigrateError::from)
            .and_then(|row| async move { decode_row(row) })
            .boxed())
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        debug!("SQL Server execute: {}", sql);
        self.run(sql).await
    }

    async fn begin_batches(&mut self, insert_sql: &str) -> Result<()> {
        debug!("SQL Server prepare: {}", insert_sql);
        if !self.in_transaction {
            self.run("BEGIN TRAN").await?;
            self.in_transaction = true;
        }
        // Parameterized statements go through sp_executesql, which caches the plan.
        self.insert_sql = Some(insert_sql.to_string());
        Ok(())
    }

    async fn execute_batch(&mut self, rows: Vec<Row>) -> Result<Vec<u64>> {
        let sql = self
            .insert_sql
            .clone()
            .ok_or_else(|| MigrateError::Config("begin_batches was not called".into()))?;
        if !self.in_transaction {
            self.run("BEGIN TRAN").await?;
            self.in_transaction = true;
        }

        let mut counts = Vec::with_capacity(rows.len());
        for row in rows {
            let mut query = Query::new(sql.as_str());
            for value in row {
                bind_value(&mut query, value);
            }
            let result = query.execute(&mut self.client).await?;
            counts.push(result.total());
        }
        Ok(counts)
    }

    async fn commit(&mut self) -> Result<()> {
        if self.in_transaction {
            self.run("COMMIT TRAN").await?;
            self.in_transaction = false;
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if self.in_transaction {
            self.in_transaction = false;
            self.run("IF @@TRANCOUNT > 0 ROLLBACK TRAN").await?;
        }
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }
}

fn decode_row(row: tiberius::Row) -> Result<Row> {
    row.into_iter().map(decode_value).collect()
}

fn decode_value(data: ColumnData<'static>) -> Result<SqlValue<'static>> {
    let value = match data {
        ColumnData::U8(v) => v
            .map(|v| SqlValue::I16(i16::from(v)))
            .unwrap_or(SqlValue::Null(SqlNullType::I16)),
        ColumnData::I16(v) => v.map(SqlValue::I16).unwrap_or(SqlValue::Null(SqlNullType::I16)),
        ColumnData::I32(v) => v.map(SqlValue::I32).unwrap_or(SqlValue::Null(SqlNullType::I32)),
        ColumnData::I64(v) => v.map(SqlValue::I64).unwrap_or(SqlValue::Null(SqlNullType::I64)),
        ColumnData::F32(v) => v.map(SqlValue::F32).unwrap_or(SqlValue::Null(SqlNullType::F32)),
        ColumnData::F64(v) => v.map(SqlValue::F64).unwrap_or(SqlValue::Null(SqlNullType::F64)),
        ColumnData::Bit(v) => v.map(SqlValue::Bool).unwrap_or(SqlValue::Null(SqlNullType::Bool)),
        ColumnData::String(v) => v
            .map(|s| SqlValue::Text(Cow::Owned(s.into_owned())))
            .unwrap_or(SqlValue::Null(SqlNullType::String)),
        ColumnData::Guid(v) => v.map(SqlValue::Uuid).unwrap_or(SqlValue::Null(SqlNullType::Uuid)),
        ColumnData::Binary(v) => v
            .map(|b| SqlValue::Bytes(Cow::Owned(b.into_owned())))
            .unwrap_or(SqlValue::Null(SqlNullType::Bytes)),
        ColumnData::Xml(v) => v
            .map(|x| SqlValue::Text(Cow::Owned(x.into_owned().into_string())))
            .unwrap_or(SqlValue::Null(SqlNullType::String)),
        ref data @ ColumnData::Numeric(_) => convert::<Decimal>(data)?
            .map(SqlValue::Decimal)
            .unwrap_or(SqlValue::Null(SqlNullType::Decimal)),
        ref data @ (ColumnData::DateTime(_)
        | ColumnData::SmallDateTime(_)
        | ColumnData::DateTime2(_)) => convert::<NaiveDateTime>(data)?
            .map(SqlValue::DateTime)
            .unwrap_or(SqlValue::Null(SqlNullType::DateTime)),
        ref data @ ColumnData::DateTimeOffset(_) => convert::<DateTime<FixedOffset>>(data)?
            .map(SqlValue::DateTimeOffset)
            .unwrap_or(SqlValue::Null(SqlNullType::DateTimeOffset)),
        ref data @ ColumnData::Date(_) => convert::<NaiveDate>(data)?
            .map(SqlValue::Date)
            .unwrap_or(SqlValue::Null(SqlNullType::Date)),
        ref data @ ColumnData::Time(_) => convert::<NaiveTime>(data)?
            .map(SqlValue::Time)
            .unwrap_or(SqlValue::Null(SqlNullType::Time)),
    };
    Ok(value)
}

fn convert<'a, T: FromSql<'a>>(data: &'a ColumnData<'static>) -> Result<Option<T>> {
    T::from_sql(data).map_err(|e| MigrateError::row_conversion(e.to_string()))
}

/// Bind one value as an `sp_executesql` parameter.
fn bind_value(query: &mut Query<'_>, value: SqlValue<'static>) {
    match value {
        SqlValue::Null(t) => match t {
            SqlNullType::Bool => query.bind(Option::<bool>::None),
            SqlNullType::I16 => query.bind(Option::<i16>::None),
            SqlNullType::I32 => query.bind(Option::<i32>::None),
            SqlNullType::I64 => query.bind(Option::<i64>::None),
            SqlNullType::F32 => query.bind(Option::<f32>::None),
            SqlNullType::F64 => query.bind(Option::<f64>::None),
            SqlNullType::String => query.bind(Option::<String>::None),
            SqlNullType::Bytes => query.bind(Option::<Vec<u8>>::None),
            SqlNullType::Uuid => query.bind(Option::<uuid::Uuid>::None),
            SqlNullType::Decimal => query.bind(Option::<tiberius::numeric::Numeric>::None),
            SqlNullType::DateTime => query.bind(Option::<NaiveDateTime>::None),
            SqlNullType::DateTimeOffset => query.bind(Option::<DateTime<FixedOffset>>::None),
            SqlNullType::Date => query.bind(Option::<NaiveDate>::None),
            SqlNullType::Time => query.bind(Option::<NaiveTime>::None),
        },
        SqlValue::Bool(v) => query.bind(v),
        SqlValue::I16(v) => query.bind(v),
        SqlValue::I32(v) => query.bind(v),
        SqlValue::I64(v) => query.bind(v),
        // SQL Server rejects NaN and infinities.
        SqlValue::F32(v) => query.bind(Some(v).filter(|f| f.is_finite())),
        SqlValue::F64(v) => query.bind(Some(v).filter(|f| f.is_finite())),
        SqlValue::Text(s) => query.bind(s.into_owned()),
        SqlValue::Bytes(b) => query.bind(b.into_owned()),
        SqlValue::Uuid(u) => query.bind(u),
        SqlValue::Decimal(d) => {
            query.bind(tiberius::numeric::Numeric::new_with_scale(d.mantissa(), d.scale() as u8))
        }
        SqlValue::DateTime(dt) => query.bind(dt),
        SqlValue::DateTimeOffset(dt) => query.bind(dt),
        SqlValue::Date(d) => query.bind(d),
        SqlValue::Time(t) => query.bind(t),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_keeps_server_width() {
        assert_eq!(decode_value(ColumnData::U8(Some(7))).unwrap(), SqlValue::I16(7));
        assert_eq!(decode_value(ColumnData::I32(Some(5))).unwrap(), SqlValue::I32(5));
        assert_eq!(
            decode_value(ColumnData::I64(None)).unwrap(),
            SqlValue::Null(SqlNullType::I64)
        );
    }

    #[test]
    fn test_decode_text_and_binary() {
        let text = ColumnData::String(Some(Cow::Borrowed("abc")));
        assert_eq!(decode_value(text).unwrap(), SqlValue::from("abc".to_string()));

        let bin = ColumnData::Binary(Some(Cow::Owned(vec![1u8, 2])));
        assert_eq!(decode_value(bin).unwrap(), SqlValue::from(vec![1u8, 2]));

        assert!(decode_value(ColumnData::Binary(None)).unwrap().is_null());
    }
}
