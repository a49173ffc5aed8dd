//! PostgreSQL driver (tokio-postgres).
//!
//! Rows stream through `query_raw`; inserts use one prepared statement whose
//! parameter types drive value coercion in [`Connection::bind_row`].

mod tls;
mod values;

use std::str::FromStr;

use async_trait::async_trait;
use futures::StreamExt;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, Config as PgConfig, NoTls, Statement};
use tracing::{debug, info, warn};

use crate::config::ConnectionDescriptor;
use crate::core::traits::{Connection, RowStream};
use crate::core::value::Row;
use crate::dialect::Dialect;
use crate::error::{MigrateError, Result};

/// One PostgreSQL session.
pub struct PostgresConnection {
    client: Client,
    insert: Option<(Statement, Vec<Type>)>,
    in_transaction: bool,
}

impl PostgresConnection {
    /// Connect using the descriptor's connection string and credentials.
    pub async fn connect(descriptor: &ConnectionDescriptor) -> Result<Self> {
        let conn_str = descriptor.connection_string()?;
        let mut config = PgConfig::from_str(&conn_str).map_err(connection_error)?;
        if !descriptor.username.is_empty() {
            config.user(&descriptor.username);
        }
        if let Some(password) = descriptor.password() {
            config.password(password);
        }

        let client = match tls::connector(descriptor.ssl_mode()?)? {
            None => {
                let (client, connection) = config.connect(NoTls).await.map_err(connection_error)?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        warn!("PostgreSQL connection closed with error: {}", e);
                    }
                });
                client
            }
            Some(tls) => {
                let (client, connection) = config.connect(tls).await.map_err(connection_error)?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        warn!("PostgreSQL connection closed with error: {}", e);
                    }
                });
                client
            }
        };

        info!(
            "Connected to PostgreSQL: {}",
            crate::config::redact_connection_string(&conn_str)
        );

        Ok(Self {
            client,
            insert: None,
            in_transaction: false,
        })
    }

    async fn ensure_transaction(&mut self) -> Result<()> {
        if !self.in_transaction {
            self.client.batch_execute("BEGIN").await?;
            self.in_transaction = true;
        }
        Ok(())
    }
}

fn connection_error(e: tokio_postgres::Error) -> MigrateError {
    MigrateError::connection(Dialect::Postgresql.as_str(), e)
}

#[async_trait]
impl Connection for PostgresConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Postgresql
    }

    async fn stream_rows<'a>(&'a mut self, sql: &'a str) -> Result<RowStream<'a>> {
        debug!("PostgreSQL query: {}", sql);
        let rows = self.client.query_raw(sql, Vec::<String>::new()).await?;
        Ok(rows
            .map(|row| match row {
                Ok(row) => values::decode_row(&row),
                Err(e) => Err(MigrateError::from(e)),
            })
            .boxed())
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        debug!("PostgreSQL execute: {}", sql);
        Ok(self.client.execute(sql, &[]).await?)
    }

    async fn begin_batches(&mut self, insert_sql: &str) -> Result<()> {
        debug!("PostgreSQL prepare: {}", insert_sql);
        self.ensure_transaction().await?;
        let statement = self.client.prepare(insert_sql).await?;
        let types = statement.params().to_vec();
        self.insert = Some((statement, types));
        Ok(())
    }

    fn bind_row(&self, row: Row) -> Result<Row> {
        let (_, types) = self
            .insert
            .as_ref()
            .ok_or_else(|| MigrateError::row_conversion("no prepared insert statement"))?;
        values::coerce_row(row, types)
    }

    async fn execute_batch(&mut self, rows: Vec<Row>) -> Result<Vec<u64>> {
        let (statement, types) = self
            .insert
            .clone()
            .ok_or_else(|| MigrateError::Config("begin_batches was not called".into()))?;
        self.ensure_transaction().await?;

        let mut counts = Vec::with_capacity(rows.len());
        for row in &rows {
            let params = values::to_params(row, &types)?;
            let refs: Vec<&(dyn ToSql + Sync)> = params
                .iter()
                .map(|p| p.as_ref() as &(dyn ToSql + Sync))
                .collect();
            counts.push(self.client.execute(&statement, &refs).await?);
        }
        Ok(counts)
    }

    async fn commit(&mut self) -> Result<()> {
        if self.in_transaction {
            self.client.batch_execute("COMMIT").await?;
            self.in_transaction = false;
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if self.in_transaction {
            self.in_transaction = false;
            self.client.batch_execute("ROLLBACK").await?;
        }
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        // Dropping the client ends the spawned connection task.
        drop(self);
        Ok(())
    }
}
