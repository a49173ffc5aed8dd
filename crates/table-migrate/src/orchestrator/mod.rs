//! Migration orchestrator - single-table workflow coordinator.
//!
//! A migration runs as a fixed sequence of phases, stopping at the first
//! fatal error:
//!
//! 1. Describe the source table
//! 2. Create the target table (optional)
//! 3. Truncate the target table (optional)
//! 4. Copy rows in committed batches
//!
//! Row-level conversion failures are counted and skipped; everything else
//! ends the run with a failed [`MigrationResult`] carrying the partial counts.

mod sql;

pub use sql::{
    build_count, build_create_table, build_insert, build_select, build_truncate,
    effective_filter,
};

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::ConnectionDescriptor;
use crate::core::schema::{ColumnDescriptor, TableDescriptor};
use crate::core::traits::{Connection, ConnectionProvider};
use crate::core::value::Row;
use crate::dialect::Dialect;
use crate::drivers::DriverProvider;
use crate::error::{ErrorKind, MigrateError, Result};
use crate::inspector;

/// Everything needed to copy one table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationRequest {
    pub source: ConnectionDescriptor,
    pub target: ConnectionDescriptor,
    pub source_table: String,
    pub target_table: String,
    /// Columns to copy, in order. Empty means every source column.
    pub columns: Vec<String>,
    /// Native predicate appended after WHERE, verbatim.
    pub filter: Option<String>,
    pub create_target_table: bool,
    pub truncate_target_table: bool,
    pub batch_size: usize,
}

impl MigrationRequest {
    /// Copy `table` to a table of the same name with default settings.
    pub fn new(
        source: ConnectionDescriptor,
        target: ConnectionDescriptor,
        table: impl Into<String>,
    ) -> Self {
        let table = table.into();
        Self {
            source,
            target,
            target_table: table.clone(),
            source_table: table,
            columns: Vec::new(),
            filter: None,
            create_target_table: false,
            truncate_target_table: false,
            batch_size: crate::config::DEFAULT_BATCH_SIZE,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.source_table.trim().is_empty() {
            return Err(MigrateError::Config("source table is required".into()));
        }
        if self.target_table.trim().is_empty() {
            return Err(MigrateError::Config("target table is required".into()));
        }
        if self.batch_size == 0 {
            return Err(MigrateError::Config("batch_size must be at least 1".into()));
        }
        Ok(())
    }
}

/// Outcome of one migration.
///
/// `migrated + failed <= total` always holds; equality holds on success.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationResult {
    /// Whether the copy ran to completion.
    pub success: bool,

    pub source_table: String,
    pub target_table: String,

    /// Rows read from the source.
    pub total: u64,

    /// Rows written by committed batches.
    pub migrated: u64,

    /// Rows skipped because they could not be converted or bound.
    pub failed: u64,

    /// Batches committed on the target.
    pub batches_committed: u64,

    /// Wall-clock duration in milliseconds.
    pub elapsed_ms: u64,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,

    /// Human-readable summary.
    pub message: String,

    /// Cause of a failed migration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Classification of `error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl MigrationResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Process exit code: 0 on success, the cause's code otherwise.
    pub fn exit_code(&self) -> u8 {
        self.error_kind.map_or(0, ErrorKind::exit_code)
    }
}

#[derive(Debug, Default)]
struct CopyStats {
    total: u64,
    migrated: u64,
    failed: u64,
    batches: u64,
}

/// Runs the five engine operations against connections from a provider.
pub struct Orchestrator {
    provider: Arc<dyn ConnectionProvider>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    /// Orchestrator backed by the real database drivers.
    pub fn new() -> Self {
        Self::with_provider(DriverProvider::new())
    }

    /// Orchestrator backed by a custom connection provider.
    pub fn with_provider(provider: impl ConnectionProvider + 'static) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }

    /// Connect and run the dialect's probe query.
    pub async fn test_connection(&self, descriptor: &ConnectionDescriptor) -> Result<bool> {
        let mut conn = self.provider.connect(descriptor).await?;
        let result = conn.ping().await.map_err(|e| match e {
            e @ MigrateError::Connection { .. } => e,
            other => MigrateError::connection(descriptor.dialect.as_str(), other),
        });
        close_quietly(conn).await;
        result?;
        info!("Connection to {} ({}) OK", descriptor.database, descriptor.dialect);
        Ok(true)
    }

    /// Base tables in the connection's current schema.
    pub async fn list_tables(&self, descriptor: &ConnectionDescriptor) -> Result<Vec<String>> {
        let mut conn = self.provider.connect(descriptor).await?;
        let result = inspector::list_tables(conn.as_mut()).await;
        close_quietly(conn).await;
        result
    }

    /// Column metadata for one table.
    pub async fn describe_table(
        &self,
        descriptor: &ConnectionDescriptor,
        table: &str,
    ) -> Result<TableDescriptor> {
        let mut conn = self.provider.connect(descriptor).await?;
        let result = inspector::describe_table(conn.as_mut(), table).await;
        close_quietly(conn).await;
        result
    }

    /// `SELECT COUNT(*)` with an optional verbatim filter; 0 for an empty result.
    pub async fn count_records(
        &self,
        descriptor: &ConnectionDescriptor,
        table: &str,
        filter: Option<&str>,
    ) -> Result<i64> {
        let sql = build_count(table, filter);
        let mut conn = self.provider.connect(descriptor).await?;
        let result = conn.query_rows(&sql).await;
        close_quietly(conn).await;

        let count = match result?.first().and_then(|row| row.first()) {
            None => 0,
            Some(value) => value.as_i64().ok_or_else(|| {
                MigrateError::row_conversion(format!(
                    "{}: count returned {} instead of an integer",
                    table, value
                ))
            })?,
        };
        debug!("{}: {} rows", table, count);
        Ok(count)
    }

    /// Run one migration. Never returns an error: failures are reported in
    /// the result together with the counts reached before the failure.
    pub async fn migrate(&self, request: &MigrationRequest) -> MigrationResult {
        let started_at = Utc::now();
        let start = Instant::now();
        info!(
            "Starting migration {} ({}) -> {} ({})",
            request.source_table, request.source.dialect, request.target_table, request.target.dialect
        );

        let mut stats = CopyStats::default();
        let outcome = self.run(request, &mut stats).await;
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (success, message, error, error_kind) = match outcome {
            Ok(()) => (true, "Migration completed successfully".to_string(), None, None),
            Err(e) => {
                error!("Migration failed: {}", e);
                (
                    false,
                    format!("Migration failed: {}", e),
                    Some(e.to_string()),
                    Some(e.kind()),
                )
            }
        };

        let result = MigrationResult {
            success,
            source_table: request.source_table.clone(),
            target_table: request.target_table.clone(),
            total: stats.total,
            migrated: stats.migrated,
            failed: stats.failed,
            batches_committed: stats.batches,
            elapsed_ms,
            started_at,
            completed_at: Utc::now(),
            message,
            error,
            error_kind,
        };

        info!(
            "Migration {}: {} read, {} migrated, {} failed in {} batches ({} ms)",
            if result.success { "completed" } else { "failed" },
            result.total,
            result.migrated,
            result.failed,
            result.batches_committed,
            result.elapsed_ms
        );
        result
    }

    async fn run(&self, request: &MigrationRequest, stats: &mut CopyStats) -> Result<()> {
        request.validate()?;
        let source_dialect = request.source.dialect()?;
        let target_dialect = request.target.dialect()?;

        // Phase 1: describe source
        info!("Phase 1: Describing source table {}", request.source_table);
        let source_table = self
            .describe_table(&request.source, &request.source_table)
            .await?;

        let columns = if request.columns.is_empty() {
            source_table.column_names()
        } else {
            request.columns.clone()
        };
        if columns.is_empty() {
            return Err(MigrateError::schema_lookup(
                &request.source_table,
                "no columns to copy",
            ));
        }

        // Phases 2 and 3: prepare target
        if request.create_target_table || request.truncate_target_table {
            self.prepare_target(request, source_dialect, target_dialect, &source_table, &columns)
                .await?;
        }

        // Phase 4: copy
        info!(
            "Phase 4: Copying {} columns in batches of {}",
            columns.len(),
            request.batch_size
        );
        self.copy_rows(request, target_dialect, &columns, stats).await
    }

    async fn prepare_target(
        &self,
        request: &MigrationRequest,
        source_dialect: Dialect,
        target_dialect: Dialect,
        source_table: &TableDescriptor,
        columns: &[String],
    ) -> Result<()> {
        let mut statements = Vec::with_capacity(2);
        if request.create_target_table {
            let selected = select_columns(source_table, columns)?;
            statements.push(build_create_table(
                source_dialect,
                target_dialect,
                &request.target_table,
                &selected,
            ));
        }
        if request.truncate_target_table {
            statements.push(build_truncate(&request.target_table));
        }

        let mut conn = self.provider.connect(&request.target).await?;
        let mut result = Ok(());
        for statement in statements {
            info!("Executing DDL: {}", statement);
            if let Err(e) = conn.execute(&statement).await {
                result = Err(MigrateError::ddl(statement, e));
                break;
            }
        }
        close_quietly(conn).await;
        result
    }

    async fn copy_rows(
        &self,
        request: &MigrationRequest,
        target_dialect: Dialect,
        columns: &[String],
        stats: &mut CopyStats,
    ) -> Result<()> {
        let select = build_select(&request.source_table, columns, request.filter.as_deref());
        let insert = build_insert(target_dialect, &request.target_table, columns);
        debug!("Source query: {}", select);
        debug!("Target insert: {}", insert);

        let mut source = self.provider.connect(&request.source).await?;
        let mut target = match self.provider.connect(&request.target).await {
            Ok(conn) => conn,
            Err(e) => {
                close_quietly(source).await;
                return Err(e);
            }
        };

        let copy = CopyLoop {
            table: &request.target_table,
            select: &select,
            insert: &insert,
            width: columns.len(),
            batch_size: request.batch_size,
        };
        let result = copy.run(source.as_mut(), target.as_mut(), stats).await;

        if result.is_err() {
            if let Err(e) = target.rollback().await {
                warn!("Rollback after failure did not complete: {}", e);
            }
        }
        close_quietly(target).await;
        close_quietly(source).await;
        result
    }
}

/// Selected columns in the requested order; each must exist in the source.
fn select_columns<'a>(
    table: &'a TableDescriptor,
    columns: &[String],
) -> Result<Vec<&'a ColumnDescriptor>> {
    columns
        .iter()
        .map(|name| {
            table.column(name).ok_or_else(|| {
                MigrateError::schema_lookup(
                    &table.name,
                    format!("column {} not found in source table", name),
                )
            })
        })
        .collect()
}

struct CopyLoop<'a> {
    table: &'a str,
    select: &'a str,
    insert: &'a str,
    width: usize,
    batch_size: usize,
}

impl CopyLoop<'_> {
    async fn run(
        &self,
        source: &mut dyn Connection,
        target: &mut dyn Connection,
        stats: &mut CopyStats,
    ) -> Result<()> {
        target
            .begin_batches(self.insert)
            .await
            .map_err(|e| self.batch_error(e))?;

        let mut rows = source.stream_rows(self.select).await?;
        let mut batch: Vec<Row> = Vec::with_capacity(self.batch_size);

        while let Some(item) = rows.next().await {
            let row = match item {
                Err(e) if !e.is_recoverable() => return Err(e),
                other => other,
            };
            stats.total += 1;

            match row
                .and_then(|row| self.check_width(row))
                .and_then(|row| target.bind_row(row))
            {
                Ok(row) => batch.push(row),
                Err(e) if e.is_recoverable() => {
                    stats.failed += 1;
                    warn!("{}: row {} skipped: {}", self.table, stats.total, e);
                    continue;
                }
                Err(e) => return Err(e),
            }

            if batch.len() >= self.batch_size {
                self.flush(target, &mut batch, stats).await?;
            }
        }

        if !batch.is_empty() {
            self.flush(target, &mut batch, stats).await?;
        }
        Ok(())
    }

    fn check_width(&self, row: Row) -> Result<Row> {
        if row.len() == self.width {
            Ok(row)
        } else {
            Err(MigrateError::row_conversion(format!(
                "expected {} values, got {}",
                self.width,
                row.len()
            )))
        }
    }

    async fn flush(
        &self,
        target: &mut dyn Connection,
        batch: &mut Vec<Row>,
        stats: &mut CopyStats,
    ) -> Result<()> {
        let rows = std::mem::replace(batch, Vec::with_capacity(self.batch_size));
        let size = rows.len();

        let affected = target
            .execute_batch(rows)
            .await
            .map_err(|e| self.batch_error(e))?;
        target.commit().await.map_err(|e| self.batch_error(e))?;

        stats.migrated += affected.iter().sum::<u64>();
        stats.batches += 1;
        debug!(
            "{}: batch {} committed ({} rows, {} total migrated)",
            self.table, stats.batches, size, stats.migrated
        );
        Ok(())
    }

    fn batch_error(&self, e: MigrateError) -> MigrateError {
        match e {
            e @ MigrateError::BatchExecution { .. } => e,
            other => MigrateError::batch(self.table, other),
        }
    }
}

async fn close_quietly(conn: Box<dyn Connection>) {
    let dialect = conn.dialect();
    if let Err(e) = conn.close().await {
        warn!("Closing {} connection failed: {}", dialect, e);
    }
}
