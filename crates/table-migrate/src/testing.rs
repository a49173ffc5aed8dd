//! In-memory database used by the inspector and engine tests.
//!
//! Understands exactly the SQL the engine generates (`SELECT cols FROM t
//! [WHERE col op int]`, `SELECT COUNT(*)`, `CREATE TABLE`, `TRUNCATE TABLE`,
//! `INSERT INTO t (cols)`) plus the HANA `SYS` catalog fallbacks. Failures can
//! be injected per table, per batch and per row.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures::StreamExt;

use crate::config::ConnectionDescriptor;
use crate::core::schema::ColumnDescriptor;
use crate::core::traits::{Connection, ConnectionProvider, RowStream};
use crate::core::value::{Row, SqlValue};
use crate::dialect::Dialect;
use crate::error::{MigrateError, Result};

/// Text value that the target refuses to bind.
pub const POISON: &str = "<poison>";

/// A stored table.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    pub columns: Vec<ColumnDescriptor>,
    pub primary_key: Vec<String>,
    pub rows: Vec<Row>,
    /// Row positions the source cannot decode.
    pub undecodable: HashSet<usize>,
}

impl MemoryTable {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            columns,
            ..Default::default()
        }
    }

    pub fn with_primary_key(mut self, names: &[&str]) -> Self {
        self.primary_key = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_undecodable(mut self, positions: &[usize]) -> Self {
        self.undecodable = positions.iter().copied().collect();
        self
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Default)]
struct State {
    tables: BTreeMap<String, MemoryTable>,
    statements: Vec<String>,
    commits: Vec<usize>,
    rollbacks: usize,
    connects: usize,
    closes: usize,
    fail_metadata: bool,
    empty_driver_metadata: bool,
    fail_ddl: bool,
    fail_batch_number: Option<usize>,
    batches_executed: usize,
    count_rows: Option<Vec<Row>>,
}

/// Shared handle to one in-memory database.
#[derive(Debug, Clone)]
pub struct MemoryDatabase {
    dialect: Dialect,
    state: Arc<Mutex<State>>,
}

impl MemoryDatabase {
    pub fn new(dialect: &str) -> Self {
        Self {
            dialect: dialect.parse().unwrap(),
            state: Arc::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn with_table(self, name: &str, table: MemoryTable) -> Self {
        self.lock().tables.insert(name.to_string(), table);
        self
    }

    /// Catalog calls fail with a driver error.
    pub fn fail_metadata(self) -> Self {
        self.lock().fail_metadata = true;
        self
    }

    /// Driver metadata calls succeed but return nothing.
    pub fn empty_driver_metadata(self) -> Self {
        self.lock().empty_driver_metadata = true;
        self
    }

    /// CREATE TABLE and TRUNCATE fail.
    pub fn fail_ddl(self) -> Self {
        self.lock().fail_ddl = true;
        self
    }

    /// The n-th executed batch (1-based) fails as a whole.
    pub fn fail_batch(self, number: usize) -> Self {
        self.lock().fail_batch_number = Some(number);
        self
    }

    /// `SELECT COUNT(*)` returns exactly these rows.
    pub fn with_count_rows(self, rows: Vec<Row>) -> Self {
        self.lock().count_rows = Some(rows);
        self
    }

    pub fn table(&self, name: &str) -> Option<MemoryTable> {
        self.lock().tables.get(name).cloned()
    }

    pub fn rows(&self, name: &str) -> Vec<Row> {
        self.table(name).map(|t| t.rows).unwrap_or_default()
    }

    /// SQL passed to `stream_rows` and `execute`, in order.
    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.clone()
    }

    /// Rows made durable by each commit.
    pub fn commits(&self) -> Vec<usize> {
        self.lock().commits.clone()
    }

    pub fn rollbacks(&self) -> usize {
        self.lock().rollbacks
    }

    /// (connects, closes)
    pub fn sessions(&self) -> (usize, usize) {
        let state = self.lock();
        (state.connects, state.closes)
    }
}

/// Provider resolving descriptors to in-memory databases by database name.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    databases: HashMap<String, MemoryDatabase>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(mut self, name: &str, db: MemoryDatabase) -> Self {
        self.databases.insert(name.to_string(), db);
        self
    }

    pub fn descriptor(&self, dialect: &str, database: &str) -> ConnectionDescriptor {
        ConnectionDescriptor::new(dialect, "memory", database, "tester")
    }
}

#[async_trait]
impl ConnectionProvider for MemoryProvider {
    async fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn Connection>> {
        let dialect = descriptor.dialect()?;
        let db = self.databases.get(&descriptor.database).ok_or_else(|| {
            MigrateError::connection(
                dialect.as_str(),
                format!("unknown database {}", descriptor.database),
            )
        })?;
        db.lock().connects += 1;
        Ok(Box::new(MemoryConnection {
            db: db.clone(),
            insert: None,
            pending: Vec::new(),
        }))
    }
}

struct MemoryConnection {
    db: MemoryDatabase,
    insert: Option<(String, Vec<String>)>,
    pending: Vec<Row>,
}

fn driver_error(message: &str) -> MigrateError {
    MigrateError::Io(std::io::Error::other(message.to_string()))
}

fn word_after<'a>(sql: &'a str, keyword: &str) -> Option<&'a str> {
    let upper = sql.to_ascii_uppercase();
    let pos = upper.find(keyword)? + keyword.len();
    sql[pos..].split_whitespace().next()
}

fn between<'a>(sql: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = sql.find(open)? + open.len();
    let end = sql[start..].find(close)? + start;
    Some(&sql[start..end])
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',').map(|s| s.trim().to_string()).collect()
}

/// Split on commas outside parentheses.
fn split_top_level(list: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in list.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// `col op int` with op one of `=`, `<>`, `>`, `<`, `>=`, `<=`.
fn matches_filter(table: &MemoryTable, row: &Row, filter: &str) -> Result<bool> {
    let parts: Vec<&str> = filter.split_whitespace().collect();
    let [col, op, value] = parts.as_slice() else {
        return Err(driver_error("unsupported filter"));
    };
    let idx = table
        .column_index(col)
        .ok_or_else(|| driver_error("unknown filter column"))?;
    let left = row[idx].as_i64().unwrap_or_default();
    let right: i64 = value.parse().map_err(|_| driver_error("bad filter value"))?;
    Ok(match *op {
        "=" => left == right,
        "<>" => left != right,
        ">" => left > right,
        "<" => left < right,
        ">=" => left >= right,
        "<=" => left <= right,
        _ => return Err(driver_error("unsupported filter operator")),
    })
}

impl MemoryConnection {
    fn run_query(&self, sql: &str) -> Result<Vec<Result<Row>>> {
        let state = self.db.lock();
        let upper = sql.to_ascii_uppercase();

        if upper.contains("SYS.TABLE_COLUMNS") {
            let name = between(sql, "TABLE_NAME = '", "'").unwrap_or_default();
            let table = state.tables.get(name);
            return Ok(table
                .map(|t| {
                    t.columns
                        .iter()
                        .map(|c| {
                            let flag = if c.is_nullable { "TRUE" } else { "FALSE" };
                            Ok(vec![
                                SqlValue::from(c.name.clone()),
                                SqlValue::from(c.data_type.clone()),
                                SqlValue::from(flag.to_string()),
                            ])
                        })
                        .collect()
                })
                .unwrap_or_default());
        }
        if upper.contains("SYS.TABLES") {
            return Ok(state
                .tables
                .keys()
                .map(|k| Ok(vec![SqlValue::from(k.clone())]))
                .collect());
        }

        if let Some(rows) = &state.count_rows {
            if upper.starts_with("SELECT COUNT(*)") {
                return Ok(rows.iter().cloned().map(Ok).collect());
            }
        }

        // Probe queries: `SELECT 1`, `SELECT 1 FROM DUAL`, `SELECT 1 FROM DUMMY`.
        let table_name = match word_after(sql, " FROM ") {
            None | Some("DUAL") | Some("DUMMY") => return Ok(vec![Ok(vec![SqlValue::I32(1)])]),
            Some(name) => name,
        };
        let table = state
            .tables
            .get(table_name)
            .ok_or_else(|| driver_error(&format!("table {} does not exist", table_name)))?;
        let filter = upper.find(" WHERE ").map(|pos| &sql[pos + 7..]);

        let mut selected = Vec::new();
        for (pos, row) in table.rows.iter().enumerate() {
            if let Some(f) = filter {
                if !matches_filter(table, row, f)? {
                    continue;
                }
            }
            selected.push((pos, row));
        }

        if upper.starts_with("SELECT COUNT(*)") {
            return Ok(vec![Ok(vec![SqlValue::I64(selected.len() as i64)])]);
        }

        let list = between(sql, "SELECT ", " FROM").unwrap_or_default();
        let indexes: Vec<usize> = split_list(list)
            .iter()
            .map(|c| {
                table
                    .column_index(c)
                    .ok_or_else(|| driver_error(&format!("unknown column {}", c)))
            })
            .collect::<Result<_>>()?;

        Ok(selected
            .into_iter()
            .map(|(pos, row)| {
                if table.undecodable.contains(&pos) {
                    Err(MigrateError::row_conversion(format!("cannot decode row {}", pos)))
                } else {
                    Ok(indexes.iter().map(|&i| row[i].clone()).collect())
                }
            })
            .collect())
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    fn dialect(&self) -> Dialect {
        self.db.dialect
    }

    async fn stream_rows<'a>(&'a mut self, sql: &'a str) -> Result<RowStream<'a>> {
        self.db.lock().statements.push(sql.to_string());
        let items = self.run_query(sql)?;
        Ok(futures::stream::iter(items).boxed())
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        let mut state = self.db.lock();
        state.statements.push(sql.to_string());
        let upper = sql.to_ascii_uppercase();

        let is_ddl = upper.starts_with("CREATE TABLE") || upper.starts_with("TRUNCATE TABLE");
        if is_ddl && state.fail_ddl {
            return Err(driver_error("permission denied"));
        }

        if upper.starts_with("CREATE TABLE") {
            let name = word_after(sql, "CREATE TABLE").unwrap_or_default().to_string();
            if state.tables.contains_key(&name) {
                return Err(driver_error(&format!("table {} already exists", name)));
            }
            let body = match (sql.find('('), sql.rfind(')')) {
                (Some(start), Some(end)) if start < end => &sql[start + 1..end],
                _ => "",
            };
            let columns = split_top_level(body)
                .into_iter()
                .filter(|def| !def.starts_with("PRIMARY KEY"))
                .filter_map(|def| {
                    let (col, rest) = def.split_once(' ')?;
                    let nullable = !rest.ends_with("NOT NULL");
                    let ty = rest.trim_end_matches(" NOT NULL");
                    Some(ColumnDescriptor::new(col, ty, nullable))
                })
                .collect();
            state.tables.insert(name, MemoryTable::new(columns));
            return Ok(0);
        }

        if upper.starts_with("TRUNCATE TABLE") {
            let name = word_after(sql, "TRUNCATE TABLE").unwrap_or_default();
            let table = state
                .tables
                .get_mut(name)
                .ok_or_else(|| driver_error(&format!("table {} does not exist", name)))?;
            let removed = table.rows.len() as u64;
            table.rows.clear();
            return Ok(removed);
        }

        Err(driver_error("unsupported statement"))
    }

    async fn metadata_tables(&mut self) -> Result<Vec<String>> {
        let state = self.db.lock();
        if state.fail_metadata {
            return Err(driver_error("catalog unavailable"));
        }
        if state.empty_driver_metadata {
            return Ok(Vec::new());
        }
        Ok(state.tables.keys().cloned().collect())
    }

    async fn metadata_columns(&mut self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let state = self.db.lock();
        if state.fail_metadata {
            return Err(driver_error("catalog unavailable"));
        }
        if state.empty_driver_metadata {
            return Ok(Vec::new());
        }
        Ok(state
            .tables
            .get(table)
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }

    async fn metadata_primary_keys(&mut self, table: &str) -> Result<Vec<String>> {
        let state = self.db.lock();
        if state.fail_metadata {
            return Err(driver_error("catalog unavailable"));
        }
        Ok(state
            .tables
            .get(table)
            .map(|t| t.primary_key.clone())
            .unwrap_or_default())
    }

    async fn begin_batches(&mut self, insert_sql: &str) -> Result<()> {
        self.db.lock().statements.push(insert_sql.to_string());
        let table = word_after(insert_sql, "INSERT INTO")
            .ok_or_else(|| driver_error("bad insert"))?
            .to_string();
        let columns = between(insert_sql, "(", ")")
            .map(split_list)
            .ok_or_else(|| driver_error("bad insert"))?;
        if !self.db.lock().tables.contains_key(&table) {
            return Err(driver_error(&format!("table {} does not exist", table)));
        }
        self.insert = Some((table, columns));
        Ok(())
    }

    fn bind_row(&self, row: Row) -> Result<Row> {
        if row
            .iter()
            .any(|v| matches!(v, SqlValue::Text(s) if s == POISON))
        {
            return Err(MigrateError::row_conversion("value violates column type"));
        }
        Ok(row)
    }

    async fn execute_batch(&mut self, rows: Vec<Row>) -> Result<Vec<u64>> {
        let mut state = self.db.lock();
        state.batches_executed += 1;
        if state.fail_batch_number == Some(state.batches_executed) {
            return Err(driver_error("unique constraint violated"));
        }
        let counts = vec![1; rows.len()];
        self.pending.extend(rows);
        Ok(counts)
    }

    async fn commit(&mut self) -> Result<()> {
        let (table, columns) = self
            .insert
            .clone()
            .ok_or_else(|| driver_error("no insert prepared"))?;
        let rows = std::mem::take(&mut self.pending);
        let mut state = self.db.lock();
        state.commits.push(rows.len());
        let target = state
            .tables
            .get_mut(&table)
            .ok_or_else(|| driver_error("target vanished"))?;
        let width = target.columns.len().max(columns.len());
        for row in rows {
            let mut stored = vec![SqlValue::from(String::new()); width];
            for (value, name) in row.into_iter().zip(&columns) {
                let idx = target
                    .column_index(name)
                    .ok_or_else(|| driver_error(&format!("unknown column {}", name)))?;
                stored[idx] = value;
            }
            target.rows.push(stored);
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.pending.clear();
        self.db.lock().rollbacks += 1;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.db.lock().closes += 1;
        Ok(())
    }
}
