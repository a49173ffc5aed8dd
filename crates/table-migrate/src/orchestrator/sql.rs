//! SQL text for the copy workflow.
//!
//! Identifiers and filter predicates are operator input and are spliced in
//! verbatim; no quoting or escaping is applied.

use tracing::warn;

use crate::core::schema::ColumnDescriptor;
use crate::dialect::{map_type, Dialect};

/// A filter that is empty or whitespace-only counts as absent.
pub fn effective_filter(filter: Option<&str>) -> Option<&str> {
    filter.filter(|f| !f.trim().is_empty())
}

fn with_where(mut sql: String, filter: Option<&str>) -> String {
    if let Some(predicate) = effective_filter(filter) {
        sql.push_str(" WHERE ");
        sql.push_str(predicate);
    }
    sql
}

/// `SELECT <columns> FROM <table> [WHERE <filter>]`
pub fn build_select(table: &str, columns: &[String], filter: Option<&str>) -> String {
    with_where(
        format!("SELECT {} FROM {}", columns.join(", "), table),
        filter,
    )
}

/// `INSERT INTO <table> (<columns>) VALUES (<placeholders>)` with the target
/// dialect's parameter markers, in column order.
pub fn build_insert(dialect: Dialect, table: &str, columns: &[String]) -> String {
    let placeholders: Vec<String> = (1..=columns.len())
        .map(|i| dialect.param_placeholder(i))
        .collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// `CREATE TABLE` for the target dialect.
///
/// Column types go through the type mapper, non-nullable columns get
/// `NOT NULL`, and key columns form one composite `PRIMARY KEY` constraint.
pub fn build_create_table(
    source: Dialect,
    target: Dialect,
    table: &str,
    columns: &[&ColumnDescriptor],
) -> String {
    let mut defs = Vec::with_capacity(columns.len() + 1);
    for col in columns {
        let mapping = map_type(source, target, &col.data_type);
        if let Some(warning) = &mapping.warning {
            warn!("{}.{}: {}", table, col.name, warning);
        }
        let mut def = format!("{} {}", col.name, mapping.target_type);
        if !col.is_nullable {
            def.push_str(" NOT NULL");
        }
        defs.push(def);
    }

    let pk: Vec<&str> = columns
        .iter()
        .filter(|c| c.is_primary_key)
        .map(|c| c.name.as_str())
        .collect();
    if !pk.is_empty() {
        defs.push(format!("PRIMARY KEY ({})", pk.join(", ")));
    }

    format!("CREATE TABLE {} ({})", table, defs.join(", "))
}

/// `TRUNCATE TABLE <table>`
pub fn build_truncate(table: &str) -> String {
    format!("TRUNCATE TABLE {}", table)
}

/// `SELECT COUNT(*) FROM <table> [WHERE <filter>]`
pub fn build_count(table: &str, filter: Option<&str>) -> String {
    with_where(format!("SELECT COUNT(*) FROM {}", table), filter)
}
