//! Table and column metadata produced by the schema inspector.

use serde::{Deserialize, Serialize};

/// Column metadata as reported by the source engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,

    /// Raw type name including any length/precision suffix, e.g. `VARCHAR(45)`.
    pub data_type: String,

    /// Whether the column accepts NULL.
    pub is_nullable: bool,

    /// Whether the column is part of the primary key.
    pub is_primary_key: bool,
}

impl ColumnDescriptor {
    /// Create a non-key column.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, is_nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable,
            is_primary_key: false,
        }
    }

    /// Mark the column as a primary key member.
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }
}

/// A table name plus its columns in the engine's reported order.
///
/// Column order is load-bearing: SELECT and INSERT lists are built from it and
/// values are copied by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Table name.
    pub name: String,

    /// Column definitions.
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    /// Create a table descriptor.
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Primary key column names in column order.
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Find a column by name. Case-insensitive since catalogs differ in how
    /// they fold unquoted identifiers.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .or_else(|| self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> TableDescriptor {
        TableDescriptor::new(
            "orders",
            vec![
                ColumnDescriptor::new("id", "INT", false).primary_key(),
                ColumnDescriptor::new("total", "DECIMAL(10,2)", true),
                ColumnDescriptor::new("note", "VARCHAR(200)", true),
            ],
        )
    }

    #[test]
    fn test_column_names_keep_order() {
        assert_eq!(orders().column_names(), vec!["id", "total", "note"]);
    }

    #[test]
    fn test_primary_key() {
        assert_eq!(orders().primary_key(), vec!["id"]);
    }

    #[test]
    fn test_column_lookup_prefers_exact_match() {
        let table = orders();
        assert_eq!(table.column("TOTAL").map(|c| c.name.as_str()), Some("total"));
        assert!(table.column("missing").is_none());
    }
}
