//! Catalog queries per dialect.
//!
//! Column queries return three text columns: name, raw type (with the
//! `(length)` or `(precision,scale)` suffix composed in SQL), and a nullability
//! flag understood by [`parse_nullable`]. Oracle and HANA columns and table
//! listings come from the ODBC metadata API instead, so those dialects have no
//! generic query here; HANA keeps raw `SYS` catalog fallbacks for when that
//! API returns nothing.

use super::Dialect;

/// Quote a value as a SQL string literal, doubling embedded quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Interpret a catalog nullability flag (`YES`, `TRUE`, `Y`, `1`).
pub fn parse_nullable(flag: &str) -> bool {
    matches!(
        flag.trim().to_ascii_uppercase().as_str(),
        "YES" | "TRUE" | "Y" | "1"
    )
}

/// Base tables of the current schema, one name per row.
pub fn list_tables_sql(dialect: Dialect) -> Option<&'static str> {
    match dialect {
        Dialect::Mysql => Some(
            r#"SELECT CAST(TABLE_NAME AS CHAR(255))
FROM information_schema.TABLES
WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE'
ORDER BY TABLE_NAME"#,
        ),
        Dialect::Postgresql => Some(
            r#"SELECT table_name::text
FROM information_schema.tables
WHERE table_schema = current_schema() AND table_type = 'BASE TABLE'
ORDER BY table_name"#,
        ),
        Dialect::Sqlserver => Some(
            r#"SELECT TABLE_NAME
FROM INFORMATION_SCHEMA.TABLES
WHERE TABLE_SCHEMA = SCHEMA_NAME() AND TABLE_TYPE = 'BASE TABLE'
ORDER BY TABLE_NAME"#,
        ),
        Dialect::Oracle | Dialect::Hana => None,
    }
}

/// Column definitions of one table in ordinal order.
pub fn columns_sql(dialect: Dialect, table: &str) -> Option<String> {
    let t = quote_literal(table);
    match dialect {
        Dialect::Mysql => Some(format!(
            r#"SELECT
    CAST(COLUMN_NAME AS CHAR(255)),
    CAST(COLUMN_TYPE AS CHAR(255)),
    CAST(IS_NULLABLE AS CHAR(3))
FROM information_schema.COLUMNS
WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = {t}
ORDER BY ORDINAL_POSITION"#
        )),
        Dialect::Postgresql => Some(format!(
            r#"SELECT
    a.attname::text,
    format_type(a.atttypid, a.atttypmod),
    CASE WHEN a.attnotnull THEN 'NO' ELSE 'YES' END
FROM pg_attribute a
WHERE a.attrelid = to_regclass({t}) AND a.attnum > 0 AND NOT a.attisdropped
ORDER BY a.attnum"#
        )),
        Dialect::Sqlserver => Some(format!(
            r#"SELECT
    c.COLUMN_NAME,
    CASE
        WHEN c.CHARACTER_MAXIMUM_LENGTH = -1 THEN c.DATA_TYPE + '(max)'
        WHEN c.CHARACTER_MAXIMUM_LENGTH IS NOT NULL
             AND c.DATA_TYPE NOT IN ('text', 'ntext', 'image', 'xml')
            THEN c.DATA_TYPE + '(' + CAST(c.CHARACTER_MAXIMUM_LENGTH AS VARCHAR(10)) + ')'
        WHEN c.DATA_TYPE IN ('decimal', 'numeric')
            THEN c.DATA_TYPE + '(' + CAST(c.NUMERIC_PRECISION AS VARCHAR(10)) + ','
                 + CAST(c.NUMERIC_SCALE AS VARCHAR(10)) + ')'
        ELSE c.DATA_TYPE
    END,
    c.IS_NULLABLE
FROM INFORMATION_SCHEMA.COLUMNS c
WHERE c.TABLE_SCHEMA = SCHEMA_NAME() AND c.TABLE_NAME = {t}
ORDER BY c.ORDINAL_POSITION"#
        )),
        Dialect::Oracle | Dialect::Hana => None,
    }
}

/// Primary key columns of one table in key order.
pub fn primary_keys_sql(dialect: Dialect, table: &str) -> String {
    let t = quote_literal(table);
    match dialect {
        Dialect::Mysql => format!(
            r#"SELECT CAST(COLUMN_NAME AS CHAR(255))
FROM information_schema.KEY_COLUMN_USAGE
WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = {t} AND CONSTRAINT_NAME = 'PRIMARY'
ORDER BY ORDINAL_POSITION"#
        ),
        Dialect::Postgresql => format!(
            r#"SELECT a.attname::text
FROM pg_index i
JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = ANY(i.indkey)
WHERE i.indrelid = to_regclass({t}) AND i.indisprimary
ORDER BY array_position(i.indkey::int2[], a.attnum)"#
        ),
        Dialect::Sqlserver => format!(
            r#"SELECT k.COLUMN_NAME
FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE k
    ON k.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
    AND k.TABLE_SCHEMA = tc.TABLE_SCHEMA
    AND k.TABLE_NAME = tc.TABLE_NAME
WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY'
    AND tc.TABLE_SCHEMA = SCHEMA_NAME()
    AND tc.TABLE_NAME = {t}
ORDER BY k.ORDINAL_POSITION"#
        ),
        Dialect::Oracle => format!(
            r#"SELECT cc.COLUMN_NAME
FROM ALL_CONSTRAINTS c
JOIN ALL_CONS_COLUMNS cc ON cc.OWNER = c.OWNER AND cc.CONSTRAINT_NAME = c.CONSTRAINT_NAME
WHERE c.CONSTRAINT_TYPE = 'P' AND c.OWNER = USER AND c.TABLE_NAME = {t}
ORDER BY cc.POSITION"#
        ),
        Dialect::Hana => format!(
            r#"SELECT COLUMN_NAME
FROM SYS.CONSTRAINTS
WHERE SCHEMA_NAME = CURRENT_SCHEMA AND TABLE_NAME = {t} AND IS_PRIMARY_KEY = 'TRUE'
ORDER BY POSITION"#
        ),
    }
}

/// HANA table listing used when the ODBC metadata call returns nothing.
pub const HANA_FALLBACK_TABLES: &str =
    "SELECT TABLE_NAME FROM SYS.TABLES WHERE SCHEMA_NAME = CURRENT_SCHEMA";

/// HANA column listing used when the ODBC metadata call returns no columns.
pub fn hana_fallback_columns_sql(table: &str) -> String {
    format!(
        r#"SELECT
    COLUMN_NAME,
    CASE
        WHEN DATA_TYPE_NAME IN ('DECIMAL', 'SMALLDECIMAL') AND SCALE IS NOT NULL
            THEN DATA_TYPE_NAME || '(' || TO_VARCHAR(LENGTH) || ',' || TO_VARCHAR(SCALE) || ')'
        WHEN DATA_TYPE_NAME IN ('VARCHAR', 'NVARCHAR', 'CHAR', 'NCHAR', 'ALPHANUM', 'VARBINARY', 'BINARY')
            THEN DATA_TYPE_NAME || '(' || TO_VARCHAR(LENGTH) || ')'
        ELSE DATA_TYPE_NAME
    END,
    IS_NULLABLE
FROM SYS.TABLE_COLUMNS
WHERE TABLE_NAME = {} AND SCHEMA_NAME = CURRENT_SCHEMA
ORDER BY POSITION"#,
        quote_literal(table)
    )
}

/// Compose a raw column type from driver metadata (`SQLColumns`).
///
/// Character and binary types get `(size)`, decimal types `(size,digits)`;
/// types without a meaningful size are returned bare.
pub fn compose_type(type_name: &str, size: Option<i64>, digits: Option<i64>) -> String {
    let name = type_name.trim();
    let upper = name.to_ascii_uppercase();
    let is_decimal = matches!(upper.as_str(), "DECIMAL" | "NUMERIC" | "NUMBER" | "SMALLDECIMAL");
    let is_sized = upper.contains("CHAR")
        || upper == "ALPHANUM"
        || upper.contains("BINARY")
        || upper == "RAW";

    match (size.filter(|s| *s > 0), digits) {
        (Some(p), Some(s)) if is_decimal => format!("{}({},{})", name, p, s),
        (Some(p), None) if is_decimal => format!("{}({})", name, p),
        (Some(n), _) if is_sized => format!("{}({})", name, n),
        _ => name.to_string(),
    }
}
