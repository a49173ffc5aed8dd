//! Dialect type mapper.
//!
//! Translates a source column type name into an equivalent type for the target
//! dialect. Lookups go through static tables keyed by (source, target) pair and
//! normalized base type; anything the tables do not know resolves through a
//! keyword fallback, so [`convert_type`] always returns a usable type.
//!
//! Length and precision suffixes are re-attached from the raw source type:
//!
//! | source family            | suffix present        | suffix absent |
//! |--------------------------|-----------------------|---------------|
//! | character (`*char*`)     | `(n)`                 | `(255)`       |
//! | decimal/numeric/number   | `(p)` or `(p,s)`      | `(18,6)`      |
//! | binary → sized binary    | `(n)`                 | none          |
//!
//! A `(max)` suffix on a character or binary source selects the target's large
//! object type instead.

use serde::Serialize;

use super::Dialect;

/// How a mapping was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Source and target dialect are the same; the raw type is reused.
    Identity,
    /// Found in the static type table.
    Table,
    /// Classified by keyword because the table had no entry.
    Fallback,
}

/// Result of mapping one column type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeMapping {
    /// Target type string (e.g. "NVARCHAR(45)", "BIGINT").
    pub target_type: String,
    /// Where the target type came from.
    pub resolution: Resolution,
    /// Explanation for fallback mappings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl TypeMapping {
    fn new(target_type: String, resolution: Resolution) -> Self {
        Self {
            target_type,
            resolution,
            warning: None,
        }
    }

    /// Whether the keyword fallback produced this mapping.
    pub fn is_fallback(&self) -> bool {
        self.resolution == Resolution::Fallback
    }
}

/// Map a source column type to the target dialect.
///
/// Pure and total: unknown types resolve through the fallback chain.
pub fn convert_type(source: Dialect, target: Dialect, raw_type: &str) -> String {
    map_type(source, target, raw_type).target_type
}

/// Map a source column type and report how the mapping was resolved.
pub fn map_type(source: Dialect, target: Dialect, raw_type: &str) -> TypeMapping {
    if source == target {
        return TypeMapping::new(raw_type.to_string(), Resolution::Identity);
    }

    let parsed = ParsedType::parse(raw_type);

    if let Some(mapped) = lookup(source, target, &parsed.base) {
        return TypeMapping::new(attach_suffix(mapped, &parsed, target), Resolution::Table);
    }

    let mut mapping = TypeMapping::new(fallback(&parsed, target), Resolution::Fallback);
    mapping.warning = Some(format!(
        "no {} -> {} mapping for '{}', using generic {}",
        source, target, raw_type, mapping.target_type
    ));
    mapping
}

/// A raw type split into its normalized base name and suffix arguments.
#[derive(Debug, PartialEq, Eq)]
struct ParsedType {
    /// Lower-cased, whitespace-collapsed, suffix and modifiers removed.
    base: String,
    /// Contents of the parenthesized suffix with whitespace removed.
    args: Option<String>,
}

impl ParsedType {
    fn parse(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();
        let (joined, args) = match (lower.find('('), lower.find(')')) {
            (Some(open), Some(close)) if close > open => {
                let args: String = lower[open + 1..close]
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect();
                (format!("{} {}", &lower[..open], &lower[close + 1..]), Some(args))
            }
            _ => (lower, None),
        };

        let base = joined
            .split_whitespace()
            .filter(|word| !matches!(*word, "unsigned" | "zerofill"))
            .collect::<Vec<_>>()
            .join(" ");

        Self { base, args }
    }

    fn family(&self) -> Family {
        let b = self.base.as_str();
        if b.contains("char") {
            Family::Character
        } else if b.contains("decimal") || b.contains("numeric") || b == "number" {
            Family::Decimal
        } else if matches!(b, "binary" | "varbinary" | "raw") {
            Family::Binary
        } else {
            Family::Other
        }
    }

    fn length(&self) -> Length {
        match self.args.as_deref() {
            None | Some("") => Length::Absent,
            Some("max") => Length::Max,
            Some(n) if n.chars().all(|c| c.is_ascii_digit()) => Length::Value(n),
            Some(_) => Length::Absent,
        }
    }

    /// `p` or `p,s` when well formed.
    fn precision(&self) -> Option<&str> {
        let args = self.args.as_deref()?;
        let mut parts = args.split(',');
        let well_formed = match (parts.next(), parts.next(), parts.next()) {
            (Some(p), None, _) => is_digits(p),
            (Some(p), Some(s), None) => is_digits(p) && is_digits(s),
            _ => false,
        };
        well_formed.then_some(args)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Character,
    Decimal,
    Binary,
    Other,
}

enum Length<'a> {
    Absent,
    Max,
    Value(&'a str),
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn attach_suffix(mapped: &str, parsed: &ParsedType, target: Dialect) -> String {
    if mapped.contains('(') {
        return mapped.to_string();
    }

    let upper = mapped.to_ascii_uppercase();
    match parsed.family() {
        Family::Character if upper.contains("CHAR") => match parsed.length() {
            Length::Value(n) => format!("{}({})", mapped, n),
            Length::Max => generic_types(target).text.to_string(),
            Length::Absent => format!("{}(255)", mapped),
        },
        Family::Decimal
            if upper.contains("DECIMAL") || upper.contains("NUMERIC") || upper.contains("NUMBER") =>
        {
            match parsed.precision() {
                Some(ps) => format!("{}({})", mapped, ps),
                // Unconstrained NUMBER is arbitrary precision.
                None if parsed.base == "number" && parsed.args.is_none() => mapped.to_string(),
                None => format!("{}(18,6)", mapped),
            }
        }
        Family::Binary if matches!(upper.as_str(), "VARBINARY" | "BINARY" | "RAW") => {
            match parsed.length() {
                Length::Value(n) => format!("{}({})", mapped, n),
                Length::Max => generic_types(target).binary.to_string(),
                Length::Absent => mapped.to_string(),
            }
        }
        _ => mapped.to_string(),
    }
}

fn fallback(parsed: &ParsedType, target: Dialect) -> String {
    let g = generic_types(target);
    let b = parsed.base.as_str();

    if b.contains("char") {
        attach_suffix(g.character, parsed, target)
    } else if b.contains("int") {
        g.integer.to_string()
    } else if parsed.family() == Family::Decimal {
        attach_suffix(g.decimal, parsed, target)
    } else if b.contains("float") || b.contains("double") {
        g.float.to_string()
    } else if b.contains("date") {
        g.date.to_string()
    } else if b.contains("time") {
        if b.contains("timestamp") {
            g.timestamp.to_string()
        } else {
            g.time.to_string()
        }
    } else if b.contains("blob") || b.contains("binary") {
        g.binary.to_string()
    } else if b.contains("text") || b.contains("clob") {
        g.text.to_string()
    } else if b.contains("bool") {
        g.boolean.to_string()
    } else {
        format!("{}(255)", g.character)
    }
}

/// Generic per-category types of a target dialect.
struct GenericTypes {
    character: &'static str,
    integer: &'static str,
    decimal: &'static str,
    float: &'static str,
    date: &'static str,
    time: &'static str,
    timestamp: &'static str,
    binary: &'static str,
    text: &'static str,
    boolean: &'static str,
}

fn generic_types(target: Dialect) -> &'static GenericTypes {
    match target {
        Dialect::Mysql => &GenericTypes {
            character: "VARCHAR",
            integer: "INT",
            decimal: "DECIMAL",
            float: "DOUBLE",
            date: "DATE",
            time: "TIME",
            timestamp: "DATETIME",
            binary: "LONGBLOB",
            text: "LONGTEXT",
            boolean: "TINYINT(1)",
        },
        Dialect::Postgresql => &GenericTypes {
            character: "VARCHAR",
            integer: "INTEGER",
            decimal: "NUMERIC",
            float: "DOUBLE PRECISION",
            date: "DATE",
            time: "TIME",
            timestamp: "TIMESTAMP",
            binary: "BYTEA",
            text: "TEXT",
            boolean: "BOOLEAN",
        },
        Dialect::Sqlserver => &GenericTypes {
            character: "NVARCHAR",
            integer: "INT",
            decimal: "DECIMAL",
            float: "FLOAT",
            date: "DATE",
            time: "TIME",
            timestamp: "DATETIME2",
            binary: "VARBINARY(MAX)",
            text: "NVARCHAR(MAX)",
            boolean: "BIT",
        },
        Dialect::Oracle => &GenericTypes {
            character: "VARCHAR2",
            integer: "NUMBER(10)",
            decimal: "NUMBER",
            float: "BINARY_DOUBLE",
            date: "DATE",
            time: "TIMESTAMP",
            timestamp: "TIMESTAMP",
            binary: "BLOB",
            text: "CLOB",
            boolean: "NUMBER(1)",
        },
        Dialect::Hana => &GenericTypes {
            character: "NVARCHAR",
            integer: "INTEGER",
            decimal: "DECIMAL",
            float: "DOUBLE",
            date: "DATE",
            time: "TIME",
            timestamp: "TIMESTAMP",
            binary: "BLOB",
            text: "NCLOB",
            boolean: "BOOLEAN",
        },
    }
}

type TypeTable = &'static [(&'static str, &'static str)];

fn lookup(source: Dialect, target: Dialect, base: &str) -> Option<&'static str> {
    type_table(source, target)
        .iter()
        .find(|(from, _)| *from == base)
        .map(|(_, to)| *to)
}

fn type_table(source: Dialect, target: Dialect) -> TypeTable {
    use Dialect::*;
    match (source, target) {
        (Mysql, Postgresql) => MYSQL_TO_POSTGRESQL,
        (Mysql, Sqlserver) => MYSQL_TO_SQLSERVER,
        (Mysql, Oracle) => MYSQL_TO_ORACLE,
        (Mysql, Hana) => MYSQL_TO_HANA,
        (Postgresql, Mysql) => POSTGRESQL_TO_MYSQL,
        (Postgresql, Sqlserver) => POSTGRESQL_TO_SQLSERVER,
        (Postgresql, Oracle) => POSTGRESQL_TO_ORACLE,
        (Postgresql, Hana) => POSTGRESQL_TO_HANA,
        (Sqlserver, Mysql) => SQLSERVER_TO_MYSQL,
        (Sqlserver, Postgresql) => SQLSERVER_TO_POSTGRESQL,
        (Sqlserver, Oracle) => SQLSERVER_TO_ORACLE,
        (Sqlserver, Hana) => SQLSERVER_TO_HANA,
        (Oracle, Mysql) => ORACLE_TO_MYSQL,
        (Oracle, Postgresql) => ORACLE_TO_POSTGRESQL,
        (Oracle, Sqlserver) => ORACLE_TO_SQLSERVER,
        (Oracle, Hana) => ORACLE_TO_HANA,
        (Hana, Mysql) => HANA_TO_MYSQL,
        (Hana, Postgresql) => HANA_TO_POSTGRESQL,
        (Hana, Sqlserver) => HANA_TO_SQLSERVER,
        (Hana, Oracle) => HANA_TO_ORACLE,
        _ => &[],
    }
}

// =============================================================================
// MySQL sources
// =============================================================================

const MYSQL_TO_HANA: TypeTable = &[
    ("varchar", "NVARCHAR"),
    ("char", "NCHAR"),
    ("tinytext", "NCLOB"),
    ("text", "NCLOB"),
    ("mediumtext", "NCLOB"),
    ("longtext", "NCLOB"),
    ("tinyint", "TINYINT"),
    ("smallint", "SMALLINT"),
    ("mediumint", "INTEGER"),
    ("int", "INTEGER"),
    ("integer", "INTEGER"),
    ("bigint", "BIGINT"),
    ("decimal", "DECIMAL"),
    ("numeric", "DECIMAL"),
    ("float", "REAL"),
    ("double", "DOUBLE"),
    ("double precision", "DOUBLE"),
    ("real", "DOUBLE"),
    ("bit", "BOOLEAN"),
    ("boolean", "BOOLEAN"),
    ("bool", "BOOLEAN"),
    ("date", "DATE"),
    ("datetime", "TIMESTAMP"),
    ("timestamp", "TIMESTAMP"),
    ("time", "TIME"),
    ("year", "SMALLINT"),
    ("binary", "VARBINARY"),
    ("varbinary", "VARBINARY"),
    ("tinyblob", "BLOB"),
    ("blob", "BLOB"),
    ("mediumblob", "BLOB"),
    ("longblob", "BLOB"),
    ("json", "NCLOB"),
    ("enum", "NVARCHAR(255)"),
    ("set", "NVARCHAR(255)"),
];

const MYSQL_TO_POSTGRESQL: TypeTable = &[
    ("varchar", "VARCHAR"),
    ("char", "CHAR"),
    ("tinytext", "TEXT"),
    ("text", "TEXT"),
    ("mediumtext", "TEXT"),
    ("longtext", "TEXT"),
    ("tinyint", "SMALLINT"),
    ("smallint", "SMALLINT"),
    ("mediumint", "INTEGER"),
    ("int", "INTEGER"),
    ("integer", "INTEGER"),
    ("bigint", "BIGINT"),
    ("decimal", "NUMERIC"),
    ("numeric", "NUMERIC"),
    ("float", "REAL"),
    ("double", "DOUBLE PRECISION"),
    ("double precision", "DOUBLE PRECISION"),
    ("real", "DOUBLE PRECISION"),
    ("bit", "BOOLEAN"),
    ("boolean", "BOOLEAN"),
    ("bool", "BOOLEAN"),
    ("date", "DATE"),
    ("datetime", "TIMESTAMP"),
    ("timestamp", "TIMESTAMP"),
    ("time", "TIME"),
    ("year", "SMALLINT"),
    ("binary", "BYTEA"),
    ("varbinary", "BYTEA"),
    ("tinyblob", "BYTEA"),
    ("blob", "BYTEA"),
    ("mediumblob", "BYTEA"),
    ("longblob", "BYTEA"),
    ("json", "JSONB"),
    ("enum", "VARCHAR(255)"),
    ("set", "VARCHAR(255)"),
];

const MYSQL_TO_SQLSERVER: TypeTable = &[
    ("varchar", "NVARCHAR"),
    ("char", "NCHAR"),
    ("tinytext", "NVARCHAR(MAX)"),
    ("text", "NVARCHAR(MAX)"),
    ("mediumtext", "NVARCHAR(MAX)"),
    ("longtext", "NVARCHAR(MAX)"),
    ("tinyint", "SMALLINT"),
    ("smallint", "SMALLINT"),
    ("mediumint", "INT"),
    ("int", "INT"),
    ("integer", "INT"),
    ("bigint", "BIGINT"),
    ("decimal", "DECIMAL"),
    ("numeric", "DECIMAL"),
    ("float", "REAL"),
    ("double", "FLOAT"),
    ("double precision", "FLOAT"),
    ("real", "FLOAT"),
    ("bit", "BIT"),
    ("boolean", "BIT"),
    ("bool", "BIT"),
    ("date", "DATE"),
    ("datetime", "DATETIME2"),
    ("timestamp", "DATETIME2"),
    ("time", "TIME"),
    ("year", "SMALLINT"),
    ("binary", "BINARY"),
    ("varbinary", "VARBINARY"),
    ("tinyblob", "VARBINARY(MAX)"),
    ("blob", "VARBINARY(MAX)"),
    ("mediumblob", "VARBINARY(MAX)"),
    ("longblob", "VARBINARY(MAX)"),
    ("json", "NVARCHAR(MAX)"),
    ("enum", "NVARCHAR(255)"),
    ("set", "NVARCHAR(255)"),
];

const MYSQL_TO_ORACLE: TypeTable = &[
    ("varchar", "VARCHAR2"),
    ("char", "CHAR"),
    ("tinytext", "CLOB"),
    ("text", "CLOB"),
    ("mediumtext", "CLOB"),
    ("longtext", "CLOB"),
    ("tinyint", "NUMBER(3)"),
    ("smallint", "NUMBER(5)"),
    ("mediumint", "NUMBER(7)"),
    ("int", "NUMBER(10)"),
    ("integer", "NUMBER(10)"),
    ("bigint", "NUMBER(19)"),
    ("decimal", "NUMBER"),
    ("numeric", "NUMBER"),
    ("float", "BINARY_FLOAT"),
    ("double", "BINARY_DOUBLE"),
    ("double precision", "BINARY_DOUBLE"),
    ("real", "BINARY_DOUBLE"),
    ("bit", "NUMBER(1)"),
    ("boolean", "NUMBER(1)"),
    ("bool", "NUMBER(1)"),
    ("date", "DATE"),
    ("datetime", "TIMESTAMP"),
    ("timestamp", "TIMESTAMP"),
    ("time", "VARCHAR2(16)"),
    ("year", "NUMBER(4)"),
    ("binary", "RAW"),
    ("varbinary", "RAW"),
    ("tinyblob", "BLOB"),
    ("blob", "BLOB"),
    ("mediumblob", "BLOB"),
    ("longblob", "BLOB"),
    ("json", "CLOB"),
    ("enum", "VARCHAR2(255)"),
    ("set", "VARCHAR2(255)"),
];

// =============================================================================
// PostgreSQL sources
// =============================================================================

const POSTGRESQL_TO_HANA: TypeTable = &[
    ("varchar", "NVARCHAR"),
    ("character varying", "NVARCHAR"),
    ("char", "NCHAR"),
    ("character", "NCHAR"),
    ("bpchar", "NCHAR"),
    ("text", "NCLOB"),
    ("citext", "NCLOB"),
    ("smallint", "SMALLINT"),
    ("int2", "SMALLINT"),
    ("smallserial", "SMALLINT"),
    ("integer", "INTEGER"),
    ("int", "INTEGER"),
    ("int4", "INTEGER"),
    ("serial", "INTEGER"),
    ("serial4", "INTEGER"),
    ("bigint", "BIGINT"),
    ("int8", "BIGINT"),
    ("bigserial", "BIGINT"),
    ("serial8", "BIGINT"),
    ("decimal", "DECIMAL"),
    ("numeric", "DECIMAL"),
    ("money", "DECIMAL(19,4)"),
    ("real", "REAL"),
    ("float4", "REAL"),
    ("double precision", "DOUBLE"),
    ("float8", "DOUBLE"),
    ("boolean", "BOOLEAN"),
    ("bool", "BOOLEAN"),
    ("date", "DATE"),
    ("time", "TIME"),
    ("time without time zone", "TIME"),
    ("timetz", "TIME"),
    ("time with time zone", "TIME"),
    ("timestamp", "TIMESTAMP"),
    ("timestamp without time zone", "TIMESTAMP"),
    ("timestamptz", "TIMESTAMP"),
    ("timestamp with time zone", "TIMESTAMP"),
    ("bytea", "BLOB"),
    ("uuid", "NVARCHAR(36)"),
    ("json", "NCLOB"),
    ("jsonb", "NCLOB"),
    ("xml", "NCLOB"),
    ("interval", "NVARCHAR(64)"),
    ("inet", "NVARCHAR(45)"),
];

const POSTGRESQL_TO_MYSQL: TypeTable = &[
    ("varchar", "VARCHAR"),
    ("character varying", "VARCHAR"),
    ("char", "CHAR"),
    ("character", "CHAR"),
    ("bpchar", "CHAR"),
    ("text", "LONGTEXT"),
    ("citext", "LONGTEXT"),
    ("smallint", "SMALLINT"),
    ("int2", "SMALLINT"),
    ("smallserial", "SMALLINT"),
    ("integer", "INT"),
    ("int", "INT"),
    ("int4", "INT"),
    ("serial", "INT"),
    ("serial4", "INT"),
    ("bigint", "BIGINT"),
    ("int8", "BIGINT"),
    ("bigserial", "BIGINT"),
    ("serial8", "BIGINT"),
    ("decimal", "DECIMAL"),
    ("numeric", "DECIMAL"),
    ("money", "DECIMAL(19,4)"),
    ("real", "FLOAT"),
    ("float4", "FLOAT"),
    ("double precision", "DOUBLE"),
    ("float8", "DOUBLE"),
    ("boolean", "TINYINT(1)"),
    ("bool", "TINYINT(1)"),
    ("date", "DATE"),
    ("time", "TIME(6)"),
    ("time without time zone", "TIME(6)"),
    ("timetz", "TIME(6)"),
    ("time with time zone", "TIME(6)"),
    ("timestamp", "DATETIME(6)"),
    ("timestamp without time zone", "DATETIME(6)"),
    ("timestamptz", "DATETIME(6)"),
    ("timestamp with time zone", "DATETIME(6)"),
    ("bytea", "LONGBLOB"),
    ("uuid", "CHAR(36)"),
    ("json", "JSON"),
    ("jsonb", "JSON"),
    ("xml", "LONGTEXT"),
    ("interval", "VARCHAR(64)"),
    ("inet", "VARCHAR(45)"),
];

const POSTGRESQL_TO_SQLSERVER: TypeTable = &[
    ("varchar", "NVARCHAR"),
    ("character varying", "NVARCHAR"),
    ("char", "NCHAR"),
    ("character", "NCHAR"),
    ("bpchar", "NCHAR"),
    ("text", "NVARCHAR(MAX)"),
    ("citext", "NVARCHAR(MAX)"),
    ("smallint", "SMALLINT"),
    ("int2", "SMALLINT"),
    ("smallserial", "SMALLINT"),
    ("integer", "INT"),
    ("int", "INT"),
    ("int4", "INT"),
    ("serial", "INT"),
    ("serial4", "INT"),
    ("bigint", "BIGINT"),
    ("int8", "BIGINT"),
    ("bigserial", "BIGINT"),
    ("serial8", "BIGINT"),
    ("decimal", "DECIMAL"),
    ("numeric", "DECIMAL"),
    ("money", "MONEY"),
    ("real", "REAL"),
    ("float4", "REAL"),
    ("double precision", "FLOAT"),
    ("float8", "FLOAT"),
    ("boolean", "BIT"),
    ("bool", "BIT"),
    ("date", "DATE"),
    ("time", "TIME"),
    ("time without time zone", "TIME"),
    ("timetz", "TIME"),
    ("time with time zone", "TIME"),
    ("timestamp", "DATETIME2"),
    ("timestamp without time zone", "DATETIME2"),
    ("timestamptz", "DATETIMEOFFSET"),
    ("timestamp with time zone", "DATETIMEOFFSET"),
    ("bytea", "VARBINARY(MAX)"),
    ("uuid", "UNIQUEIDENTIFIER"),
    ("json", "NVARCHAR(MAX)"),
    ("jsonb", "NVARCHAR(MAX)"),
    ("xml", "XML"),
    ("interval", "NVARCHAR(64)"),
    ("inet", "NVARCHAR(45)"),
];

const POSTGRESQL_TO_ORACLE: TypeTable = &[
    ("varchar", "VARCHAR2"),
    ("character varying", "VARCHAR2"),
    ("char", "CHAR"),
    ("character", "CHAR"),
    ("bpchar", "CHAR"),
    ("text", "CLOB"),
    ("citext", "CLOB"),
    ("smallint", "NUMBER(5)"),
    ("int2", "NUMBER(5)"),
    ("smallserial", "NUMBER(5)"),
    ("integer", "NUMBER(10)"),
    ("int", "NUMBER(10)"),
    ("int4", "NUMBER(10)"),
    ("serial", "NUMBER(10)"),
    ("serial4", "NUMBER(10)"),
    ("bigint", "NUMBER(19)"),
    ("int8", "NUMBER(19)"),
    ("bigserial", "NUMBER(19)"),
    ("serial8", "NUMBER(19)"),
    ("decimal", "NUMBER"),
    ("numeric", "NUMBER"),
    ("money", "NUMBER(19,4)"),
    ("real", "BINARY_FLOAT"),
    ("float4", "BINARY_FLOAT"),
    ("double precision", "BINARY_DOUBLE"),
    ("float8", "BINARY_DOUBLE"),
    ("boolean", "NUMBER(1)"),
    ("bool", "NUMBER(1)"),
    ("date", "DATE"),
    ("time", "VARCHAR2(16)"),
    ("time without time zone", "VARCHAR2(16)"),
    ("timetz", "VARCHAR2(32)"),
    ("time with time zone", "VARCHAR2(32)"),
    ("timestamp", "TIMESTAMP"),
    ("timestamp without time zone", "TIMESTAMP"),
    ("timestamptz", "TIMESTAMP WITH TIME ZONE"),
    ("timestamp with time zone", "TIMESTAMP WITH TIME ZONE"),
    ("bytea", "BLOB"),
    ("uuid", "VARCHAR2(36)"),
    ("json", "CLOB"),
    ("jsonb", "CLOB"),
    ("xml", "CLOB"),
    ("interval", "VARCHAR2(64)"),
    ("inet", "VARCHAR2(45)"),
];

// =============================================================================
// SQL Server sources
// =============================================================================

const SQLSERVER_TO_HANA: TypeTable = &[
    ("varchar", "NVARCHAR"),
    ("nvarchar", "NVARCHAR"),
    ("char", "NCHAR"),
    ("nchar", "NCHAR"),
    ("sysname", "NVARCHAR(128)"),
    ("text", "NCLOB"),
    ("ntext", "NCLOB"),
    ("tinyint", "TINYINT"),
    ("smallint", "SMALLINT"),
    ("int", "INTEGER"),
    ("bigint", "BIGINT"),
    ("decimal", "DECIMAL"),
    ("numeric", "DECIMAL"),
    ("money", "DECIMAL(19,4)"),
    ("smallmoney", "DECIMAL(10,4)"),
    ("float", "DOUBLE"),
    ("real", "REAL"),
    ("bit", "BOOLEAN"),
    ("date", "DATE"),
    ("time", "TIME"),
    ("datetime", "TIMESTAMP"),
    ("datetime2", "TIMESTAMP"),
    ("smalldatetime", "TIMESTAMP"),
    ("datetimeoffset", "TIMESTAMP"),
    ("binary", "VARBINARY"),
    ("varbinary", "BLOB"),
    ("image", "BLOB"),
    ("uniqueidentifier", "NVARCHAR(36)"),
    ("xml", "NCLOB"),
];

const SQLSERVER_TO_MYSQL: TypeTable = &[
    ("varchar", "VARCHAR"),
    ("nvarchar", "VARCHAR"),
    ("char", "CHAR"),
    ("nchar", "CHAR"),
    ("sysname", "VARCHAR(128)"),
    ("text", "LONGTEXT"),
    ("ntext", "LONGTEXT"),
    ("tinyint", "TINYINT UNSIGNED"),
    ("smallint", "SMALLINT"),
    ("int", "INT"),
    ("bigint", "BIGINT"),
    ("decimal", "DECIMAL"),
    ("numeric", "DECIMAL"),
    ("money", "DECIMAL(19,4)"),
    ("smallmoney", "DECIMAL(10,4)"),
    ("float", "DOUBLE"),
    ("real", "FLOAT"),
    ("bit", "TINYINT(1)"),
    ("date", "DATE"),
    ("time", "TIME(6)"),
    ("datetime", "DATETIME(3)"),
    ("datetime2", "DATETIME(6)"),
    ("smalldatetime", "DATETIME"),
    ("datetimeoffset", "DATETIME(6)"),
    ("binary", "BINARY"),
    ("varbinary", "VARBINARY"),
    ("image", "LONGBLOB"),
    ("uniqueidentifier", "CHAR(36)"),
    ("xml", "LONGTEXT"),
];

const SQLSERVER_TO_POSTGRESQL: TypeTable = &[
    ("varchar", "VARCHAR"),
    ("nvarchar", "VARCHAR"),
    ("char", "CHAR"),
    ("nchar", "CHAR"),
    ("sysname", "VARCHAR(128)"),
    ("text", "TEXT"),
    ("ntext", "TEXT"),
    ("tinyint", "SMALLINT"),
    ("smallint", "SMALLINT"),
    ("int", "INTEGER"),
    ("bigint", "BIGINT"),
    ("decimal", "NUMERIC"),
    ("numeric", "NUMERIC"),
    ("money", "NUMERIC(19,4)"),
    ("smallmoney", "NUMERIC(10,4)"),
    ("float", "DOUBLE PRECISION"),
    ("real", "REAL"),
    ("bit", "BOOLEAN"),
    ("date", "DATE"),
    ("time", "TIME"),
    ("datetime", "TIMESTAMP"),
    ("datetime2", "TIMESTAMP"),
    ("smalldatetime", "TIMESTAMP"),
    ("datetimeoffset", "TIMESTAMPTZ"),
    ("binary", "BYTEA"),
    ("varbinary", "BYTEA"),
    ("image", "BYTEA"),
    ("uniqueidentifier", "UUID"),
    ("xml", "XML"),
    ("geometry", "TEXT"),
    ("geography", "TEXT"),
];

const SQLSERVER_TO_ORACLE: TypeTable = &[
    ("varchar", "VARCHAR2"),
    ("nvarchar", "NVARCHAR2"),
    ("char", "CHAR"),
    ("nchar", "NCHAR"),
    ("sysname", "NVARCHAR2(128)"),
    ("text", "CLOB"),
    ("ntext", "NCLOB"),
    ("tinyint", "NUMBER(3)"),
    ("smallint", "NUMBER(5)"),
    ("int", "NUMBER(10)"),
    ("bigint", "NUMBER(19)"),
    ("decimal", "NUMBER"),
    ("numeric", "NUMBER"),
    ("money", "NUMBER(19,4)"),
    ("smallmoney", "NUMBER(10,4)"),
    ("float", "BINARY_DOUBLE"),
    ("real", "BINARY_FLOAT"),
    ("bit", "NUMBER(1)"),
    ("date", "DATE"),
    ("time", "VARCHAR2(16)"),
    ("datetime", "TIMESTAMP"),
    ("datetime2", "TIMESTAMP"),
    ("smalldatetime", "DATE"),
    ("datetimeoffset", "TIMESTAMP WITH TIME ZONE"),
    ("binary", "RAW"),
    ("varbinary", "RAW"),
    ("image", "BLOB"),
    ("uniqueidentifier", "VARCHAR2(36)"),
    ("xml", "CLOB"),
];

// =============================================================================
// Oracle sources
// =============================================================================

const ORACLE_TO_HANA: TypeTable = &[
    ("varchar2", "NVARCHAR"),
    ("nvarchar2", "NVARCHAR"),
    ("varchar", "NVARCHAR"),
    ("char", "NCHAR"),
    ("nchar", "NCHAR"),
    ("number", "DECIMAL"),
    ("integer", "INTEGER"),
    ("int", "INTEGER"),
    ("smallint", "SMALLINT"),
    ("float", "DOUBLE"),
    ("binary_float", "REAL"),
    ("binary_double", "DOUBLE"),
    ("date", "TIMESTAMP"),
    ("timestamp", "TIMESTAMP"),
    ("timestamp with time zone", "TIMESTAMP"),
    ("timestamp with local time zone", "TIMESTAMP"),
    ("clob", "NCLOB"),
    ("nclob", "NCLOB"),
    ("long", "NCLOB"),
    ("blob", "BLOB"),
    ("long raw", "BLOB"),
    ("raw", "VARBINARY"),
    ("rowid", "NVARCHAR(18)"),
    ("xmltype", "NCLOB"),
];

const ORACLE_TO_MYSQL: TypeTable = &[
    ("varchar2", "VARCHAR"),
    ("nvarchar2", "VARCHAR"),
    ("varchar", "VARCHAR"),
    ("char", "CHAR"),
    ("nchar", "CHAR"),
    ("number", "DECIMAL"),
    ("integer", "BIGINT"),
    ("int", "BIGINT"),
    ("smallint", "SMALLINT"),
    ("float", "DOUBLE"),
    ("binary_float", "FLOAT"),
    ("binary_double", "DOUBLE"),
    ("date", "DATETIME"),
    ("timestamp", "DATETIME(6)"),
    ("timestamp with time zone", "DATETIME(6)"),
    ("timestamp with local time zone", "DATETIME(6)"),
    ("clob", "LONGTEXT"),
    ("nclob", "LONGTEXT"),
    ("long", "LONGTEXT"),
    ("blob", "LONGBLOB"),
    ("long raw", "LONGBLOB"),
    ("raw", "VARBINARY"),
    ("rowid", "VARCHAR(18)"),
    ("xmltype", "LONGTEXT"),
];

const ORACLE_TO_POSTGRESQL: TypeTable = &[
    ("varchar2", "VARCHAR"),
    ("nvarchar2", "VARCHAR"),
    ("varchar", "VARCHAR"),
    ("char", "CHAR"),
    ("nchar", "CHAR"),
    ("number", "NUMERIC"),
    ("integer", "BIGINT"),
    ("int", "BIGINT"),
    ("smallint", "SMALLINT"),
    ("float", "DOUBLE PRECISION"),
    ("binary_float", "REAL"),
    ("binary_double", "DOUBLE PRECISION"),
    ("date", "TIMESTAMP"),
    ("timestamp", "TIMESTAMP"),
    ("timestamp with time zone", "TIMESTAMPTZ"),
    ("timestamp with local time zone", "TIMESTAMPTZ"),
    ("clob", "TEXT"),
    ("nclob", "TEXT"),
    ("long", "TEXT"),
    ("blob", "BYTEA"),
    ("long raw", "BYTEA"),
    ("raw", "BYTEA"),
    ("rowid", "VARCHAR(18)"),
    ("xmltype", "XML"),
];

const ORACLE_TO_SQLSERVER: TypeTable = &[
    ("varchar2", "NVARCHAR"),
    ("nvarchar2", "NVARCHAR"),
    ("varchar", "NVARCHAR"),
    ("char", "NCHAR"),
    ("nchar", "NCHAR"),
    ("number", "DECIMAL"),
    ("integer", "BIGINT"),
    ("int", "BIGINT"),
    ("smallint", "SMALLINT"),
    ("float", "FLOAT"),
    ("binary_float", "REAL"),
    ("binary_double", "FLOAT"),
    ("date", "DATETIME2"),
    ("timestamp", "DATETIME2"),
    ("timestamp with time zone", "DATETIMEOFFSET"),
    ("timestamp with local time zone", "DATETIMEOFFSET"),
    ("clob", "NVARCHAR(MAX)"),
    ("nclob", "NVARCHAR(MAX)"),
    ("long", "NVARCHAR(MAX)"),
    ("blob", "VARBINARY(MAX)"),
    ("long raw", "VARBINARY(MAX)"),
    ("raw", "VARBINARY"),
    ("rowid", "NVARCHAR(18)"),
    ("xmltype", "XML"),
];

// =============================================================================
// HANA sources
// =============================================================================

const HANA_TO_MYSQL: TypeTable = &[
    ("nvarchar", "VARCHAR"),
    ("varchar", "VARCHAR"),
    ("nchar", "CHAR"),
    ("char", "CHAR"),
    ("alphanum", "VARCHAR(127)"),
    ("shorttext", "LONGTEXT"),
    ("tinyint", "TINYINT"),
    ("smallint", "SMALLINT"),
    ("integer", "INT"),
    ("int", "INT"),
    ("bigint", "BIGINT"),
    ("decimal", "DECIMAL"),
    ("smalldecimal", "DECIMAL"),
    ("real", "FLOAT"),
    ("double", "DOUBLE"),
    ("float", "DOUBLE"),
    ("boolean", "TINYINT(1)"),
    ("date", "DATE"),
    ("time", "TIME"),
    ("seconddate", "DATETIME"),
    ("timestamp", "DATETIME"),
    ("nclob", "LONGTEXT"),
    ("clob", "LONGTEXT"),
    ("text", "LONGTEXT"),
    ("bintext", "LONGTEXT"),
    ("blob", "BLOB"),
    ("varbinary", "VARBINARY"),
    ("binary", "BINARY"),
];

const HANA_TO_POSTGRESQL: TypeTable = &[
    ("nvarchar", "VARCHAR"),
    ("varchar", "VARCHAR"),
    ("nchar", "CHAR"),
    ("char", "CHAR"),
    ("alphanum", "VARCHAR(127)"),
    ("shorttext", "TEXT"),
    ("tinyint", "SMALLINT"),
    ("smallint", "SMALLINT"),
    ("integer", "INTEGER"),
    ("int", "INTEGER"),
    ("bigint", "BIGINT"),
    ("decimal", "NUMERIC"),
    ("smalldecimal", "NUMERIC"),
    ("real", "REAL"),
    ("double", "DOUBLE PRECISION"),
    ("float", "DOUBLE PRECISION"),
    ("boolean", "BOOLEAN"),
    ("date", "DATE"),
    ("time", "TIME"),
    ("seconddate", "TIMESTAMP"),
    ("timestamp", "TIMESTAMP"),
    ("nclob", "TEXT"),
    ("clob", "TEXT"),
    ("text", "TEXT"),
    ("bintext", "TEXT"),
    ("blob", "BYTEA"),
    ("varbinary", "BYTEA"),
    ("binary", "BYTEA"),
];

const HANA_TO_SQLSERVER: TypeTable = &[
    ("nvarchar", "NVARCHAR"),
    ("varchar", "VARCHAR"),
    ("nchar", "NCHAR"),
    ("char", "CHAR"),
    ("alphanum", "NVARCHAR(127)"),
    ("shorttext", "NVARCHAR(MAX)"),
    ("tinyint", "TINYINT"),
    ("smallint", "SMALLINT"),
    ("integer", "INT"),
    ("int", "INT"),
    ("bigint", "BIGINT"),
    ("decimal", "DECIMAL"),
    ("smalldecimal", "DECIMAL"),
    ("real", "REAL"),
    ("double", "FLOAT"),
    ("float", "FLOAT"),
    ("boolean", "BIT"),
    ("date", "DATE"),
    ("time", "TIME"),
    ("seconddate", "DATETIME2"),
    ("timestamp", "DATETIME2"),
    ("nclob", "NVARCHAR(MAX)"),
    ("clob", "NVARCHAR(MAX)"),
    ("text", "NVARCHAR(MAX)"),
    ("bintext", "NVARCHAR(MAX)"),
    ("blob", "VARBINARY(MAX)"),
    ("varbinary", "VARBINARY"),
    ("binary", "BINARY"),
];

const HANA_TO_ORACLE: TypeTable = &[
    ("nvarchar", "NVARCHAR2"),
    ("varchar", "VARCHAR2"),
    ("nchar", "NCHAR"),
    ("char", "CHAR"),
    ("alphanum", "VARCHAR2(127)"),
    ("shorttext", "NCLOB"),
    ("tinyint", "NUMBER(3)"),
    ("smallint", "NUMBER(5)"),
    ("integer", "NUMBER(10)"),
    ("int", "NUMBER(10)"),
    ("bigint", "NUMBER(19)"),
    ("decimal", "NUMBER"),
    ("smalldecimal", "NUMBER"),
    ("real", "BINARY_FLOAT"),
    ("double", "BINARY_DOUBLE"),
    ("float", "BINARY_DOUBLE"),
    ("boolean", "NUMBER(1)"),
    ("date", "DATE"),
    ("time", "VARCHAR2(16)"),
    ("seconddate", "DATE"),
    ("timestamp", "TIMESTAMP"),
    ("nclob", "NCLOB"),
    ("clob", "CLOB"),
    ("text", "NCLOB"),
    ("bintext", "NCLOB"),
    ("blob", "BLOB"),
    ("varbinary", "RAW"),
    ("binary", "RAW"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use Dialect::*;

    #[test]
    fn test_same_dialect_is_identity() {
        for d in Dialect::ALL {
            for raw in ["VARCHAR(45)", "int(11) unsigned", "weird(1,2,3)", "", "  x  "] {
                assert_eq!(convert_type(d, d, raw), raw);
                assert_eq!(map_type(d, d, raw).resolution, Resolution::Identity);
            }
        }
    }

    #[test]
    fn test_conversion_is_total() {
        let samples = [
            "", "???", "geometry", "VARCHAR(", "DECIMAL(a,b)", "(10)", "int)(", "ENUM('a','b')",
        ];
        for source in Dialect::ALL {
            for target in Dialect::ALL {
                for raw in samples {
                    if source != target {
                        assert!(!convert_type(source, target, raw).is_empty());
                    }
                }
            }
        }
    }

    #[test]
    fn test_every_pair_has_a_table() {
        for source in Dialect::ALL {
            for target in Dialect::ALL {
                if source != target {
                    assert!(
                        !type_table(source, target).is_empty(),
                        "missing table {} -> {}",
                        source,
                        target
                    );
                }
            }
        }
    }

    #[test]
    fn test_character_length_preserved() {
        assert_eq!(convert_type(Mysql, Hana, "VARCHAR(45)"), "NVARCHAR(45)");
        assert_eq!(convert_type(Mysql, Hana, "VARCHAR"), "NVARCHAR(255)");
        assert_eq!(convert_type(Mysql, Hana, "char(2)"), "NCHAR(2)");
        assert_eq!(
            convert_type(Postgresql, Hana, "character varying(45)"),
            "NVARCHAR(45)"
        );
        assert_eq!(convert_type(Hana, Mysql, "NVARCHAR(100)"), "VARCHAR(100)");
        assert_eq!(convert_type(Sqlserver, Oracle, "nvarchar(30)"), "NVARCHAR2(30)");
    }

    #[test]
    fn test_decimal_precision_preserved() {
        assert_eq!(convert_type(Mysql, Hana, "DECIMAL(10,2)"), "DECIMAL(10,2)");
        assert_eq!(convert_type(Mysql, Hana, "decimal(10, 2)"), "DECIMAL(10,2)");
        assert_eq!(convert_type(Mysql, Hana, "DECIMAL"), "DECIMAL(18,6)");
        assert_eq!(convert_type(Sqlserver, Postgresql, "numeric(12,4)"), "NUMERIC(12,4)");
        assert_eq!(convert_type(Oracle, Hana, "NUMBER(10,2)"), "DECIMAL(10,2)");
        assert_eq!(convert_type(Oracle, Postgresql, "NUMBER"), "NUMERIC");
        assert_eq!(convert_type(Oracle, Hana, "number"), "DECIMAL");
        assert_eq!(convert_type(Oracle, Sqlserver, "NUMBER(38)"), "DECIMAL(38)");
        assert_eq!(convert_type(Mysql, Postgresql, "DECIMAL(a,b)"), "NUMERIC(18,6)");
    }

    #[test]
    fn test_table_entries_with_suffix_are_kept() {
        assert_eq!(convert_type(Hana, Mysql, "BOOLEAN"), "TINYINT(1)");
        assert_eq!(convert_type(Sqlserver, Hana, "money"), "DECIMAL(19,4)");
        assert_eq!(convert_type(Postgresql, Mysql, "uuid"), "CHAR(36)");
    }

    #[test]
    fn test_original_hana_mappings() {
        assert_eq!(convert_type(Mysql, Hana, "INT"), "INTEGER");
        assert_eq!(convert_type(Mysql, Hana, "datetime"), "TIMESTAMP");
        assert_eq!(convert_type(Mysql, Hana, "longtext"), "NCLOB");
        assert_eq!(convert_type(Postgresql, Hana, "bytea"), "BLOB");
        assert_eq!(convert_type(Postgresql, Hana, "double precision"), "DOUBLE");
        assert_eq!(convert_type(Sqlserver, Hana, "bit"), "BOOLEAN");
        assert_eq!(convert_type(Sqlserver, Hana, "float"), "DOUBLE");
        assert_eq!(convert_type(Oracle, Hana, "DATE"), "TIMESTAMP");
        assert_eq!(convert_type(Oracle, Hana, "RAW(16)"), "VARBINARY(16)");
        assert_eq!(convert_type(Hana, Mysql, "NCLOB"), "LONGTEXT");
        assert_eq!(convert_type(Hana, Mysql, "TIMESTAMP"), "DATETIME");
    }

    #[test]
    fn test_normalization() {
        assert_eq!(convert_type(Mysql, Postgresql, "int(11) unsigned"), "INTEGER");
        assert_eq!(
            convert_type(Postgresql, Sqlserver, "timestamp(3) with time zone"),
            "DATETIMEOFFSET"
        );
        assert_eq!(
            convert_type(Oracle, Postgresql, "TIMESTAMP(6) WITH TIME ZONE"),
            "TIMESTAMPTZ"
        );
        assert_eq!(
            ParsedType::parse("  Character  Varying (45) "),
            ParsedType {
                base: "character varying".to_string(),
                args: Some("45".to_string()),
            }
        );
    }

    #[test]
    fn test_max_suffix_selects_large_object_type() {
        assert_eq!(convert_type(Sqlserver, Postgresql, "nvarchar(max)"), "TEXT");
        assert_eq!(convert_type(Sqlserver, Hana, "varchar(MAX)"), "NCLOB");
        assert_eq!(convert_type(Sqlserver, Mysql, "varbinary(max)"), "LONGBLOB");
        assert_eq!(convert_type(Sqlserver, Hana, "varbinary(max)"), "BLOB");
        assert_eq!(convert_type(Sqlserver, Mysql, "varbinary(64)"), "VARBINARY(64)");
    }

    #[test]
    fn test_fallback_categories() {
        let cases = [
            ("geometry", "NVARCHAR(255)"),
            ("widechar(20)", "NVARCHAR(20)"),
            ("superint", "INTEGER"),
            ("mediumdecimal(12,4)", "DECIMAL(12,4)"),
            ("bigfloat", "DOUBLE"),
            ("partialdate", "DATE"),
            ("customtimestamp", "TIMESTAMP"),
            ("xtime", "TIME"),
            ("jsonb_blob", "BLOB"),
            ("longclob", "NCLOB"),
            ("flagbool", "BOOLEAN"),
        ];
        for (raw, expected) in cases {
            let mapping = map_type(Mysql, Hana, raw);
            assert_eq!(mapping.target_type, expected, "fallback for {}", raw);
            assert!(mapping.is_fallback());
            assert!(mapping.warning.is_some());
        }
    }

    #[test]
    fn test_fallback_uses_target_vocabulary() {
        assert_eq!(convert_type(Hana, Mysql, "st_geometry"), "VARCHAR(255)");
        assert_eq!(convert_type(Hana, Postgresql, "bintext_clob"), "TEXT");
        assert_eq!(convert_type(Postgresql, Sqlserver, "tsvector"), "NVARCHAR(255)");
        assert_eq!(convert_type(Mysql, Oracle, "point"), "NUMBER(10)");
    }

    #[test]
    fn test_orders_scenario_types() {
        assert_eq!(convert_type(Mysql, Hana, "INT"), "INTEGER");
        assert_eq!(convert_type(Mysql, Hana, "DECIMAL(10,2)"), "DECIMAL(10,2)");
        assert_eq!(convert_type(Mysql, Hana, "VARCHAR(200)"), "NVARCHAR(200)");
    }
}
