//! PostgreSQL row decoding and parameter binding.

use std::borrow::Cow;
use std::error::Error;

use bytes::BytesMut;
use tokio_postgres::types::{to_sql_checked, FromSql, IsNull, ToSql, Type};

use crate::core::value::{Row, SqlNullType, SqlValue};
use crate::drivers::common::coerce;
use crate::error::{MigrateError, Result};

/// Boxed parameter for `Client::execute`.
pub type PgParam = Box<dyn ToSql + Sync + Send>;

/// Decode every column of a result row.
pub fn decode_row(row: &tokio_postgres::Row) -> Result<Row> {
    (0..row.len()).map(|idx| decode_value(row, idx)).collect()
}

fn decode_value(row: &tokio_postgres::Row, idx: usize) -> Result<SqlValue<'static>> {
    let ty = row.columns()[idx].type_().clone();
    match ty {
        Type::BOOL => typed(row, idx, SqlValue::Bool, SqlNullType::Bool),
        Type::INT2 => typed(row, idx, SqlValue::I16, SqlNullType::I16),
        Type::INT4 => typed(row, idx, SqlValue::I32, SqlNullType::I32),
        Type::INT8 => typed(row, idx, SqlValue::I64, SqlNullType::I64),
        Type::OID => typed(row, idx, |v: u32| SqlValue::I64(i64::from(v)), SqlNullType::I64),
        Type::FLOAT4 => typed(row, idx, SqlValue::F32, SqlNullType::F32),
        Type::FLOAT8 => typed(row, idx, SqlValue::F64, SqlNullType::F64),
        Type::NUMERIC => typed(row, idx, SqlValue::Decimal, SqlNullType::Decimal),
        Type::UUID => typed(row, idx, SqlValue::Uuid, SqlNullType::Uuid),
        Type::TIMESTAMP => typed(row, idx, SqlValue::DateTime, SqlNullType::DateTime),
        Type::TIMESTAMPTZ => typed(
            row,
            idx,
            SqlValue::DateTimeOffset,
            SqlNullType::DateTimeOffset,
        ),
        Type::DATE => typed(row, idx, SqlValue::Date, SqlNullType::Date),
        Type::TIME => typed(row, idx, SqlValue::Time, SqlNullType::Time),
        Type::BYTEA => typed(
            row,
            idx,
            |b: Vec<u8>| SqlValue::Bytes(Cow::Owned(b)),
            SqlNullType::Bytes,
        ),
        Type::JSON | Type::JSONB => typed(
            row,
            idx,
            |v: serde_json::Value| SqlValue::Text(Cow::Owned(v.to_string())),
            SqlNullType::String,
        ),
        ref other if <String as FromSql>::accepts(other) => typed(
            row,
            idx,
            |s: String| SqlValue::Text(Cow::Owned(s)),
            SqlNullType::String,
        ),
        _ => typed(row, idx, |raw: RawValue| raw.into_value(), SqlNullType::String),
    }
}

fn typed<'r, T, F>(
    row: &'r tokio_postgres::Row,
    idx: usize,
    wrap: F,
    null: SqlNullType,
) -> Result<SqlValue<'static>>
where
    T: FromSql<'r>,
    F: FnOnce(T) -> SqlValue<'static>,
{
    let value = row.try_get::<_, Option<T>>(idx).map_err(|e| {
        MigrateError::row_conversion(format!("column {}: {}", row.columns()[idx].name(), e))
    })?;
    Ok(value.map(wrap).unwrap_or(SqlValue::Null(null)))
}

/// Wire bytes of a type without a native mapping.
struct RawValue(Vec<u8>);

impl RawValue {
    fn into_value(self) -> SqlValue<'static> {
        match String::from_utf8(self.0) {
            Ok(s) => SqlValue::Text(Cow::Owned(s)),
            Err(e) => SqlValue::Bytes(Cow::Owned(e.into_bytes())),
        }
    }
}

impl<'a> FromSql<'a> for RawValue {
    fn from_sql(
        _ty: &Type,
        raw: &'a [u8],
    ) -> std::result::Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(RawValue(raw.to_vec()))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// Convert each value to the variant its parameter type expects.
pub fn coerce_row(row: Row, types: &[Type]) -> Result<Row> {
    row.into_iter()
        .zip(types)
        .map(|(value, ty)| coerce_value(value, ty))
        .collect()
}

fn coerce_value(value: SqlValue<'static>, ty: &Type) -> Result<SqlValue<'static>> {
    if value.is_null() {
        return Ok(value);
    }

    Ok(match *ty {
        Type::BOOL => SqlValue::Bool(coerce::to_bool(&value)?),
        Type::INT2 => SqlValue::I16(coerce::to_i16(&value)?),
        Type::INT4 => SqlValue::I32(coerce::to_i32(&value)?),
        Type::INT8 => SqlValue::I64(coerce::to_i64(&value)?),
        Type::FLOAT4 => SqlValue::F32(coerce::to_f64(&value)? as f32),
        Type::FLOAT8 => SqlValue::F64(coerce::to_f64(&value)?),
        Type::NUMERIC => SqlValue::Decimal(coerce::to_decimal(&value)?),
        Type::UUID => SqlValue::Uuid(coerce::to_uuid(&value)?),
        Type::TIMESTAMP => SqlValue::DateTime(coerce::to_datetime(&value)?),
        Type::TIMESTAMPTZ => SqlValue::DateTimeOffset(coerce::to_datetime_offset(&value)?),
        Type::DATE => SqlValue::Date(coerce::to_date(&value)?),
        Type::TIME => SqlValue::Time(coerce::to_time(&value)?),
        Type::BYTEA => SqlValue::Bytes(coerce::to_bytes(value)?),
        Type::JSON | Type::JSONB => {
            let text = coerce::to_text(value);
            if let SqlValue::Text(s) = &text {
                serde_json::from_str::<serde_json::Value>(s).map_err(|e| {
                    MigrateError::row_conversion(format!("invalid JSON value: {}", e))
                })?;
            }
            text
        }
        _ => coerce::to_text(value),
    })
}

/// Box a coerced row as statement parameters.
pub fn to_params(row: &Row, types: &[Type]) -> Result<Vec<PgParam>> {
    row.iter()
        .zip(types)
        .map(|(value, ty)| to_param(value, ty))
        .collect()
}

fn to_param(value: &SqlValue<'static>, ty: &Type) -> Result<PgParam> {
    let param: PgParam = match value {
        SqlValue::Null(_) => Box::new(NullParam),
        SqlValue::Bool(v) => Box::new(*v),
        SqlValue::I16(v) => Box::new(*v),
        SqlValue::I32(v) => Box::new(*v),
        SqlValue::I64(v) => Box::new(*v),
        SqlValue::F32(v) => Box::new(*v),
        SqlValue::F64(v) => Box::new(*v),
        SqlValue::Text(s) if *ty == Type::JSON || *ty == Type::JSONB => {
            Box::new(serde_json::from_str::<serde_json::Value>(s)?)
        }
        SqlValue::Text(s) if <String as ToSql>::accepts(ty) => Box::new(s.to_string()),
        SqlValue::Text(s) => Box::new(TextParam(s.to_string())),
        SqlValue::Bytes(b) => Box::new(b.to_vec()),
        SqlValue::Uuid(v) => Box::new(*v),
        SqlValue::Decimal(v) => Box::new(*v),
        SqlValue::DateTime(v) => Box::new(*v),
        SqlValue::DateTimeOffset(v) => Box::new(*v),
        SqlValue::Date(v) => Box::new(*v),
        SqlValue::Time(v) => Box::new(*v),
    };
    Ok(param)
}

/// NULL for a parameter of any type.
#[derive(Debug)]
struct NullParam;

impl ToSql for NullParam {
    fn to_sql(
        &self,
        _ty: &Type,
        _out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn Error + Sync + Send>> {
        Ok(IsNull::Yes)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// Text sent as-is for types whose binary format is their text form
/// (enums, xml, citext and other text-like extension types).
#[derive(Debug)]
struct TextParam(String);

impl ToSql for TextParam {
    fn to_sql(
        &self,
        _ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn Error + Sync + Send>> {
        out.extend_from_slice(self.0.as_bytes());
        Ok(IsNull::No)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}
