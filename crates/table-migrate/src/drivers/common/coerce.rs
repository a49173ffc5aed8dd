//! Value coercion between [`SqlValue`] variants.
//!
//! Drivers with strictly typed parameters (PostgreSQL) convert each source
//! value to the variant the prepared statement expects. Every conversion
//! returns a `RowConversion` error on failure so the row is skipped rather
//! than failing the batch.

use std::borrow::Cow;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::core::value::SqlValue;
use crate::error::{MigrateError, Result};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

fn mismatch(value: &SqlValue<'_>, wanted: &str) -> MigrateError {
    MigrateError::row_conversion(format!("cannot convert {:?} to {}", value, wanted))
}

pub fn to_bool(value: &SqlValue<'_>) -> Result<bool> {
    match value {
        SqlValue::Bool(v) => Ok(*v),
        SqlValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "yes" | "y" => Ok(true),
            "false" | "f" | "0" | "no" | "n" => Ok(false),
            _ => Err(mismatch(value, "boolean")),
        },
        other => other
            .as_i64()
            .map(|v| v != 0)
            .ok_or_else(|| mismatch(value, "boolean")),
    }
}

pub fn to_i64(value: &SqlValue<'_>) -> Result<i64> {
    value.as_i64().ok_or_else(|| mismatch(value, "integer"))
}

pub fn to_i32(value: &SqlValue<'_>) -> Result<i32> {
    i32::try_from(to_i64(value)?).map_err(|_| mismatch(value, "int4"))
}

pub fn to_i16(value: &SqlValue<'_>) -> Result<i16> {
    i16::try_from(to_i64(value)?).map_err(|_| mismatch(value, "int2"))
}

pub fn to_f64(value: &SqlValue<'_>) -> Result<f64> {
    match value {
        SqlValue::F64(v) => Ok(*v),
        SqlValue::F32(v) => Ok(f64::from(*v)),
        SqlValue::Decimal(d) => d.to_f64().ok_or_else(|| mismatch(value, "double")),
        SqlValue::Text(s) => s.trim().parse().map_err(|_| mismatch(value, "double")),
        other => other
            .as_i64()
            .map(|v| v as f64)
            .ok_or_else(|| mismatch(value, "double")),
    }
}

pub fn to_decimal(value: &SqlValue<'_>) -> Result<Decimal> {
    match value {
        SqlValue::Decimal(d) => Ok(*d),
        SqlValue::F64(v) => Decimal::from_f64(*v).ok_or_else(|| mismatch(value, "numeric")),
        SqlValue::F32(v) => Decimal::from_f32(*v).ok_or_else(|| mismatch(value, "numeric")),
        SqlValue::Text(s) => {
            let s = s.trim();
            Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .map_err(|_| mismatch(value, "numeric"))
        }
        other => other
            .as_i64()
            .map(Decimal::from)
            .ok_or_else(|| mismatch(value, "numeric")),
    }
}

pub fn to_uuid(value: &SqlValue<'_>) -> Result<Uuid> {
    match value {
        SqlValue::Uuid(u) => Ok(*u),
        SqlValue::Text(s) => Uuid::parse_str(s.trim()).map_err(|_| mismatch(value, "uuid")),
        SqlValue::Bytes(b) => Uuid::from_slice(b).map_err(|_| mismatch(value, "uuid")),
        _ => Err(mismatch(value, "uuid")),
    }
}

pub fn to_datetime(value: &SqlValue<'_>) -> Result<NaiveDateTime> {
    match value {
        SqlValue::DateTime(v) => Ok(*v),
        SqlValue::DateTimeOffset(v) => Ok(v.naive_local()),
        SqlValue::Date(d) => Ok(d.and_time(NaiveTime::MIN)),
        SqlValue::Text(s) => parse_datetime(s).ok_or_else(|| mismatch(value, "timestamp")),
        _ => Err(mismatch(value, "timestamp")),
    }
}

pub fn to_datetime_offset(value: &SqlValue<'_>) -> Result<DateTime<FixedOffset>> {
    match value {
        SqlValue::DateTimeOffset(v) => Ok(*v),
        SqlValue::DateTime(v) => Ok(v.and_utc().fixed_offset()),
        SqlValue::Date(d) => Ok(d.and_time(NaiveTime::MIN).and_utc().fixed_offset()),
        SqlValue::Text(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z"))
                .ok()
                .or_else(|| parse_datetime(s).map(|dt| dt.and_utc().fixed_offset()))
                .ok_or_else(|| mismatch(value, "timestamptz"))
        }
        _ => Err(mismatch(value, "timestamptz")),
    }
}

pub fn to_date(value: &SqlValue<'_>) -> Result<NaiveDate> {
    match value {
        SqlValue::Date(d) => Ok(*d),
        SqlValue::DateTime(v) => Ok(v.date()),
        SqlValue::DateTimeOffset(v) => Ok(v.date_naive()),
        SqlValue::Text(s) => {
            let s = s.trim();
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .or_else(|| parse_datetime(s).map(|dt| dt.date()))
                .ok_or_else(|| mismatch(value, "date"))
        }
        _ => Err(mismatch(value, "date")),
    }
}

pub fn to_time(value: &SqlValue<'_>) -> Result<NaiveTime> {
    match value {
        SqlValue::Time(t) => Ok(*t),
        SqlValue::DateTime(v) => Ok(v.time()),
        SqlValue::DateTimeOffset(v) => Ok(v.time()),
        SqlValue::Text(s) => {
            let s = s.trim();
            TIME_FORMATS
                .iter()
                .find_map(|f| NaiveTime::parse_from_str(s, f).ok())
                .ok_or_else(|| mismatch(value, "time"))
        }
        _ => Err(mismatch(value, "time")),
    }
}

pub fn to_bytes(value: SqlValue<'static>) -> Result<Cow<'static, [u8]>> {
    match value {
        SqlValue::Bytes(b) => Ok(b),
        SqlValue::Text(Cow::Owned(s)) => Ok(Cow::Owned(s.into_bytes())),
        SqlValue::Text(Cow::Borrowed(s)) => Ok(Cow::Borrowed(s.as_bytes())),
        SqlValue::Uuid(u) => Ok(Cow::Owned(u.as_bytes().to_vec())),
        other => Err(mismatch(&other, "binary")),
    }
}

/// Any non-null value rendered as text.
pub fn to_text(value: SqlValue<'static>) -> SqlValue<'static> {
    match value {
        SqlValue::Text(s) => SqlValue::Text(s),
        SqlValue::Bytes(b) => match String::from_utf8(b.into_owned()) {
            Ok(s) => SqlValue::Text(Cow::Owned(s)),
            Err(e) => SqlValue::Text(Cow::Owned(SqlValue::Bytes(Cow::Owned(e.into_bytes())).to_string())),
        },
        other => SqlValue::Text(Cow::Owned(other.to_string())),
    }
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc).naive_utc()))
}
