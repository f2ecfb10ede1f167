//! Type-directed conversion between [`Value`] and PostgreSQL parameters
//!
//! Generated values are loosely typed (mostly text), while prepared
//! statements know the exact type of every parameter. Conversion follows the
//! statement's parameter type, so `numberBetween` can target an `int4` column
//! and `date` a `date` column. NULL binds to a parameter of any type. Types
//! without a native encoder here (`numeric`, `inet`, arrays, extension types)
//! are reached by casting a text parameter, see [`has_native_encoder`].

use std::error::Error;

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use tokio_postgres::Row;

use crate::domain::value::Value;
use crate::domain::{MasqueradeError, Result};

/// Boxed parameter ready for `query`/`execute`
pub type SqlParam = Box<dyn ToSql + Sync + Send>;

fn mismatch(value: &Value, ty: &Type) -> MasqueradeError {
    MasqueradeError::Database(format!("Cannot convert '{value}' to PostgreSQL type {ty}"))
}

fn int<T>(value: &Value, ty: &Type) -> Result<Option<T>>
where
    T: TryFrom<i64>,
{
    if value.is_null() {
        return Ok(None);
    }
    value
        .as_i64()
        .and_then(|i| T::try_from(i).ok())
        .map(Some)
        .ok_or_else(|| mismatch(value, ty))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(s).map(|ts| ts.date()))
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// SQL NULL for a parameter of any type
#[derive(Debug, Clone, Copy)]
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

/// Whether [`to_sql_param`] can encode non-NULL values of `ty` directly
///
/// Other types need the statement to take the parameter as text and cast it,
/// i.e. `$1::text::numeric`.
pub fn has_native_encoder(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::BOOL
            | Type::INT2
            | Type::INT4
            | Type::INT8
            | Type::FLOAT4
            | Type::FLOAT8
            | Type::TEXT
            | Type::VARCHAR
            | Type::BPCHAR
            | Type::NAME
            | Type::UNKNOWN
            | Type::UUID
            | Type::DATE
            | Type::TIMESTAMP
            | Type::TIMESTAMPTZ
            | Type::TIME
            | Type::JSON
            | Type::JSONB
    )
}

/// Converts `value` into a parameter of PostgreSQL type `ty`
///
/// # Errors
///
/// Returns `MasqueradeError::Database` when the value cannot be represented
/// in `ty`, or a non-NULL value targets a type without a native encoder.
pub fn to_sql_param(value: &Value, ty: &Type) -> Result<SqlParam> {
    if value.is_null() {
        return Ok(Box::new(NullParam));
    }
    let param: SqlParam = match *ty {
        Type::BOOL => Box::new(match value {
            Value::Null => None,
            v => Some(v.as_bool().ok_or_else(|| mismatch(v, ty))?),
        }),
        Type::INT2 => Box::new(int::<i16>(value, ty)?),
        Type::INT4 => Box::new(int::<i32>(value, ty)?),
        Type::INT8 => Box::new(int::<i64>(value, ty)?),
        Type::FLOAT4 => Box::new(match value {
            Value::Null => None,
            v => Some(v.as_f64().ok_or_else(|| mismatch(v, ty))? as f32),
        }),
        Type::FLOAT8 => Box::new(match value {
            Value::Null => None,
            v => Some(v.as_f64().ok_or_else(|| mismatch(v, ty))?),
        }),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            Box::new(text_of(value))
        }
        Type::UUID => Box::new(match value {
            Value::Null => None,
            v => Some(
                v.as_str()
                    .and_then(|s| uuid::Uuid::parse_str(s).ok())
                    .ok_or_else(|| mismatch(v, ty))?,
            ),
        }),
        Type::DATE => Box::new(match value {
            Value::Null => None,
            v => Some(v.as_str().and_then(parse_date).ok_or_else(|| mismatch(v, ty))?),
        }),
        Type::TIMESTAMP => Box::new(match value {
            Value::Null => None,
            v => Some(
                v.as_str()
                    .and_then(parse_timestamp)
                    .ok_or_else(|| mismatch(v, ty))?,
            ),
        }),
        Type::TIMESTAMPTZ => Box::new(match value {
            Value::Null => None,
            v => Some(
                v.as_str()
                    .and_then(parse_timestamp)
                    .map(|ts| DateTime::<Utc>::from_naive_utc_and_offset(ts, Utc))
                    .ok_or_else(|| mismatch(v, ty))?,
            ),
        }),
        Type::TIME => Box::new(match value {
            Value::Null => None,
            v => Some(
                v.as_str()
                    .and_then(|s| NaiveTime::parse_from_str(s, "%H:%M:%S").ok())
                    .ok_or_else(|| mismatch(v, ty))?,
            ),
        }),
        Type::JSON | Type::JSONB => Box::new(match value {
            Value::Null => None,
            v => Some(v.to_json()),
        }),
        _ => {
            return Err(MasqueradeError::Database(format!(
                "Unsupported PostgreSQL parameter type {ty}"
            )))
        }
    };
    Ok(param)
}

/// Reads a primary key value from column `idx` of `row`
///
/// # Errors
///
/// Returns `MasqueradeError::Database` for key types other than integers,
/// text and uuid.
pub fn key_from_row(row: &Row, idx: usize) -> Result<Value> {
    let ty = row.columns()[idx].type_().clone();
    let decode_err = |e: tokio_postgres::Error| {
        MasqueradeError::Database(format!("Failed to decode primary key: {e}"))
    };

    let value = match ty {
        Type::INT2 => Value::from(row.try_get::<_, Option<i16>>(idx).map_err(decode_err)?.map(i64::from)),
        Type::INT4 => Value::from(row.try_get::<_, Option<i32>>(idx).map_err(decode_err)?.map(i64::from)),
        Type::INT8 => Value::from(row.try_get::<_, Option<i64>>(idx).map_err(decode_err)?),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            Value::from(row.try_get::<_, Option<String>>(idx).map_err(decode_err)?)
        }
        Type::UUID => Value::from(
            row.try_get::<_, Option<uuid::Uuid>>(idx)
                .map_err(decode_err)?
                .map(|u| u.to_string()),
        ),
        other => {
            return Err(MasqueradeError::Database(format!(
                "Unsupported primary key type {other}"
            )))
        }
    };
    Ok(value)
}
