//! Trait for converting from SQL values to Rust types.
//!
//! Every conversion comes in three flavors so callers can pick their null
//! contract: [`FromSql::from_sql`] rejects NULL, [`FromSql::from_sql_nullable`]
//! maps it to `None`, and [`FromSql::from_sql_or_default`] maps it to the
//! type's default. Containers compose through `Option`, so
//! `Vec<Option<Vec<Option<String>>>>` works at any depth.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::prelude::ToPrimitive;

use crate::error::TypeError;
use crate::value::{SqlValue, ZonedDateTime};

/// Trait for types that can be converted from SQL values.
pub trait FromSql: Sized {
    /// Convert from a SQL value to this type.
    ///
    /// NULL is an error ([`TypeError::UnexpectedNull`]).
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError>;

    /// Convert from an optional SQL value.
    ///
    /// Returns `None` if the value is NULL.
    fn from_sql_nullable(value: &SqlValue) -> Result<Option<Self>, TypeError> {
        if value.is_null() {
            Ok(None)
        } else {
            Self::from_sql(value).map(Some)
        }
    }

    /// Convert, substituting `Default::default()` for NULL.
    fn from_sql_or_default(value: &SqlValue) -> Result<Self, TypeError>
    where
        Self: Default,
    {
        Ok(Self::from_sql_nullable(value)?.unwrap_or_default())
    }
}

fn mismatch(expected: &'static str, value: &SqlValue) -> TypeError {
    if value.is_null() {
        TypeError::UnexpectedNull
    } else {
        TypeError::TypeMismatch {
            expected,
            actual: value.type_name().to_string(),
        }
    }
}

impl FromSql for SqlValue {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        if value.is_null() {
            return Err(TypeError::UnexpectedNull);
        }
        Ok(value.clone())
    }
}

impl FromSql for bool {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Bool(v) => Ok(*v),
            _ => Err(mismatch("bool", value)),
        }
    }
}

impl FromSql for i8 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::TinyInt(v) => Ok(*v),
            _ => Err(mismatch("i8", value)),
        }
    }
}

impl FromSql for i16 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::SmallInt(v) => Ok(*v),
            SqlValue::TinyInt(v) => Ok(i16::from(*v)),
            _ => Err(mismatch("i16", value)),
        }
    }
}

impl FromSql for i32 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Int(v) => Ok(*v),
            SqlValue::SmallInt(v) => Ok(i32::from(*v)),
            SqlValue::TinyInt(v) => Ok(i32::from(*v)),
            _ => Err(mismatch("i32", value)),
        }
    }
}

impl FromSql for i64 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        value.as_i64().ok_or_else(|| mismatch("i64", value))
    }
}

impl FromSql for f32 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Real(v) => Ok(*v),
            _ => Err(mismatch("f32", value)),
        }
    }
}

impl FromSql for f64 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Double(v) => Ok(*v),
            SqlValue::Real(v) => Ok(f64::from(*v)),
            SqlValue::Decimal(v) => v.to_f64().ok_or(TypeError::OutOfRange { target_type: "f64" }),
            SqlValue::WideDecimal(v) => v
                .parse()
                .map_err(|_| TypeError::OutOfRange { target_type: "f64" }),
            _ => Err(mismatch("f64", value)),
        }
    }
}

impl FromSql for String {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::String(v) | SqlValue::WideDecimal(v) => Ok(v.clone()),
            _ => Err(mismatch("String", value)),
        }
    }
}

impl FromSql for Bytes {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Binary(v) => Ok(v.clone()),
            _ => Err(mismatch("Bytes", value)),
        }
    }
}

impl FromSql for uuid::Uuid {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Uuid(v) => Ok(*v),
            SqlValue::String(s) => s.parse().map_err(|e| TypeError::InvalidUuid(format!("{e}"))),
            _ => Err(mismatch("Uuid", value)),
        }
    }
}

impl FromSql for rust_decimal::Decimal {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Decimal(v) => Ok(*v),
            SqlValue::WideDecimal(_) => Err(TypeError::OutOfRange {
                target_type: "Decimal",
            }),
            SqlValue::TinyInt(_) | SqlValue::SmallInt(_) | SqlValue::Int(_) | SqlValue::BigInt(_) => {
                Ok(value.as_i64().map(rust_decimal::Decimal::from).unwrap_or_default())
            }
            SqlValue::String(s) => s
                .parse()
                .map_err(|e| TypeError::InvalidDecimal(format!("{e}"))),
            _ => Err(mismatch("Decimal", value)),
        }
    }
}

impl FromSql for NaiveDate {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Date(v) => Ok(*v),
            SqlValue::Timestamp(v) => Ok(v.date()),
            _ => Err(mismatch("NaiveDate", value)),
        }
    }
}

impl FromSql for NaiveTime {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Time(v) => Ok(*v),
            SqlValue::TimeTz { time, .. } => Ok(*time),
            SqlValue::Timestamp(v) => Ok(v.time()),
            _ => Err(mismatch("NaiveTime", value)),
        }
    }
}

impl FromSql for NaiveDateTime {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Timestamp(v) => Ok(*v),
            SqlValue::TimestampTz(v) => Ok(v.local),
            _ => Err(mismatch("NaiveDateTime", value)),
        }
    }
}

impl FromSql for ZonedDateTime {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::TimestampTz(v) => Ok(v.clone()),
            _ => Err(mismatch("ZonedDateTime", value)),
        }
    }
}

impl FromSql for DateTime<FixedOffset> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::TimestampTz(v) => v.to_fixed_offset().ok_or_else(|| {
                TypeError::InvalidDateTime(format!(
                    "time zone {} has no fixed offset",
                    v.zone
                ))
            }),
            _ => Err(mismatch("DateTime<FixedOffset>", value)),
        }
    }
}

impl FromSql for DateTime<Utc> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        DateTime::<FixedOffset>::from_sql(value).map(|v| v.to_utc())
    }
}

impl FromSql for serde_json::Value {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Json(v) => Ok(v.clone()),
            SqlValue::Null => Err(TypeError::UnexpectedNull),
            other => Ok(other.to_json()),
        }
    }
}

impl<T: FromSql> FromSql for Option<T> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        T::from_sql_nullable(value)
    }
}

/// Arrays convert element-wise. Maps convert entry-wise through 2-tuples,
/// so `Vec<(K, V)>` keeps the wire order of a map.
impl<T: FromSql> FromSql for Vec<T> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Array { values, .. } => values.iter().map(T::from_sql).collect(),
            SqlValue::Map {
                key,
                value: value_sig,
                entries,
            } => entries
                .iter()
                .map(|(k, v)| T::from_sql(&entry_row(key, value_sig, k, v)))
                .collect(),
            _ => Err(mismatch("Vec", value)),
        }
    }
}

fn entry_row(
    key: &crate::TypeSignature,
    value: &crate::TypeSignature,
    k: &SqlValue,
    v: &SqlValue,
) -> SqlValue {
    SqlValue::Row {
        fields: vec![
            crate::RowField::anonymous(key.clone()),
            crate::RowField::anonymous(value.clone()),
        ],
        values: vec![k.clone(), v.clone()],
    }
}

fn map_entries<'a>(value: &'a SqlValue) -> Result<&'a [(SqlValue, SqlValue)], TypeError> {
    value.as_map().ok_or_else(|| mismatch("map", value))
}

impl<K, V> FromSql for HashMap<K, V>
where
    K: FromSql + Eq + Hash,
    V: FromSql,
{
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        map_entries(value)?
            .iter()
            .map(|(k, v)| -> Result<(K, V), TypeError> { Ok((K::from_sql(k)?, V::from_sql(v)?)) })
            .collect()
    }
}

impl<K, V> FromSql for BTreeMap<K, V>
where
    K: FromSql + Ord,
    V: FromSql,
{
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        map_entries(value)?
            .iter()
            .map(|(k, v)| -> Result<(K, V), TypeError> { Ok((K::from_sql(k)?, V::from_sql(v)?)) })
            .collect()
    }
}

macro_rules! impl_from_sql_tuple {
    ($len:expr => $($name:ident : $idx:tt),+) => {
        impl<$($name: FromSql),+> FromSql for ($($name,)+) {
            fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
                match value.as_row() {
                    Some(values) if values.len() == $len => {
                        Ok(($($name::from_sql(&values[$idx])?,)+))
                    }
                    Some(values) => Err(TypeError::TypeMismatch {
                        expected: concat!("row of ", stringify!($len), " fields"),
                        actual: format!("row of {} fields", values.len()),
                    }),
                    None => Err(mismatch("row", value)),
                }
            }
        }
    };
}

impl_from_sql_tuple!(2 => A: 0, B: 1);
impl_from_sql_tuple!(3 => A: 0, B: 1, C: 2);
impl_from_sql_tuple!(4 => A: 0, B: 1, C: 2, D: 3);
