//! Trait for converting Rust types to SQL values.

use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::TypeError;
use crate::signature::TypeSignature;
use crate::value::{SqlValue, ZonedDateTime};

/// Trait for types that can be converted to SQL values.
///
/// This trait is implemented for common Rust types to enable
/// type-safe parameter binding in queries.
pub trait ToSql {
    /// Convert this value to a SQL value.
    fn to_sql(&self) -> Result<SqlValue, TypeError>;

    /// Get the SQL type name for this value.
    fn sql_type(&self) -> &'static str;
}

macro_rules! impl_to_sql {
    ($($ty:ty => $variant:ident, $name:literal;)*) => {
        $(
            impl ToSql for $ty {
                fn to_sql(&self) -> Result<SqlValue, TypeError> {
                    Ok(SqlValue::$variant(self.clone()))
                }

                fn sql_type(&self) -> &'static str {
                    $name
                }
            }
        )*
    };
}

impl_to_sql! {
    bool => Bool, "boolean";
    i8 => TinyInt, "tinyint";
    i16 => SmallInt, "smallint";
    i32 => Int, "integer";
    i64 => BigInt, "bigint";
    f32 => Real, "real";
    f64 => Double, "double";
    String => String, "varchar";
    Bytes => Binary, "varbinary";
    uuid::Uuid => Uuid, "uuid";
    rust_decimal::Decimal => Decimal, "decimal";
    NaiveDate => Date, "date";
    NaiveTime => Time, "time";
    NaiveDateTime => Timestamp, "timestamp";
    ZonedDateTime => TimestampTz, "timestamp with time zone";
    serde_json::Value => Json, "json";
}

impl ToSql for str {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::String(self.to_owned()))
    }

    fn sql_type(&self) -> &'static str {
        "varchar"
    }
}

impl ToSql for [u8] {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Binary(Bytes::copy_from_slice(self)))
    }

    fn sql_type(&self) -> &'static str {
        "varbinary"
    }
}

impl ToSql for DateTime<FixedOffset> {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::from(*self))
    }

    fn sql_type(&self) -> &'static str {
        "timestamp with time zone"
    }
}

impl ToSql for DateTime<Utc> {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::from(*self))
    }

    fn sql_type(&self) -> &'static str {
        "timestamp with time zone"
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(self.clone())
    }

    fn sql_type(&self) -> &'static str {
        self.type_name()
    }
}

impl<T: ToSql> ToSql for Option<T> {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        match self {
            Some(v) => v.to_sql(),
            None => Ok(SqlValue::Null),
        }
    }

    fn sql_type(&self) -> &'static str {
        match self {
            Some(v) => v.sql_type(),
            None => "unknown",
        }
    }
}

impl<T: ToSql + ?Sized> ToSql for &T {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        (**self).to_sql()
    }

    fn sql_type(&self) -> &'static str {
        (**self).sql_type()
    }
}

/// Best-effort signature of a bound value. Parameters are rendered as
/// literals, so this only labels containers.
fn signature_of(value: &SqlValue) -> TypeSignature {
    match value {
        SqlValue::Bool(_) => TypeSignature::Boolean,
        SqlValue::TinyInt(_) => TypeSignature::TinyInt,
        SqlValue::SmallInt(_) => TypeSignature::SmallInt,
        SqlValue::Int(_) => TypeSignature::Integer,
        SqlValue::BigInt(_) => TypeSignature::BigInt,
        SqlValue::Real(_) => TypeSignature::Real,
        SqlValue::Double(_) => TypeSignature::Double,
        SqlValue::Decimal(d) => TypeSignature::Decimal {
            precision: crate::signature::MAX_DECIMAL_PRECISION,
            scale: d.scale(),
        },
        SqlValue::WideDecimal(v) => TypeSignature::Decimal {
            precision: crate::signature::MAX_DECIMAL_PRECISION,
            scale: v
                .split_once('.')
                .map_or(0, |(_, fraction)| u32::try_from(fraction.len()).unwrap_or(0)),
        },
        SqlValue::String(_) => TypeSignature::Varchar(None),
        SqlValue::Binary(_) => TypeSignature::Varbinary,
        SqlValue::Json(_) => TypeSignature::Json,
        SqlValue::Uuid(_) => TypeSignature::Uuid,
        SqlValue::Date(_) => TypeSignature::Date,
        SqlValue::Time(_) => TypeSignature::Time { precision: None },
        SqlValue::TimeTz { .. } => TypeSignature::TimeWithTimeZone { precision: None },
        SqlValue::Timestamp(_) => TypeSignature::Timestamp { precision: None },
        SqlValue::TimestampTz(_) => TypeSignature::TimestampWithTimeZone { precision: None },
        SqlValue::Array { element, .. } => TypeSignature::array(element.clone()),
        SqlValue::Map { key, value, .. } => TypeSignature::map(key.clone(), value.clone()),
        SqlValue::Row { fields, .. } => TypeSignature::Row(fields.clone()),
        SqlValue::Null => TypeSignature::Unknown,
    }
}

fn common_signature<'a>(values: impl Iterator<Item = &'a SqlValue>) -> TypeSignature {
    values
        .filter(|v| !v.is_null())
        .map(signature_of)
        .next()
        .unwrap_or(TypeSignature::Unknown)
}

impl<T: ToSql> ToSql for Vec<T> {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        let values = self.iter().map(ToSql::to_sql).collect::<Result<Vec<_>, _>>()?;
        Ok(SqlValue::Array {
            element: common_signature(values.iter()),
            values,
        })
    }

    fn sql_type(&self) -> &'static str {
        "array"
    }
}

fn map_to_sql<'a, K, V>(
    pairs: impl Iterator<Item = (&'a K, &'a V)>,
) -> Result<SqlValue, TypeError>
where
    K: ToSql + 'a,
    V: ToSql + 'a,
{
    let entries = pairs
        .map(|(k, v)| -> Result<_, TypeError> { Ok((k.to_sql()?, v.to_sql()?)) })
        .collect::<Result<Vec<_>, _>>()?;
    if entries.iter().any(|(k, _)| k.is_null()) {
        return Err(TypeError::UnsupportedConversion {
            from: "map with a null key".to_string(),
            to: "map",
        });
    }
    Ok(SqlValue::Map {
        key: common_signature(entries.iter().map(|(k, _)| k)),
        value: common_signature(entries.iter().map(|(_, v)| v)),
        entries,
    })
}

impl<K: ToSql, V: ToSql, S> ToSql for HashMap<K, V, S> {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        map_to_sql(self.iter())
    }

    fn sql_type(&self) -> &'static str {
        "map"
    }
}

impl<K: ToSql, V: ToSql> ToSql for BTreeMap<K, V> {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        map_to_sql(self.iter())
    }

    fn sql_type(&self) -> &'static str {
        "map"
    }
}
