//! Encoding of SQL values back to the wire and to SQL text.
//!
//! [`SqlValue::to_json`] produces the JSON shape the coordinator uses for
//! result cells, so that decoding its output yields the original value.
//! [`to_sql_literal`] renders a value as a typed SQL literal for
//! `EXECUTE ... USING` parameter binding.

use std::fmt::Write as _;

use base64::Engine as _;
use serde_json::{Map, Number, Value};

use crate::value::{SqlValue, format_offset, format_time, format_timestamp};

fn float_to_json(v: f64) -> Value {
    if v.is_nan() {
        Value::String("NaN".into())
    } else if v.is_infinite() {
        Value::String(if v > 0.0 { "Infinity" } else { "-Infinity" }.into())
    } else {
        Number::from_f64(v).map_or(Value::Null, Value::Number)
    }
}

/// Text form of a map key: strings are used verbatim, every other kind
/// uses its JSON text.
fn map_key_text(key: &SqlValue) -> String {
    match key.to_json() {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

impl SqlValue {
    /// Encode this value in the coordinator's JSON result format.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(v) => Value::Bool(*v),
            Self::TinyInt(v) => Value::from(*v),
            Self::SmallInt(v) => Value::from(*v),
            Self::Int(v) => Value::from(*v),
            Self::BigInt(v) => Value::from(*v),
            Self::Real(v) => float_to_json(f64::from(*v)),
            Self::Double(v) => float_to_json(*v),
            Self::Decimal(v) => Value::String(v.to_string()),
            Self::WideDecimal(v) => Value::String(v.clone()),
            Self::String(v) => Value::String(v.clone()),
            Self::Binary(v) => Value::String(base64::engine::general_purpose::STANDARD.encode(v)),
            Self::Json(v) => Value::String(v.to_string()),
            Self::Uuid(v) => Value::String(v.hyphenated().to_string()),
            Self::Date(v) => Value::String(v.format("%Y-%m-%d").to_string()),
            Self::Time(v) => Value::String(format_time(v)),
            Self::TimeTz { time, offset } => {
                Value::String(format!("{}{}", format_time(time), format_offset(*offset)))
            }
            Self::Timestamp(v) => Value::String(format_timestamp(v)),
            Self::TimestampTz(v) => Value::String(v.to_string()),
            Self::Array { values, .. } | Self::Row { values, .. } => {
                Value::Array(values.iter().map(Self::to_json).collect())
            }
            Self::Map { entries, .. } => {
                let mut object = Map::with_capacity(entries.len());
                for (k, v) in entries {
                    object.insert(map_key_text(k), v.to_json());
                }
                Value::Object(object)
            }
        }
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// `nan()` and `infinity()` are `double`; other float types cast them.
fn float_literal(keyword: &str, v: f64) -> String {
    let special = if v.is_nan() {
        "nan()"
    } else if v == f64::INFINITY {
        "infinity()"
    } else if v == f64::NEG_INFINITY {
        "-infinity()"
    } else {
        return format!("{keyword} '{v}'");
    };
    if keyword == "DOUBLE" {
        special.to_string()
    } else {
        format!("CAST({special} AS {keyword})")
    }
}

fn join_literals<'a>(values: impl Iterator<Item = &'a SqlValue>) -> String {
    values.map(to_sql_literal).collect::<Vec<_>>().join(", ")
}

/// Render a value as a SQL literal.
///
/// ```
/// use trino_types::{SqlValue, to_sql_literal};
///
/// assert_eq!(to_sql_literal(&SqlValue::from("it's")), "'it''s'");
/// assert_eq!(to_sql_literal(&SqlValue::Null), "NULL");
/// ```
#[must_use]
pub fn to_sql_literal(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Bool(v) => (if *v { "TRUE" } else { "FALSE" }).to_string(),
        SqlValue::TinyInt(v) => format!("TINYINT '{v}'"),
        SqlValue::SmallInt(v) => format!("SMALLINT '{v}'"),
        SqlValue::Int(v) => v.to_string(),
        SqlValue::BigInt(v) => format!("BIGINT '{v}'"),
        SqlValue::Real(v) => float_literal("REAL", f64::from(*v)),
        SqlValue::Double(v) => float_literal("DOUBLE", *v),
        SqlValue::Decimal(v) => format!("DECIMAL '{v}'"),
        SqlValue::WideDecimal(v) => format!("DECIMAL '{v}'"),
        SqlValue::String(v) => quote(v),
        SqlValue::Binary(v) => {
            let mut hex = String::with_capacity(v.len() * 2 + 3);
            hex.push_str("X'");
            for byte in v.iter() {
                let _ = write!(hex, "{byte:02x}");
            }
            hex.push('\'');
            hex
        }
        SqlValue::Json(v) => format!("JSON {}", quote(&v.to_string())),
        SqlValue::Uuid(v) => format!("UUID '{}'", v.hyphenated()),
        SqlValue::Date(v) => format!("DATE '{}'", v.format("%Y-%m-%d")),
        SqlValue::Time(v) => format!("TIME '{}'", format_time(v)),
        SqlValue::TimeTz { time, offset } => {
            format!("TIME '{}{}'", format_time(time), format_offset(*offset))
        }
        SqlValue::Timestamp(v) => format!("TIMESTAMP '{}'", format_timestamp(v)),
        SqlValue::TimestampTz(v) => format!("TIMESTAMP {}", quote(&v.to_string())),
        SqlValue::Array { values, .. } => format!("ARRAY[{}]", join_literals(values.iter())),
        SqlValue::Map { entries, .. } => format!(
            "MAP(ARRAY[{}], ARRAY[{}])",
            join_literals(entries.iter().map(|(k, _)| k)),
            join_literals(entries.iter().map(|(_, v)| v)),
        ),
        SqlValue::Row { values, .. } => format!("ROW({})", join_literals(values.iter())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::decode::{DecodeOptions, decode_value};
    use crate::signature::TypeSignature;

    fn round_trip(sig: &str, raw: Value) {
        let sig = TypeSignature::parse(sig).unwrap();
        let value = decode_value(&sig, &raw, &DecodeOptions::default()).unwrap();
        assert_eq!(value.to_json(), raw, "{sig}");
    }

    #[test]
    fn test_to_json_matches_wire_form() {
        round_trip("bigint", json!(42));
        round_trip("double", json!("NaN"));
        round_trip("decimal(10,2)", json!("12.50"));
        round_trip("decimal(38,2)", json!("123456789012345678901234567890123456.78"));
        round_trip("varbinary", json!("AAr/"));
        round_trip("date", json!("2024-02-29"));
        round_trip("timestamp(3)", json!("2024-02-29 10:11:12.345"));
        round_trip("timestamp(3) with time zone", json!("2024-02-29 10:11:12.345 Europe/Paris"));
        round_trip("time(3) with time zone", json!("10:11:12.345+05:30"));
        round_trip("map(integer, array(varchar))", json!({"1": ["a", null], "2": null}));
        round_trip("row(a bigint, b double)", json!([1, 2.5]));
    }

    #[test]
    fn test_literals() {
        assert_eq!(to_sql_literal(&SqlValue::Bool(true)), "TRUE");
        assert_eq!(to_sql_literal(&SqlValue::Int(5)), "5");
        assert_eq!(to_sql_literal(&SqlValue::BigInt(-5)), "BIGINT '-5'");
        assert_eq!(to_sql_literal(&SqlValue::Double(1.5)), "DOUBLE '1.5'");
        assert_eq!(to_sql_literal(&SqlValue::Double(f64::NAN)), "nan()");
        assert_eq!(
            to_sql_literal(&SqlValue::Double(f64::NEG_INFINITY)),
            "-infinity()"
        );
        assert_eq!(to_sql_literal(&SqlValue::Real(1.5)), "REAL '1.5'");
        assert_eq!(to_sql_literal(&SqlValue::Real(f32::NAN)), "CAST(nan() AS REAL)");
        assert_eq!(
            to_sql_literal(&SqlValue::Real(f32::INFINITY)),
            "CAST(infinity() AS REAL)"
        );
        assert_eq!(
            to_sql_literal(&SqlValue::Real(f32::NEG_INFINITY)),
            "CAST(-infinity() AS REAL)"
        );
        assert_eq!(
            to_sql_literal(&SqlValue::WideDecimal(
                "12345678901234567890123456789012345678".into()
            )),
            "DECIMAL '12345678901234567890123456789012345678'"
        );
        assert_eq!(
            to_sql_literal(&SqlValue::Decimal(rust_decimal::Decimal::new(120, 2))),
            "DECIMAL '1.20'"
        );
        assert_eq!(
            to_sql_literal(&SqlValue::Binary(bytes::Bytes::from_static(&[0x0a, 0xff]))),
            "X'0aff'"
        );
        assert_eq!(
            to_sql_literal(&SqlValue::Date(NaiveDate::from_ymd_opt(2020, 1, 2).unwrap())),
            "DATE '2020-01-02'"
        );
    }

    #[test]
    fn test_container_literals() {
        let array = SqlValue::Array {
            element: TypeSignature::Varchar(None),
            values: vec!["a".into(), SqlValue::Null],
        };
        assert_eq!(to_sql_literal(&array), "ARRAY['a', NULL]");

        let map = SqlValue::Map {
            key: TypeSignature::Varchar(None),
            value: TypeSignature::Integer,
            entries: vec![("k".into(), SqlValue::Int(1))],
        };
        assert_eq!(to_sql_literal(&map), "MAP(ARRAY['k'], ARRAY[1])");
    }
}
