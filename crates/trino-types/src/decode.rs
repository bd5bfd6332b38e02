//! JSON decoding for SQL values.
//!
//! Result rows arrive as JSON arrays whose cells are shaped by the column's
//! [`TypeSignature`]. [`decode_value`] is a single structural recursion over
//! the signature: containers recurse into their children with the same
//! rules, so `array(array(array(bigint)))` needs no special casing.

use std::str::FromStr;

use base64::Engine as _;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;

use crate::error::TypeError;
use crate::signature::TypeSignature;
use crate::value::{SqlValue, ZonedDateTime, parse_fixed_offset};

/// How `decimal(p, s)` columns are materialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DecimalMode {
    /// Exact [`rust_decimal::Decimal`] values.
    #[default]
    Decimal,
    /// Lossy `f64` values.
    Double,
}

/// Options applied while decoding a result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// How decimals are materialized.
    pub decimal_mode: DecimalMode,
}

impl DecodeOptions {
    /// Options with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the decimal mode.
    #[must_use]
    pub fn decimal_mode(mut self, mode: DecimalMode) -> Self {
        self.decimal_mode = mode;
        self
    }
}

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";
const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Decode one raw JSON cell against its signature.
///
/// A JSON `null` decodes to [`SqlValue::Null`] at any depth.
///
/// # Errors
///
/// Returns [`TypeError::Decode`] when the fragment's shape or content does
/// not match the signature.
pub fn decode_value(
    signature: &TypeSignature,
    raw: &Value,
    options: &DecodeOptions,
) -> Result<SqlValue, TypeError> {
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }

    let fail = |reason: &str| TypeError::decode(signature, raw, reason);

    let value = match signature {
        TypeSignature::Boolean => raw
            .as_bool()
            .map(SqlValue::Bool)
            .ok_or_else(|| fail("expected a boolean"))?,
        TypeSignature::TinyInt => integer(raw)
            .and_then(|v| i8::try_from(v).ok())
            .map(SqlValue::TinyInt)
            .ok_or_else(|| fail("expected an 8-bit integer"))?,
        TypeSignature::SmallInt => integer(raw)
            .and_then(|v| i16::try_from(v).ok())
            .map(SqlValue::SmallInt)
            .ok_or_else(|| fail("expected a 16-bit integer"))?,
        TypeSignature::Integer => integer(raw)
            .and_then(|v| i32::try_from(v).ok())
            .map(SqlValue::Int)
            .ok_or_else(|| fail("expected a 32-bit integer"))?,
        TypeSignature::BigInt => integer(raw)
            .map(SqlValue::BigInt)
            .ok_or_else(|| fail("expected a 64-bit integer"))?,
        TypeSignature::Real => float(raw)
            .map(|v| SqlValue::Real(v as f32))
            .ok_or_else(|| fail("expected a number"))?,
        TypeSignature::Double => float(raw)
            .map(SqlValue::Double)
            .ok_or_else(|| fail("expected a number"))?,
        TypeSignature::Decimal { .. } => {
            let text = match raw {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return Err(fail("expected a decimal string")),
            };
            match options.decimal_mode {
                DecimalMode::Decimal => {
                    let text = text.trim();
                    if wide_decimal_digits(text).is_some_and(|n| n > EXACT_DECIMAL_DIGITS) {
                        SqlValue::WideDecimal(text.to_string())
                    } else {
                        parse_decimal(text)
                            .map(SqlValue::Decimal)
                            .ok_or_else(|| fail("not a decimal number"))?
                    }
                }
                DecimalMode::Double => text
                    .trim()
                    .parse()
                    .map(SqlValue::Double)
                    .map_err(|_| fail("not a decimal number"))?,
            }
        }
        TypeSignature::Varchar(_)
        | TypeSignature::Char(_)
        | TypeSignature::IpAddress
        | TypeSignature::IntervalDayToSecond
        | TypeSignature::IntervalYearToMonth => raw
            .as_str()
            .map(|s| SqlValue::String(s.to_string()))
            .ok_or_else(|| fail("expected a string"))?,
        TypeSignature::Varbinary => {
            let text = raw.as_str().ok_or_else(|| fail("expected a base64 string"))?;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(text)
                .map_err(|e| fail(&format!("invalid base64: {e}")))?;
            SqlValue::Binary(bytes.into())
        }
        TypeSignature::Json => match raw {
            Value::String(text) => serde_json::from_str(text)
                .map(SqlValue::Json)
                .map_err(|e| fail(&format!("invalid json: {e}")))?,
            other => SqlValue::Json(other.clone()),
        },
        TypeSignature::Uuid => {
            let text = raw.as_str().ok_or_else(|| fail("expected a uuid string"))?;
            uuid::Uuid::parse_str(text)
                .map(SqlValue::Uuid)
                .map_err(|e| fail(&format!("invalid uuid: {e}")))?
        }
        TypeSignature::Date => {
            let text = raw.as_str().ok_or_else(|| fail("expected a date string"))?;
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .map(SqlValue::Date)
                .map_err(|e| fail(&format!("invalid date: {e}")))?
        }
        TypeSignature::Time { .. } => {
            let text = raw.as_str().ok_or_else(|| fail("expected a time string"))?;
            NaiveTime::parse_from_str(text, TIME_FORMAT)
                .map(SqlValue::Time)
                .map_err(|e| fail(&format!("invalid time: {e}")))?
        }
        TypeSignature::TimeWithTimeZone { .. } => {
            let text = raw.as_str().ok_or_else(|| fail("expected a time string"))?;
            let (time, zone) = split_time_zone(text).ok_or_else(|| fail("missing time zone"))?;
            let offset =
                parse_fixed_offset(zone).ok_or_else(|| fail("time zone is not a fixed offset"))?;
            let time = NaiveTime::parse_from_str(time, TIME_FORMAT)
                .map_err(|e| fail(&format!("invalid time: {e}")))?;
            SqlValue::TimeTz { time, offset }
        }
        TypeSignature::Timestamp { .. } => {
            let text = raw.as_str().ok_or_else(|| fail("expected a timestamp string"))?;
            parse_timestamp(text)
                .map(SqlValue::Timestamp)
                .ok_or_else(|| fail("invalid timestamp"))?
        }
        TypeSignature::TimestampWithTimeZone { .. } => {
            let text = raw.as_str().ok_or_else(|| fail("expected a timestamp string"))?;
            let (date, rest) = text
                .split_once([' ', 'T'])
                .ok_or_else(|| fail("invalid timestamp"))?;
            let (time, zone) = split_time_zone(rest).ok_or_else(|| fail("missing time zone"))?;
            let local = parse_timestamp(&format!("{date} {time}"))
                .ok_or_else(|| fail("invalid timestamp"))?;
            SqlValue::TimestampTz(ZonedDateTime::new(local, zone))
        }
        TypeSignature::Unknown => return Err(fail("only null is valid for unknown")),
        TypeSignature::Array(element) => {
            let items = raw.as_array().ok_or_else(|| fail("expected a list"))?;
            let values = items
                .iter()
                .map(|item| decode_value(element, item, options))
                .collect::<Result<Vec<_>, _>>()?;
            SqlValue::Array {
                element: (**element).clone(),
                values,
            }
        }
        TypeSignature::Map(key, value) => {
            let object = raw.as_object().ok_or_else(|| fail("expected an object"))?;
            let mut entries = Vec::with_capacity(object.len());
            for (k, v) in object {
                entries.push((decode_map_key(key, k, options)?, decode_value(value, v, options)?));
            }
            SqlValue::Map {
                key: (**key).clone(),
                value: (**value).clone(),
                entries,
            }
        }
        TypeSignature::Row(fields) => {
            let items = raw.as_array().ok_or_else(|| fail("expected a list"))?;
            if items.len() != fields.len() {
                return Err(fail(&format!(
                    "expected {} fields, found {}",
                    fields.len(),
                    items.len()
                )));
            }
            let values = fields
                .iter()
                .zip(items)
                .map(|(field, item)| decode_value(&field.signature, item, options))
                .collect::<Result<Vec<_>, _>>()?;
            SqlValue::Row {
                fields: fields.clone(),
                values,
            }
        }
    };

    Ok(value)
}

/// Decode a map key, which is always a JSON object key string on the wire.
fn decode_map_key(
    signature: &TypeSignature,
    key: &str,
    options: &DecodeOptions,
) -> Result<SqlValue, TypeError> {
    let raw = if travels_as_string(signature) {
        Value::String(key.to_string())
    } else {
        serde_json::from_str(key).unwrap_or_else(|_| Value::String(key.to_string()))
    };
    if raw.is_null() {
        return Err(TypeError::decode(signature, &raw, "map keys cannot be null"));
    }
    decode_value(signature, &raw, options)
}

/// Whether the JSON form of `signature` is a string.
pub(crate) fn travels_as_string(signature: &TypeSignature) -> bool {
    signature.is_string_like()
        || matches!(
            signature,
            TypeSignature::Decimal { .. }
                | TypeSignature::Varbinary
                | TypeSignature::Json
                | TypeSignature::Uuid
                | TypeSignature::Date
                | TypeSignature::Time { .. }
                | TypeSignature::TimeWithTimeZone { .. }
                | TypeSignature::Timestamp { .. }
                | TypeSignature::TimestampWithTimeZone { .. }
        )
}

fn integer(raw: &Value) -> Option<i64> {
    raw.as_i64()
}

fn float(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => match s.as_str() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            _ => None,
        },
        _ => None,
    }
}

fn parse_decimal(text: &str) -> Option<rust_decimal::Decimal> {
    let text = text.trim();
    rust_decimal::Decimal::from_str(text)
        .or_else(|_| rust_decimal::Decimal::from_scientific(text))
        .ok()
}

/// Digits [`rust_decimal::Decimal`] always represents exactly, at any scale.
const EXACT_DECIMAL_DIGITS: usize = 28;

/// Significant digits of `[+-]digits[.digits]`, the form the coordinator
/// renders decimals in; `None` for anything else.
fn wide_decimal_digits(text: &str) -> Option<usize> {
    let unsigned = text.strip_prefix(['-', '+']).unwrap_or(text);
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let plain = !whole.is_empty()
        && whole.bytes().all(|b| b.is_ascii_digit())
        && fraction.bytes().all(|b| b.is_ascii_digit());
    plain.then(|| whole.trim_start_matches('0').len() + fraction.len())
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}

/// Split `12:00:00.000 UTC`, `12:00:00+05:30` or `12:00:00 Europe/Paris`
/// into the time and zone parts.
fn split_time_zone(text: &str) -> Option<(&str, &str)> {
    if let Some((time, zone)) = text.split_once(' ') {
        let zone = zone.trim();
        return (!zone.is_empty()).then_some((time, zone));
    }
    let at = text.find(['+', '-', 'Z'])?;
    Some((&text[..at], &text[at..]))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;

    fn decode(sig: &str, raw: Value) -> Result<SqlValue, TypeError> {
        decode_value(&TypeSignature::parse(sig).unwrap(), &raw, &DecodeOptions::default())
    }

    #[test]
    fn test_decode_scalars() {
        assert_eq!(decode("boolean", json!(true)).unwrap(), SqlValue::Bool(true));
        assert_eq!(decode("tinyint", json!(-5)).unwrap(), SqlValue::TinyInt(-5));
        assert_eq!(decode("integer", json!(42)).unwrap(), SqlValue::Int(42));
        assert_eq!(decode("bigint", json!(i64::MAX)).unwrap(), SqlValue::BigInt(i64::MAX));
        assert_eq!(decode("varchar(3)", json!("abc")).unwrap(), SqlValue::String("abc".into()));
        assert_eq!(
            decode("interval day to second", json!("2 03:04:05.000")).unwrap(),
            SqlValue::String("2 03:04:05.000".into())
        );
    }

    #[test]
    fn test_decode_integer_range_checked() {
        assert!(decode("tinyint", json!(300)).unwrap_err().is_decode_error());
        assert!(decode("integer", json!(1.5)).is_err());
        assert!(decode("bigint", json!("1")).is_err());
    }

    #[test]
    fn test_decode_special_floats() {
        match decode("double", json!("NaN")).unwrap() {
            SqlValue::Double(v) => assert!(v.is_nan()),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(decode("double", json!("-Infinity")).unwrap(), SqlValue::Double(f64::NEG_INFINITY));
        assert_eq!(decode("real", json!(1.5)).unwrap(), SqlValue::Real(1.5));
        assert!(decode("double", json!("1.5")).is_err());
    }

    #[test]
    fn test_decode_decimal_modes() {
        let sig = TypeSignature::parse("decimal(10,2)").unwrap();
        let exact = decode_value(&sig, &json!("1234.50"), &DecodeOptions::default()).unwrap();
        assert_eq!(exact, SqlValue::Decimal(rust_decimal::Decimal::new(123_450, 2)));

        let lossy = decode_value(
            &sig,
            &json!("1234.50"),
            &DecodeOptions::new().decimal_mode(DecimalMode::Double),
        )
        .unwrap();
        assert_eq!(lossy, SqlValue::Double(1234.5));
    }

    #[test]
    fn test_decode_decimal_wider_than_rust_decimal() {
        let digits = "12345678901234567890123456789012345678";
        assert_eq!(
            decode("decimal(38,0)", json!(digits)).unwrap(),
            SqlValue::WideDecimal(digits.to_string())
        );
        let scaled = "-1234567890123456789012345678.9012345678";
        assert_eq!(
            decode("decimal(38,10)", json!(scaled)).unwrap(),
            SqlValue::WideDecimal(scaled.to_string())
        );
        let tiny = "0.00000000000000000000000000000001";
        assert_eq!(
            decode("decimal(38,32)", json!(tiny)).unwrap(),
            SqlValue::WideDecimal(tiny.to_string())
        );
        assert_eq!(
            decode("decimal(38,2)", json!("0012.50")).unwrap(),
            SqlValue::Decimal(rust_decimal::Decimal::new(1250, 2))
        );
        assert!(decode("decimal(38,0)", json!("12x")).is_err());
    }

    #[test]
    fn test_decode_binary_and_json() {
        assert_eq!(
            decode("varbinary", json!("AAr/")).unwrap(),
            SqlValue::Binary(bytes::Bytes::from_static(&[0x00, 0x0a, 0xff]))
        );
        assert_eq!(
            decode("json", json!("{\"a\":[1,2]}")).unwrap(),
            SqlValue::Json(json!({"a": [1, 2]}))
        );
        assert!(decode("varbinary", json!("not base64!")).is_err());
    }

    #[test]
    fn test_decode_temporal() {
        let date = NaiveDate::from_ymd_opt(2017, 7, 10).unwrap();
        assert_eq!(decode("date", json!("2017-07-10")).unwrap(), SqlValue::Date(date));

        let ts = date.and_hms_milli_opt(1, 2, 3, 4).unwrap();
        assert_eq!(
            decode("timestamp(3)", json!("2017-07-10 01:02:03.004")).unwrap(),
            SqlValue::Timestamp(ts)
        );

        match decode("timestamp(3) with time zone", json!("2017-07-10 01:02:03.004 UTC")).unwrap() {
            SqlValue::TimestampTz(z) => {
                assert_eq!(z.local, ts);
                assert_eq!(z.zone, "UTC");
                assert_eq!(z.offset.unwrap().local_minus_utc(), 0);
            }
            other => panic!("unexpected {other:?}"),
        }

        match decode("timestamp with time zone", json!("2017-07-10 01:02:03.004 America/New_York")).unwrap() {
            SqlValue::TimestampTz(z) => {
                assert_eq!(z.zone, "America/New_York");
                assert!(z.offset.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }

        match decode("time(3) with time zone", json!("01:02:03.004+05:30")).unwrap() {
            SqlValue::TimeTz { time, offset } => {
                assert_eq!(time, NaiveTime::from_hms_milli_opt(1, 2, 3, 4).unwrap());
                assert_eq!(offset.local_minus_utc(), 19_800);
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(decode("date", json!("07/10/2017")).is_err());
    }

    #[test]
    fn test_decode_nested_arrays_with_nulls() {
        let value = decode("array(array(bigint))", json!([[1, null], null, []])).unwrap();
        let outer = value.as_array().unwrap();
        assert_eq!(outer.len(), 3);
        assert_eq!(
            outer[0].as_array().unwrap(),
            &[SqlValue::BigInt(1), SqlValue::Null]
        );
        assert!(outer[1].is_null());
        assert_eq!(outer[2].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_decode_shape_mismatch_is_error() {
        let err = decode("array(array(bigint))", json!([1, 2])).unwrap_err();
        match err {
            TypeError::Decode { signature, .. } => assert_eq!(signature, "array(bigint)"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(decode("row(a bigint, b bigint)", json!([1])).is_err());
        assert!(decode("unknown", json!(1)).is_err());
    }

    #[test]
    fn test_decode_map_null_vs_empty() {
        assert_eq!(decode("map(varchar, bigint)", Value::Null).unwrap(), SqlValue::Null);
        let empty = decode("map(varchar, bigint)", json!({})).unwrap();
        assert_eq!(empty.as_map().unwrap().len(), 0);
    }

    #[test]
    fn test_decode_map_keys() {
        let value = decode("map(integer, varchar)", json!({"2": "b", "1": "a"})).unwrap();
        let entries = value.as_map().unwrap();
        assert_eq!(entries[0].0, SqlValue::Int(2));
        assert_eq!(entries[1], (SqlValue::Int(1), SqlValue::String("a".into())));

        let value = decode("map(varchar, bigint)", json!({"123": 1})).unwrap();
        assert_eq!(value.as_map().unwrap()[0].0, SqlValue::String("123".into()));

        let value = decode("map(array(integer), boolean)", json!({"[1,2]": true})).unwrap();
        let key = &value.as_map().unwrap()[0].0;
        assert_eq!(key.as_array().unwrap(), &[SqlValue::Int(1), SqlValue::Int(2)]);
    }

    #[test]
    fn test_decode_row() {
        let value = decode("row(x bigint, y varchar)", json!([7, null])).unwrap();
        assert_eq!(value.as_row().unwrap(), &[SqlValue::BigInt(7), SqlValue::Null]);
    }
}
