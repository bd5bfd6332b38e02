//! SQL value representation.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::signature::{RowField, TypeSignature};

/// A decoded Trino value.
///
/// Containers carry the signatures of their children so that a `Null`
/// element of an `array(bigint)` is still known to be a null `bigint`.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SqlValue {
    /// NULL value of any type.
    Null,
    /// `boolean`
    Bool(bool),
    /// `tinyint`
    TinyInt(i8),
    /// `smallint`
    SmallInt(i16),
    /// `integer`
    Int(i32),
    /// `bigint`
    BigInt(i64),
    /// `real`
    Real(f32),
    /// `double`
    Double(f64),
    /// `decimal(p, s)`
    Decimal(rust_decimal::Decimal),
    /// `decimal(p, s)` with more digits than [`rust_decimal::Decimal`] holds,
    /// kept as its exact decimal text.
    WideDecimal(String),
    /// `varchar`, `char`, `ipaddress` and interval types.
    String(String),
    /// `varbinary`
    Binary(Bytes),
    /// `json`
    Json(serde_json::Value),
    /// `uuid`
    Uuid(uuid::Uuid),
    /// `date`
    Date(NaiveDate),
    /// `time(p)`
    Time(NaiveTime),
    /// `time(p) with time zone`
    TimeTz {
        /// Local wall-clock time.
        time: NaiveTime,
        /// Offset from UTC.
        offset: FixedOffset,
    },
    /// `timestamp(p)`
    Timestamp(NaiveDateTime),
    /// `timestamp(p) with time zone`
    TimestampTz(ZonedDateTime),
    /// `array(T)`
    Array {
        /// Signature of every element.
        element: TypeSignature,
        /// Elements in wire order.
        values: Vec<SqlValue>,
    },
    /// `map(K, V)`
    Map {
        /// Key signature.
        key: TypeSignature,
        /// Value signature.
        value: TypeSignature,
        /// Entries in wire order.
        entries: Vec<(SqlValue, SqlValue)>,
    },
    /// `row(...)`
    Row {
        /// Field descriptors.
        fields: Vec<RowField>,
        /// Field values, one per descriptor.
        values: Vec<SqlValue>,
    },
}

/// A timestamp tagged with the zone the engine reported it in.
///
/// Named zones such as `Europe/Paris` are kept by name; `offset` is only
/// known when the zone was numeric or one of `UTC`, `Z` and `GMT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ZonedDateTime {
    /// Wall-clock time in `zone`.
    pub local: NaiveDateTime,
    /// Zone text as received, e.g. `UTC`, `+05:30` or `America/New_York`.
    pub zone: String,
    /// Offset from UTC, if it could be derived from `zone`.
    pub offset: Option<FixedOffset>,
}

impl ZonedDateTime {
    /// Build from a wall-clock time and zone text.
    pub fn new(local: NaiveDateTime, zone: impl Into<String>) -> Self {
        let zone = zone.into();
        let offset = parse_fixed_offset(&zone);
        Self {
            local,
            zone,
            offset,
        }
    }

    /// Convert to a `DateTime<FixedOffset>` if the offset is known.
    #[must_use]
    pub fn to_fixed_offset(&self) -> Option<DateTime<FixedOffset>> {
        let offset = self.offset?;
        self.local.and_local_timezone(offset).single()
    }
}

impl fmt::Display for ZonedDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", format_timestamp(&self.local), self.zone)
    }
}

impl From<DateTime<FixedOffset>> for ZonedDateTime {
    fn from(value: DateTime<FixedOffset>) -> Self {
        let offset = *value.offset();
        Self {
            local: value.naive_local(),
            zone: format_offset(offset),
            offset: Some(offset),
        }
    }
}

impl From<DateTime<Utc>> for ZonedDateTime {
    fn from(value: DateTime<Utc>) -> Self {
        Self {
            local: value.naive_utc(),
            zone: "UTC".to_string(),
            offset: FixedOffset::east_opt(0),
        }
    }
}

/// Parse `UTC`, `Z`, `GMT`, `+05:30`, `-0800` or `+05` into an offset.
pub(crate) fn parse_fixed_offset(zone: &str) -> Option<FixedOffset> {
    match zone {
        "UTC" | "Z" | "GMT" | "Etc/UTC" => return FixedOffset::east_opt(0),
        _ => {}
    }
    let (sign, rest) = match zone.as_bytes().first()? {
        b'+' => (1, &zone[1..]),
        b'-' => (-1, &zone[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Render an offset as `+HH:MM`.
pub(crate) fn format_offset(offset: FixedOffset) -> String {
    let seconds = offset.local_minus_utc();
    let sign = if seconds < 0 { '-' } else { '+' };
    let seconds = seconds.abs();
    format!("{sign}{:02}:{:02}", seconds / 3600, (seconds % 3600) / 60)
}

pub(crate) fn format_time(time: &NaiveTime) -> String {
    time.format("%H:%M:%S%.f").to_string()
}

pub(crate) fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()
}

impl SqlValue {
    /// Check if the value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the value as a bool, if it is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as an i64, if it is an integer of any width.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::BigInt(v) => Some(*v),
            Self::Int(v) => Some(i64::from(*v)),
            Self::SmallInt(v) => Some(i64::from(*v)),
            Self::TinyInt(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// Get the value as an f64, if it is a floating point number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            Self::Real(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    /// Get the value as a string slice, if it is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Get the value as bytes, if it is binary.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(v) => Some(v),
            _ => None,
        }
    }

    /// Get array elements, if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[SqlValue]> {
        match self {
            Self::Array { values, .. } => Some(values),
            _ => None,
        }
    }

    /// Get map entries in wire order, if this is a map.
    #[must_use]
    pub fn as_map(&self) -> Option<&[(SqlValue, SqlValue)]> {
        match self {
            Self::Map { entries, .. } => Some(entries),
            _ => None,
        }
    }

    /// Get row field values, if this is a row.
    #[must_use]
    pub fn as_row(&self) -> Option<&[SqlValue]> {
        match self {
            Self::Row { values, .. } => Some(values),
            _ => None,
        }
    }

    /// Get the type name as a string.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::TinyInt(_) => "tinyint",
            Self::SmallInt(_) => "smallint",
            Self::Int(_) => "integer",
            Self::BigInt(_) => "bigint",
            Self::Real(_) => "real",
            Self::Double(_) => "double",
            Self::Decimal(_) | Self::WideDecimal(_) => "decimal",
            Self::String(_) => "varchar",
            Self::Binary(_) => "varbinary",
            Self::Json(_) => "json",
            Self::Uuid(_) => "uuid",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::TimeTz { .. } => "time with time zone",
            Self::Timestamp(_) => "timestamp",
            Self::TimestampTz(_) => "timestamp with time zone",
            Self::Array { .. } => "array",
            Self::Map { .. } => "map",
            Self::Row { .. } => "row",
        }
    }
}

impl Default for SqlValue {
    fn default() -> Self {
        Self::Null
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from_scalar! {
    bool => Bool,
    i8 => TinyInt,
    i16 => SmallInt,
    i32 => Int,
    i64 => BigInt,
    f32 => Real,
    f64 => Double,
    String => String,
    Bytes => Binary,
    rust_decimal::Decimal => Decimal,
    uuid::Uuid => Uuid,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    ZonedDateTime => TimestampTz,
    serde_json::Value => Json,
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(v))
    }
}

impl From<DateTime<FixedOffset>> for SqlValue {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Self::TimestampTz(v.into())
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::TimestampTz(v.into())
    }
}

impl<T> From<Option<T>> for SqlValue
where
    T: Into<SqlValue>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}
