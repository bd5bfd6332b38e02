//! # trino-types
//!
//! Trino type signatures, typed values and conversions.
//!
//! Result pages describe each column with a textual type signature and
//! carry cells as JSON. This crate parses the signatures
//! ([`TypeSignature`]), decodes cells into [`SqlValue`]s
//! ([`decode_value`]), converts them into Rust types ([`FromSql`]) and
//! renders Rust values as SQL literals for parameter binding ([`ToSql`],
//! [`to_sql_literal`]).
//!
//! ## Type Mappings
//!
//! | Trino Type | Rust Type |
//! |------------|-----------|
//! | `boolean` | `bool` |
//! | `tinyint` | `i8` |
//! | `smallint` | `i16` |
//! | `integer` | `i32` |
//! | `bigint` | `i64` |
//! | `real` | `f32` |
//! | `double` | `f64` |
//! | `decimal(p, s)` | `rust_decimal::Decimal` (or `f64`, see [`DecimalMode`]) |
//! | `varchar`/`char` | `String` |
//! | `varbinary` | `bytes::Bytes` |
//! | `json` | `serde_json::Value` |
//! | `uuid` | `uuid::Uuid` |
//! | `date` | `chrono::NaiveDate` |
//! | `time(p)` | `chrono::NaiveTime` |
//! | `timestamp(p)` | `chrono::NaiveDateTime` |
//! | `timestamp(p) with time zone` | [`ZonedDateTime`], `chrono::DateTime<FixedOffset>` |
//! | `array(T)` | `Vec<T>` |
//! | `map(K, V)` | `HashMap<K, V>`, `BTreeMap<K, V>`, `Vec<(K, V)>` |
//! | `row(...)` | tuples |
//!
//! Wrap any of them in `Option` to accept NULL.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod decode;
pub mod encode;
pub mod error;
pub mod from_sql;
pub mod signature;
pub mod to_sql;
pub mod value;

pub use decode::{DecimalMode, DecodeOptions, decode_value};
pub use encode::to_sql_literal;
pub use error::TypeError;
pub use from_sql::FromSql;
pub use signature::{RowField, TypeSignature};
pub use to_sql::ToSql;
pub use value::{SqlValue, ZonedDateTime};
