//! Trino type signatures.
//!
//! The coordinator describes every result column with a textual type such as
//! `bigint`, `decimal(10,2)`, `timestamp(3) with time zone` or
//! `array(map(varchar, integer))`. [`TypeSignature`] is the parsed,
//! recursive form of that text; the decoder walks it structurally.

use std::fmt;
use std::str::FromStr;

use crate::error::TypeError;

/// Default precision of an unparameterized `decimal`.
pub const DEFAULT_DECIMAL_PRECISION: u32 = 38;

/// Largest precision a `decimal` can declare.
pub const MAX_DECIMAL_PRECISION: u32 = 38;

/// A parsed Trino type signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum TypeSignature {
    /// `boolean`
    Boolean,
    /// `tinyint`
    TinyInt,
    /// `smallint`
    SmallInt,
    /// `integer`
    Integer,
    /// `bigint`
    BigInt,
    /// `real`
    Real,
    /// `double`
    Double,
    /// `decimal(precision, scale)`
    Decimal {
        /// Total number of digits.
        precision: u32,
        /// Digits after the decimal point.
        scale: u32,
    },
    /// `varchar` or `varchar(n)`
    Varchar(Option<u32>),
    /// `char(n)`
    Char(u32),
    /// `varbinary`
    Varbinary,
    /// `json`
    Json,
    /// `uuid`
    Uuid,
    /// `ipaddress`
    IpAddress,
    /// `date`
    Date,
    /// `time` or `time(p)`
    Time {
        /// Fractional second precision, if declared.
        precision: Option<u32>,
    },
    /// `time(p) with time zone`
    TimeWithTimeZone {
        /// Fractional second precision, if declared.
        precision: Option<u32>,
    },
    /// `timestamp` or `timestamp(p)`
    Timestamp {
        /// Fractional second precision, if declared.
        precision: Option<u32>,
    },
    /// `timestamp(p) with time zone`
    TimestampWithTimeZone {
        /// Fractional second precision, if declared.
        precision: Option<u32>,
    },
    /// `interval day to second`
    IntervalDayToSecond,
    /// `interval year to month`
    IntervalYearToMonth,
    /// `unknown`, the type of a bare `NULL` literal.
    Unknown,
    /// `array(T)`
    Array(Box<TypeSignature>),
    /// `map(K, V)`
    Map(Box<TypeSignature>, Box<TypeSignature>),
    /// `row(name T, ...)`
    Row(Vec<RowField>),
}

/// One field of a `row(...)` type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowField {
    /// Field name; anonymous fields have none.
    pub name: Option<String>,
    /// Field type.
    pub signature: TypeSignature,
}

impl RowField {
    /// Create a named row field.
    pub fn named(name: impl Into<String>, signature: TypeSignature) -> Self {
        Self {
            name: Some(name.into()),
            signature,
        }
    }

    /// Create an anonymous row field.
    #[must_use]
    pub fn anonymous(signature: TypeSignature) -> Self {
        Self {
            name: None,
            signature,
        }
    }
}

impl TypeSignature {
    /// Parse a signature string as reported by the coordinator.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::InvalidSignature`] for malformed text or
    /// unknown type names.
    pub fn parse(text: &str) -> Result<Self, TypeError> {
        let mut parser = Parser::new(text);
        let signature = parser
            .parse_type()
            .map_err(|reason| TypeError::signature(text, reason))?;
        parser.skip_ws();
        if !parser.at_end() {
            return Err(TypeError::signature(
                text,
                format!("unexpected trailing input at offset {}", parser.pos),
            ));
        }
        Ok(signature)
    }

    /// Shorthand for `array(element)`.
    #[must_use]
    pub fn array(element: TypeSignature) -> Self {
        Self::Array(Box::new(element))
    }

    /// Shorthand for `map(key, value)`.
    #[must_use]
    pub fn map(key: TypeSignature, value: TypeSignature) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    /// The head token of the signature, e.g. `array` for `array(bigint)`.
    #[must_use]
    pub fn base_name(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::TinyInt => "tinyint",
            Self::SmallInt => "smallint",
            Self::Integer => "integer",
            Self::BigInt => "bigint",
            Self::Real => "real",
            Self::Double => "double",
            Self::Decimal { .. } => "decimal",
            Self::Varchar(_) => "varchar",
            Self::Char(_) => "char",
            Self::Varbinary => "varbinary",
            Self::Json => "json",
            Self::Uuid => "uuid",
            Self::IpAddress => "ipaddress",
            Self::Date => "date",
            Self::Time { .. } => "time",
            Self::TimeWithTimeZone { .. } => "time with time zone",
            Self::Timestamp { .. } => "timestamp",
            Self::TimestampWithTimeZone { .. } => "timestamp with time zone",
            Self::IntervalDayToSecond => "interval day to second",
            Self::IntervalYearToMonth => "interval year to month",
            Self::Unknown => "unknown",
            Self::Array(_) => "array",
            Self::Map(_, _) => "map",
            Self::Row(_) => "row",
        }
    }

    /// Whether values of this type travel as plain JSON strings that are
    /// used verbatim.
    #[must_use]
    pub fn is_string_like(&self) -> bool {
        matches!(
            self,
            Self::Varchar(_)
                | Self::Char(_)
                | Self::IpAddress
                | Self::IntervalDayToSecond
                | Self::IntervalYearToMonth
        )
    }

    /// Whether this is a container type (`array`, `map` or `row`).
    #[must_use]
    pub fn is_nested(&self) -> bool {
        matches!(self, Self::Array(_) | Self::Map(_, _) | Self::Row(_))
    }

    /// Nesting depth: 0 for scalars, 1 for `array(bigint)`, and so on.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Array(element) => 1 + element.depth(),
            Self::Map(key, value) => 1 + key.depth().max(value.depth()),
            Self::Row(fields) => {
                1 + fields
                    .iter()
                    .map(|f| f.signature.depth())
                    .max()
                    .unwrap_or(0)
            }
            _ => 0,
        }
    }
}

impl FromStr for TypeSignature {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn write_precision(f: &mut fmt::Formatter<'_>, name: &str, precision: Option<u32>) -> fmt::Result {
    match precision {
        Some(p) => write!(f, "{name}({p})"),
        None => f.write_str(name),
    }
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decimal { precision, scale } => write!(f, "decimal({precision},{scale})"),
            Self::Varchar(length) => write_precision(f, "varchar", *length),
            Self::Char(length) => write!(f, "char({length})"),
            Self::Time { precision } => write_precision(f, "time", *precision),
            Self::TimeWithTimeZone { precision } => {
                write_precision(f, "time", *precision)?;
                f.write_str(" with time zone")
            }
            Self::Timestamp { precision } => write_precision(f, "timestamp", *precision),
            Self::TimestampWithTimeZone { precision } => {
                write_precision(f, "timestamp", *precision)?;
                f.write_str(" with time zone")
            }
            Self::Array(element) => write!(f, "array({element})"),
            Self::Map(key, value) => write!(f, "map({key}, {value})"),
            Self::Row(fields) => {
                f.write_str("row(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match &field.name {
                        Some(name) if is_plain_identifier(name) => write!(f, "{name} ")?,
                        Some(name) => write!(f, "\"{}\" ", name.replace('"', "\"\""))?,
                        None => {}
                    }
                    write!(f, "{}", field.signature)?;
                }
                f.write_str(")")
            }
            other => f.write_str(other.base_name()),
        }
    }
}

/// Recursive-descent parser over the raw signature text.
struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.input.len() - trimmed.len();
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), String> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(match self.peek() {
                Some(found) => format!("expected '{expected}' at offset {}, found '{found}'", self.pos),
                None => format!("expected '{expected}', found end of input"),
            })
        }
    }

    fn identifier(&mut self) -> Result<String, String> {
        self.skip_ws();
        let len = self
            .rest()
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(self.rest().len());
        if len == 0 {
            return Err(match self.peek() {
                Some(found) => format!("expected a type name at offset {}, found '{found}'", self.pos),
                None => "expected a type name, found end of input".to_string(),
            });
        }
        let ident = &self.rest()[..len];
        self.pos += len;
        Ok(ident.to_ascii_lowercase())
    }

    fn keyword(&mut self, word: &str) -> Result<(), String> {
        let found = self.identifier()?;
        if found == word {
            Ok(())
        } else {
            Err(format!("expected '{word}', found '{found}'"))
        }
    }

    /// Peek at the next word without consuming it.
    fn peek_word(&mut self) -> Option<String> {
        let saved = self.pos;
        let word = self.identifier().ok();
        self.pos = saved;
        word
    }

    fn number(&mut self) -> Result<u32, String> {
        self.skip_ws();
        let len = self
            .rest()
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.rest().len());
        if len == 0 {
            return Err(format!("expected a number at offset {}", self.pos));
        }
        let digits = &self.rest()[..len];
        self.pos += len;
        digits
            .parse()
            .map_err(|_| format!("number {digits} is out of range"))
    }

    fn optional_precision(&mut self) -> Result<Option<u32>, String> {
        if self.eat('(') {
            let value = self.number()?;
            self.expect(')')?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    /// Consume a trailing `with time zone` / `without time zone` clause.
    fn time_zone_suffix(&mut self) -> Result<bool, String> {
        match self.peek_word().as_deref() {
            Some("with") => {
                self.keyword("with")?;
                self.keyword("time")?;
                self.keyword("zone")?;
                Ok(true)
            }
            Some("without") => {
                self.keyword("without")?;
                self.keyword("time")?;
                self.keyword("zone")?;
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    fn parse_type(&mut self) -> Result<TypeSignature, String> {
        let name = self.identifier()?;
        let signature = match name.as_str() {
            "boolean" => TypeSignature::Boolean,
            "tinyint" => TypeSignature::TinyInt,
            "smallint" => TypeSignature::SmallInt,
            "integer" | "int" => TypeSignature::Integer,
            "bigint" => TypeSignature::BigInt,
            "real" => TypeSignature::Real,
            "double" => TypeSignature::Double,
            "decimal" => {
                let (precision, scale) = if self.eat('(') {
                    let precision = self.number()?;
                    let scale = if self.eat(',') { self.number()? } else { 0 };
                    self.expect(')')?;
                    (precision, scale)
                } else {
                    (DEFAULT_DECIMAL_PRECISION, 0)
                };
                if precision == 0 || precision > MAX_DECIMAL_PRECISION {
                    return Err(format!("decimal precision {precision} out of range"));
                }
                if scale > precision {
                    return Err(format!("decimal scale {scale} exceeds precision {precision}"));
                }
                TypeSignature::Decimal { precision, scale }
            }
            "varchar" => TypeSignature::Varchar(self.optional_precision()?),
            "char" => TypeSignature::Char(self.optional_precision()?.unwrap_or(1)),
            "varbinary" => TypeSignature::Varbinary,
            "json" => TypeSignature::Json,
            "uuid" => TypeSignature::Uuid,
            "ipaddress" => TypeSignature::IpAddress,
            "date" => TypeSignature::Date,
            "time" => {
                let precision = self.optional_precision()?;
                if self.time_zone_suffix()? {
                    TypeSignature::TimeWithTimeZone { precision }
                } else {
                    TypeSignature::Time { precision }
                }
            }
            "timestamp" => {
                let precision = self.optional_precision()?;
                if self.time_zone_suffix()? {
                    TypeSignature::TimestampWithTimeZone { precision }
                } else {
                    TypeSignature::Timestamp { precision }
                }
            }
            "interval" => {
                let from = self.identifier()?;
                self.keyword("to")?;
                let to = self.identifier()?;
                match (from.as_str(), to.as_str()) {
                    ("day", "second") => TypeSignature::IntervalDayToSecond,
                    ("year", "month") => TypeSignature::IntervalYearToMonth,
                    _ => return Err(format!("unknown interval type 'interval {from} to {to}'")),
                }
            }
            "unknown" => TypeSignature::Unknown,
            "array" => {
                self.expect('(')?;
                let element = self.parse_type()?;
                self.expect(')')?;
                TypeSignature::array(element)
            }
            "map" => {
                self.expect('(')?;
                let key = self.parse_type()?;
                self.expect(',')?;
                let value = self.parse_type()?;
                self.expect(')')?;
                TypeSignature::map(key, value)
            }
            "row" => {
                self.expect('(')?;
                let mut fields = vec![self.parse_row_field()?];
                while self.eat(',') {
                    fields.push(self.parse_row_field()?);
                }
                self.expect(')')?;
                TypeSignature::Row(fields)
            }
            other => return Err(format!("unknown type '{other}'")),
        };
        Ok(signature)
    }

    fn quoted_name(&mut self) -> Result<String, String> {
        // Opening quote already consumed.
        let mut name = String::new();
        let mut chars = self.rest().char_indices();
        while let Some((i, c)) = chars.next() {
            if c == '"' {
                if self.rest()[i + 1..].starts_with('"') {
                    name.push('"');
                    chars.next();
                    continue;
                }
                self.pos += i + 1;
                return Ok(name);
            }
            name.push(c);
        }
        Err("unterminated quoted row field name".to_string())
    }

    fn parse_row_field(&mut self) -> Result<RowField, String> {
        if self.eat('"') {
            let name = self.quoted_name()?;
            let signature = self.parse_type()?;
            return Ok(RowField::named(name, signature));
        }

        let start = self.pos;
        let first = self.identifier()?;
        self.skip_ws();
        let next_is_delimiter = matches!(self.peek(), None | Some(',' | ')' | '('));
        let is_multi_word_type = matches!(
            (first.as_str(), self.peek_word().as_deref()),
            ("time" | "timestamp", Some("with" | "without")) | ("interval", Some("day" | "year"))
        );

        self.pos = start;
        if next_is_delimiter || is_multi_word_type {
            return Ok(RowField::anonymous(self.parse_type()?));
        }

        // `name type`: keep the field name's original case.
        self.skip_ws();
        let name_start = self.pos;
        self.identifier()?;
        let name = self.input[name_start..self.pos].to_string();
        let signature = self.parse_type()?;
        Ok(RowField::named(name, signature))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalars() {
        assert_eq!(TypeSignature::parse("bigint").unwrap(), TypeSignature::BigInt);
        assert_eq!(TypeSignature::parse("VARCHAR").unwrap(), TypeSignature::Varchar(None));
        assert_eq!(
            TypeSignature::parse("varchar(25)").unwrap(),
            TypeSignature::Varchar(Some(25))
        );
        assert_eq!(TypeSignature::parse("char(3)").unwrap(), TypeSignature::Char(3));
        assert_eq!(
            TypeSignature::parse("decimal(12, 2)").unwrap(),
            TypeSignature::Decimal {
                precision: 12,
                scale: 2
            }
        );
    }

    #[test]
    fn test_parse_temporal() {
        assert_eq!(
            TypeSignature::parse("timestamp(3) with time zone").unwrap(),
            TypeSignature::TimestampWithTimeZone { precision: Some(3) }
        );
        assert_eq!(
            TypeSignature::parse("timestamp").unwrap(),
            TypeSignature::Timestamp { precision: None }
        );
        assert_eq!(
            TypeSignature::parse("time(6)").unwrap(),
            TypeSignature::Time { precision: Some(6) }
        );
        assert_eq!(
            TypeSignature::parse("interval day to second").unwrap(),
            TypeSignature::IntervalDayToSecond
        );
    }

    #[test]
    fn test_parse_nested() {
        let sig = TypeSignature::parse("array(map(varchar,integer))").unwrap();
        assert_eq!(
            sig,
            TypeSignature::array(TypeSignature::map(
                TypeSignature::Varchar(None),
                TypeSignature::Integer
            ))
        );
        assert_eq!(sig.depth(), 2);

        let deep = TypeSignature::parse("array(array(array(double)))").unwrap();
        assert_eq!(deep.depth(), 3);
    }

    #[test]
    fn test_parse_row() {
        let sig = TypeSignature::parse(r#"row(x bigint, "y z" varchar(3), timestamp(3) with time zone)"#)
            .unwrap();
        match sig {
            TypeSignature::Row(fields) => {
                assert_eq!(fields.len(), 3);
                assert_eq!(fields[0].name.as_deref(), Some("x"));
                assert_eq!(fields[1].name.as_deref(), Some("y z"));
                assert_eq!(fields[1].signature, TypeSignature::Varchar(Some(3)));
                assert_eq!(fields[2].name, None);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_display_round_trips() {
        for text in [
            "bigint",
            "decimal(10,2)",
            "varchar(25)",
            "array(map(varchar, integer))",
            "map(array(integer), array(integer))",
            "timestamp(3) with time zone",
            "row(x bigint, \"y z\" varchar)",
            "interval year to month",
        ] {
            let sig = TypeSignature::parse(text).unwrap();
            assert_eq!(sig.to_string(), text);
            assert_eq!(TypeSignature::parse(&sig.to_string()).unwrap(), sig);
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for text in [
            "",
            "array(",
            "array(bigint",
            "map(varchar)",
            "frobnicate",
            "bigint bigint",
            "decimal(0,0)",
            "decimal(5,6)",
            "interval hour to day",
        ] {
            let err = TypeSignature::parse(text).unwrap_err();
            assert!(
                matches!(err, TypeError::InvalidSignature { .. }),
                "{text:?} should be rejected"
            );
        }
    }
}
