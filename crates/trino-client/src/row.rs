//! Row representation for query results.
//!
//! Cells arrive as JSON and are decoded into [`SqlValue`]s against their
//! column's [`TypeSignature`] when the row is handed out, one row at a
//! time. Column descriptors are shared by every row of a result set.
//!
//! ## Access Patterns
//!
//! - `get::<T>()` - converts with [`FromSql::from_sql`]; NULL is an error
//! - `get_opt::<T>()` - NULL becomes `None`
//! - `get_or_default::<T>()` - NULL becomes `T::default()`
//! - `try_get::<T>()` - any failure becomes `None`
//! - `get_raw()` - the decoded [`SqlValue`]

use std::sync::Arc;

use serde_json::Value;
use trino_protocol::ProtocolError;
use trino_types::{DecodeOptions, FromSql, SqlValue, TypeError, TypeSignature, decode_value};

use crate::error::Result;

/// Column metadata describing a result set column.
///
/// This struct is marked `#[non_exhaustive]` to allow adding new fields
/// in future versions without breaking semver compatibility. Use
/// [`Column::new()`] to construct instances.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Column index (0-based).
    pub index: usize,
    /// Type signature as sent by the coordinator, e.g. `array(varchar)`.
    pub type_name: String,
    /// Parsed type signature.
    pub signature: TypeSignature,
}

impl Column {
    /// Create a column, parsing its type signature.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::InvalidSignature`] if `type_name` does not parse.
    pub fn new(
        name: impl Into<String>,
        index: usize,
        type_name: impl Into<String>,
    ) -> std::result::Result<Self, TypeError> {
        let type_name = type_name.into();
        let signature = TypeSignature::parse(&type_name)?;
        Ok(Self {
            name: name.into(),
            index,
            type_name,
            signature,
        })
    }
}

/// A row from a query result.
#[derive(Clone)]
pub struct Row {
    columns: Arc<[Column]>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Create a row from already decoded values.
    #[must_use]
    pub fn new(columns: Arc<[Column]>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    /// Decode one wire row against its columns.
    pub(crate) fn decode(
        columns: Arc<[Column]>,
        cells: Vec<Value>,
        options: &DecodeOptions,
    ) -> Result<Self> {
        if cells.len() != columns.len() {
            return Err(ProtocolError::RowWidth {
                expected: columns.len(),
                actual: cells.len(),
            }
            .into());
        }
        let values = columns
            .iter()
            .zip(&cells)
            .map(|(column, cell)| decode_value(&column.signature, cell, options))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { columns, values })
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    fn value(&self, index: usize) -> std::result::Result<&SqlValue, TypeError> {
        self.values.get(index).ok_or_else(|| TypeError::TypeMismatch {
            expected: "valid column index",
            actual: format!("index {index} out of bounds"),
        })
    }

    fn index_of(&self, name: &str) -> std::result::Result<usize, TypeError> {
        self.find(name).ok_or_else(|| TypeError::TypeMismatch {
            expected: "valid column name",
            actual: format!("column '{name}' not found"),
        })
    }

    /// Get a value by column index with type conversion.
    ///
    /// NULL is an error; use [`Row::get_opt`] for nullable columns.
    pub fn get<T: FromSql>(&self, index: usize) -> std::result::Result<T, TypeError> {
        T::from_sql(self.value(index)?)
    }

    /// Get a value by column name (case-insensitive) with type conversion.
    pub fn get_by_name<T: FromSql>(&self, name: &str) -> std::result::Result<T, TypeError> {
        self.get(self.index_of(name)?)
    }

    /// Get a nullable value by column index.
    pub fn get_opt<T: FromSql>(&self, index: usize) -> std::result::Result<Option<T>, TypeError> {
        T::from_sql_nullable(self.value(index)?)
    }

    /// Get a nullable value by column name.
    pub fn get_opt_by_name<T: FromSql>(
        &self,
        name: &str,
    ) -> std::result::Result<Option<T>, TypeError> {
        self.get_opt(self.index_of(name)?)
    }

    /// Get a value by column index, substituting the default for NULL.
    pub fn get_or_default<T: FromSql + Default>(
        &self,
        index: usize,
    ) -> std::result::Result<T, TypeError> {
        T::from_sql_or_default(self.value(index)?)
    }

    /// Try to get a value by column index, returning None if NULL, not
    /// found or not convertible.
    pub fn try_get<T: FromSql>(&self, index: usize) -> Option<T> {
        self.values
            .get(index)
            .and_then(|v| T::from_sql_nullable(v).ok().flatten())
    }

    /// Try to get a value by column name, returning None if NULL or not found.
    pub fn try_get_by_name<T: FromSql>(&self, name: &str) -> Option<T> {
        self.try_get(self.find(name)?)
    }

    /// Get the decoded value by index.
    #[must_use]
    pub fn get_raw(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// Get the decoded value by column name.
    #[must_use]
    pub fn get_raw_by_name(&self, name: &str) -> Option<&SqlValue> {
        self.get_raw(self.find(name)?)
    }

    /// Get the number of columns in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the column metadata.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Check if a column value is NULL. Out-of-range indexes count as NULL.
    #[must_use]
    pub fn is_null(&self, index: usize) -> bool {
        self.values.get(index).is_none_or(SqlValue::is_null)
    }

    /// Check if a column value is NULL by name.
    #[must_use]
    pub fn is_null_by_name(&self, name: &str) -> bool {
        self.find(name).is_none_or(|i| self.is_null(i))
    }

    /// All decoded values.
    #[must_use]
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Take the decoded values.
    #[must_use]
    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}

impl std::fmt::Debug for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (column, value) in self.columns.iter().zip(&self.values) {
            map.entry(&column.name, value);
        }
        map.finish()
    }
}
