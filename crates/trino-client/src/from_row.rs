//! FromRow trait for automatic row-to-struct mapping.
//!
//! Implement [`FromRow`] for your own types, or use the tuple impls for
//! ad-hoc queries:
//!
//! ```rust,ignore
//! let (name, population): (String, i64) = row.into_typed()?;
//! ```

use trino_types::FromSql;

use crate::error::Error;
use crate::row::Row;

/// Trait for types that can be constructed from a result row.
///
/// # Example
///
/// ```rust
/// use trino_client::{Error, FromRow, Row};
///
/// struct Nation {
///     key: i64,
///     name: String,
/// }
///
/// impl FromRow for Nation {
///     fn from_row(row: &Row) -> Result<Self, Error> {
///         Ok(Self {
///             key: row.get_by_name("nationkey")?,
///             name: row.get_by_name("name")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    /// Construct an instance of this type from a result row.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A required column is missing
    /// - A column value cannot be converted to the expected Rust type
    /// - Any other mapping error occurs
    fn from_row(row: &Row) -> Result<Self, Error>;
}

impl Row {
    /// Convert this row with [`FromRow`].
    ///
    /// # Errors
    ///
    /// See [`FromRow::from_row`].
    pub fn into_typed<T: FromRow>(&self) -> Result<T, Error> {
        T::from_row(self)
    }
}

macro_rules! impl_from_row_tuple {
    ($($name:ident: $idx:tt),+) => {
        impl<$($name: FromSql),+> FromRow for ($($name,)+) {
            fn from_row(row: &Row) -> Result<Self, Error> {
                Ok(($(row.get::<$name>($idx)?,)+))
            }
        }
    };
}

impl_from_row_tuple!(A: 0);
impl_from_row_tuple!(A: 0, B: 1);
impl_from_row_tuple!(A: 0, B: 1, C: 2);
impl_from_row_tuple!(A: 0, B: 1, C: 2, D: 3);
impl_from_row_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_from_row_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

/// Extension trait for iterating over query results as typed structs.
///
/// This trait is automatically implemented for any iterator of `Result<Row, Error>`.
pub trait RowIteratorExt: Iterator<Item = Result<Row, Error>> + Sized {
    /// Map each row to a struct implementing `FromRow`.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use trino_client::RowIteratorExt;
    ///
    /// let nations: Vec<(i64, String)> = client
    ///     .query("SELECT nationkey, name FROM tpch.tiny.nation", &[])
    ///     .await?
    ///     .collect_all()
    ///     .await?
    ///     .into_iter()
    ///     .map(Ok)
    ///     .map_rows::<(i64, String)>()
    ///     .collect::<Result<Vec<_>, _>>()?;
    /// ```
    fn map_rows<T: FromRow>(self) -> MapRows<Self, T>;
}

impl<I: Iterator<Item = Result<Row, Error>>> RowIteratorExt for I {
    fn map_rows<T: FromRow>(self) -> MapRows<Self, T> {
        MapRows {
            inner: self,
            _marker: std::marker::PhantomData,
        }
    }
}

/// Iterator adapter that maps rows to typed structs.
pub struct MapRows<I, T> {
    inner: I,
    _marker: std::marker::PhantomData<T>,
}

impl<I, T> Iterator for MapRows<I, T>
where
    I: Iterator<Item = Result<Row, Error>>,
    T: FromRow,
{
    type Item = Result<T, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|result| result.and_then(|row| T::from_row(&row)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
