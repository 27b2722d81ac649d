//! Row keys identifying one row within an association.

use super::{check_arity, structural_hash, value_of, write_columns};
use crate::error::DialectResult;
use gridlink_codec::Value;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of one row inside an association.
#[derive(Debug, Clone)]
pub struct RowKey {
    table: String,
    column_names: Vec<String>,
    values: Vec<Value>,
    hash: u64,
}

impl RowKey {
    /// Creates a row key.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DialectError::InvalidKey`] if names and values differ in length.
    pub fn new(
        table: impl Into<String>,
        column_names: Vec<String>,
        values: Vec<Value>,
    ) -> DialectResult<Self> {
        let table = table.into();
        check_arity(&table, &column_names, &values)?;
        let hash = structural_hash(&[&table], &column_names, &values);
        Ok(Self {
            table,
            column_names,
            values,
            hash,
        })
    }

    /// Creates a row key from `(column, value)` pairs.
    #[must_use]
    pub fn from_pairs<K: Into<String>, V: Into<Value>>(
        table: impl Into<String>,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        let table = table.into();
        let (column_names, values): (Vec<String>, Vec<Value>) =
            pairs.into_iter().map(|(k, v)| (k.into(), v.into())).unzip();
        let hash = structural_hash(&[&table], &column_names, &values);
        Self {
            table,
            column_names,
            values,
            hash,
        }
    }

    /// Returns the association table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the row key column names.
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Returns the row key column values.
    #[must_use]
    pub fn column_values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the value of one column.
    #[must_use]
    pub fn column_value(&self, column: &str) -> Option<&Value> {
        value_of(&self.column_names, &self.values, column)
    }

    /// Iterates `(column, value)` pairs.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.column_names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl PartialEq for RowKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.table == other.table
            && self.column_names == other.column_names
            && self.values == other.values
    }
}

impl Eq for RowKey {}

impl Hash for RowKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_columns(f, &self.table, &self.column_names, &self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_and_vectors_build_equal_keys() {
        let a = RowKey::from_pairs("order_lines", [("order_id", Value::Integer(1)), ("line", Value::Integer(2))]);
        let b = RowKey::new(
            "order_lines",
            vec!["order_id".into(), "line".into()],
            vec![Value::Integer(1), Value::Integer(2)],
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn column_order_matters() {
        let a = RowKey::from_pairs("t", [("a", 1), ("b", 2)]);
        let b = RowKey::from_pairs("t", [("b", 2), ("a", 1)]);
        assert_ne!(a, b);
    }
}
