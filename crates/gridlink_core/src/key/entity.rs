//! Entity keys.

use super::{check_arity, structural_hash, value_of, write_columns};
use crate::error::DialectResult;
use gridlink_codec::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Table and id column layout shared by every key of one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKeyMetadata {
    table: String,
    column_names: Vec<String>,
}

impl EntityKeyMetadata {
    /// Creates metadata for `table` identified by `column_names`.
    #[must_use]
    pub fn new<S: Into<String>>(table: impl Into<String>, column_names: impl IntoIterator<Item = S>) -> Self {
        Self {
            table: table.into(),
            column_names: column_names.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the id column names.
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Whether `column` is one of the id columns.
    #[must_use]
    pub fn is_key_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }
}

/// Identity of one stored record.
#[derive(Debug, Clone)]
pub struct EntityKey {
    metadata: Arc<EntityKeyMetadata>,
    values: Vec<Value>,
    hash: u64,
}

impl EntityKey {
    /// Creates a key from shared metadata and the id column values.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DialectError::InvalidKey`] if the number of values does
    /// not match the number of id columns.
    pub fn new(metadata: Arc<EntityKeyMetadata>, values: Vec<Value>) -> DialectResult<Self> {
        check_arity(metadata.table(), metadata.column_names(), &values)?;
        let hash = structural_hash(&[metadata.table()], metadata.column_names(), &values);
        Ok(Self {
            metadata,
            values,
            hash,
        })
    }

    /// Creates a key for a table with a single id column.
    #[must_use]
    pub fn single(table: &str, column: &str, value: impl Into<Value>) -> Self {
        let metadata = Arc::new(EntityKeyMetadata::new(table, [column]));
        let values = vec![value.into()];
        let hash = structural_hash(&[table], metadata.column_names(), &values);
        Self {
            metadata,
            values,
            hash,
        }
    }

    /// Returns the shared metadata.
    #[must_use]
    pub fn metadata(&self) -> &Arc<EntityKeyMetadata> {
        &self.metadata
    }

    /// Returns the table name.
    #[must_use]
    pub fn table(&self) -> &str {
        self.metadata.table()
    }

    /// Returns the id column names.
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        self.metadata.column_names()
    }

    /// Returns the id column values, parallel to [`column_names`](Self::column_names).
    #[must_use]
    pub fn column_values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the value of one id column.
    #[must_use]
    pub fn column_value(&self, column: &str) -> Option<&Value> {
        value_of(self.column_names(), &self.values, column)
    }

    /// Iterates `(column, value)` pairs.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.column_names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl PartialEq for EntityKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && (Arc::ptr_eq(&self.metadata, &other.metadata) || self.metadata == other.metadata)
            && self.values == other.values
    }
}

impl Eq for EntityKey {}

impl Hash for EntityKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_columns(f, self.table(), self.column_names(), &self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::collections::HashSet;

    fn hash_of(key: &EntityKey) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn keys_from_separate_metadata_are_equal() {
        let a = EntityKey::new(
            Arc::new(EntityKeyMetadata::new("orders", ["id", "region"])),
            vec![Value::Integer(1), Value::from("eu")],
        )
        .unwrap();
        let b = EntityKey::new(
            Arc::new(EntityKeyMetadata::new("orders", ["id", "region"])),
            vec![Value::Integer(1), Value::from("eu")],
        )
        .unwrap();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn different_column_sets_are_never_equal() {
        let a = EntityKey::single("orders", "id", 1);
        let b = EntityKey::single("orders", "order_id", 1);
        let c = EntityKey::single("invoices", "id", 1);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn arity_mismatch_is_rejected() {
        let metadata = Arc::new(EntityKeyMetadata::new("orders", ["id", "region"]));
        assert!(EntityKey::new(metadata, vec![Value::Integer(1)]).is_err());
    }

    #[test]
    fn keys_work_in_hash_sets() {
        let mut set = HashSet::new();
        set.insert(EntityKey::single("orders", "id", 1));
        set.insert(EntityKey::single("orders", "id", 1));
        set.insert(EntityKey::single("orders", "id", 2));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn display_lists_columns() {
        let key = EntityKey::single("orders", "id", "A-1");
        assert_eq!(key.to_string(), "orders[id=\"A-1\"]");
        assert_eq!(key.column_value("id"), Some(&Value::from("A-1")));
        assert_eq!(key.column_value("missing"), None);
    }
}
