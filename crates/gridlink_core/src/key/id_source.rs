//! Keys of persistent id generators.

use super::{structural_hash, write_columns};
use gridlink_codec::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// How an id source is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdSourceType {
    /// A generator table holding one row per discriminator value.
    Table,
    /// A native or emulated sequence.
    Sequence,
}

/// Layout of an id generator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdSourceKeyMetadata {
    kind: IdSourceType,
    name: String,
    key_column: Option<String>,
    value_column: String,
}

impl IdSourceKeyMetadata {
    /// Metadata for a generator table: `key_column` holds the discriminator
    /// and `value_column` the counter.
    #[must_use]
    pub fn for_table(
        table: impl Into<String>,
        key_column: impl Into<String>,
        value_column: impl Into<String>,
    ) -> Self {
        Self {
            kind: IdSourceType::Table,
            name: table.into(),
            key_column: Some(key_column.into()),
            value_column: value_column.into(),
        }
    }

    /// Metadata for a named sequence.
    #[must_use]
    pub fn for_sequence(name: impl Into<String>) -> Self {
        Self {
            kind: IdSourceType::Sequence,
            name: name.into(),
            key_column: None,
            value_column: "next_val".to_string(),
        }
    }

    /// Returns the storage kind.
    #[must_use]
    pub fn kind(&self) -> IdSourceType {
        self.kind
    }

    /// Returns the table or sequence name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the discriminator column, if any.
    #[must_use]
    pub fn key_column(&self) -> Option<&str> {
        self.key_column.as_deref()
    }

    /// Returns the column holding the counter value.
    #[must_use]
    pub fn value_column(&self) -> &str {
        &self.value_column
    }
}

/// Identity of one counter.
#[derive(Debug, Clone)]
pub struct IdSourceKey {
    metadata: Arc<IdSourceKeyMetadata>,
    column_names: Vec<String>,
    values: Vec<Value>,
    hash: u64,
}

impl IdSourceKey {
    /// Key of one row of a generator table, selected by `discriminator`.
    ///
    /// Sequence metadata has no discriminator column, so the value is ignored
    /// for it.
    #[must_use]
    pub fn for_table(metadata: Arc<IdSourceKeyMetadata>, discriminator: impl Into<Value>) -> Self {
        match metadata.key_column().map(str::to_string) {
            Some(column) => Self::build(metadata, vec![column], vec![discriminator.into()]),
            None => Self::build(metadata, Vec::new(), Vec::new()),
        }
    }

    /// Key of a sequence.
    #[must_use]
    pub fn for_sequence(metadata: Arc<IdSourceKeyMetadata>) -> Self {
        Self::build(metadata, Vec::new(), Vec::new())
    }

    fn build(metadata: Arc<IdSourceKeyMetadata>, column_names: Vec<String>, values: Vec<Value>) -> Self {
        let kind = match metadata.kind() {
            IdSourceType::Table => "table",
            IdSourceType::Sequence => "sequence",
        };
        let hash = structural_hash(&[kind, metadata.name()], &column_names, &values);
        Self {
            metadata,
            column_names,
            values,
            hash,
        }
    }

    /// Returns the shared metadata.
    #[must_use]
    pub fn metadata(&self) -> &Arc<IdSourceKeyMetadata> {
        &self.metadata
    }

    /// Returns the table or sequence name.
    #[must_use]
    pub fn table(&self) -> &str {
        self.metadata.name()
    }

    /// Returns the discriminator column names (empty for sequences).
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Returns the discriminator values.
    #[must_use]
    pub fn column_values(&self) -> &[Value] {
        &self.values
    }
}

impl PartialEq for IdSourceKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.metadata.kind() == other.metadata.kind()
            && self.table() == other.table()
            && self.column_names == other.column_names
            && self.values == other.values
    }
}

impl Eq for IdSourceKey {}

impl Hash for IdSourceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Display for IdSourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_columns(f, self.table(), &self.column_names, &self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_keys_compare_by_discriminator() {
        let metadata = Arc::new(IdSourceKeyMetadata::for_table("id_gen", "name", "next"));
        let a = IdSourceKey::for_table(Arc::clone(&metadata), "orders");
        let b = IdSourceKey::for_table(Arc::clone(&metadata), "orders");
        let c = IdSourceKey::for_table(metadata, "invoices");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "id_gen[name=\"orders\"]");
    }

    #[test]
    fn sequence_and_table_with_same_name_differ() {
        let seq = IdSourceKey::for_sequence(Arc::new(IdSourceKeyMetadata::for_sequence("ids")));
        let table = IdSourceKey::for_table(
            Arc::new(IdSourceKeyMetadata::for_table("ids", "k", "v")),
            "ids",
        );
        assert_ne!(seq, table);
        assert_eq!(seq.to_string(), "ids[]");
    }
}
