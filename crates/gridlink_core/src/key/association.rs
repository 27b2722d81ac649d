//! Association keys and their column layout.

use super::{check_arity, structural_hash, value_of, write_columns, EntityKey, EntityKeyMetadata};
use crate::error::DialectResult;
use gridlink_codec::{ScalarType, Value};
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Whether an association points at entities or holds embedded values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    /// Rows reference other entities.
    #[default]
    Association,
    /// Rows are embedded values or element collections.
    EmbeddedCollection,
}

/// Collection semantics of an association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationType {
    /// Unordered, duplicates allowed.
    #[default]
    Bag,
    /// Unordered, unique rows.
    Set,
    /// Ordered by an index column.
    List,
    /// Keyed by one or more index columns.
    Map,
    /// A single associated row.
    OneToOne,
}

/// Column layout of one association type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssociationKeyMetadata {
    table: String,
    column_names: Vec<String>,
    row_key_column_names: Vec<String>,
    row_key_index_columns: Vec<(String, ScalarType)>,
    collection_role: String,
    kind: AssociationKind,
    association_type: AssociationType,
    inverse: bool,
    associated_entity: Option<Arc<EntityKeyMetadata>>,
}

impl AssociationKeyMetadata {
    /// Starts building metadata for an association stored in `table` and
    /// identified by `column_names` (the owner's foreign key columns).
    #[must_use]
    pub fn builder<S: Into<String>>(
        table: impl Into<String>,
        column_names: impl IntoIterator<Item = S>,
    ) -> AssociationKeyMetadataBuilder {
        AssociationKeyMetadataBuilder {
            metadata: Self {
                table: table.into(),
                column_names: column_names.into_iter().map(Into::into).collect(),
                row_key_column_names: Vec::new(),
                row_key_index_columns: Vec::new(),
                collection_role: String::new(),
                kind: AssociationKind::default(),
                association_type: AssociationType::default(),
                inverse: false,
                associated_entity: None,
            },
        }
    }

    /// Returns the association table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the association key column names.
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Returns the columns that identify one row.
    #[must_use]
    pub fn row_key_column_names(&self) -> &[String] {
        &self.row_key_column_names
    }

    /// Returns the index column names (list position or map key).
    pub fn row_key_index_column_names(&self) -> impl Iterator<Item = &str> {
        self.row_key_index_columns.iter().map(|(name, _)| name.as_str())
    }

    /// Returns the index columns with their scalar types.
    #[must_use]
    pub fn row_key_index_columns(&self) -> &[(String, ScalarType)] {
        &self.row_key_index_columns
    }

    /// Returns the role (property name) on the owning side.
    #[must_use]
    pub fn collection_role(&self) -> &str {
        &self.collection_role
    }

    /// Returns the association kind.
    #[must_use]
    pub fn kind(&self) -> AssociationKind {
        self.kind
    }

    /// Returns the collection semantics.
    #[must_use]
    pub fn association_type(&self) -> AssociationType {
        self.association_type
    }

    /// Whether this is the inverse (non-owning) side.
    #[must_use]
    pub fn is_inverse(&self) -> bool {
        self.inverse
    }

    /// Whether the association holds a single row.
    #[must_use]
    pub fn is_one_to_one(&self) -> bool {
        self.association_type == AssociationType::OneToOne
    }

    /// Returns the metadata of the entity on the other side, if any.
    #[must_use]
    pub fn associated_entity(&self) -> Option<&Arc<EntityKeyMetadata>> {
        self.associated_entity.as_ref()
    }

    /// Whether `column` belongs to the association key.
    #[must_use]
    pub fn is_key_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }

    /// Filters out the association key columns from `columns`.
    ///
    /// Embedded rows do not repeat the owner's key.
    pub fn columns_without_key_columns<'a>(
        &self,
        columns: impl IntoIterator<Item = &'a str>,
    ) -> Vec<&'a str> {
        columns
            .into_iter()
            .filter(|c| !self.is_key_column(c))
            .collect()
    }

    /// Returns the single row key column that is not part of the association
    /// key, or `None` if there are zero or several.
    ///
    /// Such a row can be stored as a bare value instead of a sub-document.
    #[must_use]
    pub fn single_row_key_column_not_in_association_key(&self) -> Option<&str> {
        let mut rest = self
            .row_key_column_names
            .iter()
            .filter(|c| !self.is_key_column(c));
        match (rest.next(), rest.next()) {
            (Some(only), None) => Some(only.as_str()),
            _ => None,
        }
    }

    /// Whether rows can be addressed by a single `String` index column.
    #[must_use]
    pub fn has_single_string_index(&self) -> bool {
        matches!(
            self.row_key_index_columns.as_slice(),
            [(_, ScalarType::String)]
        )
    }
}

/// Builder for [`AssociationKeyMetadata`].
#[derive(Debug, Clone)]
pub struct AssociationKeyMetadataBuilder {
    metadata: AssociationKeyMetadata,
}

impl AssociationKeyMetadataBuilder {
    /// Sets the columns identifying one row.
    #[must_use]
    pub fn row_key_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.metadata.row_key_column_names = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Adds an index column (list position or map key) of the given type.
    #[must_use]
    pub fn index_column(mut self, name: impl Into<String>, ty: ScalarType) -> Self {
        self.metadata.row_key_index_columns.push((name.into(), ty));
        self
    }

    /// Sets the role on the owning side.
    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.metadata.collection_role = role.into();
        self
    }

    /// Sets the association kind.
    #[must_use]
    pub fn kind(mut self, kind: AssociationKind) -> Self {
        self.metadata.kind = kind;
        self
    }

    /// Sets the collection semantics.
    #[must_use]
    pub fn association_type(mut self, association_type: AssociationType) -> Self {
        self.metadata.association_type = association_type;
        self
    }

    /// Marks this as the inverse side.
    #[must_use]
    pub fn inverse(mut self, inverse: bool) -> Self {
        self.metadata.inverse = inverse;
        self
    }

    /// Sets the entity on the other side.
    #[must_use]
    pub fn associated_entity(mut self, metadata: Arc<EntityKeyMetadata>) -> Self {
        self.metadata.associated_entity = Some(metadata);
        self
    }

    /// Finishes the metadata.
    #[must_use]
    pub fn build(self) -> AssociationKeyMetadata {
        self.metadata
    }
}

/// Identity of one association instance.
///
/// Equality covers the table, the key columns, the role and the key values.
/// The owning entity key travels along so dialects storing rows inside the
/// owner can find it.
#[derive(Debug, Clone)]
pub struct AssociationKey {
    metadata: Arc<AssociationKeyMetadata>,
    values: Vec<Value>,
    owner: EntityKey,
    hash: u64,
}

impl AssociationKey {
    /// Creates an association key.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DialectError::InvalidKey`] if the number of values does
    /// not match the metadata's key columns.
    pub fn new(
        metadata: Arc<AssociationKeyMetadata>,
        values: Vec<Value>,
        owner: EntityKey,
    ) -> DialectResult<Self> {
        check_arity(metadata.table(), metadata.column_names(), &values)?;
        let hash = structural_hash(
            &[metadata.table(), metadata.collection_role()],
            metadata.column_names(),
            &values,
        );
        Ok(Self {
            metadata,
            values,
            owner,
            hash,
        })
    }

    /// Returns the shared metadata.
    #[must_use]
    pub fn metadata(&self) -> &Arc<AssociationKeyMetadata> {
        &self.metadata
    }

    /// Returns the association table name.
    #[must_use]
    pub fn table(&self) -> &str {
        self.metadata.table()
    }

    /// Returns the role on the owning side.
    #[must_use]
    pub fn role(&self) -> &str {
        self.metadata.collection_role()
    }

    /// Returns the key column names.
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        self.metadata.column_names()
    }

    /// Returns the key column values.
    #[must_use]
    pub fn column_values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the value of one key column.
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

    /// Returns the key of the owning entity.
    #[must_use]
    pub fn owner(&self) -> &EntityKey {
        &self.owner
    }
}

impl PartialEq for AssociationKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.table() == other.table()
            && self.role() == other.role()
            && self.column_names() == other.column_names()
            && self.values == other.values
    }
}

impl Eq for AssociationKey {}

impl Hash for AssociationKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Display for AssociationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_columns(f, self.table(), self.column_names(), &self.values)?;
        write!(f, ".{}", self.role())
    }
}
