//! Association rows embedded in the owning document.
//!
//! Rows are stored without the association key columns, which the owner
//! already holds. `AsList` stores an array; a row whose only remaining column
//! is the single row key column outside the association key is stored as the
//! bare value. `ByNaturalKey` stores a map keyed by the `String` index
//! column; when the only column left is the one row key column outside both
//! the association key and the index, the entry is that bare value.

use crate::error::DocumentError;
use gridlink_codec::Value;
use gridlink_core::datastore::{Record, StoredRow};
use gridlink_core::{AssociationKey, AssociationKeyMetadata, RowKey, RowLayout};
use std::collections::BTreeMap;

/// Rebuilds the row key of a stored row from its columns.
#[must_use]
pub fn row_key_of(metadata: &AssociationKeyMetadata, record: &Record) -> RowKey {
    RowKey::from_pairs(
        metadata.table(),
        metadata
            .row_key_column_names()
            .iter()
            .map(|column| (column.as_str(), record.get(column).cloned().unwrap_or(Value::Null))),
    )
}

fn strip_key_columns(metadata: &AssociationKeyMetadata, record: &Record) -> Record {
    metadata
        .columns_without_key_columns(record.keys().map(String::as_str))
        .into_iter()
        .filter_map(|column| Some((column.to_owned(), record.get(column)?.clone())))
        .collect()
}

fn index_column(metadata: &AssociationKeyMetadata) -> Result<&str, DocumentError> {
    match metadata.row_key_index_columns() {
        [(name, _)] => Ok(name.as_str()),
        _ => Err(DocumentError::corrupted_document(format!(
            "association {} has no single index column",
            metadata.collection_role()
        ))),
    }
}

/// The one row key column that is neither an association key column nor the
/// index column, if there is exactly one.
fn map_value_column<'a>(metadata: &'a AssociationKeyMetadata, index: &str) -> Option<&'a str> {
    let mut rest = metadata
        .row_key_column_names()
        .iter()
        .filter(|c| !metadata.is_key_column(c) && c.as_str() != index);
    match (rest.next(), rest.next()) {
        (Some(only), None) => Some(only.as_str()),
        _ => None,
    }
}

/// Encodes rows as the value of the owner's role field.
///
/// # Errors
///
/// Returns [`DocumentError::CorruptedDocument`] if a natural-key row lacks a
/// text index value.
pub fn embed_rows(
    metadata: &AssociationKeyMetadata,
    layout: RowLayout,
    rows: &[StoredRow],
) -> Result<Value, DocumentError> {
    match layout {
        RowLayout::AsList => {
            let bare = metadata.single_row_key_column_not_in_association_key();
            let items = rows
                .iter()
                .map(|(_, record)| {
                    let stripped = strip_key_columns(metadata, record);
                    match (bare, stripped.len()) {
                        (Some(column), 1) => match stripped.get(column) {
                            Some(value) if value.is_scalar() => value.clone(),
                            _ => Value::Map(stripped),
                        },
                        _ => Value::Map(stripped),
                    }
                })
                .collect();
            Ok(Value::Array(items))
        }
        RowLayout::ByNaturalKey => {
            let index = index_column(metadata)?;
            let bare = map_value_column(metadata, index);
            let mut entries = BTreeMap::new();
            for (_, record) in rows {
                let name = record
                    .get(index)
                    .and_then(Value::as_text)
                    .ok_or_else(|| DocumentError::corrupted_document(format!("row without text index `{index}`")))?;
                let mut stripped = strip_key_columns(metadata, record);
                stripped.remove(index);
                let entry = match (bare, stripped.len()) {
                    (Some(column), 1) => match stripped.get(column) {
                        Some(value) if value.is_scalar() => value.clone(),
                        _ => Value::Map(stripped),
                    },
                    _ => Value::Map(stripped),
                };
                entries.insert(name.to_owned(), entry);
            }
            Ok(Value::Map(entries))
        }
    }
}

/// Decodes the value of the owner's role field back into rows.
///
/// # Errors
///
/// Returns [`DocumentError::CorruptedDocument`] if the value does not have
/// the shape `layout` produces.
pub fn unembed_rows(key: &AssociationKey, layout: RowLayout, value: &Value) -> Result<Vec<StoredRow>, DocumentError> {
    let metadata = key.metadata();
    let owner_columns = || -> Record {
        key.columns()
            .map(|(column, value)| (column.to_owned(), value.clone()))
            .collect()
    };
    let finish = |record: Record| (row_key_of(metadata, &record), record);

    match (layout, value) {
        (RowLayout::AsList, Value::Array(items)) => items
            .iter()
            .map(|item| {
                let mut record = owner_columns();
                match item {
                    Value::Map(fields) => record.extend(fields.clone()),
                    scalar => {
                        let column = metadata
                            .single_row_key_column_not_in_association_key()
                            .ok_or_else(|| DocumentError::corrupted_document("bare row value without a row column"))?;
                        record.insert(column.to_owned(), scalar.clone());
                    }
                }
                Ok::<_, DocumentError>(finish(record))
            })
            .collect(),
        (RowLayout::ByNaturalKey, Value::Map(entries)) => {
            let index = index_column(metadata)?;
            let bare = map_value_column(metadata, index);
            entries
                .iter()
                .map(|(name, item)| {
                    let mut record = owner_columns();
                    match (item, bare) {
                        (Value::Map(fields), _) => record.extend(fields.clone()),
                        (scalar, Some(column)) => {
                            record.insert(column.to_owned(), scalar.clone());
                        }
                        (_, None) => return Err(DocumentError::corrupted_document("natural-key row is not a map")),
                    }
                    record.insert(index.to_owned(), Value::from(name.as_str()));
                    Ok::<_, DocumentError>(finish(record))
                })
                .collect()
        }
        (_, other) => Err(DocumentError::corrupted_document(format!(
            "unexpected {} for embedded association {}",
            other.type_name(),
            key.role()
        ))),
    }
}
