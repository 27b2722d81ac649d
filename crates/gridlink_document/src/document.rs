//! Stored document forms.
//!
//! Documents are CBOR-encoded. Every write stamps a fresh revision, so two
//! encodings of the same document are never byte-equal after a write and a
//! byte-level compare-and-swap detects every concurrent modification.

use crate::error::DocumentError;
use gridlink_codec::{from_cbor, to_cbor};
use gridlink_core::datastore::Record;
use gridlink_core::{DialectError, DialectResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// An entity record, possibly with embedded association rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDocument {
    /// Revision stamped on every write.
    pub revision: Uuid,
    /// Columns, including embedded association fields.
    pub fields: Record,
    /// Set while the document only exists to hold embedded association rows
    /// written before the owning entity itself was inserted.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub association_only: bool,
}

impl EntityDocument {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self {
            revision: Uuid::new_v4(),
            fields: Record::new(),
            association_only: false,
        }
    }

    /// Creates an empty document that holds association rows for an owner
    /// that has not been inserted yet.
    #[must_use]
    pub fn association_only() -> Self {
        Self {
            association_only: true,
            ..Self::new()
        }
    }
}

impl Default for EntityDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// A dedicated association record holding every row of one association.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssociationDocument {
    /// Revision stamped on every write.
    pub revision: Uuid,
    /// Rows in storage order. Each row carries its row key columns.
    pub rows: Vec<Record>,
}

/// A document that is stamped with a new revision before each write.
pub trait Revisioned: Serialize + DeserializeOwned {
    /// Replaces the revision.
    fn touch(&mut self);
}

impl Revisioned for EntityDocument {
    fn touch(&mut self) {
        self.revision = Uuid::new_v4();
    }
}

impl Revisioned for AssociationDocument {
    fn touch(&mut self) {
        self.revision = Uuid::new_v4();
    }
}

/// Encodes a document.
///
/// # Errors
///
/// Returns a codec error if serialization fails.
pub fn encode<T: Serialize>(document: &T) -> DialectResult<Vec<u8>> {
    Ok(to_cbor(document)?)
}

/// Decodes a document read by `operation` on `key`.
///
/// # Errors
///
/// Returns an operation error wrapping [`DocumentError::CorruptedDocument`].
pub fn decode<T: DeserializeOwned>(operation: &'static str, key: &impl fmt::Display, bytes: &[u8]) -> DialectResult<T> {
    from_cbor(bytes).map_err(|e| {
        DialectError::operation(operation, key, DocumentError::corrupted_document(e.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlink_codec::Value;

    #[test]
    fn touched_document_encodes_differently() {
        let mut doc = EntityDocument::new();
        doc.fields.insert("name".into(), Value::from("ada"));
        let before = encode(&doc).unwrap();
        doc.touch();
        let after = encode(&doc).unwrap();
        assert_ne!(before, after);

        let decoded: EntityDocument = decode("get_tuple", &"users[id=1]", &after).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn garbage_is_reported_as_operation_error() {
        let err = decode::<EntityDocument>("get_tuple", &"users[id=1]", &[0xff, 0x00]).unwrap_err();
        assert!(err.is_operation());
    }
}
