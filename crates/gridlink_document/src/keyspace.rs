//! Mapping of keys onto store key bytes.
//!
//! Every store key is a flattened value list `[bucket, kind, table, ...]`.
//! The bucket is the table name under per-table cache mapping and one fixed
//! name per kind under per-kind mapping. The kind segment keeps records,
//! associations, association rows and counters of the same table apart, and
//! flattening keeps every key prefix-free, so a prefix scan over
//! `[bucket, kind, table]` returns exactly one table.

use gridlink_codec::{flatten, Value};
use gridlink_core::{AssociationKey, CacheMappingType, DialectResult, EntityKey, IdSourceKey, RowKey};

const ENTITIES: &str = "ENTITIES";
const ASSOCIATIONS: &str = "ASSOCIATIONS";
const IDENTIFIERS: &str = "IDENTIFIERS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Entity,
    Association,
    Row,
    Counter,
}

impl Kind {
    fn tag(self) -> &'static str {
        match self {
            Kind::Entity => "e",
            Kind::Association => "a",
            Kind::Row => "r",
            Kind::Counter => "i",
        }
    }

    fn bucket(self) -> &'static str {
        match self {
            Kind::Entity => ENTITIES,
            Kind::Association | Kind::Row => ASSOCIATIONS,
            Kind::Counter => IDENTIFIERS,
        }
    }
}

/// Builds store keys under one cache mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeySpace {
    mapping: CacheMappingType,
}

impl KeySpace {
    /// Creates a key space.
    #[must_use]
    pub const fn new(mapping: CacheMappingType) -> Self {
        Self { mapping }
    }

    /// Returns the cache mapping.
    #[must_use]
    pub const fn mapping(&self) -> CacheMappingType {
        self.mapping
    }

    /// Name of the bucket holding `kind` records of `table`.
    fn bucket<'a>(&self, kind: Kind, table: &'a str) -> &'a str {
        match self.mapping {
            CacheMappingType::CachePerTable => table,
            CacheMappingType::CachePerKind => kind.bucket(),
        }
    }

    fn encode(&self, kind: Kind, table: &str, rest: &[&[Value]]) -> DialectResult<Vec<u8>> {
        let mut parts = vec![
            Value::from(self.bucket(kind, table)),
            Value::from(kind.tag()),
            Value::from(table),
        ];
        for values in rest {
            parts.extend(values.iter().cloned());
        }
        Ok(flatten(&parts)?.into_bytes())
    }

    /// Key of an entity document.
    ///
    /// # Errors
    ///
    /// Returns a codec error if a key value cannot be flattened.
    pub fn entity(&self, key: &EntityKey) -> DialectResult<Vec<u8>> {
        self.encode(Kind::Entity, key.table(), &[key.column_values()])
    }

    /// Prefix of every entity document of `table`.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the table name cannot be flattened.
    pub fn entity_prefix(&self, table: &str) -> DialectResult<Vec<u8>> {
        self.encode(Kind::Entity, table, &[])
    }

    /// Key of a dedicated association document.
    ///
    /// # Errors
    ///
    /// Returns a codec error if a key value cannot be flattened.
    pub fn association(&self, key: &AssociationKey) -> DialectResult<Vec<u8>> {
        let role = [Value::from(key.role())];
        self.encode(Kind::Association, key.table(), &[&role[..], key.column_values()])
    }

    /// Prefix of every shared-collection row of one association.
    ///
    /// # Errors
    ///
    /// Returns a codec error if a key value cannot be flattened.
    pub fn rows_prefix(&self, key: &AssociationKey) -> DialectResult<Vec<u8>> {
        let role = [Value::from(key.role())];
        self.encode(Kind::Row, key.table(), &[&role[..], key.column_values()])
    }

    /// Key of one shared-collection row.
    ///
    /// # Errors
    ///
    /// Returns a codec error if a key value cannot be flattened.
    pub fn row(&self, key: &AssociationKey, row: &RowKey) -> DialectResult<Vec<u8>> {
        let role = [Value::from(key.role())];
        self.encode(
            Kind::Row,
            key.table(),
            &[&role[..], key.column_values(), row.column_values()],
        )
    }

    /// Key of an id generator counter.
    ///
    /// # Errors
    ///
    /// Returns a codec error if a key value cannot be flattened.
    pub fn counter(&self, key: &IdSourceKey) -> DialectResult<Vec<u8>> {
        self.encode(Kind::Counter, key.table(), &[key.column_values()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlink_core::IdSourceKeyMetadata;
    use std::sync::Arc;

    #[test]
    fn per_table_buckets_use_the_table_name() {
        let space = KeySpace::new(CacheMappingType::CachePerTable);
        let key = space.entity(&EntityKey::single("users", "id", 1)).unwrap();
        assert_eq!(key, b"s5:userss1:es5:usersi1:1".to_vec());
    }

    #[test]
    fn per_kind_buckets_share_one_name() {
        let space = KeySpace::new(CacheMappingType::CachePerKind);
        let key = space.entity(&EntityKey::single("users", "id", 1)).unwrap();
        assert!(key.starts_with(b"s8:ENTITIES"));
    }

    #[test]
    fn entity_prefix_covers_only_its_table() {
        let space = KeySpace::default();
        let prefix = space.entity_prefix("user").unwrap();
        let user = space.entity(&EntityKey::single("user", "id", 1)).unwrap();
        let users = space.entity(&EntityKey::single("users", "id", 1)).unwrap();
        assert!(user.starts_with(&prefix));
        assert!(!users.starts_with(&prefix));
    }

    #[test]
    fn counters_and_entities_never_collide() {
        let space = KeySpace::default();
        let metadata = Arc::new(IdSourceKeyMetadata::for_table("users", "name", "next_val"));
        let counter = space.counter(&IdSourceKey::for_table(metadata, 1)).unwrap();
        let entity = space.entity(&EntityKey::single("users", "id", 1)).unwrap();
        assert_ne!(counter, entity);
    }
}
