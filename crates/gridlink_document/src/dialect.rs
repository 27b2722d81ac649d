//! The document dialect.

use crate::document::{decode, encode, AssociationDocument, EntityDocument, Revisioned};
use crate::embedded::{embed_rows, row_key_of, unembed_rows};
use crate::error::DocumentError;
use crate::keyspace::KeySpace;
use crate::query::parse_native_query;
use crate::types::document_types;
use gridlink_core::datastore::{
    apply_association, apply_tuple, association_from_rows, matches_lock_state, Record, StoredRow,
};
use gridlink_core::{
    Association, AssociationContext, AssociationKey, AssociationOperation, AssociationStorageStrategy,
    BackendProfile, Config, CounterStore, Criteria, CriteriaDialect, DialectError, DialectResult, EntityKey,
    EntityKeyMetadata, GridDialect, IdSourceKey, NativeQuery, NextValueRequest, OptimisticLockingDialect,
    QueryParameters, RowLayout, SnapshotType, Tuple, TupleContext, TupleIter, TypeRegistry,
    UniqueConstraint, backoff, next_value_with_cas,
};
use gridlink_storage::KvStore;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, trace, warn};

/// What a document update does once it has seen the current document.
enum Change<T> {
    /// Store this document.
    Write(T),
    /// Delete the document.
    Delete,
    /// Leave storage untouched.
    Keep,
}

/// A unique constraint degraded to one column.
#[derive(Debug, Clone)]
struct ColumnConstraint {
    name: String,
    column: String,
}

/// Document dialect over a byte-oriented [`KvStore`].
///
/// Records are CBOR documents. Association rows are embedded in the owning
/// document, kept in one dedicated document per association, or stored as one
/// record per row in a shared collection, as the resolved strategy says.
/// Every single-document write is a compare-and-swap loop, so concurrent
/// writers to the same key never lose updates; nothing is atomic across keys.
///
/// Row keys handed to this dialect must use the association metadata's table
/// and row key columns, in order; rows read back are keyed that way.
pub struct DocumentDialect<S: KvStore> {
    store: S,
    keys: KeySpace,
    max_attempts: u32,
    constraints: RwLock<HashMap<String, Vec<ColumnConstraint>>>,
}

impl<S: KvStore> DocumentDialect<S> {
    /// Creates a dialect with the default configuration.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self::with_config(store, &Config::default())
    }

    /// Creates a dialect. The cache mapping is read from the global options.
    #[must_use]
    pub fn with_config(store: S, config: &Config) -> Self {
        let mapping = config.options.global.cache_mapping.unwrap_or_default();
        debug!(?mapping, max_attempts = config.max_id_generation_attempts, "document dialect ready");
        Self {
            store,
            keys: KeySpace::new(mapping),
            max_attempts: config.max_id_generation_attempts.max(1),
            constraints: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the backend client.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the key space.
    #[must_use]
    pub fn key_space(&self) -> KeySpace {
        self.keys
    }

    fn read<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        display: &impl fmt::Display,
        key: &[u8],
    ) -> DialectResult<Option<(Vec<u8>, T)>> {
        let Some(bytes) = self
            .store
            .get(key)
            .map_err(|e| DialectError::operation(operation, display, e))?
        else {
            return Ok(None);
        };
        let document = decode(operation, display, &bytes)?;
        Ok(Some((bytes, document)))
    }

    /// Applies `change` to the document under `key` with compare-and-swap,
    /// retrying when another writer got there first. Returns `false` if
    /// `change` decided to keep the document as it is.
    fn update<T, F>(
        &self,
        operation: &'static str,
        target: &impl fmt::Display,
        key: &[u8],
        mut change: F,
    ) -> DialectResult<bool>
    where
        T: Revisioned,
        F: FnMut(Option<T>) -> DialectResult<Change<T>>,
    {
        for attempt in 1..=self.max_attempts {
            let (expected, current) = match self.read::<T>(operation, target, key)? {
                Some((bytes, document)) => (Some(bytes), Some(document)),
                None => (None, None),
            };
            let new = match change(current)? {
                Change::Keep => return Ok(false),
                Change::Delete if expected.is_none() => return Ok(false),
                Change::Delete => None,
                Change::Write(mut document) => {
                    document.touch();
                    Some(encode(&document)?)
                }
            };
            if self
                .store
                .compare_and_swap(key, expected.as_deref(), new)
                .map_err(|e| DialectError::operation(operation, target, e))?
            {
                return Ok(true);
            }
            trace!(key = %target, attempt, "document changed concurrently, retrying");
            backoff(attempt);
        }
        Err(DialectError::operation(
            operation,
            target,
            DocumentError::Contention {
                attempts: self.max_attempts,
            },
        ))
    }

    fn scan_entities(&self, operation: &'static str, table: &str) -> DialectResult<Vec<(Vec<u8>, EntityDocument)>> {
        let prefix = self.keys.entity_prefix(table)?;
        self.store
            .scan_prefix(&prefix)
            .map_err(|e| DialectError::operation(operation, &table, e))?
            .into_iter()
            .map(|(key, bytes)| Ok((key, decode(operation, &table, &bytes)?)))
            .collect()
    }

    fn matching(
        &self,
        operation: &'static str,
        table: &str,
        criteria: Option<&Criteria>,
        context: &TupleContext,
    ) -> DialectResult<Vec<Tuple>> {
        Ok(self
            .scan_entities(operation, table)?
            .into_iter()
            .filter(|(_, document)| !document.association_only)
            .map(|(_, document)| select(&document.fields, context))
            .filter(|tuple| criteria.map_or(true, |c| c.matches(tuple)))
            .collect())
    }

    fn check_unique(&self, key: &EntityKey, store_key: &[u8], fields: &Record) -> DialectResult<()> {
        let constraints = self.constraints.read();
        let Some(constraints) = constraints.get(key.table()).filter(|c| !c.is_empty()) else {
            return Ok(());
        };
        let others = self.scan_entities("insert_or_update_tuple", key.table())?;
        for constraint in constraints {
            let Some(value) = fields.get(&constraint.column).filter(|v| !v.is_null()) else {
                continue;
            };
            let taken = others
                .iter()
                .any(|(other, document)| other != store_key && document.fields.get(&constraint.column) == Some(value));
            if taken {
                return Err(DialectError::unique_constraint_violation(constraint.name.clone(), key));
            }
        }
        Ok(())
    }

    fn write_entity(
        &self,
        operation: &'static str,
        key: &EntityKey,
        mut change: impl FnMut(Option<EntityDocument>) -> DialectResult<Change<EntityDocument>>,
    ) -> DialectResult<bool> {
        let store_key = self.keys.entity(key)?;
        self.update(operation, key, &store_key, |current| {
            let change = change(current)?;
            if let Change::Write(document) = &change {
                self.check_unique(key, &store_key, &document.fields)?;
            }
            Ok(change)
        })
    }

    fn embedded_rows(key: &AssociationKey, layout: RowLayout, document: &EntityDocument) -> DialectResult<Vec<StoredRow>> {
        match document.fields.get(key.role()) {
            Some(value) => unembed_rows(key, layout, value).map_err(|e| DialectError::operation("get_association", key, e)),
            None => Ok(Vec::new()),
        }
    }

    fn shared_rows(&self, operation: &'static str, key: &AssociationKey) -> DialectResult<Vec<(Vec<u8>, StoredRow)>> {
        let prefix = self.keys.rows_prefix(key)?;
        self.store
            .scan_prefix(&prefix)
            .map_err(|e| DialectError::operation(operation, key, e))?
            .into_iter()
            .map(|(store_key, bytes)| {
                let record: Record = decode(operation, key, &bytes)?;
                Ok((store_key, (row_key_of(key.metadata(), &record), record)))
            })
            .collect()
    }

    fn delete_shared_rows(&self, operation: &'static str, key: &AssociationKey) -> DialectResult<()> {
        for (store_key, _) in self.shared_rows(operation, key)? {
            self.store
                .delete(&store_key)
                .map_err(|e| DialectError::operation(operation, key, e))?;
        }
        Ok(())
    }
}

/// Whether an owner document still holds anything besides its key columns.
fn has_embedded_fields(document: &EntityDocument, owner: &EntityKey) -> bool {
    document.fields.keys().any(|column| !owner.metadata().is_key_column(column))
}

fn select(fields: &Record, context: &TupleContext) -> Tuple {
    Tuple::loaded(
        fields
            .iter()
            .filter(|(column, _)| context.is_selectable(column))
            .map(|(column, value)| (column.clone(), value.clone()))
            .collect(),
    )
}

impl<S: KvStore> fmt::Debug for DocumentDialect<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentDialect")
            .field("keys", &self.keys)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl<S: KvStore> GridDialect for DocumentDialect<S> {
    fn profile(&self) -> BackendProfile {
        BackendProfile::document()
    }

    fn type_overrides(&self) -> TypeRegistry {
        document_types()
    }

    fn get_tuple(&self, key: &EntityKey, context: &TupleContext) -> DialectResult<Option<Tuple>> {
        let store_key = self.keys.entity(key)?;
        Ok(self
            .read::<EntityDocument>("get_tuple", key, &store_key)?
            .filter(|(_, document)| !document.association_only)
            .map(|(_, document)| select(&document.fields, context)))
    }

    fn insert_or_update_tuple(&self, key: &EntityKey, tuple: &Tuple, _context: &TupleContext) -> DialectResult<()> {
        let insert = tuple.snapshot_type() == SnapshotType::Insert;
        self.write_entity("insert_or_update_tuple", key, |current| {
            if insert && current.as_ref().is_some_and(|document| !document.association_only) {
                return Err(DialectError::tuple_already_exists(key));
            }
            let mut document = current.unwrap_or_default();
            document.association_only = false;
            apply_tuple(&mut document.fields, key, tuple);
            Ok(Change::Write(document))
        })?;
        Ok(())
    }

    fn remove_tuple(&self, key: &EntityKey, _context: &TupleContext) -> DialectResult<()> {
        let store_key = self.keys.entity(key)?;
        let existed = self
            .store
            .delete(&store_key)
            .map_err(|e| DialectError::operation("remove_tuple", key, e))?;
        if !existed {
            debug!(%key, "remove_tuple: no record");
        }
        Ok(())
    }

    fn get_association(
        &self,
        key: &AssociationKey,
        context: &AssociationContext,
    ) -> DialectResult<Option<Association>> {
        match context.strategy() {
            AssociationStorageStrategy::InEntity { layout } => {
                let owner_key = self.keys.entity(key.owner())?;
                let Some((_, document)) = self.read::<EntityDocument>("get_association", key, &owner_key)? else {
                    return Ok(None);
                };
                if !document.fields.contains_key(key.role()) {
                    return Ok(None);
                }
                let rows = Self::embedded_rows(key, layout, &document)?;
                Ok(Some(association_from_rows(&rows)))
            }
            AssociationStorageStrategy::DedicatedRecord => {
                let store_key = self.keys.association(key)?;
                Ok(self
                    .read::<AssociationDocument>("get_association", key, &store_key)?
                    .map(|(_, document)| {
                        let rows: Vec<StoredRow> = document
                            .rows
                            .into_iter()
                            .map(|record| (row_key_of(key.metadata(), &record), record))
                            .collect();
                        association_from_rows(&rows)
                    }))
            }
            AssociationStorageStrategy::SharedCollection => {
                let rows: Vec<StoredRow> = self
                    .shared_rows("get_association", key)?
                    .into_iter()
                    .map(|(_, row)| row)
                    .collect();
                Ok((!rows.is_empty()).then(|| association_from_rows(&rows)))
            }
        }
    }

    fn insert_or_update_association(
        &self,
        key: &AssociationKey,
        association: &Association,
        context: &AssociationContext,
    ) -> DialectResult<()> {
        const OPERATION: &str = "insert_or_update_association";
        match context.strategy() {
            AssociationStorageStrategy::InEntity { layout } => {
                let owner = key.owner();
                self.write_entity(OPERATION, owner, |current| {
                    let mut rows = match &current {
                        Some(document) => Self::embedded_rows(key, layout, document)?,
                        None => Vec::new(),
                    };
                    apply_association(&mut rows, association);
                    let mut document = match current {
                        Some(document) => document,
                        None if rows.is_empty() => return Ok(Change::Keep),
                        None => {
                            let mut document = EntityDocument::association_only();
                            apply_tuple(&mut document.fields, owner, &Tuple::new());
                            document
                        }
                    };
                    if rows.is_empty() {
                        document.fields.remove(key.role());
                        if document.association_only && !has_embedded_fields(&document, owner) {
                            return Ok(Change::Delete);
                        }
                    } else {
                        let value = embed_rows(key.metadata(), layout, &rows)
                            .map_err(|e| DialectError::operation(OPERATION, key, e))?;
                        document.fields.insert(key.role().to_owned(), value);
                    }
                    Ok(Change::Write(document))
                })?;
            }
            AssociationStorageStrategy::DedicatedRecord => {
                let store_key = self.keys.association(key)?;
                self.update::<AssociationDocument, _>(OPERATION, key, &store_key, |current| {
                    let mut rows: Vec<StoredRow> = current
                        .map(|document| document.rows)
                        .unwrap_or_default()
                        .into_iter()
                        .map(|record| (row_key_of(key.metadata(), &record), record))
                        .collect();
                    apply_association(&mut rows, association);
                    if rows.is_empty() {
                        return Ok(Change::Delete);
                    }
                    Ok(Change::Write(AssociationDocument {
                        revision: Default::default(),
                        rows: rows.into_iter().map(|(_, record)| record).collect(),
                    }))
                })?;
            }
            AssociationStorageStrategy::SharedCollection => {
                if association.is_cleared() {
                    self.delete_shared_rows(OPERATION, key)?;
                }
                for op in association.operations() {
                    match op {
                        AssociationOperation::Put { key: row, tuple } => {
                            let mut record = tuple.to_map();
                            for (column, value) in row.columns() {
                                record.insert(column.to_owned(), value.clone());
                            }
                            self.store
                                .put(&self.keys.row(key, row)?, encode(&record)?)
                                .map_err(|e| DialectError::operation(OPERATION, key, e))?;
                        }
                        AssociationOperation::Remove { key: row } => {
                            self.store
                                .delete(&self.keys.row(key, row)?)
                                .map_err(|e| DialectError::operation(OPERATION, key, e))?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn remove_association(&self, key: &AssociationKey, context: &AssociationContext) -> DialectResult<()> {
        const OPERATION: &str = "remove_association";
        match context.strategy() {
            AssociationStorageStrategy::InEntity { .. } => {
                self.write_entity(OPERATION, key.owner(), |current| match current {
                    Some(mut document) if document.fields.contains_key(key.role()) => {
                        document.fields.remove(key.role());
                        if document.association_only && !has_embedded_fields(&document, key.owner()) {
                            return Ok(Change::Delete);
                        }
                        Ok(Change::Write(document))
                    }
                    _ => Ok(Change::Keep),
                })?;
            }
            AssociationStorageStrategy::DedicatedRecord => {
                let store_key = self.keys.association(key)?;
                self.store
                    .delete(&store_key)
                    .map_err(|e| DialectError::operation(OPERATION, key, e))?;
            }
            AssociationStorageStrategy::SharedCollection => self.delete_shared_rows(OPERATION, key)?,
        }
        Ok(())
    }

    fn next_value(&self, request: &NextValueRequest) -> DialectResult<i64> {
        let counters = KvCounters {
            store: &self.store,
            keys: self.keys,
        };
        next_value_with_cas(&counters, request, self.max_attempts)
    }

    fn execute_native_query(&self, query: &NativeQuery, parameters: &QueryParameters) -> DialectResult<TupleIter> {
        let criteria = parse_native_query(query.text(), parameters)?;
        let rows = self.matching(
            "execute_native_query",
            criteria.table(),
            Some(&criteria),
            &TupleContext::default(),
        )?;
        Ok(parameters.select_rows(Box::new(rows.into_iter())))
    }

    fn for_each_tuple(
        &self,
        metadata: &EntityKeyMetadata,
        context: &TupleContext,
        consumer: &mut dyn FnMut(Tuple),
    ) -> DialectResult<()> {
        for tuple in self.matching("for_each_tuple", metadata.table(), None, context)? {
            consumer(tuple);
        }
        Ok(())
    }

    /// Only single-column constraints are enforced. A multi-column constraint
    /// keeps its first column and logs a warning.
    fn define_unique_constraints(&self, constraints: &[UniqueConstraint]) -> DialectResult<()> {
        let mut defined = self.constraints.write();
        for constraint in constraints {
            let column = match constraint.columns.as_slice() {
                [] => {
                    return Err(DialectError::config(format!(
                        "unique constraint {} has no columns",
                        constraint.name
                    )))
                }
                [only] => only,
                [first, ..] => {
                    warn!(
                        constraint = %constraint.name,
                        table = %constraint.table,
                        kept = %first,
                        "multi-column unique constraints are not supported, keeping the first column"
                    );
                    first
                }
            };
            let entries = defined.entry(constraint.table.clone()).or_default();
            entries.retain(|existing| existing.name != constraint.name);
            entries.push(ColumnConstraint {
                name: constraint.name.clone(),
                column: column.clone(),
            });
        }
        Ok(())
    }

    fn optimistic_locking(&self) -> Option<&dyn OptimisticLockingDialect> {
        Some(self)
    }

    fn criteria(&self) -> Option<&dyn CriteriaDialect> {
        Some(self)
    }
}

impl<S: KvStore> OptimisticLockingDialect for DocumentDialect<S> {
    fn update_tuple_with_optimistic_lock(
        &self,
        key: &EntityKey,
        old_lock_state: &Tuple,
        tuple: &Tuple,
        _context: &TupleContext,
    ) -> DialectResult<bool> {
        self.write_entity("update_tuple_with_optimistic_lock", key, |current| match current {
            Some(mut document)
                if !document.association_only && matches_lock_state(&document.fields, old_lock_state) =>
            {
                apply_tuple(&mut document.fields, key, tuple);
                Ok(Change::Write(document))
            }
            _ => Ok(Change::Keep),
        })
    }

    fn remove_tuple_with_optimistic_lock(
        &self,
        key: &EntityKey,
        old_lock_state: &Tuple,
        _context: &TupleContext,
    ) -> DialectResult<bool> {
        let store_key = self.keys.entity(key)?;
        self.update::<EntityDocument, _>("remove_tuple_with_optimistic_lock", key, &store_key, |current| {
            match current {
                Some(document) if !document.association_only && matches_lock_state(&document.fields, old_lock_state) => {
                    Ok(Change::Delete)
                }
                _ => Ok(Change::Keep),
            }
        })
    }
}

impl<S: KvStore> CriteriaDialect for DocumentDialect<S> {
    fn execute_criteria(&self, criteria: &Criteria, context: &TupleContext) -> DialectResult<TupleIter> {
        let mut rows = self.matching("execute_criteria", criteria.table(), Some(criteria), context)?;
        if let Some(limit) = criteria.row_limit() {
            rows.truncate(limit);
        }
        Ok(Box::new(rows.into_iter()))
    }
}

/// Counters stored as 8-byte big-endian integers.
struct KvCounters<'a, S: KvStore> {
    store: &'a S,
    keys: KeySpace,
}

impl<S: KvStore> CounterStore for KvCounters<'_, S> {
    fn load(&self, key: &IdSourceKey) -> DialectResult<Option<i64>> {
        let store_key = self.keys.counter(key)?;
        let Some(bytes) = self
            .store
            .get(&store_key)
            .map_err(|e| DialectError::operation("next_value", key, e))?
        else {
            return Ok(None);
        };
        let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
            DialectError::operation("next_value", key, DocumentError::CorruptedCounter { length: bytes.len() })
        })?;
        Ok(Some(i64::from_be_bytes(raw)))
    }

    fn create_if_absent(&self, key: &IdSourceKey, value: i64) -> DialectResult<bool> {
        self.store
            .put_if_absent(&self.keys.counter(key)?, value.to_be_bytes().to_vec())
            .map_err(|e| DialectError::operation("next_value", key, e))
    }

    fn compare_and_set(&self, key: &IdSourceKey, expected: i64, new: i64) -> DialectResult<bool> {
        self.store
            .compare_and_swap(
                &self.keys.counter(key)?,
                Some(&expected.to_be_bytes()[..]),
                Some(new.to_be_bytes().to_vec()),
            )
            .map_err(|e| DialectError::operation("next_value", key, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlink_codec::Value;
    use gridlink_core::{IdSourceKeyMetadata, OptionsConfig, OptionsLayer, CacheMappingType};
    use gridlink_storage::InMemoryKvStore;
    use std::sync::Arc;

    fn dialect() -> DocumentDialect<InMemoryKvStore> {
        DocumentDialect::new(InMemoryKvStore::new())
    }

    fn user(id: i64) -> EntityKey {
        EntityKey::single("users", "id", id)
    }

    fn insert(dialect: &DocumentDialect<InMemoryKvStore>, id: i64, email: &str) -> DialectResult<()> {
        let mut tuple = Tuple::new();
        tuple.put("email", email);
        dialect.insert_or_update_tuple(&user(id), &tuple, &TupleContext::default())
    }

    #[test]
    fn memory_put_null_and_remove_stay_distinct() {
        let dialect = dialect();
        let mut tuple = Tuple::new();
        tuple.put("nickname", "ada");
        tuple.put("middle_name", "b");
        dialect.insert_or_update_tuple(&user(1), &tuple, &TupleContext::default()).unwrap();

        let mut update = dialect.get_tuple(&user(1), &TupleContext::default()).unwrap().unwrap();
        update.put_null("nickname");
        update.remove("middle_name");
        dialect.insert_or_update_tuple(&user(1), &update, &TupleContext::default()).unwrap();

        let stored = dialect.get_tuple(&user(1), &TupleContext::default()).unwrap().unwrap();
        assert_eq!(stored.get("nickname"), Some(&Value::Null));
        assert_eq!(stored.get("middle_name"), None);
    }

    #[test]
    fn memory_double_insert_fails() {
        let dialect = dialect();
        insert(&dialect, 1, "a@example.com").unwrap();
        let err = insert(&dialect, 1, "b@example.com").unwrap_err();
        assert!(matches!(err, DialectError::TupleAlreadyExists { .. }));
    }

    #[test]
    fn memory_unique_constraint_keeps_first_column() {
        let dialect = dialect();
        dialect
            .define_unique_constraints(&[UniqueConstraint::new("uq_email_name", "users", ["email", "name"])])
            .unwrap();
        insert(&dialect, 1, "a@example.com").unwrap();
        let err = insert(&dialect, 2, "a@example.com").unwrap_err();
        assert!(matches!(err, DialectError::UniqueConstraintViolation { .. }));
        insert(&dialect, 3, "c@example.com").unwrap();
    }

    #[test]
    fn memory_unique_constraint_without_columns_is_rejected() {
        let dialect = dialect();
        let err = dialect
            .define_unique_constraints(&[UniqueConstraint::new("uq_none", "users", Vec::<String>::new())])
            .unwrap_err();
        assert!(matches!(err, DialectError::Config { .. }));
    }

    #[test]
    fn memory_corrupted_counter_is_an_operation_error() {
        let dialect = dialect();
        let key = IdSourceKey::for_sequence(Arc::new(IdSourceKeyMetadata::for_sequence("seq")));
        let store_key = dialect.key_space().counter(&key).unwrap();
        dialect.store().put(&store_key, vec![1, 2, 3]).unwrap();
        let err = dialect.next_value(&NextValueRequest::new(key, 1, 1)).unwrap_err();
        assert!(err.is_operation());
    }

    #[test]
    fn memory_per_kind_mapping_groups_all_tables() {
        let config = Config::new().options(
            OptionsConfig::new().with_global(OptionsLayer::new().cache_mapping(CacheMappingType::CachePerKind)),
        );
        let dialect = DocumentDialect::with_config(InMemoryKvStore::new(), &config);
        insert(&dialect, 1, "a@example.com").unwrap();
        dialect
            .insert_or_update_tuple(&EntityKey::single("orders", "id", 1), &Tuple::new(), &TupleContext::default())
            .unwrap();
        let entities = dialect.store().scan_prefix(b"s8:ENTITIES").unwrap();
        assert_eq!(entities.len(), 2);
    }

    #[test]
    fn memory_closed_store_surfaces_operation_error() {
        let dialect = dialect();
        dialect.store().close();
        let err = dialect.get_tuple(&user(1), &TupleContext::default()).unwrap_err();
        assert!(err.is_operation());
        assert!(err.to_string().starts_with("get_tuple failed for users[id=1]"));
    }
}
