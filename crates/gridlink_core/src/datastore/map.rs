//! In-memory reference dialect.

use super::{apply_association, apply_tuple, association_from_rows, matches_lock_state, Record, StoredRow};
use crate::association::Association;
use crate::batch::OperationsQueue;
use crate::dialect::{
    AssociationContext, BatchableDialect, Criteria, CriteriaDialect, GridDialect, NativeQuery,
    OptimisticLockingDialect, ProcedureParameters, QueryParameters,
    StoredProcedureDialect, TupleContext, TupleIter,
};
use crate::error::{DialectError, DialectResult};
use crate::idgen::NextValueRequest;
use crate::key::{AssociationKey, EntityKey, EntityKeyMetadata, IdSourceKey};
use crate::strategy::BackendProfile;
use crate::tuple::{SnapshotType, Tuple};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// A stored procedure of the [`MapDialect`].
pub type Procedure = Arc<dyn Fn(&ProcedureParameters) -> DialectResult<Vec<Tuple>> + Send + Sync>;

/// Thread-safe in-memory storage for records, associations and counters.
#[derive(Debug, Default)]
pub struct MapDatastore {
    entities: RwLock<HashMap<EntityKey, Record>>,
    associations: RwLock<HashMap<AssociationKey, Vec<StoredRow>>>,
    counters: RwLock<HashMap<IdSourceKey, Arc<AtomicI64>>>,
}

impl MapDatastore {
    /// Creates an empty datastore.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the stored record.
    #[must_use]
    pub fn entity(&self, key: &EntityKey) -> Option<Record> {
        self.entities.read().get(key).cloned()
    }

    /// Returns a copy of the stored association rows.
    #[must_use]
    pub fn association(&self, key: &AssociationKey) -> Option<Vec<StoredRow>> {
        self.associations.read().get(key).cloned()
    }

    /// Number of stored records.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.read().len()
    }

    /// Number of stored associations.
    #[must_use]
    pub fn association_count(&self) -> usize {
        self.associations.read().len()
    }

    /// Drops everything.
    pub fn clear(&self) {
        self.entities.write().clear();
        self.associations.write().clear();
        self.counters.write().clear();
        debug!("map datastore cleared");
    }

    /// Creates the counter with `initial` and returns it on first access;
    /// afterwards adds `increment` and returns the new value.
    fn next_counter_value(&self, key: &IdSourceKey, initial: i64, increment: i64) -> DialectResult<i64> {
        let existing = self.counters.read().get(key).cloned();
        let counter = match existing {
            Some(counter) => counter,
            None => {
                let mut counters = self.counters.write();
                match counters.get(key) {
                    Some(counter) => Arc::clone(counter),
                    None => {
                        counters.insert(key.clone(), Arc::new(AtomicI64::new(initial)));
                        return Ok(initial);
                    }
                }
            }
        };
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_add(increment))
            .map(|previous| previous + increment)
            .map_err(|_| DialectError::id_generation(key, "counter overflow"))
    }

    fn matching(&self, table: &str, criteria: Option<&Criteria>, context: &TupleContext) -> Vec<Tuple> {
        let entities = self.entities.read();
        let mut rows: Vec<(String, Tuple)> = entities
            .iter()
            .filter(|(key, _)| key.table() == table)
            .map(|(key, record)| (key.to_string(), select(record, context)))
            .filter(|(_, tuple)| criteria.map_or(true, |c| c.matches(tuple)))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows.into_iter().map(|(_, tuple)| tuple).collect()
    }
}

fn select(record: &Record, context: &TupleContext) -> Tuple {
    Tuple::loaded(
        record
            .iter()
            .filter(|(column, _)| context.is_selectable(column))
            .map(|(column, value)| (column.clone(), value.clone()))
            .collect(),
    )
}

/// Key-value dialect over a [`MapDatastore`]. Offers every facet.
///
/// Native queries name a table; named parameters become equality filters.
///
/// ```
/// use gridlink_core::{EntityKey, GridDialect, MapDialect, Tuple, TupleContext};
///
/// let dialect = MapDialect::new();
/// let key = EntityKey::single("users", "id", 1);
/// let mut tuple = Tuple::new();
/// tuple.put("name", "ada");
/// dialect.insert_or_update_tuple(&key, &tuple, &TupleContext::default()).unwrap();
///
/// let stored = dialect.get_tuple(&key, &TupleContext::default()).unwrap().unwrap();
/// assert_eq!(stored.get("name").and_then(|v| v.as_text()), Some("ada"));
/// ```
pub struct MapDialect {
    store: Arc<MapDatastore>,
    procedures: RwLock<HashMap<String, Procedure>>,
}

impl MapDialect {
    /// Creates a dialect over a fresh datastore.
    #[must_use]
    pub fn new() -> Self {
        Self::with_datastore(Arc::new(MapDatastore::new()))
    }

    /// Creates a dialect over a shared datastore.
    #[must_use]
    pub fn with_datastore(store: Arc<MapDatastore>) -> Self {
        Self {
            store,
            procedures: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the datastore.
    #[must_use]
    pub fn datastore(&self) -> &Arc<MapDatastore> {
        &self.store
    }

    /// Registers a stored procedure under `name`, replacing any previous one.
    pub fn register_procedure<F>(&self, name: impl Into<String>, procedure: F)
    where
        F: Fn(&ProcedureParameters) -> DialectResult<Vec<Tuple>> + Send + Sync + 'static,
    {
        self.procedures.write().insert(name.into(), Arc::new(procedure));
    }
}

impl Default for MapDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MapDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapDialect")
            .field("entities", &self.store.entity_count())
            .field("associations", &self.store.association_count())
            .field("procedures", &self.procedures.read().len())
            .finish()
    }
}

impl GridDialect for MapDialect {
    fn profile(&self) -> BackendProfile {
        BackendProfile::key_value()
    }

    fn get_tuple(&self, key: &EntityKey, context: &TupleContext) -> DialectResult<Option<Tuple>> {
        Ok(self.store.entities.read().get(key).map(|record| select(record, context)))
    }

    fn insert_or_update_tuple(&self, key: &EntityKey, tuple: &Tuple, _context: &TupleContext) -> DialectResult<()> {
        let mut entities = self.store.entities.write();
        if tuple.snapshot_type() == SnapshotType::Insert && entities.contains_key(key) {
            return Err(DialectError::tuple_already_exists(key));
        }
        apply_tuple(entities.entry(key.clone()).or_default(), key, tuple);
        Ok(())
    }

    fn remove_tuple(&self, key: &EntityKey, _context: &TupleContext) -> DialectResult<()> {
        self.store.entities.write().remove(key);
        Ok(())
    }

    fn get_association(
        &self,
        key: &AssociationKey,
        _context: &AssociationContext,
    ) -> DialectResult<Option<Association>> {
        Ok(self
            .store
            .associations
            .read()
            .get(key)
            .map(|rows| association_from_rows(rows)))
    }

    fn insert_or_update_association(
        &self,
        key: &AssociationKey,
        association: &Association,
        _context: &AssociationContext,
    ) -> DialectResult<()> {
        let mut associations = self.store.associations.write();
        apply_association(associations.entry(key.clone()).or_default(), association);
        Ok(())
    }

    fn remove_association(&self, key: &AssociationKey, _context: &AssociationContext) -> DialectResult<()> {
        self.store.associations.write().remove(key);
        Ok(())
    }

    fn next_value(&self, request: &NextValueRequest) -> DialectResult<i64> {
        self.store.next_counter_value(
            request.key(),
            request.initial_value(),
            i64::from(request.increment()),
        )
    }

    fn execute_native_query(&self, query: &NativeQuery, parameters: &QueryParameters) -> DialectResult<TupleIter> {
        let table = query.text().trim();
        if table.is_empty() || table.contains(char::is_whitespace) {
            return Err(DialectError::invalid_query(format!(
                "expected a table name, got `{}`",
                query.text()
            )));
        }
        let mut criteria = Criteria::new(table);
        for (column, value) in parameters.named() {
            criteria = criteria.eq(column.clone(), value.clone());
        }
        let rows = self.store.matching(table, Some(&criteria), &TupleContext::default());
        Ok(parameters.select_rows(Box::new(rows.into_iter())))
    }

    fn for_each_tuple(
        &self,
        metadata: &EntityKeyMetadata,
        context: &TupleContext,
        consumer: &mut dyn FnMut(Tuple),
    ) -> DialectResult<()> {
        for tuple in self.store.matching(metadata.table(), None, context) {
            consumer(tuple);
        }
        Ok(())
    }

    fn optimistic_locking(&self) -> Option<&dyn OptimisticLockingDialect> {
        Some(self)
    }

    fn stored_procedures(&self) -> Option<&dyn StoredProcedureDialect> {
        Some(self)
    }

    fn batchable(&self) -> Option<&dyn BatchableDialect> {
        Some(self)
    }

    fn criteria(&self) -> Option<&dyn CriteriaDialect> {
        Some(self)
    }
}

impl OptimisticLockingDialect for MapDialect {
    fn update_tuple_with_optimistic_lock(
        &self,
        key: &EntityKey,
        old_lock_state: &Tuple,
        tuple: &Tuple,
        _context: &TupleContext,
    ) -> DialectResult<bool> {
        let mut entities = self.store.entities.write();
        match entities.get_mut(key) {
            Some(record) if matches_lock_state(record, old_lock_state) => {
                apply_tuple(record, key, tuple);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn remove_tuple_with_optimistic_lock(
        &self,
        key: &EntityKey,
        old_lock_state: &Tuple,
        _context: &TupleContext,
    ) -> DialectResult<bool> {
        let mut entities = self.store.entities.write();
        match entities.get(key) {
            Some(record) if matches_lock_state(record, old_lock_state) => {
                entities.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl StoredProcedureDialect for MapDialect {
    fn call_stored_procedure(
        &self,
        name: &str,
        parameters: &ProcedureParameters,
        _context: &TupleContext,
    ) -> DialectResult<TupleIter> {
        let procedure = self
            .procedures
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| DialectError::invalid_query(format!("unknown stored procedure `{name}`")))?;
        let tuples = procedure(parameters)?;
        Ok(Box::new(tuples.into_iter()))
    }
}

impl BatchableDialect for MapDialect {
    fn execute_batch(&self, queue: &mut OperationsQueue) -> DialectResult<()> {
        debug!(operations = queue.len(), "executing map batch");
        queue.replay(self)
    }
}

impl CriteriaDialect for MapDialect {
    fn execute_criteria(&self, criteria: &Criteria, context: &TupleContext) -> DialectResult<TupleIter> {
        let mut rows = self.store.matching(criteria.table(), Some(criteria), context);
        if let Some(limit) = criteria.row_limit() {
            rows.truncate(limit);
        }
        Ok(Box::new(rows.into_iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::IdSourceKeyMetadata;
    use gridlink_codec::Value;

    fn ctx() -> TupleContext {
        TupleContext::default()
    }

    fn insert(dialect: &MapDialect, id: i64, name: &str) {
        let mut tuple = Tuple::new();
        tuple.put("name", name);
        dialect
            .insert_or_update_tuple(&EntityKey::single("users", "id", id), &tuple, &ctx())
            .unwrap();
    }

    #[test]
    fn memory_insert_then_read() {
        let dialect = MapDialect::new();
        insert(&dialect, 1, "ada");
        let tuple = dialect
            .get_tuple(&EntityKey::single("users", "id", 1), &ctx())
            .unwrap()
            .unwrap();
        assert_eq!(tuple.get("name"), Some(&Value::from("ada")));
        assert_eq!(tuple.get("id"), Some(&Value::Integer(1)));
    }

    #[test]
    fn memory_double_insert_fails() {
        let dialect = MapDialect::new();
        insert(&dialect, 1, "ada");
        let mut tuple = Tuple::new();
        tuple.put("name", "grace");
        let err = dialect
            .insert_or_update_tuple(&EntityKey::single("users", "id", 1), &tuple, &ctx())
            .unwrap_err();
        assert!(matches!(err, DialectError::TupleAlreadyExists { .. }));
    }

    #[test]
    fn memory_selectable_columns_filter_reads() {
        let dialect = MapDialect::new();
        insert(&dialect, 1, "ada");
        let context = ctx().with_selectable_columns(["name"]);
        let tuple = dialect
            .get_tuple(&EntityKey::single("users", "id", 1), &context)
            .unwrap()
            .unwrap();
        assert_eq!(tuple.column_names().len(), 1);
    }

    #[test]
    fn memory_counter_starts_at_initial_value() {
        let dialect = MapDialect::new();
        let key = IdSourceKey::for_sequence(Arc::new(IdSourceKeyMetadata::for_sequence("seq")));
        let request = NextValueRequest::new(key, 10, 5);
        let values: Vec<_> = (0..3).map(|_| dialect.next_value(&request).unwrap()).collect();
        assert_eq!(values, vec![5, 15, 25]);
    }

    #[test]
    fn memory_counter_overflow_is_an_error() {
        let dialect = MapDialect::new();
        let key = IdSourceKey::for_sequence(Arc::new(IdSourceKeyMetadata::for_sequence("seq")));
        let request = NextValueRequest::new(key, 1, i64::MAX);
        assert_eq!(dialect.next_value(&request).unwrap(), i64::MAX);
        let err = dialect.next_value(&request).unwrap_err();
        assert!(matches!(err, DialectError::IdGeneration { .. }));
    }

    #[test]
    fn memory_native_query_filters_by_parameters() {
        let dialect = MapDialect::new();
        insert(&dialect, 1, "ada");
        insert(&dialect, 2, "grace");
        insert(&dialect, 3, "ada");
        let rows: Vec<_> = dialect
            .execute_native_query(&NativeQuery::new("users"), &QueryParameters::new().with("name", "ada"))
            .unwrap()
            .collect();
        assert_eq!(rows.len(), 2);

        let err = dialect
            .execute_native_query(&NativeQuery::new("select *"), &QueryParameters::new())
            .err()
            .unwrap();
        assert!(matches!(err, DialectError::InvalidQuery { .. }));
    }

    #[test]
    fn memory_unknown_procedure_is_invalid_query() {
        let dialect = MapDialect::new();
        let err = dialect
            .call_stored_procedure("missing", &ProcedureParameters::none(), &ctx())
            .err()
            .unwrap();
        assert!(matches!(err, DialectError::InvalidQuery { .. }));
    }

    #[test]
    fn memory_procedure_receives_parameters() {
        let dialect = MapDialect::new();
        dialect.register_procedure("echo", |params| {
            let mut tuple = Tuple::new();
            tuple.put("value", params.positional(0).cloned().unwrap_or(Value::Null));
            Ok(vec![tuple])
        });
        let rows: Vec<_> = dialect
            .call_stored_procedure("echo", &ProcedureParameters::Positional(vec![Value::Integer(4)]), &ctx())
            .unwrap()
            .collect();
        assert_eq!(rows[0].get("value"), Some(&Value::Integer(4)));
    }
}
