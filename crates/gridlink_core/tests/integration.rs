//! Integration tests for the dialect handle, delegators and the map dialect.

use gridlink_core::{
    Association, AssociationContext, AssociationKey, AssociationKeyMetadata, AssociationStorageStrategy,
    BackendProfile, Config, Criteria, DialectError, DialectHandle, DialectResult, EntityKey,
    EntityKeyMetadata, Facet, GridDialect, IdSourceKey, IdSourceKeyMetadata, LoggingDialect,
    ManagedTuple, MapDialect, NativeQuery, NextValueRequest, QueryParameters, RowKey, Tuple,
    TupleContext, TupleIter, TupleState, Value,
};
use std::sync::Arc;
use std::thread;

/// A dialect offering no optional facet, backed by a map dialect.
struct PlainDialect {
    inner: MapDialect,
}

impl PlainDialect {
    fn new() -> Self {
        Self {
            inner: MapDialect::new(),
        }
    }
}

impl GridDialect for PlainDialect {
    fn profile(&self) -> BackendProfile {
        BackendProfile::key_value()
    }

    fn get_tuple(&self, key: &EntityKey, context: &TupleContext) -> DialectResult<Option<Tuple>> {
        self.inner.get_tuple(key, context)
    }

    fn insert_or_update_tuple(&self, key: &EntityKey, tuple: &Tuple, context: &TupleContext) -> DialectResult<()> {
        self.inner.insert_or_update_tuple(key, tuple, context)
    }

    fn remove_tuple(&self, key: &EntityKey, context: &TupleContext) -> DialectResult<()> {
        self.inner.remove_tuple(key, context)
    }

    fn get_association(
        &self,
        key: &AssociationKey,
        context: &AssociationContext,
    ) -> DialectResult<Option<Association>> {
        self.inner.get_association(key, context)
    }

    fn insert_or_update_association(
        &self,
        key: &AssociationKey,
        association: &Association,
        context: &AssociationContext,
    ) -> DialectResult<()> {
        self.inner.insert_or_update_association(key, association, context)
    }

    fn remove_association(&self, key: &AssociationKey, context: &AssociationContext) -> DialectResult<()> {
        self.inner.remove_association(key, context)
    }

    fn next_value(&self, request: &NextValueRequest) -> DialectResult<i64> {
        self.inner.next_value(request)
    }

    fn execute_native_query(&self, query: &NativeQuery, parameters: &QueryParameters) -> DialectResult<TupleIter> {
        self.inner.execute_native_query(query, parameters)
    }

    fn for_each_tuple(
        &self,
        metadata: &EntityKeyMetadata,
        context: &TupleContext,
        consumer: &mut dyn FnMut(Tuple),
    ) -> DialectResult<()> {
        self.inner.for_each_tuple(metadata, context, consumer)
    }
}

fn order_key(id: i64) -> EntityKey {
    EntityKey::single("orders", "id", id)
}

fn lines_metadata() -> Arc<AssociationKeyMetadata> {
    Arc::new(
        AssociationKeyMetadata::builder("order_lines", ["order_id"])
            .row_key_columns(["order_id", "line"])
            .role("lines")
            .build(),
    )
}

fn lines_key(order: i64) -> AssociationKey {
    AssociationKey::new(lines_metadata(), vec![Value::Integer(order)], order_key(order)).unwrap()
}

fn line_row(order: i64, line: i64) -> RowKey {
    RowKey::from_pairs("order_lines", [("order_id", order), ("line", line)])
}

#[test]
fn handle_reports_every_facet_of_the_map_dialect() {
    let handle = DialectHandle::new(Arc::new(MapDialect::new()));
    let caps = handle.capabilities();
    assert!(caps.optimistic_locking);
    assert!(caps.stored_procedures);
    assert!(caps.batch);
    assert!(caps.criteria);
    assert!(!caps.sequences);
    assert!(handle.optimistic_locking().is_ok());
    assert!(handle.criteria().is_ok());
}

#[test]
fn missing_facets_yield_unsupported_facet() {
    let handle = DialectHandle::new(Arc::new(PlainDialect::new()));
    assert!(!handle.capabilities().supports(Facet::OptimisticLocking));

    let err = handle.stored_procedures().err().unwrap();
    assert!(matches!(
        err,
        DialectError::UnsupportedFacet {
            facet: Facet::StoredProcedures
        }
    ));
    assert_eq!(err.to_string(), "dialect does not support stored procedures");
    assert!(handle.batchable().is_err());
    assert!(handle.criteria().is_err());
}

#[test]
fn key_value_backend_stores_associations_as_dedicated_records() {
    let handle = DialectHandle::new(Arc::new(MapDialect::new()));
    let context = handle.association_context("orders", &lines_metadata());
    assert_eq!(context.strategy(), AssociationStorageStrategy::DedicatedRecord);
    assert!(!handle
        .dialect()
        .is_stored_in_entity_structure(&lines_metadata(), context.type_context()));
}

#[test]
fn association_rows_round_trip_through_the_map_dialect() {
    let handle = DialectHandle::new(Arc::new(MapDialect::new()));
    let dialect = handle.dialect();
    let context = handle.association_context("orders", &lines_metadata());
    let key = lines_key(1);

    assert!(dialect.get_association(&key, &context).unwrap().is_none());

    let mut association = dialect.create_association(&key, &context).unwrap();
    for line in 1..=3 {
        let mut row = Tuple::new();
        row.put("qty", line * 2);
        association.put(line_row(1, line), row);
    }
    dialect.insert_or_update_association(&key, &association, &context).unwrap();

    let mut loaded = dialect.get_association(&key, &context).unwrap().unwrap();
    assert_eq!(loaded.size(), 3);
    loaded.remove(line_row(1, 2));
    dialect.insert_or_update_association(&key, &loaded, &context).unwrap();

    let reloaded = dialect.get_association(&key, &context).unwrap().unwrap();
    assert_eq!(reloaded.keys(), vec![line_row(1, 1), line_row(1, 3)]);
    assert_eq!(
        reloaded.get(&line_row(1, 3)).and_then(|t| t.get("qty")),
        Some(&Value::Integer(6))
    );

    dialect.remove_association(&key, &context).unwrap();
    assert!(dialect.get_association(&key, &context).unwrap().is_none());
}

#[test]
fn batched_writes_are_invisible_until_flushed() {
    let map = Arc::new(MapDialect::new());
    let handle = DialectHandle::with_config(map.clone(), Config::new().batching(true));
    let batch = handle.batch().unwrap();
    let context = handle.tuple_context("orders");

    batch.begin_batch().unwrap();
    for id in 1..=3 {
        let mut tuple = Tuple::new();
        tuple.put("total", id * 10);
        handle.dialect().insert_or_update_tuple(&order_key(id), &tuple, &context).unwrap();
    }
    handle.dialect().remove_tuple(&order_key(2), &context).unwrap();
    assert_eq!(batch.pending(), 4);
    assert!(handle.dialect().get_tuple(&order_key(1), &context).unwrap().is_none());

    batch.execute_batch().unwrap();
    assert!(!batch.is_batch_open());
    assert_eq!(map.datastore().entity_count(), 2);
    assert!(handle.dialect().get_tuple(&order_key(2), &context).unwrap().is_none());
}

#[test]
fn batch_without_native_facet_is_replayed_in_order() {
    let handle = DialectHandle::with_config(Arc::new(PlainDialect::new()), Config::new().batching(true));
    let batch = handle.batch().unwrap();
    let context = TupleContext::default();

    batch.begin_batch().unwrap();
    let mut first = Tuple::new();
    first.put("status", "new");
    handle.dialect().insert_or_update_tuple(&order_key(1), &first, &context).unwrap();
    let mut second = Tuple::loaded(Default::default());
    second.put("status", "paid");
    handle.dialect().insert_or_update_tuple(&order_key(1), &second, &context).unwrap();
    batch.execute_batch().unwrap();

    let stored = handle.dialect().get_tuple(&order_key(1), &context).unwrap().unwrap();
    assert_eq!(stored.get("status"), Some(&Value::from("paid")));
}

#[test]
fn batch_lifecycle_errors() {
    let handle = DialectHandle::with_config(Arc::new(MapDialect::new()), Config::new().batching(true));
    let batch = handle.batch().unwrap();
    assert!(matches!(batch.execute_batch(), Err(DialectError::InvalidOperation { .. })));

    batch.begin_batch().unwrap();
    assert!(matches!(batch.begin_batch(), Err(DialectError::InvalidOperation { .. })));

    handle
        .dialect()
        .remove_tuple(&order_key(9), &TupleContext::default())
        .unwrap();
    assert_eq!(batch.abort_batch(), 1);
    assert!(!batch.is_batch_open());
}

#[test]
fn failing_batch_stops_at_first_error() {
    let map = Arc::new(MapDialect::new());
    let handle = DialectHandle::with_config(map.clone(), Config::new().batching(true));
    let batch = handle.batch().unwrap();
    let context = TupleContext::default();

    batch.begin_batch().unwrap();
    for _ in 0..2 {
        let mut tuple = Tuple::new();
        tuple.put("total", 1);
        handle.dialect().insert_or_update_tuple(&order_key(1), &tuple, &context).unwrap();
    }
    let mut tuple = Tuple::new();
    tuple.put("total", 3);
    handle.dialect().insert_or_update_tuple(&order_key(3), &tuple, &context).unwrap();

    let err = batch.execute_batch().unwrap_err();
    assert!(matches!(err, DialectError::TupleAlreadyExists { .. }));
    assert!(map.datastore().entity(&order_key(3)).is_none());
}

#[test]
fn logging_dialect_forwards_calls_and_facets() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();

    let map = Arc::new(MapDialect::new());
    let logging = LoggingDialect::new(map.clone(), tracing::info_span!("dialect", backend = "map"));
    let handle = DialectHandle::new(Arc::new(logging));
    assert!(handle.capabilities().stored_procedures);

    let mut tuple = Tuple::new();
    tuple.put("total", 5);
    handle
        .dialect()
        .insert_or_update_tuple(&order_key(5), &tuple, &TupleContext::default())
        .unwrap();
    assert_eq!(map.datastore().entity_count(), 1);
}

#[test]
fn managed_tuple_saves_with_optimistic_lock() {
    let handle = DialectHandle::new(Arc::new(MapDialect::new()));
    let dialect = handle.dialect();
    let context = handle.tuple_context("orders");

    let mut fresh = ManagedTuple::load(dialect, order_key(1), &context).unwrap();
    assert_eq!(fresh.state(), TupleState::Absent);
    fresh.put("version", 1).unwrap();
    fresh.save(dialect, &context).unwrap();
    assert_eq!(fresh.state(), TupleState::Committed);

    let mut first = ManagedTuple::load(dialect, order_key(1), &context).unwrap();
    let mut second = ManagedTuple::load(dialect, order_key(1), &context).unwrap();
    assert_eq!(first.state(), TupleState::Loaded);

    first.put("version", 2).unwrap();
    assert!(first.save_with_lock(handle.optimistic_locking().unwrap(), &context).unwrap());

    second.put("version", 2).unwrap();
    assert!(!second.save_with_lock(handle.optimistic_locking().unwrap(), &context).unwrap());
    assert_eq!(second.state(), TupleState::Modified);
    second.discard().unwrap();
    assert_eq!(second.state(), TupleState::Discarded);
}

#[test]
fn remove_with_stale_lock_state_is_a_miss() {
    let dialect = MapDialect::new();
    let locking = dialect.optimistic_locking().unwrap();
    let context = TupleContext::default();

    let mut tuple = Tuple::new();
    tuple.put("version", 1);
    dialect.insert_or_update_tuple(&order_key(1), &tuple, &context).unwrap();
    let loaded = dialect.get_tuple(&order_key(1), &context).unwrap().unwrap();

    let mut bump = loaded.clone();
    bump.put("version", 2);
    assert!(locking
        .update_tuple_with_optimistic_lock(&order_key(1), &loaded, &bump, &context)
        .unwrap());
    assert!(!locking
        .remove_tuple_with_optimistic_lock(&order_key(1), &loaded, &context)
        .unwrap());
    assert!(!locking
        .remove_tuple_with_optimistic_lock(&order_key(7), &loaded, &context)
        .unwrap());
}

#[test]
fn criteria_select_matching_rows() {
    let handle = DialectHandle::new(Arc::new(MapDialect::new()));
    let context = handle.tuple_context("orders");
    for (id, status) in [(1, "new"), (2, "paid"), (3, "new"), (4, "shipped")] {
        let mut tuple = Tuple::new();
        tuple.put("status", status);
        if id == 4 {
            tuple.put_null("coupon");
        }
        handle.dialect().insert_or_update_tuple(&order_key(id), &tuple, &context).unwrap();
    }

    let criteria = handle.criteria().unwrap();
    let new_orders: Vec<_> = criteria
        .execute_criteria(&Criteria::new("orders").eq("status", "new"), &context)
        .unwrap()
        .collect();
    assert_eq!(new_orders.len(), 2);

    let nulls: Vec<_> = criteria
        .execute_criteria(&Criteria::new("orders").is_null("coupon"), &context)
        .unwrap()
        .collect();
    assert_eq!(nulls.len(), 4);

    let limited: Vec<_> = criteria
        .execute_criteria(
            &Criteria::new("orders")
                .is_in("status", [Value::from("new"), Value::from("paid")])
                .limit(2),
            &context,
        )
        .unwrap()
        .collect();
    assert_eq!(limited.len(), 2);
}

#[test]
fn for_each_tuple_scans_one_table() {
    let dialect = MapDialect::new();
    let context = TupleContext::default();
    for id in 1..=3 {
        dialect
            .insert_or_update_tuple(&order_key(id), &Tuple::new(), &context)
            .unwrap();
    }
    dialect
        .insert_or_update_tuple(&EntityKey::single("users", "id", 1), &Tuple::new(), &context)
        .unwrap();

    let mut seen = 0;
    dialect
        .for_each_tuple(&EntityKeyMetadata::new("orders", ["id"]), &context, &mut |_| seen += 1)
        .unwrap();
    assert_eq!(seen, 3);
}

#[test]
fn concurrent_next_value_is_gapless() {
    let dialect = Arc::new(MapDialect::new());
    let metadata = Arc::new(IdSourceKeyMetadata::for_table("id_sequences", "sequence_name", "next_val"));
    let request = NextValueRequest::new(IdSourceKey::for_table(metadata, "orders"), 1, 1);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let dialect = Arc::clone(&dialect);
            let request = request.clone();
            thread::spawn(move || {
                (0..50)
                    .map(|_| dialect.next_value(&request).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut values: Vec<i64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
    values.sort_unstable();
    assert_eq!(values, (1..=400).collect::<Vec<_>>());
}
