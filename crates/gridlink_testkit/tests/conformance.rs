//! Runs the conformance suite and shared properties against every dialect.

use gridlink_codec::{flatten, unflatten};
use gridlink_core::{
    resolve_strategy, AssociationKind, AssociationStorageStrategy, AssociationType, EntityKey,
    MapStorageType, RowLayout, Tuple, TupleContext, Value,
};
use gridlink_testkit::prelude::*;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

#[test]
fn map_dialect_conforms() {
    let mut suite = ConformanceSuite::new(map_dialect());
    suite.run_all();
    assert!(suite.all_passed(), "{}", suite.summary());
}

#[test]
fn document_dialect_conforms() {
    let mut suite = ConformanceSuite::new(document_dialect()).with_id_load(16, 50);
    suite.run_all();
    assert!(suite.all_passed(), "{}", suite.summary());
}

#[test]
fn summary_lists_every_check() {
    let mut suite = ConformanceSuite::new(map_dialect());
    let results = suite.run_all();
    assert_eq!(results.len(), suite.results().len());
    let summary = suite.summary();
    assert!(summary.starts_with(&format!("{0}/{0} checks passed", results.len())));
    assert!(summary.contains("[PASS] concurrent_next_value"));
}

#[test]
fn flatten_vectors_hold() {
    for vector in flatten_vectors() {
        let actual = flatten(&vector.segments).ok();
        assert_eq!(actual, vector.expected, "vector {}", vector.id);
        if let Some(expected) = &vector.expected {
            assert_eq!(unflatten(expected).unwrap(), vector.segments, "vector {}", vector.id);
        }
    }
}

#[test]
fn distinct_keys_flatten_apart() {
    for (a, b) in distinct_key_pairs() {
        assert_ne!(flatten(&a).unwrap(), flatten(&b).unwrap());
    }
}

#[test]
fn stress_loses_no_updates_or_ids() {
    let config = StressConfig {
        operations: 50,
        threads: 4,
        record_count: 4,
    };
    for dialect in [map_dialect(), document_dialect()] {
        let updates = stress_concurrent_updates(Arc::clone(&dialect), &config);
        assert_eq!(updates.failed_ops, 0, "{updates:?}");
        let ids = stress_next_value(dialect, &config);
        assert_eq!(ids.failed_ops, 0, "{ids:?}");
        assert_eq!(ids.successful_ops, 200);
    }
}

#[test]
fn populate_writes_every_record() {
    let dialect = document_dialect();
    let written = populate(dialect.as_ref(), "cities", 5, &[("country", Value::from("uk"))]);
    assert_eq!(written, 5);
    let stored = dialect
        .get_tuple(&EntityKey::single("cities", "id", 4), &TupleContext::default())
        .unwrap()
        .unwrap();
    assert_eq!(stored.get("country"), Some(&Value::from("uk")));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn written_tuples_read_back_as_modelled(edits in tuple_edits_strategy()) {
        for dialect in [map_dialect(), document_dialect()] {
            let key = EntityKey::single("modelled", "id", 1);
            let context = TupleContext::default();
            let initial = tuple_of(&[("a", Value::Integer(1)), ("b", Value::from("two"))]);
            dialect.insert_or_update_tuple(&key, &initial, &context).unwrap();

            let mut tuple = dialect.get_tuple(&key, &context).unwrap().unwrap();
            apply_edits(&mut tuple, &edits);
            dialect.insert_or_update_tuple(&key, &tuple, &context).unwrap();

            let stored = dialect.get_tuple(&key, &context).unwrap().unwrap();
            let mut start = BTreeMap::new();
            start.insert("a".to_owned(), Value::Integer(1));
            start.insert("b".to_owned(), Value::from("two"));
            let mut expected = expected_columns(&start, &edits);
            expected.insert("id".to_owned(), Value::Integer(1));
            prop_assert_eq!(stored.to_map(), expected);
        }
    }

    #[test]
    fn unflatten_inverts_flatten(segments in key_segments_strategy()) {
        let flat = flatten(&segments).unwrap();
        prop_assert_eq!(unflatten(&flat).unwrap(), segments);
    }

    #[test]
    fn strategies_respect_backend_capabilities(
        metadata in association_metadata_strategy(),
        options in effective_options_strategy(),
        profile in backend_profile_strategy(),
    ) {
        let strategy = resolve_strategy(&metadata, &options, &profile);
        match strategy {
            AssociationStorageStrategy::InEntity { layout } => {
                prop_assert!(profile.can_embed);
                if layout == RowLayout::ByNaturalKey {
                    prop_assert_eq!(metadata.association_type(), AssociationType::Map);
                    prop_assert_eq!(options.map_storage, MapStorageType::ByKey);
                    prop_assert!(metadata.has_single_string_index());
                }
            }
            AssociationStorageStrategy::SharedCollection => prop_assert!(profile.can_share),
            AssociationStorageStrategy::DedicatedRecord => {}
        }
        let forced = metadata.is_one_to_one() || metadata.kind() == AssociationKind::EmbeddedCollection;
        if forced && profile.can_embed {
            prop_assert!(strategy.is_in_entity());
        }
    }

    #[test]
    fn fresh_tuples_hold_their_edits(edits in tuple_edits_strategy()) {
        let mut tuple = Tuple::new();
        apply_edits(&mut tuple, &edits);
        prop_assert_eq!(tuple.to_map(), expected_columns(&BTreeMap::new(), &edits));
    }
}
