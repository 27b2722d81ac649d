//! Property-based test generators using proptest.
//!
//! Provides strategies for keys, values, tuple edits and association
//! metadata, plus the reference model the edits are checked against.

use gridlink_core::{
    AssociationDocumentStorageType, AssociationKeyMetadata, AssociationKind, AssociationStorageType,
    AssociationType, BackendProfile, CacheMappingType, EffectiveOptions, EntityKey, MapStorageType, OptionsLayer,
    ScalarType, Tuple, Value,
};
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Strategy for table and column names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for values that may take part in a key.
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        prop::num::f64::NORMAL.prop_map(Value::Float),
        ".{0,12}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..12).prop_map(Value::Bytes),
    ]
}

/// Strategy for lists of key segments.
pub fn key_segments_strategy() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(scalar_value_strategy(), 0..6)
}

/// Strategy for single-column entity keys.
pub fn entity_key_strategy() -> impl Strategy<Value = EntityKey> {
    (name_strategy(), any::<i64>()).prop_map(|(table, id)| EntityKey::single(&table, "id", id))
}

/// One change to a tuple.
#[derive(Debug, Clone)]
pub enum TupleEdit {
    /// Set a column.
    Put(String, Value),
    /// Set a column to an explicit null.
    PutNull(String),
    /// Remove a column.
    Remove(String),
}

/// Strategy for edits over a small set of columns, so edits collide often.
pub fn tuple_edit_strategy() -> impl Strategy<Value = TupleEdit> {
    let column = prop::sample::select(vec!["a", "b", "c", "d"]).prop_map(str::to_owned);
    prop_oneof![
        (column.clone(), scalar_value_strategy().prop_filter("not null", |v| !v.is_null()))
            .prop_map(|(c, v)| TupleEdit::Put(c, v)),
        column.clone().prop_map(TupleEdit::PutNull),
        column.prop_map(TupleEdit::Remove),
    ]
}

/// Strategy for sequences of edits.
pub fn tuple_edits_strategy() -> impl Strategy<Value = Vec<TupleEdit>> {
    prop::collection::vec(tuple_edit_strategy(), 0..24)
}

/// Applies `edits` to `tuple` in order.
pub fn apply_edits(tuple: &mut Tuple, edits: &[TupleEdit]) {
    for edit in edits {
        match edit {
            TupleEdit::Put(column, value) => tuple.put(column.clone(), value.clone()),
            TupleEdit::PutNull(column) => tuple.put_null(column.clone()),
            TupleEdit::Remove(column) => tuple.remove(column.clone()),
        }
    }
}

/// The columns a record holds after `edits` are written over `initial`.
pub fn expected_columns(initial: &BTreeMap<String, Value>, edits: &[TupleEdit]) -> BTreeMap<String, Value> {
    let mut columns = initial.clone();
    for edit in edits {
        match edit {
            TupleEdit::Put(column, value) => {
                columns.insert(column.clone(), value.clone());
            }
            TupleEdit::PutNull(column) => {
                columns.insert(column.clone(), Value::Null);
            }
            TupleEdit::Remove(column) => {
                columns.remove(column);
            }
        }
    }
    columns
}

/// Strategy for association metadata covering every kind, type and index
/// shape.
pub fn association_metadata_strategy() -> impl Strategy<Value = AssociationKeyMetadata> {
    let kind = prop_oneof![
        Just(AssociationKind::Association),
        Just(AssociationKind::EmbeddedCollection)
    ];
    let association_type = prop_oneof![
        Just(AssociationType::Bag),
        Just(AssociationType::Set),
        Just(AssociationType::List),
        Just(AssociationType::Map),
        Just(AssociationType::OneToOne),
    ];
    let index = prop::option::of(prop::sample::select(ScalarType::ALL.to_vec()));
    (kind, association_type, index, any::<bool>()).prop_map(|(kind, association_type, index, inverse)| {
        let mut builder = AssociationKeyMetadata::builder("owner_items", ["owner_id"])
            .row_key_columns(["owner_id", "item"])
            .role("items")
            .kind(kind)
            .association_type(association_type)
            .inverse(inverse);
        if let Some(ty) = index {
            builder = builder.index_column("item", ty);
        }
        builder.build()
    })
}

/// Strategy for fully resolved options.
pub fn effective_options_strategy() -> impl Strategy<Value = EffectiveOptions> {
    (
        prop_oneof![
            Just(AssociationStorageType::InEntity),
            Just(AssociationStorageType::AssociationDocument)
        ],
        prop_oneof![
            Just(AssociationDocumentStorageType::GlobalCollection),
            Just(AssociationDocumentStorageType::CollectionPerAssociation)
        ],
        prop_oneof![Just(MapStorageType::ByKey), Just(MapStorageType::AsList)],
        prop_oneof![
            Just(CacheMappingType::CachePerTable),
            Just(CacheMappingType::CachePerKind)
        ],
    )
        .prop_map(
            |(association_storage, association_document_storage, map_storage, cache_mapping)| EffectiveOptions {
                association_storage,
                association_document_storage,
                map_storage,
                cache_mapping,
            },
        )
}

/// Strategy for backend profiles.
pub fn backend_profile_strategy() -> impl Strategy<Value = BackendProfile> {
    (any::<bool>(), any::<bool>()).prop_map(|(can_embed, can_share)| BackendProfile {
        can_embed,
        can_share,
        defaults: OptionsLayer::new(),
    })
}
