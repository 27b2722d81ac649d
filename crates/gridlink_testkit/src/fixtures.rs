//! Fixtures for dialects, keys and rows.
//!
//! Rows built here follow the convention every dialect relies on: a row key
//! uses the association metadata's table and row key columns, in order.

use gridlink_core::{
    AssociationKey, AssociationKeyMetadata, Config, DialectHandle, EntityKey, GridDialect, MapDialect, RowKey,
    Tuple, Value,
};
use gridlink_document::DocumentDialect;
use gridlink_storage::InMemoryKvStore;
use std::sync::Arc;

/// Creates an in-memory map dialect.
pub fn map_dialect() -> Arc<dyn GridDialect> {
    Arc::new(MapDialect::new())
}

/// Creates a document dialect over a fresh in-memory store.
pub fn document_dialect() -> Arc<dyn GridDialect> {
    document_dialect_with(&Config::default())
}

/// Creates a document dialect over a fresh in-memory store with `config`.
pub fn document_dialect_with(config: &Config) -> Arc<dyn GridDialect> {
    Arc::new(DocumentDialect::with_config(InMemoryKvStore::new(), config))
}

/// Wraps `dialect` in a handle with the default configuration.
pub fn handle(dialect: Arc<dyn GridDialect>) -> DialectHandle {
    DialectHandle::new(dialect)
}

/// Builds a tuple from `(column, value)` pairs.
pub fn tuple_of(pairs: &[(&str, Value)]) -> Tuple {
    let mut tuple = Tuple::new();
    for (column, value) in pairs {
        tuple.put(*column, value.clone());
    }
    tuple
}

/// Metadata of an `order -> lines` association stored in `table`.
///
/// The association key is `order_id`; rows are keyed by `(order_id, line)`.
pub fn order_lines_metadata(table: &str) -> Arc<AssociationKeyMetadata> {
    Arc::new(
        AssociationKeyMetadata::builder(table, ["order_id"])
            .row_key_columns(["order_id", "line"])
            .role("lines")
            .build(),
    )
}

/// The lines association of order `order`.
pub fn order_lines_key(metadata: &Arc<AssociationKeyMetadata>, order: i64) -> AssociationKey {
    AssociationKey::new(
        Arc::clone(metadata),
        vec![Value::Integer(order)],
        EntityKey::single("orders", "id", order),
    )
    .expect("order lines key matches its metadata")
}

/// Row key of line `line` of order `order`.
pub fn order_line_row(metadata: &AssociationKeyMetadata, order: i64, line: i64) -> RowKey {
    RowKey::from_pairs(metadata.table(), [("order_id", order), ("line", line)])
}

/// Row content of a line.
pub fn order_line(order: i64, line: i64, quantity: i64) -> Tuple {
    tuple_of(&[
        ("order_id", Value::Integer(order)),
        ("line", Value::Integer(line)),
        ("quantity", Value::Integer(quantity)),
    ])
}
