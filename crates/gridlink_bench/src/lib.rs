//! Benchmark utilities.

use gridlink_core::{EntityKey, RowKey, Tuple, Value};

/// Generate `count` entity keys of one table.
pub fn generate_keys(table: &str, count: usize) -> Vec<EntityKey> {
    (0..count).map(|i| EntityKey::single(table, "id", i as i64)).collect()
}

/// Generate a tuple with `columns` text columns.
pub fn wide_tuple(columns: usize) -> Tuple {
    let mut tuple = Tuple::new();
    for i in 0..columns {
        tuple.put(format!("column_{i}"), format!("value {i}"));
    }
    tuple
}

/// Generate the row keys of `count` rows of one owner.
pub fn generate_rows(table: &str, owner: i64, count: usize) -> Vec<RowKey> {
    (0..count)
        .map(|i| RowKey::from_pairs(table, [("owner_id", Value::Integer(owner)), ("line", Value::Integer(i as i64))]))
        .collect()
}
