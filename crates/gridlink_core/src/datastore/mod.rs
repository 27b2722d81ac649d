//! Reference datastore and record helpers shared by dialects.

mod map;

pub use map::{MapDatastore, MapDialect, Procedure};

use crate::association::{Association, AssociationOperation};
use crate::key::{EntityKey, RowKey};
use crate::tuple::Tuple;
use gridlink_codec::Value;
use std::collections::BTreeMap;

/// A stored record: column name to value.
pub type Record = BTreeMap<String, Value>;

/// A stored association row.
pub type StoredRow = (RowKey, Record);

/// Applies the tuple's pending operations to `record`, after copying the key
/// columns into it so a record is self-describing.
pub fn apply_tuple(record: &mut Record, key: &EntityKey, tuple: &Tuple) {
    for (column, value) in key.columns() {
        record.insert(column.to_owned(), value.clone());
    }
    for op in tuple.operations() {
        op.apply_to(record);
    }
}

/// Whether `record` still holds every column of `old_lock_state`.
///
/// An explicit null only matches a stored null, never an absent column.
#[must_use]
pub fn matches_lock_state(record: &Record, old_lock_state: &Tuple) -> bool {
    old_lock_state
        .to_map()
        .iter()
        .all(|(column, expected)| record.get(column) == Some(expected))
}

/// Applies an association's row operations to stored rows, keeping storage
/// order and appending new rows. A cleared association starts from nothing.
///
/// Stored rows always carry their row key columns.
pub fn apply_association(rows: &mut Vec<StoredRow>, association: &Association) {
    if association.is_cleared() {
        rows.clear();
    }
    for op in association.operations() {
        match op {
            AssociationOperation::Put { key, tuple } => {
                let mut record = tuple.to_map();
                for (column, value) in key.columns() {
                    record.insert(column.to_owned(), value.clone());
                }
                match rows.iter_mut().find(|(existing, _)| existing == key) {
                    Some((_, stored)) => *stored = record,
                    None => rows.push((key.clone(), record)),
                }
            }
            AssociationOperation::Remove { key } => rows.retain(|(existing, _)| existing != key),
        }
    }
}

/// Rebuilds an association from stored rows.
#[must_use]
pub fn association_from_rows(rows: &[StoredRow]) -> Association {
    Association::loaded(
        rows.iter()
            .map(|(key, record)| (key.clone(), Tuple::loaded(record.clone()))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(n: i64) -> RowKey {
        RowKey::from_pairs("order_lines", [("order_id", Value::Integer(1)), ("line", Value::Integer(n))])
    }

    fn line(qty: i64) -> Tuple {
        let mut tuple = Tuple::new();
        tuple.put("qty", qty);
        tuple
    }

    #[test]
    fn apply_tuple_injects_key_columns() {
        let key = EntityKey::single("orders", "id", 7);
        let mut tuple = Tuple::new();
        tuple.put("total", 12);
        let mut record = Record::new();
        apply_tuple(&mut record, &key, &tuple);
        assert_eq!(record.get("id"), Some(&Value::Integer(7)));
        assert_eq!(record.get("total"), Some(&Value::Integer(12)));
    }

    #[test]
    fn null_and_absent_differ_for_lock_state() {
        let mut old = Record::new();
        old.insert("note".into(), Value::Null);
        old.insert("version".into(), Value::Integer(3));
        let old_state = Tuple::loaded(old);

        let mut record = Record::new();
        record.insert("version".into(), Value::Integer(3));
        assert!(!matches_lock_state(&record, &old_state));

        record.insert("note".into(), Value::Null);
        assert!(matches_lock_state(&record, &old_state));

        record.insert("version".into(), Value::Integer(4));
        assert!(!matches_lock_state(&record, &old_state));
    }

    #[test]
    fn association_operations_replace_append_and_remove() {
        let mut rows = vec![(row(1), line(1).to_map()), (row(2), line(2).to_map())];
        let mut association = association_from_rows(&rows);
        association.put(row(3), line(3));
        association.put(row(1), line(10));
        association.remove(row(2));
        apply_association(&mut rows, &association);

        let keys: Vec<_> = rows.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec![row(1), row(3)]);
        assert_eq!(rows[0].1.get("qty"), Some(&Value::Integer(10)));
    }

    #[test]
    fn cleared_association_drops_stored_rows() {
        let mut rows = vec![(row(1), line(1).to_map())];
        let mut association = association_from_rows(&rows);
        association.clear();
        association.put(row(9), line(9));
        apply_association(&mut rows, &association);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, row(9));
    }
}
