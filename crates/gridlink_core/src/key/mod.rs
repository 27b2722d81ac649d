//! Structural identity values for records, associations and id generators.
//!
//! Every key is an immutable value: a table (or collection) name, an ordered
//! list of column names and a parallel list of column values. Equality and
//! hashing are structural and cover the full column set; the hash is computed
//! once at construction so keys are cheap to use in maps. Keys with different
//! column sets never compare equal.

mod association;
mod entity;
mod id_source;
mod row;

pub use association::{
    AssociationKey, AssociationKeyMetadata, AssociationKeyMetadataBuilder, AssociationKind,
    AssociationType,
};
pub use entity::{EntityKey, EntityKeyMetadata};
pub use id_source::{IdSourceKey, IdSourceKeyMetadata, IdSourceType};
pub use row::RowKey;

use crate::error::{DialectError, DialectResult};
use gridlink_codec::Value;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

fn check_arity(table: &str, column_names: &[String], values: &[Value]) -> DialectResult<()> {
    if column_names.len() == values.len() {
        Ok(())
    } else {
        Err(DialectError::invalid_key(format!(
            "{table}: {} column names but {} values",
            column_names.len(),
            values.len()
        )))
    }
}

fn structural_hash(parts: &[&str], column_names: &[String], values: &[Value]) -> u64 {
    let mut hasher = DefaultHasher::new();
    parts.hash(&mut hasher);
    column_names.hash(&mut hasher);
    values.hash(&mut hasher);
    hasher.finish()
}

fn value_of<'a>(column_names: &[String], values: &'a [Value], column: &str) -> Option<&'a Value> {
    column_names
        .iter()
        .position(|name| name == column)
        .map(|i| &values[i])
}

fn write_columns(
    f: &mut fmt::Formatter<'_>,
    table: &str,
    column_names: &[String],
    values: &[Value],
) -> fmt::Result {
    write!(f, "{table}[")?;
    for (i, (name, value)) in column_names.iter().zip(values).enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{name}={value}")?;
    }
    write!(f, "]")
}
