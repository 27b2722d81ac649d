//! Key flattening vectors.
//!
//! Every backend that addresses records by a single string must produce
//! exactly these identifiers, so data written by one stays readable by
//! another.

use gridlink_codec::Value;
use serde::{Deserialize, Serialize};

/// A key and the string it must flatten to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Key segments in order.
    pub segments: Vec<Value>,
    /// Expected flattened form, or `None` if flattening must fail.
    pub expected: Option<String>,
}

impl KeyVector {
    fn new(id: &str, description: &str, segments: Vec<Value>, expected: Option<&str>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            segments,
            expected: expected.map(Into::into),
        }
    }
}

/// Vectors for [`flatten`](gridlink_codec::flatten).
pub fn flatten_vectors() -> Vec<KeyVector> {
    vec![
        KeyVector::new("empty", "no segments", vec![], Some("")),
        KeyVector::new("null", "a null segment", vec![Value::Null], Some("n0:")),
        KeyVector::new("bool", "both booleans", vec![Value::Bool(true), Value::Bool(false)], Some("b1:1b1:0")),
        KeyVector::new(
            "entity",
            "table and integer id",
            vec![Value::from("users"), Value::Integer(42)],
            Some("s5:usersi2:42"),
        ),
        KeyVector::new("negative", "negative integer", vec![Value::Integer(-7)], Some("i2:-7")),
        KeyVector::new("float", "IEEE-754 bits of 1.5", vec![Value::Float(1.5)], Some("d16:3ff8000000000000")),
        KeyVector::new("bytes", "lowercase hex", vec![Value::Bytes(vec![0x00, 0xab])], Some("x4:00ab")),
        KeyVector::new(
            "separator_in_text",
            "text containing what looks like a segment",
            vec![Value::from("a:s1:b")],
            Some("s6:a:s1:b"),
        ),
        KeyVector::new("empty_text", "empty text differs from null", vec![Value::from("")], Some("s0:")),
        KeyVector::new("unicode", "length counts bytes", vec![Value::from("é")], Some("s2:é")),
        KeyVector::new("array", "arrays cannot be key segments", vec![Value::Array(vec![])], None),
    ]
}

/// Pairs of keys that must never flatten to the same string.
pub fn distinct_key_pairs() -> Vec<(Vec<Value>, Vec<Value>)> {
    vec![
        (vec![Value::from("a:b")], vec![Value::from("a"), Value::from("b")]),
        (vec![Value::Integer(1)], vec![Value::from("1")]),
        (vec![Value::Null], vec![Value::from("")]),
        (vec![Value::from("ab"), Value::from("c")], vec![Value::from("a"), Value::from("bc")]),
        (vec![Value::Bool(true)], vec![Value::Integer(1)]),
    ]
}
