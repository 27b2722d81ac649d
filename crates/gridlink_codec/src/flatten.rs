//! Collision-safe flattening of composite keys into one string.
//!
//! Backends that address records by a single string identifier need a way to
//! turn a list of key values into that identifier. Every segment is encoded as
//!
//! ```text
//! <tag><len>:<payload>
//! ```
//!
//! where `tag` is one ASCII letter naming the value kind, `len` is the decimal
//! byte length of `payload`, and `payload` is the textual form of the value.
//! Because every segment carries its own length no separator ever needs
//! escaping, and two different value lists can never flatten to the same
//! string. Flattening `a ++ b` equals flattening `a` followed by flattening
//! `b`, so a flattened prefix is a valid range-scan prefix.
//!
//! | tag | kind | payload |
//! |---|---|---|
//! | `n` | null | empty |
//! | `b` | bool | `1` or `0` |
//! | `i` | integer | decimal |
//! | `d` | float | 16 lowercase hex digits of the IEEE-754 bits |
//! | `s` | text | the text itself |
//! | `x` | bytes | lowercase hex |
//!
//! Arrays and maps cannot take part in a key.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use std::fmt::Write;

/// Flattens key values into a single collision-safe string.
///
/// # Errors
///
/// Returns [`CodecError::UnsupportedType`] if a value is an array or a map.
pub fn flatten(values: &[Value]) -> CodecResult<String> {
    let mut out = String::new();
    for value in values {
        push_segment(&mut out, value)?;
    }
    Ok(out)
}

/// Flattens a single value. Equivalent to `flatten(&[value])`.
///
/// # Errors
///
/// Returns [`CodecError::UnsupportedType`] for arrays and maps.
pub fn flatten_one(value: &Value) -> CodecResult<String> {
    let mut out = String::new();
    push_segment(&mut out, value)?;
    Ok(out)
}

/// Parses a string produced by [`flatten`] back into its values.
///
/// # Errors
///
/// Returns [`CodecError::MalformedKey`] on any structural problem.
pub fn unflatten(key: &str) -> CodecResult<Vec<Value>> {
    let bytes = key.as_bytes();
    let mut values = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        let tag = bytes[pos];
        pos += 1;

        let digits_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos == digits_start {
            return Err(CodecError::malformed_key(start, "missing segment length"));
        }
        if pos >= bytes.len() || bytes[pos] != b':' {
            return Err(CodecError::malformed_key(start, "expected ':' after length"));
        }
        let len: usize = key[digits_start..pos]
            .parse()
            .map_err(|_| CodecError::malformed_key(start, "segment length overflow"))?;
        pos += 1;

        let end = pos
            .checked_add(len)
            .filter(|end| *end <= bytes.len())
            .ok_or_else(|| CodecError::malformed_key(start, "segment runs past end of key"))?;
        let payload = key
            .get(pos..end)
            .ok_or_else(|| CodecError::malformed_key(start, "segment splits a character"))?;
        pos = end;

        values.push(parse_payload(start, tag, payload)?);
    }

    Ok(values)
}

fn push_segment(out: &mut String, value: &Value) -> CodecResult<()> {
    let (tag, payload) = match value {
        Value::Null => ('n', String::new()),
        Value::Bool(b) => ('b', if *b { "1" } else { "0" }.to_string()),
        Value::Integer(n) => ('i', n.to_string()),
        Value::Float(x) => ('d', format!("{:016x}", x.to_bits())),
        Value::Text(s) => ('s', s.clone()),
        Value::Bytes(b) => ('x', to_hex(b)),
        Value::Array(_) | Value::Map(_) => {
            return Err(CodecError::unsupported_type(format!(
                "{} as key segment",
                value.type_name()
            )))
        }
    };
    out.push(tag);
    // Writing to a String cannot fail.
    let _ = write!(out, "{}:", payload.len());
    out.push_str(&payload);
    Ok(())
}

fn parse_payload(offset: usize, tag: u8, payload: &str) -> CodecResult<Value> {
    match tag {
        b'n' if payload.is_empty() => Ok(Value::Null),
        b'n' => Err(CodecError::malformed_key(offset, "null segment with payload")),
        b'b' => match payload {
            "1" => Ok(Value::Bool(true)),
            "0" => Ok(Value::Bool(false)),
            _ => Err(CodecError::malformed_key(offset, "invalid bool payload")),
        },
        b'i' => payload
            .parse()
            .map(Value::Integer)
            .map_err(|_| CodecError::malformed_key(offset, "invalid integer payload")),
        b'd' if payload.len() == 16 => u64::from_str_radix(payload, 16)
            .map(|bits| Value::Float(f64::from_bits(bits)))
            .map_err(|_| CodecError::malformed_key(offset, "invalid float payload")),
        b'd' => Err(CodecError::malformed_key(offset, "float payload must be 16 hex digits")),
        b's' => Ok(Value::Text(payload.to_string())),
        b'x' => from_hex(payload)
            .map(Value::Bytes)
            .ok_or_else(|| CodecError::malformed_key(offset, "invalid hex payload")),
        other => Err(CodecError::malformed_key(
            offset,
            format!("unknown segment tag {:?}", char::from(other)),
        )),
    }
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn from_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(text.get(i..i + 2)?, 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn flatten_uses_length_prefixes() {
        let key = flatten(&[Value::from("a:b"), Value::Integer(5)]).unwrap();
        assert_eq!(key, "s3:a:bi1:5");
    }

    #[test]
    fn separator_in_text_does_not_collide() {
        let joined = flatten(&[Value::from("a_b")]).unwrap();
        let split = flatten(&[Value::from("a"), Value::from("b")]).unwrap();
        assert_ne!(joined, split);
    }

    #[test]
    fn empty_key_flattens_to_empty_string() {
        assert_eq!(flatten(&[]).unwrap(), "");
        assert!(unflatten("").unwrap().is_empty());
    }

    #[test]
    fn flatten_is_concatenative() {
        let a = [Value::Integer(1), Value::from("x")];
        let b = [Value::Bool(true)];
        let whole = flatten(&[a[0].clone(), a[1].clone(), b[0].clone()]).unwrap();
        assert_eq!(whole, flatten(&a).unwrap() + &flatten(&b).unwrap());
    }

    #[test]
    fn unflatten_restores_every_scalar_kind() {
        let values = vec![
            Value::Null,
            Value::Bool(false),
            Value::Integer(i64::MIN),
            Value::Float(-0.0),
            Value::from("naïve"),
            Value::Bytes(vec![0, 255, 16]),
        ];
        let key = flatten(&values).unwrap();
        assert_eq!(unflatten(&key).unwrap(), values);
    }

    #[test]
    fn arrays_are_rejected() {
        let err = flatten(&[Value::Array(vec![])]).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedType { .. }));
    }

    #[test]
    fn truncated_key_is_malformed() {
        assert!(matches!(
            unflatten("s5:abc"),
            Err(CodecError::MalformedKey { offset: 0, .. })
        ));
        assert!(unflatten("s3abc").is_err());
        assert!(unflatten("q1:a").is_err());
        assert!(unflatten("i1:5s").is_err());
    }

    #[test]
    fn multibyte_split_is_malformed() {
        // "é" is two bytes; a length of 1 lands inside it.
        assert!(unflatten("s1:é").is_err());
    }

    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Integer),
            any::<f64>().prop_map(Value::Float),
            ".*".prop_map(Value::Text),
            proptest::collection::vec(any::<u8>(), 0..16).prop_map(Value::Bytes),
        ]
    }

    proptest! {
        #[test]
        fn unflatten_inverts_flatten(values in proptest::collection::vec(scalar(), 0..6)) {
            let key = flatten(&values).unwrap();
            prop_assert_eq!(unflatten(&key).unwrap(), values);
        }

        #[test]
        fn distinct_keys_flatten_distinctly(
            a in proptest::collection::vec(scalar(), 0..4),
            b in proptest::collection::vec(scalar(), 0..4),
        ) {
            prop_assume!(a != b);
            prop_assert_ne!(flatten(&a).unwrap(), flatten(&b).unwrap());
        }
    }
}
