//! Scalar type registry.
//!
//! The engine hands values to a dialect in a canonical representation per
//! [`ScalarType`]. A backend that cannot store a type natively contributes an
//! override: a pair of pure functions converting between the canonical form
//! and the stored form. Registries compose by overlaying, never by
//! inheritance.
//!
//! Canonical representations:
//!
//! | type | canonical value |
//! |---|---|
//! | `Boolean` | `Bool` |
//! | `Byte`, `Short`, `Integer`, `Long` | `Integer` (range-checked) |
//! | `Double` | `Float` |
//! | `Char` | `Text` with exactly one char |
//! | `String` | `Text` |
//! | `Binary` | `Bytes` |
//! | `Uuid` | `Bytes` of length 16 |
//! | `Instant` | `Integer` milliseconds since the Unix epoch |
//!
//! `Null` passes through every codec untouched.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Semantic tag of a scalar column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    /// Boolean flag.
    Boolean,
    /// 8-bit signed integer.
    Byte,
    /// 16-bit signed integer.
    Short,
    /// 32-bit signed integer.
    Integer,
    /// 64-bit signed integer.
    Long,
    /// Double precision float.
    Double,
    /// Single Unicode scalar value.
    Char,
    /// UTF-8 string.
    String,
    /// Arbitrary bytes.
    Binary,
    /// 128-bit UUID.
    Uuid,
    /// Point in time (epoch milliseconds).
    Instant,
}

impl ScalarType {
    /// All scalar types, in declaration order.
    pub const ALL: [ScalarType; 11] = [
        ScalarType::Boolean,
        ScalarType::Byte,
        ScalarType::Short,
        ScalarType::Integer,
        ScalarType::Long,
        ScalarType::Double,
        ScalarType::Char,
        ScalarType::String,
        ScalarType::Binary,
        ScalarType::Uuid,
        ScalarType::Instant,
    ];

    /// Checks that `value` is a valid canonical representation of this type.
    pub fn validate(self, value: &Value) -> CodecResult<()> {
        if value.is_null() {
            return Ok(());
        }
        let ok = match (self, value) {
            (ScalarType::Boolean, Value::Bool(_)) => true,
            (ScalarType::Byte, Value::Integer(n)) => i8::try_from(*n).is_ok(),
            (ScalarType::Short, Value::Integer(n)) => i16::try_from(*n).is_ok(),
            (ScalarType::Integer, Value::Integer(n)) => i32::try_from(*n).is_ok(),
            (ScalarType::Long | ScalarType::Instant, Value::Integer(_)) => true,
            (ScalarType::Double, Value::Float(_)) => true,
            (ScalarType::Char, Value::Text(s)) => s.chars().count() == 1,
            (ScalarType::String, Value::Text(_)) => true,
            (ScalarType::Binary, Value::Bytes(_)) => true,
            (ScalarType::Uuid, Value::Bytes(b)) => b.len() == 16,
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(CodecError::type_mismatch(self.canonical_name(), value.type_name()))
        }
    }

    fn canonical_name(self) -> &'static str {
        match self {
            ScalarType::Boolean => "bool",
            ScalarType::Byte => "integer in i8 range",
            ScalarType::Short => "integer in i16 range",
            ScalarType::Integer => "integer in i32 range",
            ScalarType::Long | ScalarType::Instant => "integer",
            ScalarType::Double => "float",
            ScalarType::Char => "single-char text",
            ScalarType::String => "text",
            ScalarType::Binary => "bytes",
            ScalarType::Uuid => "16 bytes",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::Boolean => "boolean",
            ScalarType::Byte => "byte",
            ScalarType::Short => "short",
            ScalarType::Integer => "integer",
            ScalarType::Long => "long",
            ScalarType::Double => "double",
            ScalarType::Char => "char",
            ScalarType::String => "string",
            ScalarType::Binary => "binary",
            ScalarType::Uuid => "uuid",
            ScalarType::Instant => "instant",
        };
        f.write_str(name)
    }
}

/// Converts a non-null value between canonical and stored form.
pub type ConvertFn = fn(&Value) -> CodecResult<Value>;

/// A pair of pure conversion functions for one scalar type.
#[derive(Clone, Copy)]
pub struct ScalarCodec {
    /// Canonical -> stored.
    pub encode: ConvertFn,
    /// Stored -> canonical.
    pub decode: ConvertFn,
}

impl ScalarCodec {
    /// Creates a codec from an encode/decode pair.
    pub const fn new(encode: ConvertFn, decode: ConvertFn) -> Self {
        Self { encode, decode }
    }

    /// The codec that stores the canonical form as-is.
    pub const fn identity() -> Self {
        Self::new(clone_value, clone_value)
    }
}

fn clone_value(value: &Value) -> CodecResult<Value> {
    Ok(value.clone())
}

impl fmt::Debug for ScalarCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarCodec").finish_non_exhaustive()
    }
}

/// Maps scalar types to their codecs.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    codecs: HashMap<ScalarType, ScalarCodec>,
}

impl TypeRegistry {
    /// A registry without any codecs. Used for override sets.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard registry: every type stored in its canonical form.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for ty in ScalarType::ALL {
            registry.register(ty, ScalarCodec::identity());
        }
        registry
    }

    /// Registers (or replaces) the codec for a type.
    pub fn register(&mut self, ty: ScalarType, codec: ScalarCodec) -> &mut Self {
        self.codecs.insert(ty, codec);
        self
    }

    /// Builder-style variant of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, ty: ScalarType, codec: ScalarCodec) -> Self {
        self.register(ty, codec);
        self
    }

    /// Returns a registry where codecs from `overrides` replace ours.
    #[must_use]
    pub fn overlay(&self, overrides: &TypeRegistry) -> Self {
        let mut codecs = self.codecs.clone();
        codecs.extend(overrides.codecs.iter().map(|(ty, codec)| (*ty, *codec)));
        Self { codecs }
    }

    /// Whether a codec is registered for the type.
    pub fn contains(&self, ty: ScalarType) -> bool {
        self.codecs.contains_key(&ty)
    }

    /// Number of registered codecs.
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    /// Whether no codec is registered.
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    /// Converts a canonical value into its stored form.
    ///
    /// # Errors
    ///
    /// Fails if no codec is registered for `ty`, if the value is not a valid
    /// canonical representation, or if the codec rejects it.
    pub fn encode(&self, ty: ScalarType, value: &Value) -> CodecResult<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        ty.validate(value)?;
        (self.codec(ty)?.encode)(value)
    }

    /// Converts a stored value back into canonical form.
    ///
    /// # Errors
    ///
    /// Fails if no codec is registered for `ty` or the stored value cannot be
    /// decoded into a valid canonical representation.
    pub fn decode(&self, ty: ScalarType, value: &Value) -> CodecResult<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let decoded = (self.codec(ty)?.decode)(value)?;
        ty.validate(&decoded)?;
        Ok(decoded)
    }

    fn codec(&self, ty: ScalarType) -> CodecResult<&ScalarCodec> {
        self.codecs
            .get(&ty)
            .ok_or_else(|| CodecError::unsupported_type(ty.to_string()))
    }
}
