//! Scalar codecs replacing the standard ones in document storage.
//!
//! UUIDs are stored as hyphenated text and bytes as decimal text, which keeps
//! both readable and comparable inside documents.

use gridlink_codec::{CodecError, CodecResult, ScalarCodec, ScalarType, TypeRegistry, Value};
use uuid::Uuid;

/// Returns the document dialect's overrides.
#[must_use]
pub fn document_types() -> TypeRegistry {
    TypeRegistry::empty()
        .with(ScalarType::Uuid, ScalarCodec::new(uuid_to_text, text_to_uuid))
        .with(ScalarType::Byte, ScalarCodec::new(byte_to_text, text_to_byte))
}

fn uuid_to_text(value: &Value) -> CodecResult<Value> {
    match value {
        Value::Bytes(bytes) => {
            let uuid = Uuid::from_slice(bytes).map_err(|e| CodecError::encoding_failed(e.to_string()))?;
            Ok(Value::Text(uuid.hyphenated().to_string()))
        }
        other => Err(CodecError::type_mismatch("bytes", other.type_name())),
    }
}

fn text_to_uuid(value: &Value) -> CodecResult<Value> {
    match value {
        Value::Text(text) => {
            let uuid = Uuid::parse_str(text).map_err(|e| CodecError::decoding_failed(e.to_string()))?;
            Ok(Value::Bytes(uuid.as_bytes().to_vec()))
        }
        other => Err(CodecError::type_mismatch("text", other.type_name())),
    }
}

fn byte_to_text(value: &Value) -> CodecResult<Value> {
    match value {
        Value::Integer(i) => Ok(Value::Text(i.to_string())),
        other => Err(CodecError::type_mismatch("integer", other.type_name())),
    }
}

fn text_to_byte(value: &Value) -> CodecResult<Value> {
    match value {
        Value::Text(text) => text
            .parse::<i8>()
            .map(|b| Value::Integer(i64::from(b)))
            .map_err(|e| CodecError::decoding_failed(e.to_string())),
        other => Err(CodecError::type_mismatch("text", other.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        TypeRegistry::standard().overlay(&document_types())
    }

    #[test]
    fn uuid_is_stored_as_text() {
        let uuid = Uuid::new_v4();
        let canonical = Value::Bytes(uuid.as_bytes().to_vec());
        let stored = registry().encode(ScalarType::Uuid, &canonical).unwrap();
        assert_eq!(stored, Value::Text(uuid.hyphenated().to_string()));
        assert_eq!(registry().decode(ScalarType::Uuid, &stored).unwrap(), canonical);
    }

    #[test]
    fn byte_is_stored_as_text() {
        let stored = registry().encode(ScalarType::Byte, &Value::Integer(-7)).unwrap();
        assert_eq!(stored, Value::from("-7"));
        assert_eq!(registry().decode(ScalarType::Byte, &stored).unwrap(), Value::Integer(-7));
        assert!(registry().decode(ScalarType::Byte, &Value::from("300")).is_err());
    }

    #[test]
    fn other_types_keep_standard_codecs() {
        let stored = registry().encode(ScalarType::Long, &Value::Integer(5)).unwrap();
        assert_eq!(stored, Value::Integer(5));
    }
}
