use bytes::Bytes;

use crate::chain::Codec;
use crate::error::{CodecError, Result};
use crate::value::Value;

/// Transcodes between raw bytes and UTF-8 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl Codec for StringCodec {
    fn name(&self) -> &'static str {
        "string"
    }

    fn decode(&self, value: Value) -> Result<Value> {
        match value {
            Value::Bytes(bytes) => Ok(Value::Text(String::from_utf8(bytes.to_vec())?)),
            other => Err(CodecError::TypeMismatch {
                expected: "bytes",
                got: other.kind(),
            }),
        }
    }

    fn encode(&self, value: Value) -> Result<Value> {
        match value {
            Value::Text(text) => Ok(Value::Bytes(Bytes::from(text.into_bytes()))),
            other => Err(CodecError::TypeMismatch {
                expected: "text",
                got: other.kind(),
            }),
        }
    }
}

/// Transcodes between raw bytes and structured JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn decode(&self, value: Value) -> Result<Value> {
        match value {
            Value::Bytes(bytes) => Ok(Value::Json(serde_json::from_slice(&bytes)?)),
            Value::Text(text) => Ok(Value::Json(serde_json::from_str(&text)?)),
            other => Err(CodecError::TypeMismatch {
                expected: "bytes or text",
                got: other.kind(),
            }),
        }
    }

    fn encode(&self, value: Value) -> Result<Value> {
        match value {
            Value::Json(json) => Ok(Value::Bytes(Bytes::from(serde_json::to_vec(&json)?))),
            other => Err(CodecError::TypeMismatch {
                expected: "json",
                got: other.kind(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_decode_rejects_invalid_utf8() {
        let err = StringCodec
            .decode(Value::Bytes(Bytes::from_static(&[0xFF, 0xFE])))
            .unwrap_err();
        assert!(matches!(err, CodecError::Utf8(_)));
    }

    #[test]
    fn string_encode_rejects_bytes_input() {
        let err = StringCodec.encode(Value::from(&b"raw"[..])).unwrap_err();
        assert!(matches!(
            err,
            CodecError::TypeMismatch { expected: "text", .. }
        ));
    }

    #[test]
    fn json_roundtrip() {
        let value = Value::Json(serde_json::json!({"cmd": "say", "n": 7}));
        let encoded = JsonCodec.encode(value.clone()).unwrap();
        let decoded = JsonCodec.decode(encoded).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn json_decode_accepts_text() {
        let decoded = JsonCodec.decode(Value::from("[1,2]")).unwrap();
        assert_eq!(decoded, Value::Json(serde_json::json!([1, 2])));
    }

    #[test]
    fn json_decode_rejects_garbage() {
        let err = JsonCodec.decode(Value::from(&b"{nope"[..])).unwrap_err();
        assert!(matches!(err, CodecError::Json(_)));
    }
}
