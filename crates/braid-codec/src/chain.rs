use bytes::Bytes;

use crate::error::{CodecError, Result};
use crate::value::Value;

/// A bidirectional value transform.
///
/// `decode` runs toward the application, `encode` back toward the wire.
/// A codec that transforms bytes into text decodes `Bytes -> Text` and
/// encodes `Text -> Bytes`.
pub trait Codec: Send + Sync {
    /// Short name used in stage-failure diagnostics.
    fn name(&self) -> &'static str {
        "codec"
    }

    /// Transform an inbound value one step toward the application.
    fn decode(&self, value: Value) -> Result<Value>;

    /// Transform an outbound value one step toward the wire.
    fn encode(&self, value: Value) -> Result<Value>;
}

/// Ordered list of codecs applied between frame bytes and handler values.
///
/// Decoding applies stages in registration order; the output of stage *i*
/// feeds stage *i + 1* and the final output reaches the handler. Encoding
/// applies stages in reverse, so the last-registered codec sits closest to
/// the application and the first sits closest to the wire. The empty chain
/// is identity in both directions.
#[derive(Default)]
pub struct CodecChain {
    stages: Vec<Box<dyn Codec>>,
}

impl CodecChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a codec to the chain.
    pub fn with(mut self, codec: impl Codec + 'static) -> Self {
        self.stages.push(Box::new(codec));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Decode one frame payload into the value delivered to the handler.
    ///
    /// Stops at the first failing stage; nothing partial flows onward.
    pub fn decode(&self, frame: Value) -> Result<Value> {
        let mut value = frame;
        for (index, codec) in self.stages.iter().enumerate() {
            value = codec.decode(value).map_err(|source| CodecError::Stage {
                index,
                name: codec.name(),
                source: Box::new(source),
            })?;
        }
        Ok(value)
    }

    /// Encode an application value down to the raw bytes a frame channel
    /// can carry.
    ///
    /// A chain whose final output is not bytes is misconfigured; that is
    /// reported as [`CodecError::NotBytes`], never a panic.
    pub fn encode(&self, value: Value) -> Result<Bytes> {
        let mut value = value;
        for (index, codec) in self.stages.iter().enumerate().rev() {
            value = codec.encode(value).map_err(|source| CodecError::Stage {
                index,
                name: codec.name(),
                source: Box::new(source),
            })?;
        }
        match value {
            Value::Bytes(bytes) => Ok(bytes),
            other => Err(CodecError::NotBytes { got: other.kind() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::{JsonCodec, StringCodec};

    #[test]
    fn empty_chain_is_identity() {
        let chain = CodecChain::new();
        let decoded = chain.decode(Value::from(&b"raw"[..])).unwrap();
        assert_eq!(decoded, Value::Bytes(Bytes::from_static(b"raw")));

        let encoded = chain.encode(Value::from(&b"raw"[..])).unwrap();
        assert_eq!(encoded.as_ref(), b"raw");
    }

    #[test]
    fn empty_chain_rejects_non_bytes_on_encode() {
        let chain = CodecChain::new();
        let err = chain.encode(Value::from("text")).unwrap_err();
        assert!(matches!(err, CodecError::NotBytes { got: "text" }));
    }

    #[test]
    fn string_chain_roundtrip() {
        let chain = CodecChain::new().with(StringCodec);
        let decoded = chain.decode(Value::from(&b"hello"[..])).unwrap();
        assert_eq!(decoded, Value::Text("hello".to_string()));

        let encoded = chain.encode(decoded).unwrap();
        assert_eq!(encoded.as_ref(), b"hello");
    }

    #[test]
    fn stacked_chain_roundtrip() {
        // bytes -> text is the wire-side stage, text -> json the app-side
        // stage; encode must traverse them in reverse.
        let chain = CodecChain::new().with(StringCodec).with(JsonCodec);
        let value = Value::Json(serde_json::json!({"k": [1, 2, 3]}));

        let encoded = chain.encode(value.clone()).unwrap();
        let decoded = chain.decode(Value::Bytes(encoded)).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn decode_failure_names_the_stage() {
        let chain = CodecChain::new().with(StringCodec).with(JsonCodec);
        let err = chain.decode(Value::from(&b"not json"[..])).unwrap_err();
        match err {
            CodecError::Stage { index, name, .. } => {
                assert_eq!(index, 1);
                assert_eq!(name, "json");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn decode_stops_at_first_failure() {
        struct Exploding;
        impl Codec for Exploding {
            fn name(&self) -> &'static str {
                "exploding"
            }
            fn decode(&self, _value: Value) -> Result<Value> {
                Err(CodecError::TypeMismatch {
                    expected: "nothing",
                    got: "anything",
                })
            }
            fn encode(&self, value: Value) -> Result<Value> {
                Ok(value)
            }
        }

        let chain = CodecChain::new().with(Exploding).with(StringCodec);
        let err = chain.decode(Value::from(&b"x"[..])).unwrap_err();
        assert!(matches!(err, CodecError::Stage { index: 0, .. }));
    }

    #[test]
    fn encode_not_ending_in_bytes_is_contract_violation() {
        struct TextOnly;
        impl Codec for TextOnly {
            fn decode(&self, value: Value) -> Result<Value> {
                Ok(value)
            }
            fn encode(&self, value: Value) -> Result<Value> {
                Ok(value)
            }
        }

        let chain = CodecChain::new().with(TextOnly);
        let err = chain.encode(Value::from("still text")).unwrap_err();
        assert!(matches!(err, CodecError::NotBytes { got: "text" }));
    }
}
