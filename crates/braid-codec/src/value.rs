use bytes::Bytes;

/// A payload traveling the codec chain.
///
/// Frames enter as [`Value::Bytes`]; each chain stage may trade one variant
/// for another on the way to the handler, and back again on the way out.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Raw bytes — the only variant a frame channel carries.
    Bytes(Bytes),
    /// UTF-8 text.
    Text(String),
    /// Structured JSON.
    Json(serde_json::Value),
}

impl Value {
    /// Variant name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bytes(_) => "bytes",
            Value::Text(_) => "text",
            Value::Json(_) => "json",
        }
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(b))
    }
}

impl From<&'static [u8]> for Value {
    fn from(b: &'static [u8]) -> Self {
        Value::Bytes(Bytes::from_static(b))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}
