/// Errors that can occur while encoding or decoding values.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A codec was handed a value variant it does not transform.
    #[error("expected {expected} input, got {got}")]
    TypeMismatch {
        expected: &'static str,
        got: &'static str,
    },

    /// Payload bytes are not valid UTF-8.
    #[error("invalid utf-8 payload: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Payload bytes are not valid JSON.
    #[error("invalid json payload: {0}")]
    Json(#[from] serde_json::Error),

    /// A chain stage failed; carries which stage for diagnostics.
    #[error("codec stage {index} ({name}) failed: {source}")]
    Stage {
        index: usize,
        name: &'static str,
        #[source]
        source: Box<CodecError>,
    },

    /// The encode chain did not produce raw bytes. A misconfigured chain,
    /// not a runtime condition.
    #[error("encoded value must be raw bytes, got {got}")]
    NotBytes { got: &'static str },
}

pub type Result<T> = std::result::Result<T, CodecError>;
