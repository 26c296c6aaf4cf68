/// Errors that can occur while reading or writing frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// An I/O error occurred on the underlying connection.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended. Distinct from [`FrameError::Io`] so callers can
    /// treat a peer hanging up as lifecycle, not failure.
    #[error("connection closed")]
    Closed,

    /// A frame exceeds the configured maximum size.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The bytes on the wire (or handed to a writer) violate the framing
    /// strategy's shape.
    #[error("bad frame: {0}")]
    BadFrame(String),
}

pub type Result<T> = std::result::Result<T, FrameError>;
