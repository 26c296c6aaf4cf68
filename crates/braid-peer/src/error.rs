/// Errors that can occur in endpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] braid_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] braid_frame::FrameError),

    /// Codec chain error.
    #[error("codec error: {0}")]
    Codec(#[from] braid_codec::CodecError),

    /// The endpoint was asked to serve or dial without a handler.
    #[error("handler has not been set")]
    HandlerNotSet,

    /// The endpoint was asked to serve or dial without a frame function.
    #[error("frame function has not been set")]
    FrameFnNotSet,

    /// A write or stop was issued before `dial` established a connection.
    #[error("not connected")]
    NotConnected,

    /// `dial` was called on an initiator that already has a live session.
    #[error("already connected")]
    AlreadyConnected,

    /// No command handler is registered for the decoded tag.
    #[error("no handler registered for command {0:?}")]
    UnknownCommand(String),

    /// A command frame does not carry a well-formed tag header.
    #[error("malformed command frame: {0}")]
    MalformedCommand(&'static str),

    /// Application handler failure.
    #[error("handler error: {0}")]
    Handler(String),
}

pub type Result<T> = std::result::Result<T, PeerError>;
