//! Compose custom stream protocols from three pluggable stages: a frame
//! splitter, a codec chain, and an application handler.
//!
//! braid gives you the connection machinery — dial/accept loops,
//! per-connection session threads, broadcast shutdown — and you plug in
//! how frames are bounded, how payloads are transformed, and what the
//! application does with them.
//!
//! # Crate Structure
//!
//! - [`transport`] — raw stream connections (TCP, Unix domain sockets)
//! - [`frame`] — frame boundary extraction strategies
//! - [`codec`] — chainable value codecs
//! - [`peer`] — the acceptor/initiator engine and session lifecycle

/// Re-export transport types.
pub mod transport {
    pub use braid_transport::*;
}

/// Re-export framing types.
pub mod frame {
    pub use braid_frame::*;
}

/// Re-export codec types.
pub mod codec {
    pub use braid_codec::*;
}

/// Re-export the endpoint engine.
pub mod peer {
    pub use braid_peer::*;
}
