//! Connection lifecycle and pipeline dispatch engine for braid.
//!
//! This is the layer that actually runs a protocol built from the pluggable
//! pieces: it owns the listening/accept loop with failure classification
//! and backoff, the per-connection session threads (connect, read-decode-
//! dispatch, disconnect), the codec chain application in both directions,
//! the registry used for broadcast shutdown, and the coordinated stop
//! protocol. Frame splitting, value codecs, and application handlers plug
//! in; everything here is shared by the [`Acceptor`] and [`Initiator`]
//! roles.

pub mod acceptor;
pub mod backoff;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod initiator;
pub mod pipeline;
mod registry;
mod session;

pub use acceptor::Acceptor;
pub use dispatch::{wrap_command, CommandDispatcher};
pub use error::{PeerError, Result};
pub use handler::Handler;
pub use initiator::Initiator;
pub use pipeline::{write_value, ConnTransform};
