use std::sync::Arc;

use braid_codec::Value;
use braid_frame::FrameChannel;
use braid_transport::Connection;

use crate::error::{PeerError, Result};

/// Application-side contract for one endpoint.
///
/// One handler instance is shared read-only by every session of an
/// endpoint, so implementations keep their own state behind interior
/// mutability if they need any.
///
/// Per session the engine guarantees: `connected` fires exactly once
/// before the first `handle`; `handle` fires once per decoded frame, in
/// receipt order, never concurrently with itself for the same session;
/// `disconnected` fires exactly once after the last `handle`, on every
/// termination path. An `Err` from `handle` is fatal for that session.
pub trait Handler: Send + Sync {
    /// A connection entered its session loop.
    fn connected(&self, _conn: &Connection) {}

    /// A session terminated and its connection is closed.
    fn disconnected(&self, _conn: &Connection) {}

    /// One decoded value arrived on `channel`.
    fn handle(&self, channel: &Arc<dyn FrameChannel>, value: Value) -> Result<()>;

    /// A session-fatal fault (read, decode, or handle failure).
    fn error_caught(&self, _err: &PeerError) {}
}

impl<T: Handler + ?Sized> Handler for Arc<T> {
    fn connected(&self, conn: &Connection) {
        (**self).connected(conn)
    }

    fn disconnected(&self, conn: &Connection) {
        (**self).disconnected(conn)
    }

    fn handle(&self, channel: &Arc<dyn FrameChannel>, value: Value) -> Result<()> {
        (**self).handle(channel, value)
    }

    fn error_caught(&self, err: &PeerError) {
        (**self).error_caught(err)
    }
}
