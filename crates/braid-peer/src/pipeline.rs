use std::sync::Arc;

use braid_codec::{CodecChain, Value};
use braid_frame::{FrameChannel, FrameFn};
use braid_transport::Connection;

use crate::error::{PeerError, Result};
use crate::handler::Handler;

/// Transport-transform hook, applied once to each raw connection between
/// accept/dial and framing. The extension point for transport hardening;
/// the default is identity.
pub type ConnTransform = Arc<dyn Fn(Connection) -> Connection + Send + Sync>;

/// The pluggable stages shared by both endpoint roles.
///
/// Handler and frame function are mandatory; they are checked when the
/// endpoint starts serving or dialing, not at build time, so configuration
/// can be assembled in any order.
#[derive(Clone, Default)]
pub struct Pipeline {
    pub(crate) transform: Option<ConnTransform>,
    pub(crate) frame_fn: Option<FrameFn>,
    pub(crate) chain: Arc<CodecChain>,
    pub(crate) handler: Option<Arc<dyn Handler>>,
}

impl Pipeline {
    /// Fail fast on a configuration that cannot run.
    pub(crate) fn validate(&self) -> Result<(FrameFn, Arc<dyn Handler>)> {
        let handler = self.handler.clone().ok_or(PeerError::HandlerNotSet)?;
        let frame_fn = self.frame_fn.clone().ok_or(PeerError::FrameFnNotSet)?;
        Ok((frame_fn, handler))
    }

    /// Run the transform hook, if any.
    pub(crate) fn transform(&self, conn: Connection) -> Connection {
        match &self.transform {
            Some(hook) => hook(conn),
            None => conn,
        }
    }
}

/// Encode `value` through `chain` and write the resulting frame.
///
/// Encoding applies the chain in reverse registration order and must
/// bottom out at raw bytes; anything else is a chain misconfiguration
/// surfaced as an error, not a panic. Safe to call from any thread,
/// including inside [`Handler::handle`].
pub fn write_value(
    chain: &CodecChain,
    channel: &dyn FrameChannel,
    value: Value,
) -> Result<()> {
    let bytes = chain.encode(value)?;
    channel.write_frame(&bytes)?;
    Ok(())
}
