use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use braid_codec::{CodecChain, Value};
use braid_frame::{FrameChannel, FrameError};
use tracing::{debug, error};

use crate::error::PeerError;
use crate::handler::Handler;
use crate::registry::ConnectionRegistry;

/// One live connection's processing loop.
///
/// Sessions are ephemeral: created when a connection is established,
/// destroyed when the read loop exits. The channel is exclusively read
/// here; the chain and handler are shared read-only with every other
/// session of the endpoint.
pub(crate) struct Session {
    pub(crate) channel: Arc<dyn FrameChannel>,
    pub(crate) chain: Arc<CodecChain>,
    pub(crate) handler: Arc<dyn Handler>,
    /// Raised before any locally-initiated close; read faults observed
    /// while it is set are expected termination, not errors.
    pub(crate) closing: Arc<AtomicBool>,
    /// Acceptor-side registry slot to vacate on exit.
    pub(crate) registry: Option<(Arc<ConnectionRegistry>, String)>,
}

/// Removes the session's registry entry on every exit path.
struct RegistryGuard {
    registry: Arc<ConnectionRegistry>,
    label: String,
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.label);
    }
}

/// Launch the session on its own thread.
pub(crate) fn spawn(session: Session) {
    std::thread::spawn(move || session.run());
}

impl Session {
    /// Run the read-decode-dispatch loop to completion.
    ///
    /// Terminates on clean peer close, on locally-initiated shutdown, or on
    /// the first read/decode/handle fault — one failed message ends the
    /// session. Whatever the path, the connection is closed, the registry
    /// slot vacated, and `disconnected` fired exactly once.
    pub(crate) fn run(self) {
        let Session {
            channel,
            chain,
            handler,
            closing,
            registry,
        } = self;

        let guard = registry.map(|(registry, label)| RegistryGuard { registry, label });
        let peer = channel.connection().peer_label().to_string();

        debug!(%peer, "session started");
        handler.connected(channel.connection());

        loop {
            let frame = match channel.read_frame() {
                Ok(frame) => frame,
                Err(FrameError::Closed) => {
                    debug!(%peer, "connection closed");
                    break;
                }
                Err(err) if closing.load(Ordering::Acquire) => {
                    debug!(%peer, %err, "read failed during shutdown");
                    break;
                }
                Err(err) => {
                    let err = PeerError::Frame(err);
                    error!(%peer, %err, "failed to read frame");
                    handler.error_caught(&err);
                    break;
                }
            };

            let value = match chain.decode(Value::Bytes(frame)) {
                Ok(value) => value,
                Err(err) => {
                    let err = PeerError::Codec(err);
                    error!(%peer, %err, "failed to decode frame");
                    handler.error_caught(&err);
                    break;
                }
            };

            if let Err(err) = handler.handle(&channel, value) {
                error!(%peer, %err, "failed to handle message");
                handler.error_caught(&err);
                break;
            }
        }

        if let Err(err) = channel.close() {
            debug!(%peer, %err, "close on session exit");
        }
        drop(guard);
        handler.disconnected(channel.connection());
        debug!(%peer, "session ended");
    }
}
