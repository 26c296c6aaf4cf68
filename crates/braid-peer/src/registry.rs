use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use braid_frame::FrameChannel;
use dashmap::DashMap;
use tracing::{debug, warn};

/// Per-session handle kept by the registry.
///
/// `closing` is the typed "closed locally via stop" condition: bulk close
/// raises it before shutting the socket, and the session treats any
/// subsequent read fault as expected termination rather than an error.
pub(crate) struct SessionHandle {
    pub(crate) channel: Arc<dyn FrameChannel>,
    pub(crate) closing: Arc<AtomicBool>,
}

/// Live connections of an acceptor, keyed by peer label.
///
/// Written by the accept loop, drained entry-by-entry by each session's
/// own termination path, and swept wholesale by `close_all` during stop.
#[derive(Default)]
pub(crate) struct ConnectionRegistry {
    conns: DashMap<String, SessionHandle>,
}

impl ConnectionRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, label: String, handle: SessionHandle) {
        self.conns.insert(label, handle);
    }

    pub(crate) fn remove(&self, label: &str) {
        self.conns.remove(label);
    }

    pub(crate) fn len(&self) -> usize {
        self.conns.len()
    }

    /// Force-close every registered connection.
    ///
    /// Each affected session's blocked read fails, and the session then
    /// terminates through its normal path — closing, deregistering, and
    /// firing its own `disconnected`. No callbacks fire from here.
    pub(crate) fn close_all(&self) {
        for entry in self.conns.iter() {
            entry.value().closing.store(true, Ordering::Release);
            if let Err(err) = entry.value().channel.close() {
                warn!(peer = %entry.key(), %err, "failed to close connection");
            } else {
                debug!(peer = %entry.key(), "closed connection");
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use braid_frame::{FrameError, FramedConn, LineSplitter};
    use braid_transport::Connection;

    fn handle() -> (SessionHandle, Arc<dyn FrameChannel>) {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let channel =
            FramedConn::shared(Connection::from_unix(left), LineSplitter::default()).unwrap();
        let peer =
            FramedConn::shared(Connection::from_unix(right), LineSplitter::default()).unwrap();
        (
            SessionHandle {
                channel,
                closing: Arc::new(AtomicBool::new(false)),
            },
            peer,
        )
    }

    #[test]
    fn insert_and_remove() {
        let registry = ConnectionRegistry::new();
        let (h, _peer) = handle();
        registry.insert("a".to_string(), h);
        assert_eq!(registry.len(), 1);
        registry.remove("a");
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn close_all_raises_closing_and_shuts_sockets() {
        let registry = ConnectionRegistry::new();
        let (h, peer) = handle();
        let closing = Arc::clone(&h.closing);
        registry.insert("a".to_string(), h);

        registry.close_all();

        assert!(closing.load(Ordering::Acquire));
        assert!(matches!(peer.read_frame(), Err(FrameError::Closed)));
    }
}
