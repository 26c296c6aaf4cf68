use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use braid_codec::{CodecChain, Value};
use braid_frame::{FrameChannel, FrameFn};
use braid_transport::{Connection, NetKind};
use tracing::debug;

use crate::error::{PeerError, Result};
use crate::handler::Handler;
use crate::pipeline::{write_value, Pipeline};
use crate::session::{self, Session};

/// The client role: dials one connection and runs a single session over it.
///
/// `dial` returns once the session thread is launched; inbound frames are
/// delivered to the handler on that thread while `write` may be called
/// from any thread.
#[derive(Default)]
pub struct Initiator {
    pipeline: Pipeline,
    dial_timeout: Option<Duration>,
    channel: Mutex<Option<Arc<dyn FrameChannel>>>,
    closing: Arc<AtomicBool>,
}

impl Initiator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the transport-transform hook, applied once after dialing,
    /// before framing.
    pub fn with_transform(
        mut self,
        hook: impl Fn(Connection) -> Connection + Send + Sync + 'static,
    ) -> Self {
        self.pipeline.transform = Some(Arc::new(hook));
        self
    }

    /// Set the mandatory frame-construction function.
    pub fn with_frame_fn(mut self, frame_fn: FrameFn) -> Self {
        self.pipeline.frame_fn = Some(frame_fn);
        self
    }

    /// Set the codec chain. Defaults to the empty (identity) chain.
    pub fn with_chain(mut self, chain: CodecChain) -> Self {
        self.pipeline.chain = Arc::new(chain);
        self
    }

    /// Set the mandatory application handler.
    pub fn with_handler(mut self, handler: impl Handler + 'static) -> Self {
        self.pipeline.handler = Some(Arc::new(handler));
        self
    }

    /// Bound the time spent establishing a TCP connection.
    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = Some(timeout);
        self
    }

    /// Connect and launch the session. Returns once the session thread is
    /// running; lifecycle and inbound values flow through the handler.
    pub fn dial(&self, kind: NetKind, addr: &str) -> Result<()> {
        let (frame_fn, handler) = self.pipeline.validate()?;

        let mut slot = self.channel.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            return Err(PeerError::AlreadyConnected);
        }

        let conn = Connection::dial(kind, addr, self.dial_timeout)?;
        let conn = self.pipeline.transform(conn);
        let channel = frame_fn(conn)?;
        *slot = Some(Arc::clone(&channel));
        drop(slot);

        debug!(%addr, "dialed; launching session");
        session::spawn(Session {
            channel,
            chain: Arc::clone(&self.pipeline.chain),
            handler,
            closing: Arc::clone(&self.closing),
            registry: None,
        });
        Ok(())
    }

    /// Encode `value` through the codec chain and write it to the dialed
    /// connection.
    pub fn write(&self, value: Value) -> Result<()> {
        let channel = self
            .channel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(PeerError::NotConnected)?;
        write_value(&self.pipeline.chain, channel.as_ref(), value)
    }

    /// The dialed frame channel, for writers that frame their own bytes.
    pub fn channel(&self) -> Option<Arc<dyn FrameChannel>> {
        self.channel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Close the dialed connection; the session terminates through its
    /// normal path and fires `disconnected`.
    pub fn stop(&self) {
        self.closing.store(true, Ordering::Release);
        if let Some(channel) = self
            .channel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
        {
            if let Err(err) = channel.close() {
                debug!(%err, "close on stop");
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use braid_frame::line_frames;

    use super::*;

    struct Sink;
    impl Handler for Sink {
        fn handle(&self, _c: &Arc<dyn FrameChannel>, _v: Value) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_before_dial_is_not_connected() {
        let client = Initiator::new()
            .with_frame_fn(line_frames())
            .with_handler(Sink);
        let err = client.write(Value::from(&b"x"[..])).unwrap_err();
        assert!(matches!(err, PeerError::NotConnected));
    }

    #[test]
    fn dial_without_handler_is_a_setup_error() {
        let client = Initiator::new().with_frame_fn(line_frames());
        let err = client.dial(NetKind::Tcp, "127.0.0.1:1").unwrap_err();
        assert!(matches!(err, PeerError::HandlerNotSet));
    }

    #[test]
    fn dial_without_frame_fn_is_a_setup_error() {
        let client = Initiator::new().with_handler(Sink);
        let err = client.dial(NetKind::Tcp, "127.0.0.1:1").unwrap_err();
        assert!(matches!(err, PeerError::FrameFnNotSet));
    }

    #[test]
    fn dial_failure_surfaces_the_transport_error() {
        let sock = std::env::temp_dir().join(format!(
            "braid-no-such-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        let client = Initiator::new()
            .with_frame_fn(line_frames())
            .with_handler(Sink);
        let err = client
            .dial(NetKind::Unix, sock.to_str().unwrap())
            .unwrap_err();
        assert!(matches!(err, PeerError::Transport(_)));
    }

    #[test]
    fn second_dial_is_rejected() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let keep = std::thread::spawn(move || listener.accept());

        let client = Initiator::new()
            .with_frame_fn(line_frames())
            .with_handler(Sink);
        client.dial(NetKind::Tcp, &addr).unwrap();
        assert!(client.channel().is_some());
        let err = client.dial(NetKind::Tcp, &addr).unwrap_err();
        assert!(matches!(err, PeerError::AlreadyConnected));

        client.stop();
        let _ = keep.join();
    }
}
