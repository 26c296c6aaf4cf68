use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use braid_codec::{CodecChain, Value};
use braid_frame::{FrameChannel, FrameFn};
use braid_transport::{is_temporary, Connection, NetKind, NetListener, TransportError};
use tracing::{debug, error, info, warn};

use crate::backoff::AcceptBackoff;
use crate::error::Result;
use crate::handler::Handler;
use crate::pipeline::{write_value, Pipeline};
use crate::registry::{ConnectionRegistry, SessionHandle};
use crate::session::{self, Session};

/// Keep-alive probe period applied to accepted TCP connections.
const KEEPALIVE_PERIOD: Duration = Duration::from_secs(180);

/// The server role: owns a listening socket and spawns one session per
/// accepted connection.
///
/// Configure with the `with_*` builders, then call [`Acceptor::serve`]
/// (blocking) from one thread and [`Acceptor::stop`] from another.
///
/// ```no_run
/// use std::sync::Arc;
/// use braid_codec::{CodecChain, StringCodec};
/// use braid_frame::line_frames;
/// use braid_peer::{Acceptor, CommandDispatcher};
/// use braid_transport::NetKind;
///
/// let server = Arc::new(
///     Acceptor::new()
///         .with_frame_fn(line_frames())
///         .with_chain(CodecChain::new().with(StringCodec))
///         .with_handler(CommandDispatcher::new()),
/// );
/// server.serve(NetKind::Tcp, "127.0.0.1:9000").unwrap();
/// ```
#[derive(Default)]
pub struct Acceptor {
    pipeline: Pipeline,
    registry: Arc<ConnectionRegistry>,
    stopped: Arc<AtomicBool>,
    listener: Mutex<Option<Arc<NetListener>>>,
}

impl Acceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the transport-transform hook, applied once per accepted
    /// connection before framing.
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

    /// Bind and run the accept loop. Blocks until [`Acceptor::stop`] is
    /// called or a fatal accept error occurs.
    pub fn serve(&self, kind: NetKind, addr: &str) -> Result<()> {
        let (frame_fn, handler) = self.pipeline.validate()?;

        let listener = Arc::new(NetListener::bind(kind, addr)?);
        *self
            .listener
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&listener));

        self.accept_loop(|| listener.accept(), frame_fn, handler)
    }

    /// The bound listen address once [`Acceptor::serve`] has bound.
    ///
    /// Resolves ephemeral TCP ports, so tests can serve on port 0 and
    /// learn where to dial.
    pub fn local_addr(&self) -> Option<String> {
        self.listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|l| l.local_addr().to_string())
    }

    /// Number of currently registered connections.
    pub fn active_connections(&self) -> usize {
        self.registry.len()
    }

    /// Encode `value` through this endpoint's codec chain and write it to
    /// `channel`. Callable from any thread, including inside a handler.
    pub fn write(&self, channel: &dyn FrameChannel, value: Value) -> Result<()> {
        write_value(&self.pipeline.chain, channel, value)
    }

    /// Request shutdown: stops the accept loop and force-closes every
    /// registered connection, driving each session to terminate through
    /// its normal path (each fires `disconnected` exactly once). Calling
    /// `stop` again is a no-op.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("stopping acceptor");
        if let Some(listener) = self
            .listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
        {
            listener.unblock();
        }
        self.registry.close_all();
    }

    fn stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// The accept loop proper, generic over the accept source so failure
    /// classification and backoff can be exercised without a real
    /// listener.
    fn accept_loop<F>(
        &self,
        mut accept: F,
        frame_fn: FrameFn,
        handler: Arc<dyn Handler>,
    ) -> Result<()>
    where
        F: FnMut() -> braid_transport::Result<Connection>,
    {
        let mut backoff = AcceptBackoff::new();
        loop {
            let conn = match accept() {
                Ok(conn) => conn,
                Err(err) => {
                    if let TransportError::Accept(io_err) = &err {
                        if is_temporary(io_err) && !self.stopped() {
                            let delay = backoff.next();
                            warn!(error = %io_err, ?delay, "accept error; retrying");
                            std::thread::sleep(delay);
                            continue;
                        }
                    }
                    if self.stopped() {
                        debug!("accept loop stopped");
                        return Ok(());
                    }
                    error!(%err, "accept error");
                    return Err(err.into());
                }
            };
            backoff.reset();

            // A stop issued while this accept was in flight: do not serve
            // the connection.
            if self.stopped() {
                let _ = conn.shutdown();
                return Ok(());
            }

            if let Err(err) = conn.set_keepalive(KEEPALIVE_PERIOD) {
                debug!(%err, "failed to enable keep-alive");
            }

            let conn = self.pipeline.transform(conn);
            let label = conn.peer_label().to_string();
            let channel = match frame_fn(conn) {
                Ok(channel) => channel,
                Err(err) => {
                    warn!(peer = %label, %err, "failed to build frame channel");
                    continue;
                }
            };

            let closing = Arc::new(AtomicBool::new(false));
            self.registry.insert(
                label.clone(),
                SessionHandle {
                    channel: Arc::clone(&channel),
                    closing: Arc::clone(&closing),
                },
            );
            debug!(peer = %label, "connection registered");

            session::spawn(Session {
                channel,
                chain: Arc::clone(&self.pipeline.chain),
                handler: Arc::clone(&handler),
                closing,
                registry: Some((Arc::clone(&self.registry), label)),
            });
        }
    }
}
