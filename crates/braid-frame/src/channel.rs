use std::io::{ErrorKind, Read, Write};
use std::sync::{Arc, Mutex};

use braid_transport::Connection;
use bytes::{Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::splitter::Splitter;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Frame-level view of one connection.
///
/// Exactly one channel is built per connection and it is never re-created.
/// `read_frame` blocks only the calling thread; one thread (the session)
/// owns the read side by convention, while any thread holding the `Arc`
/// may call `write_frame` concurrently. Individual frames are written
/// atomically, but ordering between concurrent writers is the caller's
/// concern.
pub trait FrameChannel: Send + Sync {
    /// Read the next complete frame (blocking).
    ///
    /// Returns [`FrameError::Closed`] when the stream ends, whether the
    /// peer hung up or the socket was shut down locally.
    fn read_frame(&self) -> Result<Bytes>;

    /// Frame and write a payload (blocking).
    fn write_frame(&self, payload: &[u8]) -> Result<()>;

    /// The underlying connection.
    fn connection(&self) -> &Connection;

    /// Close the underlying connection, waking any blocked reader.
    fn close(&self) -> Result<()>;
}

/// Frame-construction hook: maps a freshly established connection to its
/// frame channel. Every endpoint must be configured with one.
pub type FrameFn = Arc<dyn Fn(Connection) -> Result<Arc<dyn FrameChannel>> + Send + Sync>;

/// The one [`FrameChannel`] implementation: a connection split into a
/// buffered read half and a write half, with frame boundaries decided by a
/// [`Splitter`] strategy.
pub struct FramedConn<S> {
    splitter: S,
    read_half: Mutex<ReadHalf>,
    write_half: Mutex<WriteHalf>,
    conn: Connection,
}

struct ReadHalf {
    stream: Connection,
    buf: BytesMut,
}

struct WriteHalf {
    stream: Connection,
    scratch: BytesMut,
}

impl<S: Splitter> FramedConn<S> {
    /// Split `conn` into read and write halves framed by `splitter`.
    pub fn new(conn: Connection, splitter: S) -> Result<Self> {
        let read_stream = conn.try_clone().map_err(transport_to_frame)?;
        let write_stream = conn.try_clone().map_err(transport_to_frame)?;
        Ok(Self {
            splitter,
            read_half: Mutex::new(ReadHalf {
                stream: read_stream,
                buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            }),
            write_half: Mutex::new(WriteHalf {
                stream: write_stream,
                scratch: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            }),
            conn,
        })
    }

    /// Wrap in the `Arc<dyn FrameChannel>` form endpoints pass around.
    pub fn shared(conn: Connection, splitter: S) -> Result<Arc<dyn FrameChannel>>
    where
        S: 'static,
    {
        Ok(Arc::new(Self::new(conn, splitter)?))
    }
}

impl<S: Splitter> FrameChannel for FramedConn<S> {
    fn read_frame(&self) -> Result<Bytes> {
        let mut half = self.read_half.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(frame) = self.splitter.split(&mut half.buf)? {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match half.stream.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                // EOF. Buffered bytes short of a boundary are dropped, the
                // same as a peer hanging up mid-frame.
                return Err(FrameError::Closed);
            }

            half.buf.extend_from_slice(&chunk[..read]);
        }
    }

    fn write_frame(&self, payload: &[u8]) -> Result<()> {
        let mut half = self.write_half.lock().unwrap_or_else(|e| e.into_inner());
        let half = &mut *half;
        half.scratch.clear();
        self.splitter.seal(payload, &mut half.scratch)?;

        let mut offset = 0usize;
        while offset < half.scratch.len() {
            match half.stream.write(&half.scratch[offset..]) {
                Ok(0) => return Err(FrameError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        loop {
            match half.stream.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    fn connection(&self) -> &Connection {
        &self.conn
    }

    fn close(&self) -> Result<()> {
        self.conn.shutdown().map_err(transport_to_frame)
    }
}

fn transport_to_frame(err: braid_transport::TransportError) -> FrameError {
    match err {
        braid_transport::TransportError::Io(io)
        | braid_transport::TransportError::Accept(io) => FrameError::Io(io),
        braid_transport::TransportError::Bind { source, .. }
        | braid_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
