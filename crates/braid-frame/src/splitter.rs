use std::sync::Arc;

use braid_transport::Connection;
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::channel::{FrameFn, FramedConn};
use crate::error::{FrameError, Result};

/// Default maximum frame size: 16 MiB.
pub const DEFAULT_MAX_FRAME: usize = 16 * 1024 * 1024;

/// Frame-boundary strategy.
///
/// `split` inspects buffered bytes and carves off one complete frame if the
/// boundary is present; `seal` appends one outgoing frame to a write
/// buffer. Implementations are pure over the buffers and hold no
/// per-connection state, so one instance serves both directions.
pub trait Splitter: Send + Sync {
    /// Extract one complete frame payload, consuming its bytes from `buf`.
    ///
    /// Returns `Ok(None)` when the buffer does not yet hold a full frame.
    fn split(&self, buf: &mut BytesMut) -> Result<Option<Bytes>>;

    /// Append `payload` to `dst` in wire form.
    fn seal(&self, payload: &[u8], dst: &mut BytesMut) -> Result<()>;
}

/// Frames terminated by `\n`; a trailing `\r` is stripped on read.
#[derive(Debug, Clone)]
pub struct LineSplitter {
    max_frame: usize,
}

impl LineSplitter {
    pub fn new(max_frame: usize) -> Self {
        Self { max_frame }
    }
}

impl Default for LineSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME)
    }
}

impl Splitter for LineSplitter {
    fn split(&self, buf: &mut BytesMut) -> Result<Option<Bytes>> {
        match buf.iter().position(|&b| b == b'\n') {
            Some(at) => {
                let mut line = buf.split_to(at);
                buf.advance(1);
                if line.last() == Some(&b'\r') {
                    line.truncate(line.len() - 1);
                }
                Ok(Some(line.freeze()))
            }
            None if buf.len() > self.max_frame => Err(FrameError::FrameTooLarge {
                size: buf.len(),
                max: self.max_frame,
            }),
            None => Ok(None),
        }
    }

    fn seal(&self, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
        if payload.len() > self.max_frame {
            return Err(FrameError::FrameTooLarge {
                size: payload.len(),
                max: self.max_frame,
            });
        }
        dst.reserve(payload.len() + 1);
        dst.put_slice(payload);
        dst.put_u8(b'\n');
        Ok(())
    }
}

/// Frames terminated by an arbitrary delimiter byte.
#[derive(Debug, Clone)]
pub struct DelimiterSplitter {
    delimiter: u8,
    max_frame: usize,
}

impl DelimiterSplitter {
    pub fn new(delimiter: u8) -> Self {
        Self {
            delimiter,
            max_frame: DEFAULT_MAX_FRAME,
        }
    }

    pub fn with_max_frame(mut self, max_frame: usize) -> Self {
        self.max_frame = max_frame;
        self
    }
}

impl Splitter for DelimiterSplitter {
    fn split(&self, buf: &mut BytesMut) -> Result<Option<Bytes>> {
        match buf.iter().position(|&b| b == self.delimiter) {
            Some(at) => {
                let frame = buf.split_to(at);
                buf.advance(1);
                Ok(Some(frame.freeze()))
            }
            None if buf.len() > self.max_frame => Err(FrameError::FrameTooLarge {
                size: buf.len(),
                max: self.max_frame,
            }),
            None => Ok(None),
        }
    }

    fn seal(&self, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
        if payload.len() > self.max_frame {
            return Err(FrameError::FrameTooLarge {
                size: payload.len(),
                max: self.max_frame,
            });
        }
        dst.reserve(payload.len() + 1);
        dst.put_slice(payload);
        dst.put_u8(self.delimiter);
        Ok(())
    }
}

/// Every frame is exactly `length` bytes; no header, no terminator.
#[derive(Debug, Clone)]
pub struct FixedLengthSplitter {
    length: usize,
}

impl FixedLengthSplitter {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl Splitter for FixedLengthSplitter {
    fn split(&self, buf: &mut BytesMut) -> Result<Option<Bytes>> {
        if buf.len() < self.length {
            return Ok(None);
        }
        Ok(Some(buf.split_to(self.length).freeze()))
    }

    fn seal(&self, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
        if payload.len() != self.length {
            return Err(FrameError::BadFrame(format!(
                "fixed-length frames must be exactly {} bytes, got {}",
                self.length,
                payload.len()
            )));
        }
        dst.extend_from_slice(payload);
        Ok(())
    }
}

/// Frame function for `\n`-terminated frames.
pub fn line_frames() -> FrameFn {
    Arc::new(|conn: Connection| FramedConn::shared(conn, LineSplitter::default()))
}

/// Frame function for frames terminated by `delimiter`.
pub fn delimiter_frames(delimiter: u8) -> FrameFn {
    Arc::new(move |conn: Connection| FramedConn::shared(conn, DelimiterSplitter::new(delimiter)))
}

/// Frame function for fixed-length frames of `length` bytes.
pub fn fixed_length_frames(length: usize) -> FrameFn {
    Arc::new(move |conn: Connection| FramedConn::shared(conn, FixedLengthSplitter::new(length)))
}
