use std::sync::Arc;

use braid_transport::Connection;
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::channel::{FrameFn, FramedConn};
use crate::error::{FrameError, Result};
use crate::splitter::{Splitter, DEFAULT_MAX_FRAME};

/// Shape of a length-prefixed frame.
///
/// The length field sits at the front of every frame and states the payload
/// size; `length_includes_header` covers protocols whose length counts the
/// field itself.
#[derive(Debug, Clone)]
pub struct LengthFieldConfig {
    /// Width of the length field in bytes: 1, 2, 4, or 8.
    pub field_len: usize,
    /// Big-endian (network order) when true, little-endian otherwise.
    pub big_endian: bool,
    /// Whether the on-wire length counts the length field itself.
    pub length_includes_header: bool,
    /// Maximum accepted payload size.
    pub max_frame: usize,
}

impl Default for LengthFieldConfig {
    fn default() -> Self {
        Self {
            field_len: 4,
            big_endian: true,
            length_includes_header: false,
            max_frame: DEFAULT_MAX_FRAME,
        }
    }
}

impl LengthFieldConfig {
    fn validate(&self) -> Result<()> {
        match self.field_len {
            1 | 2 | 4 | 8 => Ok(()),
            other => Err(FrameError::BadFrame(format!(
                "length field width must be 1, 2, 4, or 8 bytes, got {other}"
            ))),
        }
    }

    fn field_max(&self) -> u64 {
        match self.field_len {
            1 => u8::MAX as u64,
            2 => u16::MAX as u64,
            4 => u32::MAX as u64,
            _ => u64::MAX,
        }
    }
}

/// Length-prefixed frames.
#[derive(Debug, Clone)]
pub struct LengthFieldSplitter {
    config: LengthFieldConfig,
}

impl LengthFieldSplitter {
    pub fn new(config: LengthFieldConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl Splitter for LengthFieldSplitter {
    fn split(&self, buf: &mut BytesMut) -> Result<Option<Bytes>> {
        let cfg = &self.config;
        if buf.len() < cfg.field_len {
            return Ok(None);
        }

        let mut field = [0u8; 8];
        if cfg.big_endian {
            field[8 - cfg.field_len..].copy_from_slice(&buf[..cfg.field_len]);
        } else {
            field[..cfg.field_len].copy_from_slice(&buf[..cfg.field_len]);
        }
        let raw = if cfg.big_endian {
            u64::from_be_bytes(field)
        } else {
            u64::from_le_bytes(field)
        };

        let payload_len = if cfg.length_includes_header {
            raw.checked_sub(cfg.field_len as u64).ok_or_else(|| {
                FrameError::BadFrame(format!(
                    "length {raw} smaller than its own {}-byte header",
                    cfg.field_len
                ))
            })?
        } else {
            raw
        };

        if payload_len > cfg.max_frame as u64 {
            return Err(FrameError::FrameTooLarge {
                size: payload_len as usize,
                max: cfg.max_frame,
            });
        }
        let payload_len = payload_len as usize;

        if buf.len() < cfg.field_len + payload_len {
            return Ok(None);
        }

        buf.advance(cfg.field_len);
        Ok(Some(buf.split_to(payload_len).freeze()))
    }

    fn seal(&self, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
        let cfg = &self.config;
        if payload.len() > cfg.max_frame {
            return Err(FrameError::FrameTooLarge {
                size: payload.len(),
                max: cfg.max_frame,
            });
        }

        let mut length = payload.len() as u64;
        if cfg.length_includes_header {
            length += cfg.field_len as u64;
        }
        if length > cfg.field_max() {
            return Err(FrameError::FrameTooLarge {
                size: payload.len(),
                max: cfg.field_max() as usize,
            });
        }

        dst.reserve(cfg.field_len + payload.len());
        let bytes = if cfg.big_endian {
            length.to_be_bytes()
        } else {
            length.to_le_bytes()
        };
        if cfg.big_endian {
            dst.put_slice(&bytes[8 - cfg.field_len..]);
        } else {
            dst.put_slice(&bytes[..cfg.field_len]);
        }
        dst.put_slice(payload);
        Ok(())
    }
}

/// Frame function for length-prefixed frames.
pub fn length_field_frames(config: LengthFieldConfig) -> FrameFn {
    Arc::new(move |conn: Connection| {
        let splitter = LengthFieldSplitter::new(config.clone())?;
        FramedConn::shared(conn, splitter)
    })
}
