use std::collections::HashMap;
use std::sync::Arc;

use braid_codec::Value;
use braid_frame::FrameChannel;
use braid_transport::Connection;
use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{PeerError, Result};
use crate::handler::Handler;

type CommandFn = Box<dyn Fn(&Arc<dyn FrameChannel>, Bytes) -> Result<()> + Send + Sync>;
type ConnCallback = Box<dyn Fn(&Connection) + Send + Sync>;
type ErrorCallback = Box<dyn Fn(&PeerError) + Send + Sync>;

/// A stock [`Handler`] that routes command-tagged payloads.
///
/// Frames carry a tag header — a big-endian `u16` tag length, the tag
/// bytes, then the body — built with [`wrap_command`]. The tag selects a
/// registered route; an unknown tag or a truncated header is an error and,
/// per the engine's fail-fast policy, ends the offending session.
///
/// Lifecycle callbacks are explicit optional operations defaulting to
/// no-ops.
pub struct CommandDispatcher {
    routes: HashMap<String, CommandFn>,
    connected: ConnCallback,
    disconnected: ConnCallback,
    error: ErrorCallback,
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self {
            routes: HashMap::new(),
            connected: Box::new(|_| {}),
            disconnected: Box::new(|_| {}),
            error: Box::new(|_| {}),
        }
    }
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route for `tag`.
    pub fn command(
        mut self,
        tag: impl Into<String>,
        route: impl Fn(&Arc<dyn FrameChannel>, Bytes) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.routes.insert(tag.into(), Box::new(route));
        self
    }

    /// Observe session starts.
    pub fn on_connected(mut self, f: impl Fn(&Connection) + Send + Sync + 'static) -> Self {
        self.connected = Box::new(f);
        self
    }

    /// Observe session ends.
    pub fn on_disconnected(mut self, f: impl Fn(&Connection) + Send + Sync + 'static) -> Self {
        self.disconnected = Box::new(f);
        self
    }

    /// Observe session-fatal faults.
    pub fn on_error(mut self, f: impl Fn(&PeerError) + Send + Sync + 'static) -> Self {
        self.error = Box::new(f);
        self
    }
}

impl Handler for CommandDispatcher {
    fn connected(&self, conn: &Connection) {
        (self.connected)(conn)
    }

    fn disconnected(&self, conn: &Connection) {
        (self.disconnected)(conn)
    }

    fn handle(&self, channel: &Arc<dyn FrameChannel>, value: Value) -> Result<()> {
        let data = match value {
            Value::Bytes(bytes) => bytes,
            Value::Text(text) => Bytes::from(text.into_bytes()),
            _ => {
                return Err(PeerError::MalformedCommand(
                    "command frames must be bytes or text",
                ))
            }
        };

        let (tag, body) = parse_command(&data)?;
        let route = self
            .routes
            .get(tag)
            .ok_or_else(|| PeerError::UnknownCommand(tag.to_string()))?;
        route(channel, body)
    }

    fn error_caught(&self, err: &PeerError) {
        (self.error)(err)
    }
}

/// Prefix `body` with a command tag header.
pub fn wrap_command(tag: &str, body: &[u8]) -> Result<Bytes> {
    if tag.len() > u16::MAX as usize {
        return Err(PeerError::MalformedCommand("tag longer than 65535 bytes"));
    }
    let mut out = BytesMut::with_capacity(2 + tag.len() + body.len());
    out.put_u16(tag.len() as u16);
    out.put_slice(tag.as_bytes());
    out.put_slice(body);
    Ok(out.freeze())
}

fn parse_command(data: &Bytes) -> Result<(&str, Bytes)> {
    if data.len() < 2 {
        return Err(PeerError::MalformedCommand("frame too short for tag length"));
    }
    let tag_len = u16::from_be_bytes([data[0], data[1]]) as usize;
    if data.len() < 2 + tag_len {
        return Err(PeerError::MalformedCommand("frame too short for tag"));
    }
    let tag = std::str::from_utf8(&data[2..2 + tag_len])
        .map_err(|_| PeerError::MalformedCommand("tag is not valid utf-8"))?;
    Ok((tag, data.slice(2 + tag_len..)))
}
