use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tracing::debug;

use crate::error::{Result, TransportError};

/// The stream transports an endpoint can listen or dial on.
///
/// Datagram and packet-oriented networks are rejected at setup time; braid
/// only frames continuous byte streams.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NetKind {
    Tcp,
    Unix,
}

impl std::str::FromStr for NetKind {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tcp" | "tcp4" | "tcp6" => Ok(NetKind::Tcp),
            "unix" => Ok(NetKind::Unix),
            other => Err(TransportError::UnsupportedNetwork(other.to_string())),
        }
    }
}

impl std::fmt::Display for NetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetKind::Tcp => f.write_str("tcp"),
            NetKind::Unix => f.write_str("unix"),
        }
    }
}

/// Label counter for Unix peers that connect without a named socket path.
static ANON_PEER_SEQ: AtomicU64 = AtomicU64::new(1);

/// A connected byte stream — implements `Read + Write`.
///
/// This is the fundamental I/O type produced by dial and accept. Each clone
/// shares the same underlying socket, so `shutdown` on one clone unblocks a
/// read on another; framing layers rely on that to split read and write
/// halves.
pub struct Connection {
    inner: ConnInner,
    label: Arc<str>,
}

enum ConnInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Connection {
    /// Wrap an already-connected TCP stream.
    pub fn from_tcp(stream: TcpStream) -> Self {
        let label = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| anon_label());
        Self {
            inner: ConnInner::Tcp(stream),
            label: label.into(),
        }
    }

    /// Wrap an already-connected Unix stream.
    #[cfg(unix)]
    pub fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        // Unix peers are usually unbound, so their socket address carries no
        // usable name; fall back to a process-unique label.
        let label = stream
            .peer_addr()
            .ok()
            .and_then(|a| a.as_pathname().map(|p| p.display().to_string()))
            .unwrap_or_else(anon_label);
        Self {
            inner: ConnInner::Unix(stream),
            label: label.into(),
        }
    }

    /// Connect to a remote endpoint (blocking).
    ///
    /// TCP honors `timeout` via `connect_timeout`; Unix sockets connect
    /// without one. For [`NetKind::Unix`], `addr` is a socket path.
    pub fn dial(kind: NetKind, addr: &str, timeout: Option<Duration>) -> Result<Self> {
        match kind {
            NetKind::Tcp => {
                let stream = match timeout {
                    Some(t) => {
                        let sock_addr = addr
                            .to_socket_addrs()
                            .map_err(|e| TransportError::Connect {
                                addr: addr.to_string(),
                                source: e,
                            })?
                            .next()
                            .ok_or_else(|| TransportError::Connect {
                                addr: addr.to_string(),
                                source: std::io::Error::new(
                                    std::io::ErrorKind::AddrNotAvailable,
                                    "address resolved to nothing",
                                ),
                            })?;
                        TcpStream::connect_timeout(&sock_addr, t)
                    }
                    None => TcpStream::connect(addr),
                }
                .map_err(|e| TransportError::Connect {
                    addr: addr.to_string(),
                    source: e,
                })?;
                debug!(%addr, "connected over tcp");
                Ok(Self::from_tcp(stream))
            }
            #[cfg(unix)]
            NetKind::Unix => {
                let stream = std::os::unix::net::UnixStream::connect(addr).map_err(|e| {
                    TransportError::Connect {
                        addr: addr.to_string(),
                        source: e,
                    }
                })?;
                debug!(%addr, "connected over unix socket");
                Ok(Self::from_unix(stream))
            }
            #[cfg(not(unix))]
            NetKind::Unix => Err(TransportError::UnsupportedNetwork("unix".to_string())),
        }
    }

    /// The remote peer's address string.
    ///
    /// Stable for the lifetime of the connection and shared by clones, so it
    /// is usable as a registry key. Anonymous Unix peers get a
    /// process-unique `unix-peer-<n>` label.
    pub fn peer_label(&self) -> &str {
        &self.label
    }

    /// Try to clone this connection (creates a new file descriptor for the
    /// same socket).
    pub fn try_clone(&self) -> Result<Self> {
        let inner = match &self.inner {
            ConnInner::Tcp(stream) => ConnInner::Tcp(stream.try_clone()?),
            #[cfg(unix)]
            ConnInner::Unix(stream) => ConnInner::Unix(stream.try_clone()?),
        };
        Ok(Self {
            inner,
            label: Arc::clone(&self.label),
        })
    }

    /// Shut down both halves of the connection.
    ///
    /// A reader blocked on any clone of this connection observes
    /// end-of-stream. Shutting down an already-closed socket is not an
    /// error worth surfacing, so `NotConnected` is swallowed.
    pub fn shutdown(&self) -> Result<()> {
        let res = match &self.inner {
            ConnInner::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            ConnInner::Unix(stream) => stream.shutdown(Shutdown::Both),
        };
        match res {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(TransportError::Io(e)),
        }
    }

    /// Enable keep-alive probing on stream transports that support it.
    ///
    /// TCP sockets get `SO_KEEPALIVE` with the given probe period; Unix
    /// sockets have no keep-alive concept and ignore the call.
    pub fn set_keepalive(&self, period: Duration) -> Result<()> {
        match &self.inner {
            ConnInner::Tcp(stream) => {
                let sock = SockRef::from(stream);
                sock.set_keepalive(true)?;
                sock.set_tcp_keepalive(&TcpKeepalive::new().with_time(period))?;
                Ok(())
            }
            #[cfg(unix)]
            ConnInner::Unix(_) => Ok(()),
        }
    }
}

fn anon_label() -> String {
    format!("unix-peer-{}", ANON_PEER_SEQ.fetch_add(1, Ordering::Relaxed))
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            ConnInner::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            ConnInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            ConnInner::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            ConnInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            ConnInner::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            ConnInner::Unix(stream) => stream.flush(),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.inner {
            ConnInner::Tcp(_) => "tcp",
            #[cfg(unix)]
            ConnInner::Unix(_) => "unix",
        };
        f.debug_struct("Connection")
            .field("kind", &kind)
            .field("peer", &self.label)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_tcp_variants() {
        assert_eq!(NetKind::from_str("tcp").unwrap(), NetKind::Tcp);
        assert_eq!(NetKind::from_str("tcp4").unwrap(), NetKind::Tcp);
        assert_eq!(NetKind::from_str("tcp6").unwrap(), NetKind::Tcp);
        assert_eq!(NetKind::from_str("unix").unwrap(), NetKind::Unix);
    }

    #[test]
    fn rejects_non_stream_networks() {
        for bad in ["udp", "udp4", "unixpacket", "ip", ""] {
            let err = NetKind::from_str(bad).unwrap_err();
            assert!(matches!(err, TransportError::UnsupportedNetwork(_)));
        }
    }

    #[cfg(unix)]
    #[test]
    fn clones_share_peer_label() {
        let (left, _right) = std::os::unix::net::UnixStream::pair().unwrap();
        let conn = Connection::from_unix(left);
        let clone = conn.try_clone().unwrap();
        assert_eq!(conn.peer_label(), clone.peer_label());
    }

    #[cfg(unix)]
    #[test]
    fn anonymous_unix_peers_get_distinct_labels() {
        let (a, _a2) = std::os::unix::net::UnixStream::pair().unwrap();
        let (b, _b2) = std::os::unix::net::UnixStream::pair().unwrap();
        let ca = Connection::from_unix(a);
        let cb = Connection::from_unix(b);
        assert_ne!(ca.peer_label(), cb.peer_label());
    }

    #[cfg(unix)]
    #[test]
    fn shutdown_unblocks_cloned_reader() {
        let (left, _right) = std::os::unix::net::UnixStream::pair().unwrap();
        let conn = Connection::from_unix(left);
        let mut reader = conn.try_clone().unwrap();

        let t = std::thread::spawn(move || {
            let mut buf = [0u8; 16];
            reader.read(&mut buf).unwrap()
        });

        std::thread::sleep(Duration::from_millis(20));
        conn.shutdown().unwrap();
        assert_eq!(t.join().unwrap(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn shutdown_is_idempotent() {
        let (left, _right) = std::os::unix::net::UnixStream::pair().unwrap();
        let conn = Connection::from_unix(left);
        conn.shutdown().unwrap();
        conn.shutdown().unwrap();
    }

    #[test]
    fn dial_tcp_roundtrip() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4];
            stream.read_exact(&mut buf).unwrap();
            stream.write_all(&buf).unwrap();
        });

        let mut conn =
            Connection::dial(NetKind::Tcp, &addr, Some(Duration::from_secs(5))).unwrap();
        conn.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        conn.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");

        server.join().unwrap();
    }

    #[test]
    fn dial_keepalive_applies_to_tcp() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = std::thread::spawn(move || {
            let _ = listener.accept().unwrap();
        });

        let conn = Connection::dial(NetKind::Tcp, &addr, None).unwrap();
        conn.set_keepalive(Duration::from_secs(180)).unwrap();
        server.join().unwrap();
    }
}
