use std::net::TcpListener;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::conn::{Connection, NetKind};
use crate::error::{Result, TransportError};

/// A bound listening socket for either stream transport.
///
/// `accept` blocks the calling thread. `unblock` wakes a blocked `accept`
/// from another thread, which is how the stop protocol tears the accept
/// loop down without waiting for a final inbound connection.
pub struct NetListener {
    inner: ListenerInner,
    addr: String,
}

enum ListenerInner {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix {
        listener: std::os::unix::net::UnixListener,
        path: PathBuf,
        cleanup_on_drop: bool,
    },
}

impl NetListener {
    /// Bind and listen on the given address.
    ///
    /// For [`NetKind::Unix`], `addr` is a socket path; a stale socket file
    /// at that path is removed first, but an existing non-socket file is
    /// refused rather than clobbered.
    pub fn bind(kind: NetKind, addr: &str) -> Result<Self> {
        match kind {
            NetKind::Tcp => {
                let listener = TcpListener::bind(addr).map_err(|e| TransportError::Bind {
                    addr: addr.to_string(),
                    source: e,
                })?;
                let bound = listener
                    .local_addr()
                    .map(|a| a.to_string())
                    .unwrap_or_else(|_| addr.to_string());
                info!(addr = %bound, "listening on tcp");
                Ok(Self {
                    inner: ListenerInner::Tcp(listener),
                    addr: bound,
                })
            }
            #[cfg(unix)]
            NetKind::Unix => {
                let path = PathBuf::from(addr);
                if path.exists() {
                    let metadata =
                        std::fs::symlink_metadata(&path).map_err(|e| TransportError::Bind {
                            addr: addr.to_string(),
                            source: e,
                        })?;
                    if std::os::unix::fs::FileTypeExt::is_socket(&metadata.file_type()) {
                        debug!(?path, "removing stale socket");
                        std::fs::remove_file(&path).map_err(|e| TransportError::Bind {
                            addr: addr.to_string(),
                            source: e,
                        })?;
                    } else {
                        return Err(TransportError::Bind {
                            addr: addr.to_string(),
                            source: std::io::Error::new(
                                std::io::ErrorKind::AlreadyExists,
                                "existing path is not a unix socket",
                            ),
                        });
                    }
                }

                let listener = std::os::unix::net::UnixListener::bind(&path).map_err(|e| {
                    TransportError::Bind {
                        addr: addr.to_string(),
                        source: e,
                    }
                })?;
                info!(?path, "listening on unix socket");
                Ok(Self {
                    inner: ListenerInner::Unix {
                        listener,
                        path,
                        cleanup_on_drop: true,
                    },
                    addr: addr.to_string(),
                })
            }
            #[cfg(not(unix))]
            NetKind::Unix => Err(TransportError::UnsupportedNetwork("unix".to_string())),
        }
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<Connection> {
        match &self.inner {
            ListenerInner::Tcp(listener) => {
                let (stream, _addr) = listener.accept().map_err(TransportError::Accept)?;
                debug!("accepted tcp connection");
                Ok(Connection::from_tcp(stream))
            }
            #[cfg(unix)]
            ListenerInner::Unix { listener, .. } => {
                let (stream, _addr) = listener.accept().map_err(TransportError::Accept)?;
                debug!("accepted unix connection");
                Ok(Connection::from_unix(stream))
            }
        }
    }

    /// The address this listener is bound to.
    ///
    /// For TCP this is the resolved local address, so binding port 0 yields
    /// the ephemeral port actually assigned.
    pub fn local_addr(&self) -> &str {
        &self.addr
    }

    /// Wake a thread blocked in [`NetListener::accept`].
    ///
    /// The woken accept fails; callers consult their stop flag to tell this
    /// apart from a real fault.
    pub fn unblock(&self) {
        #[cfg(unix)]
        {
            use std::os::fd::AsRawFd;
            let fd = match &self.inner {
                ListenerInner::Tcp(listener) => listener.as_raw_fd(),
                ListenerInner::Unix { listener, .. } => listener.as_raw_fd(),
            };
            // SAFETY: fd is an open listening socket owned by this process;
            // shutdown on it wakes pending accepts without closing the fd.
            unsafe {
                libc::shutdown(fd, libc::SHUT_RDWR);
            }
        }
    }
}

impl Drop for NetListener {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let ListenerInner::Unix {
            path,
            cleanup_on_drop: true,
            ..
        } = &self.inner
        {
            if let Ok(metadata) = std::fs::symlink_metadata(path) {
                if std::os::unix::fs::FileTypeExt::is_socket(&metadata.file_type()) {
                    debug!(?path, "cleaning up socket file");
                    let _ = std::fs::remove_file(path);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    fn temp_sock_path(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "braid-ln-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir.join("listener.sock")
    }

    #[test]
    fn tcp_bind_reports_ephemeral_port() {
        let listener = NetListener::bind(NetKind::Tcp, "127.0.0.1:0").unwrap();
        assert!(!listener.local_addr().ends_with(":0"));
    }

    #[cfg(unix)]
    #[test]
    fn unix_bind_accept_connect() {
        let sock_path = temp_sock_path("accept");
        let listener = NetListener::bind(NetKind::Unix, sock_path.to_str().unwrap()).unwrap();

        let path = sock_path.clone();
        let client = std::thread::spawn(move || {
            let mut conn =
                Connection::dial(NetKind::Unix, path.to_str().unwrap(), None).unwrap();
            conn.write_all(b"hi").unwrap();
        });

        let mut accepted = listener.accept().unwrap();
        let mut buf = [0u8; 2];
        accepted.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hi");

        client.join().unwrap();
        drop(listener);
        assert!(!sock_path.exists(), "socket file should be removed on drop");
        if let Some(parent) = sock_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[cfg(unix)]
    #[test]
    fn unix_bind_refuses_existing_regular_file() {
        let sock_path = temp_sock_path("file");
        std::fs::write(&sock_path, b"regular").unwrap();

        let result = NetListener::bind(NetKind::Unix, sock_path.to_str().unwrap());
        assert!(matches!(result, Err(TransportError::Bind { .. })));

        if let Some(parent) = sock_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[cfg(unix)]
    #[test]
    fn unix_bind_replaces_stale_socket() {
        let sock_path = temp_sock_path("stale");
        let first = NetListener::bind(NetKind::Unix, sock_path.to_str().unwrap()).unwrap();
        // Simulate a crashed process leaving the file behind.
        std::mem::forget(first);

        let second = NetListener::bind(NetKind::Unix, sock_path.to_str().unwrap());
        assert!(second.is_ok());

        drop(second);
        if let Some(parent) = sock_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn unblock_wakes_blocked_accept() {
        let listener =
            std::sync::Arc::new(NetListener::bind(NetKind::Tcp, "127.0.0.1:0").unwrap());
        let waiter = std::sync::Arc::clone(&listener);

        let t = std::thread::spawn(move || waiter.accept());

        std::thread::sleep(std::time::Duration::from_millis(50));
        listener.unblock();
        let result = t.join().unwrap();
        assert!(matches!(result, Err(TransportError::Accept(_))));
    }
}
