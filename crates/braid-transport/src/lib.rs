//! Stream transport abstraction for braid.
//!
//! Provides a unified interface over the stream-oriented transports a braid
//! endpoint can run on:
//! - TCP (`tcp`, `tcp4`, `tcp6`)
//! - Unix domain sockets (`unix`)
//!
//! This is the lowest layer of braid. Everything else builds on top of the
//! [`Connection`] and [`NetListener`] types provided here.

pub mod conn;
pub mod error;
pub mod listener;

pub use conn::{Connection, NetKind};
pub use error::{is_temporary, Result, TransportError};
pub use listener::NetListener;
