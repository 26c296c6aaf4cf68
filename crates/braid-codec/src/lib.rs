//! Chainable value codecs for braid frames.
//!
//! A [`CodecChain`] sits between raw frame bytes and the value an
//! application handler sees. Decoding walks the chain in registration
//! order; encoding walks it in reverse and must bottom out at raw bytes,
//! since that is all a frame channel will carry.

pub mod chain;
pub mod codecs;
pub mod error;
pub mod value;

pub use chain::{Codec, CodecChain};
pub use codecs::{JsonCodec, StringCodec};
pub use error::{CodecError, Result};
pub use value::Value;
