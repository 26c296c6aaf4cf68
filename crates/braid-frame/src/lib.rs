//! Frame boundary extraction for braid byte streams.
//!
//! A raw connection delivers an undifferentiated byte stream; this crate
//! turns it into discrete frames. The [`FrameChannel`] trait is the
//! per-connection contract the rest of braid builds on, and [`Splitter`]
//! is the strategy that decides where one frame ends and the next begins.
//!
//! Four stock strategies ship here: line-based, delimiter-based,
//! fixed-length, and length-field-based. Partial reads are handled
//! internally; callers always see complete frames.

pub mod channel;
pub mod error;
pub mod length_field;
pub mod splitter;

pub use channel::{FrameChannel, FrameFn, FramedConn};
pub use error::{FrameError, Result};
pub use length_field::{length_field_frames, LengthFieldConfig, LengthFieldSplitter};
pub use splitter::{
    delimiter_frames, fixed_length_frames, line_frames, DelimiterSplitter, FixedLengthSplitter,
    LineSplitter, Splitter, DEFAULT_MAX_FRAME,
};
