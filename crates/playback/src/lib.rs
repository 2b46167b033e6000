//! Audio streaming — container header parse and the transport state machine.
//!
//! [`StreamEngine`] owes its shape to the card: audio is stored as WAV
//! payloads in raw block ranges, so playback is a multi-block streaming read
//! that the engine opens, feeds block by block, and closes. Pause keeps the
//! cursor and closes the stream; resume reopens it at the retained block, so
//! nothing is re-read and the header is parsed exactly once per track.
//!
//! # Modules
//!
//! - [`header`] — `AudioHeader` and the RIFF/WAVE chunk walk
//! - [`cursor`] — `PlaybackCursor` block/byte position
//! - [`engine`] — `StreamEngine` transport state machine

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod cursor;
pub mod engine;
pub mod error;
pub mod header;

pub use cursor::PlaybackCursor;
pub use engine::{Progress, StreamEngine, StreamState};
pub use error::StreamError;
pub use header::{AudioHeader, HeaderError};
