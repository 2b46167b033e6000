//! Hardware abstraction seams for the cardlet firmware core.
//!
//! Every hardware dependency the core consumes is narrowed to a trait in
//! this crate, enabling development and testing without physical hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Integration layer (system crate)
//!         ↓
//! Feature layers (sdcard, assets, playback, ui)
//!         ↓
//! Platform seams (this crate - trait abstractions)
//!         ↓
//! Hardware collaborators (SPI driver, DAC/DMA, LCD, power block)
//! ```
//!
//! # Seams
//!
//! - [`BlockTransport`] — byte-level serial link to the SD card
//! - [`BlockDevice`] — block read/write/stream, implemented by the card driver
//! - [`AudioSink`] — consumer of decoded audio blocks (DAC + DMA collaborator)
//! - [`PowerControl`] — backlight and deep-sleep entry
//! - [`EventSlot`] — single-slot latest-wins input register
//!
//! # Features
//!
//! - `std`: expose the in-memory mocks outside of this crate's own tests
//! - `defmt`: derive `defmt::Format` on event and error types

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod audio;
pub mod input;
pub mod layout;
pub mod power;
pub mod storage;
pub mod transport;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

pub use audio::AudioSink;
pub use input::{Button, EventSlot, InputEvent};
pub use power::{PowerControl, SleepMode};
pub use storage::{Block, BlockDevice, BLOCK_SIZE};
pub use transport::{BlockTransport, ClockSpeed};
