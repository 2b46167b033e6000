//! SD card protocol driver — SPI-mode command sequencing over a byte transport.
//!
//! Drives the card through the idle → interface-condition → operating-condition
//! handshake, then serves single-block reads/writes and multi-block streaming
//! reads with bounded retries. Implements [`platform::BlockDevice`] for the
//! layers above.
//!
//! Command frames, response shapes (R1/R3/R7), and data tokens follow the SD
//! SPI wire format bit-for-bit; the physical byte shifter is the external
//! [`platform::BlockTransport`] collaborator.

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod driver;
pub mod error;
pub mod protocol;

pub use driver::{CardInfo, SdCard};
pub use error::{CardError, InitError, ProtocolError, ReadError, WriteError};
