//! Error taxonomy for the card protocol layer.
//!
//! Transport faults are retried locally up to a small fixed bound; exhaustion
//! converts them into one of these layer errors, never silently swallowed.
//! Only [`InitError`] during boot is fatal to storage-dependent features.

use thiserror_no_std::Error;

/// Malformed or missing response framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolError {
    /// No response byte with a valid start bit within the poll window.
    #[error("no response within the poll window")]
    NoResponse,
    /// A response byte carried an unexpected bit pattern.
    #[error("unexpected response byte {0:#04x}")]
    UnexpectedResponse(u8),
}

/// Failure to bring the card to the ready state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitError {
    /// The card never answered CMD0 with the idle response.
    #[error("card did not respond to the idle sequence")]
    NoResponse,
    /// CMD8 / OCR voltage window rejected the supply voltage.
    #[error("card rejected the 3.3 V operating range")]
    UnsupportedVoltage,
    /// ACMD41 polling exhausted its retry bound without the card leaving idle.
    #[error("card stayed busy past the init retry bound")]
    Timeout,
}

/// Failure of a single- or multi-block read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadError {
    /// Card was never brought to the ready state.
    #[error("card not initialised")]
    NotReady,
    /// A streaming session is open; finish it first.
    #[error("streaming read session already open")]
    StreamOpen,
    /// Streaming primitive called with no open session.
    #[error("no streaming read session open")]
    NoStream,
    /// Non-zero R1 status to the read command.
    #[error("read command rejected with R1 status {0:#04x}")]
    Status(u8),
    /// The data start token never arrived within the poll window.
    #[error("data token timeout")]
    TokenTimeout,
    /// The payload CRC16 did not match the trailer.
    #[error("data block checksum mismatch")]
    Checksum,
    /// Response framing error.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Failure of a single-block write. Non-fatal to callers: the operation is
/// abandoned and surfaced upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteError {
    /// Card was never brought to the ready state.
    #[error("card not initialised")]
    NotReady,
    /// A streaming session is open; finish it first.
    #[error("streaming read session already open")]
    StreamOpen,
    /// Non-zero R1 status to the write command.
    #[error("write command rejected with R1 status {0:#04x}")]
    Status(u8),
    /// The card's data response rejected the block (CRC or write error).
    #[error("data rejected with response {0:#04x}")]
    Rejected(u8),
    /// The card held the line busy past the completion poll bound.
    #[error("write completion timeout")]
    BusyTimeout,
    /// Response framing error.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Umbrella error for the [`platform::BlockDevice`] implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CardError {
    /// Init handshake failure.
    #[error("init: {0}")]
    Init(#[from] InitError),
    /// Read failure.
    #[error("read: {0}")]
    Read(#[from] ReadError),
    /// Write failure.
    #[error("write: {0}")]
    Write(#[from] WriteError),
}
