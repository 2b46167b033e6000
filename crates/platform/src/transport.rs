//! Byte-level transport to the SD card.
//!
//! The physical SPI peripheral (clock tree, GPIO alternate functions,
//! single-byte shift register access) is an external collaborator. The card
//! protocol driver only composes these primitives into command frames.

/// SPI clock rate selection.
///
/// SD initialisation must run below 400 kHz; once the card reports ready the
/// bus is switched to full speed for streaming reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSpeed {
    /// ≤ 400 kHz, used during the init handshake.
    Init,
    /// Full bus speed, used for all data transfer.
    Full,
}

/// Synchronous byte-level serial link with software-managed chip select.
///
/// All transfers are full duplex: sending a byte shifts one in, and receiving
/// requires clocking a dummy byte out. Implementations busy-wait on the
/// shift register; there is no scheduler to yield to.
pub trait BlockTransport {
    /// Shift `value` out; returns the byte shifted in on the same clocks.
    fn send_byte(&mut self, value: u8) -> u8;

    /// Clock `dummy` out (conventionally `0xFF`) and return the byte read.
    fn receive_byte(&mut self, dummy: u8) -> u8;

    /// Drive chip select active (low).
    fn select(&mut self);

    /// Release chip select (high).
    fn deselect(&mut self);

    /// Reconfigure the bus clock.
    fn set_clock(&mut self, speed: ClockSpeed);

    /// Busy-wait for at least `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}
