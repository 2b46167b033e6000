//! Raw block storage abstraction.
//!
//! There is no filesystem. Everything above the card protocol driver
//! addresses storage as fixed 512-byte blocks, either one at a time or as an
//! open streaming read session.

/// Fixed block size in bytes (SDHC block length).
pub const BLOCK_SIZE: usize = 512;

/// One storage block.
pub type Block = [u8; BLOCK_SIZE];

/// Block-granular storage with an optional open streaming read session.
///
/// Operations are not reentrant: callers must finish one block operation
/// (including [`end_stream`](BlockDevice::end_stream) for streaming reads)
/// before issuing another. Implementations reject single-block operations
/// while a stream is open.
pub trait BlockDevice {
    /// Error type.
    type Error: core::fmt::Debug;

    /// Read the block at `address` into `buf`.
    fn read_block(&mut self, address: u32, buf: &mut Block) -> Result<(), Self::Error>;

    /// Write `buf` to the block at `address`.
    fn write_block(&mut self, buf: &Block, address: u32) -> Result<(), Self::Error>;

    /// Open a streaming read session starting at `start_address`.
    fn begin_stream(&mut self, start_address: u32) -> Result<(), Self::Error>;

    /// Fetch the next block of the open stream without re-issuing a command.
    fn next_stream_block(&mut self, buf: &mut Block) -> Result<(), Self::Error>;

    /// Terminate the open stream. Must be a no-op when no stream is open.
    fn end_stream(&mut self) -> Result<(), Self::Error>;
}
