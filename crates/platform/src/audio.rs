//! Audio output seam.
//!
//! The DAC, its amplifier, and the DMA double-buffer live behind this trait.
//! The stream engine only hands over raw sample blocks in file order; pacing
//! to the sample clock is the collaborator's problem.

use crate::storage::Block;

/// Consumer of streamed audio data.
pub trait AudioSink {
    /// Configure the output path for the clip about to play.
    fn configure(&mut self, sample_rate: u32, bit_depth: u16, channels: u16);

    /// Power up the output path.
    fn enable(&mut self);

    /// Accept one block of sample data.
    fn push_block(&mut self, block: &Block);

    /// Power down the output path. Must be safe to call when already off.
    fn disable(&mut self);
}
