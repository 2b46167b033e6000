//! AssetEntry — the block-range record held per asset in the index.

use serde::{Deserialize, Serialize};

use crate::tag::AssetTag;

/// One catalogued asset: its tag and the block range it occupies.
///
/// `start_block` addresses the descriptor block itself; the payload begins
/// one block later. `end_block` is exclusive, so the next asset's descriptor
/// (if any) sits exactly at `end_block`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AssetEntry {
    /// Identifier from the descriptor block.
    pub tag: AssetTag,
    /// Address of the descriptor block.
    pub start_block: u32,
    /// First block past the payload.
    pub end_block: u32,
}

impl AssetEntry {
    /// First payload block (the block after the descriptor).
    pub const fn payload_start(&self) -> u32 {
        self.start_block.saturating_add(1)
    }

    /// Number of payload blocks.
    pub const fn payload_blocks(&self) -> u32 {
        self.end_block
            .saturating_sub(self.start_block)
            .saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_follows_descriptor() {
        let e = AssetEntry {
            tag: AssetTag::new([1, 2, 3, 4, 5]),
            start_block: 15_000,
            end_block: 15_011,
        };
        assert_eq!(e.payload_start(), 15_001);
        assert_eq!(e.payload_blocks(), 10);
    }

    #[test]
    fn empty_payload_is_zero_blocks() {
        let e = AssetEntry {
            tag: AssetTag::new([0; 5]),
            start_block: 20,
            end_block: 21,
        };
        assert_eq!(e.payload_blocks(), 0);
    }
}
