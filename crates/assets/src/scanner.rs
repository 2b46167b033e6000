//! Descriptor decode and the asset-region walk.
//!
//! Each asset is announced by a one-block descriptor at its start address.
//! Assets are packed back to back, so the scan reads the descriptor, skips
//! the payload, and reads the next one; the first block that does not carry
//! the descriptor magic terminates the walk. Cost is one block read per
//! asset, independent of payload sizes.

use platform::layout::{ASSET_REGION_END, ASSET_REGION_START};
use platform::{Block, BlockDevice};

use crate::entry::AssetEntry;
use crate::error::ScanError;
use crate::index::AssetIndex;
use crate::tag::AssetTag;

/// The one-block marker written ahead of every asset payload.
///
/// Layout (rest of the block is padding):
/// ```text
/// [0..4]  magic          b"AST1"
/// [4..9]  tag            5 raw bytes
/// [9..13] payload_blocks u32 le
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetDescriptor {
    /// Identifier the application resolves at playback time.
    pub tag: AssetTag,
    /// Payload length in 512-byte blocks, descriptor excluded.
    pub payload_blocks: u32,
}

impl AssetDescriptor {
    /// Descriptor magic bytes.
    pub const MAGIC: &'static [u8; 4] = b"AST1";

    /// Write the descriptor into `block`, zeroing the padding.
    ///
    /// # Safety (lint allow)
    /// All range indices are compile-time constants well inside the
    /// 512-byte block.
    #[allow(clippy::indexing_slicing)]
    pub fn encode_into(&self, block: &mut Block) {
        block.fill(0);
        block[0..4].copy_from_slice(Self::MAGIC);
        block[4..9].copy_from_slice(self.tag.as_bytes());
        block[9..13].copy_from_slice(&self.payload_blocks.to_le_bytes());
    }

    /// Decode a descriptor from `block`, or `None` when the magic is absent
    /// (i.e. the block is past the last asset).
    ///
    /// # Safety (lint allow)
    /// All range indices are compile-time constants well inside the
    /// 512-byte block; the `try_into` calls convert slices of matching
    /// fixed length.
    #[allow(clippy::indexing_slicing)]
    pub fn decode(block: &Block) -> Option<Self> {
        if &block[0..4] != Self::MAGIC {
            return None;
        }
        let tag: [u8; 5] = block[4..9].try_into().ok()?;
        let payload_blocks = u32::from_le_bytes(block[9..13].try_into().ok()?);
        Some(AssetDescriptor {
            tag: AssetTag::new(tag),
            payload_blocks,
        })
    }
}

/// Walk the asset region and rebuild `index` from the descriptors found.
///
/// The index is cleared first. Returns the number of assets catalogued.
///
/// # Errors
///
/// [`ScanError::Device`] on a block read fault (the scan stops),
/// [`ScanError::IndexFull`] when the card holds more descriptors than the
/// index capacity.
pub fn scan<D: BlockDevice, const N: usize>(
    device: &mut D,
    index: &mut AssetIndex<N>,
) -> Result<usize, ScanError<D::Error>> {
    index.clear();
    let mut buf: Block = [0; platform::BLOCK_SIZE];
    let mut address = ASSET_REGION_START;
    while address < ASSET_REGION_END {
        device.read_block(address, &mut buf).map_err(ScanError::Device)?;
        let Some(descriptor) = AssetDescriptor::decode(&buf) else {
            break;
        };
        let end_block = address
            .saturating_add(1)
            .saturating_add(descriptor.payload_blocks);
        index
            .append(AssetEntry {
                tag: descriptor.tag,
                start_block: address,
                end_block,
            })
            .map_err(|_| ScanError::IndexFull)?;
        address = end_block;
    }
    Ok(index.len())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use super::*;
    use crate::index::SmallAssetIndex;
    use platform::mocks::{MockBlockDevice, MockDeviceError};
    use platform::BLOCK_SIZE;

    fn write_descriptor(dev: &mut MockBlockDevice, address: u32, tag: [u8; 5], payload: u32) {
        let mut block = [0u8; BLOCK_SIZE];
        AssetDescriptor {
            tag: AssetTag::new(tag),
            payload_blocks: payload,
        }
        .encode_into(&mut block);
        dev.set_block(address, block);
    }

    #[test]
    fn descriptor_roundtrip() {
        let mut block = [0xFFu8; BLOCK_SIZE];
        let desc = AssetDescriptor {
            tag: AssetTag::new([0x01, 0x28, 0x15, 0x72, 0x01]),
            payload_blocks: 42,
        };
        desc.encode_into(&mut block);
        assert_eq!(AssetDescriptor::decode(&block), Some(desc));
        // Padding must be zeroed so stale bytes never survive a rewrite.
        assert_eq!(block[13], 0);
    }

    #[test]
    fn decode_rejects_missing_magic() {
        let block = [0u8; BLOCK_SIZE];
        assert!(AssetDescriptor::decode(&block).is_none());
    }

    #[test]
    fn scan_walks_packed_assets() {
        let mut dev = MockBlockDevice::new();
        write_descriptor(&mut dev, ASSET_REGION_START, [1, 1, 1, 1, 1], 10);
        write_descriptor(&mut dev, ASSET_REGION_START + 11, [2, 2, 2, 2, 2], 3);
        let mut idx = SmallAssetIndex::new();
        let count = scan(&mut dev, &mut idx).unwrap();
        assert_eq!(count, 2);
        let first = idx.get(0).unwrap();
        assert_eq!(first.start_block, ASSET_REGION_START);
        assert_eq!(first.end_block, ASSET_REGION_START + 11);
        let second = idx.get(1).unwrap();
        assert_eq!(second.tag, AssetTag::new([2, 2, 2, 2, 2]));
        assert_eq!(second.payload_start(), ASSET_REGION_START + 12);
        // One descriptor read per asset plus the terminator block.
        assert_eq!(dev.reads, 3);
    }

    #[test]
    fn scan_of_blank_region_is_empty() {
        let mut dev = MockBlockDevice::new();
        let mut idx = SmallAssetIndex::new();
        assert_eq!(scan(&mut dev, &mut idx).unwrap(), 0);
        assert!(idx.is_empty());
    }

    #[test]
    fn scan_clears_previous_contents() {
        let mut dev = MockBlockDevice::new();
        write_descriptor(&mut dev, ASSET_REGION_START, [7, 7, 7, 7, 7], 1);
        let mut idx = SmallAssetIndex::new();
        idx.append(AssetEntry {
            tag: AssetTag::new([9, 9, 9, 9, 9]),
            start_block: 1,
            end_block: 2,
        })
        .unwrap();
        scan(&mut dev, &mut idx).unwrap();
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.get(0).unwrap().tag, AssetTag::new([7, 7, 7, 7, 7]));
    }

    #[test]
    fn scan_surfaces_device_fault() {
        let mut dev = MockBlockDevice::new();
        dev.fail_reads = 1;
        let mut idx = SmallAssetIndex::new();
        assert_eq!(
            scan(&mut dev, &mut idx),
            Err(ScanError::Device(MockDeviceError::ReadFault))
        );
    }

    #[test]
    fn scan_overflowing_index_errors() {
        let mut dev = MockBlockDevice::new();
        for i in 0..3u32 {
            write_descriptor(&mut dev, ASSET_REGION_START + i * 2, [i as u8; 5], 1);
        }
        let mut idx = AssetIndex::<2>::new();
        assert_eq!(scan(&mut dev, &mut idx), Err(ScanError::IndexFull));
    }
}
