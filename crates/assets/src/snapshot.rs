//! Index snapshot — checksummed persistence of the catalogue.
//!
//! The snapshot lives in a small reserved region past the assets. Layout:
//! a 16-byte fixed header followed by the postcard-encoded entry list, all
//! multi-byte integers little-endian:
//!
//! ```text
//! [0..4]   magic       b"AIDX"
//! [4]      version     u8 = 1
//! [5..8]   _pad        [u8; 3]
//! [8..12]  payload_len u32 le (postcard bytes)
//! [12..16] checksum    u32 le (CRC32 of the payload)
//! ```
//!
//! Any validation failure on load is answered by falling back to a full
//! region scan, so a corrupt snapshot can never brick the catalogue.

use platform::layout::{INDEX_SNAPSHOT_BLOCK, INDEX_SNAPSHOT_BLOCKS};
use platform::{Block, BlockDevice, BLOCK_SIZE};

use crate::entry::AssetEntry;
use crate::error::{ScanError, SnapshotError};
use crate::index::AssetIndex;
use crate::scanner::scan;

/// Total snapshot region size in bytes.
pub const SNAPSHOT_BYTES: usize = BLOCK_SIZE * INDEX_SNAPSHOT_BLOCKS as usize;

const HEADER_LEN: usize = 16;
const MAGIC: &[u8; 4] = b"AIDX";
const VERSION: u8 = 1;
const PAYLOAD_CAPACITY: usize = SNAPSHOT_BYTES - HEADER_LEN;

/// How the boot path obtained the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IndexSource {
    /// Loaded from a valid snapshot; no region walk was needed.
    Snapshot,
    /// Rebuilt by scanning the asset region.
    Scan,
}

/// Persist `index` into the snapshot region.
///
/// # Errors
///
/// [`SnapshotError::TooLarge`] when the encoded entries exceed the region,
/// [`SnapshotError::Device`] on a write fault. Callers treat both as
/// non-fatal: the index in RAM stays authoritative.
pub fn save<D: BlockDevice, const N: usize>(
    device: &mut D,
    index: &AssetIndex<N>,
) -> Result<(), SnapshotError<D::Error>> {
    // 2 KB staging image; the boot task stack is sized for it.
    #[allow(clippy::large_stack_arrays)]
    let mut image = [0u8; SNAPSHOT_BYTES];

    let payload_len = {
        // SAFETY: HEADER_LEN is a compile-time constant below SNAPSHOT_BYTES.
        #[allow(clippy::indexing_slicing)]
        let tail = &mut image[HEADER_LEN..];
        postcard::to_slice(index.entries(), tail)
            .map_err(|_| SnapshotError::TooLarge)?
            .len()
    };

    // SAFETY: header indices are compile-time constants; payload_len is
    // bounded by the staging slice postcard just wrote into.
    #[allow(clippy::indexing_slicing)]
    {
        let checksum = crc32fast::hash(&image[HEADER_LEN..HEADER_LEN.saturating_add(payload_len)]);
        image[0..4].copy_from_slice(MAGIC);
        image[4] = VERSION;
        image[8..12].copy_from_slice(&(payload_len as u32).to_le_bytes());
        image[12..16].copy_from_slice(&checksum.to_le_bytes());
    }

    let mut block: Block = [0; BLOCK_SIZE];
    for i in 0..INDEX_SNAPSHOT_BLOCKS {
        let offset = (i as usize).saturating_mul(BLOCK_SIZE);
        // SAFETY: offset + BLOCK_SIZE never exceeds SNAPSHOT_BYTES.
        #[allow(clippy::indexing_slicing)]
        block.copy_from_slice(&image[offset..offset.saturating_add(BLOCK_SIZE)]);
        device
            .write_block(&block, INDEX_SNAPSHOT_BLOCK.saturating_add(i))
            .map_err(SnapshotError::Device)?;
    }
    Ok(())
}

/// Load the snapshot into `index`, replacing its contents.
///
/// Returns the number of entries restored.
///
/// # Errors
///
/// Any header or checksum validation failure, a device fault, or a decode
/// failure. The index is untouched on error.
pub fn load<D: BlockDevice, const N: usize>(
    device: &mut D,
    index: &mut AssetIndex<N>,
) -> Result<usize, SnapshotError<D::Error>> {
    // 2 KB staging image; the boot task stack is sized for it.
    #[allow(clippy::large_stack_arrays)]
    let mut image = [0u8; SNAPSHOT_BYTES];
    let mut block: Block = [0; BLOCK_SIZE];
    for i in 0..INDEX_SNAPSHOT_BLOCKS {
        device
            .read_block(INDEX_SNAPSHOT_BLOCK.saturating_add(i), &mut block)
            .map_err(SnapshotError::Device)?;
        let offset = (i as usize).saturating_mul(BLOCK_SIZE);
        // SAFETY: offset + BLOCK_SIZE never exceeds SNAPSHOT_BYTES.
        #[allow(clippy::indexing_slicing)]
        image[offset..offset.saturating_add(BLOCK_SIZE)].copy_from_slice(&block);
    }

    if image.get(0..4) != Some(MAGIC.as_ref()) {
        return Err(SnapshotError::BadMagic);
    }
    if image.get(4).copied() != Some(VERSION) {
        return Err(SnapshotError::UnsupportedVersion);
    }
    // SAFETY: header indices are compile-time constants within the image.
    #[allow(clippy::indexing_slicing)]
    let payload_len = u32::from_le_bytes(
        image[8..12].try_into().map_err(|_| SnapshotError::Decode)?,
    ) as usize;
    #[allow(clippy::indexing_slicing)]
    let expected = u32::from_le_bytes(
        image[12..16].try_into().map_err(|_| SnapshotError::Decode)?,
    );
    if payload_len > PAYLOAD_CAPACITY {
        return Err(SnapshotError::Truncated);
    }
    let payload = image
        .get(HEADER_LEN..HEADER_LEN.saturating_add(payload_len))
        .ok_or(SnapshotError::Truncated)?;
    if crc32fast::hash(payload) != expected {
        return Err(SnapshotError::ChecksumMismatch);
    }
    let entries: heapless::Vec<AssetEntry, N> =
        postcard::from_bytes(payload).map_err(|_| SnapshotError::Decode)?;
    let count = entries.len();
    index.replace(entries);
    Ok(count)
}

/// Boot path: restore the index from the snapshot, or rebuild it by
/// scanning and refresh the snapshot for the next boot.
///
/// A failed snapshot refresh after a scan is swallowed; it only costs the
/// next boot its shortcut.
///
/// # Errors
///
/// Only scan failures propagate; a rejected snapshot is the designed
/// fallback, not an error.
pub fn load_or_scan<D: BlockDevice, const N: usize>(
    device: &mut D,
    index: &mut AssetIndex<N>,
) -> Result<IndexSource, ScanError<D::Error>> {
    if load(device, index).is_ok() {
        return Ok(IndexSource::Snapshot);
    }
    scan(device, index)?;
    let _ = save(device, index);
    Ok(IndexSource::Scan)
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
    use crate::scanner::AssetDescriptor;
    use crate::tag::AssetTag;
    use platform::layout::ASSET_REGION_START;
    use platform::mocks::MockBlockDevice;

    fn sample_index() -> SmallAssetIndex {
        let mut idx = SmallAssetIndex::new();
        idx.append(AssetEntry {
            tag: AssetTag::new([1, 2, 3, 4, 5]),
            start_block: 15_000,
            end_block: 15_040,
        })
        .unwrap();
        idx.append(AssetEntry {
            tag: AssetTag::new([6, 7, 8, 9, 10]),
            start_block: 15_040,
            end_block: 15_100,
        })
        .unwrap();
        idx
    }

    #[test]
    fn save_then_load_restores_entries() {
        let mut dev = MockBlockDevice::new();
        save(&mut dev, &sample_index()).unwrap();
        let mut restored = SmallAssetIndex::new();
        assert_eq!(load(&mut dev, &mut restored).unwrap(), 2);
        assert_eq!(restored.entries(), sample_index().entries());
    }

    #[test]
    fn load_from_blank_region_is_bad_magic() {
        let mut dev = MockBlockDevice::new();
        let mut idx = SmallAssetIndex::new();
        assert_eq!(
            load(&mut dev, &mut idx),
            Err(SnapshotError::BadMagic)
        );
    }

    #[test]
    fn load_rejects_wrong_version() {
        let mut dev = MockBlockDevice::new();
        save(&mut dev, &sample_index()).unwrap();
        let mut block = dev.block(INDEX_SNAPSHOT_BLOCK);
        block[4] = 99;
        dev.set_block(INDEX_SNAPSHOT_BLOCK, block);
        let mut idx = SmallAssetIndex::new();
        assert_eq!(
            load(&mut dev, &mut idx),
            Err(SnapshotError::UnsupportedVersion)
        );
    }

    #[test]
    fn load_rejects_flipped_payload_byte() {
        let mut dev = MockBlockDevice::new();
        save(&mut dev, &sample_index()).unwrap();
        let mut block = dev.block(INDEX_SNAPSHOT_BLOCK);
        block[HEADER_LEN + 3] ^= 0xFF;
        dev.set_block(INDEX_SNAPSHOT_BLOCK, block);
        let mut idx = SmallAssetIndex::new();
        assert_eq!(
            load(&mut dev, &mut idx),
            Err(SnapshotError::ChecksumMismatch)
        );
        // The index must be untouched after a rejected load.
        assert!(idx.is_empty());
    }

    #[test]
    fn load_rejects_oversized_payload_length() {
        let mut dev = MockBlockDevice::new();
        save(&mut dev, &sample_index()).unwrap();
        let mut block = dev.block(INDEX_SNAPSHOT_BLOCK);
        block[8..12].copy_from_slice(&(SNAPSHOT_BYTES as u32).to_le_bytes());
        dev.set_block(INDEX_SNAPSHOT_BLOCK, block);
        let mut idx = SmallAssetIndex::new();
        assert_eq!(load(&mut dev, &mut idx), Err(SnapshotError::Truncated));
    }

    #[test]
    fn load_into_smaller_index_is_decode_error() {
        let mut dev = MockBlockDevice::new();
        save(&mut dev, &sample_index()).unwrap();
        let mut idx = AssetIndex::<1>::new();
        assert_eq!(load(&mut dev, &mut idx), Err(SnapshotError::Decode));
    }

    #[test]
    fn load_or_scan_prefers_snapshot() {
        let mut dev = MockBlockDevice::new();
        save(&mut dev, &sample_index()).unwrap();
        let mut idx = SmallAssetIndex::new();
        assert_eq!(
            load_or_scan(&mut dev, &mut idx).unwrap(),
            IndexSource::Snapshot
        );
        assert_eq!(idx.len(), 2);
    }

    #[test]
    fn load_or_scan_falls_back_and_refreshes() {
        let mut dev = MockBlockDevice::new();
        let mut block = [0u8; BLOCK_SIZE];
        AssetDescriptor {
            tag: AssetTag::new([1, 1, 1, 1, 1]),
            payload_blocks: 4,
        }
        .encode_into(&mut block);
        dev.set_block(ASSET_REGION_START, block);

        let mut idx = SmallAssetIndex::new();
        assert_eq!(load_or_scan(&mut dev, &mut idx).unwrap(), IndexSource::Scan);
        assert_eq!(idx.len(), 1);

        // The fallback wrote a fresh snapshot, so the next boot loads it.
        let mut second = SmallAssetIndex::new();
        assert_eq!(
            load_or_scan(&mut dev, &mut second).unwrap(),
            IndexSource::Snapshot
        );
        assert_eq!(second.entries(), idx.entries());
    }
}
