//! AssetIndex — fixed-capacity, in-memory catalogue of stored assets.
//!
//! Built once per boot, either from the persisted snapshot or from a full
//! region scan, and queried by tag for every playback request afterwards.

use heapless::Vec;

use crate::entry::AssetEntry;
use crate::error::IndexError;
use crate::tag::AssetTag;

/// Maximum number of assets the hardware index holds.
///
/// A card image carries a few dozen clips and slides; 128 leaves generous
/// headroom while the whole `FullAssetIndex` stays under 2 KB.
pub const MAX_ASSETS: usize = 128;

/// A fixed-capacity catalogue of [`AssetEntry`] records in card order.
///
/// `N` is the maximum number of assets; use [`SmallAssetIndex`] in tests and
/// [`FullAssetIndex`] on hardware.
pub struct AssetIndex<const N: usize> {
    entries: Vec<AssetEntry, N>,
}

/// Alias for the hardware catalogue.
pub type FullAssetIndex = AssetIndex<MAX_ASSETS>;

/// Alias used in tests (capacity 16).
pub type SmallAssetIndex = AssetIndex<16>;

impl<const N: usize> AssetIndex<N> {
    /// Create an empty index.
    pub const fn new() -> Self {
        AssetIndex { entries: Vec::new() }
    }

    /// Append `entry` to the index.
    ///
    /// Returns `Err(IndexError::Full)` when capacity `N` is exhausted.
    pub fn append(&mut self, entry: AssetEntry) -> Result<(), IndexError> {
        self.entries.push(entry).map_err(|_| IndexError::Full)
    }

    /// Adopt an externally supplied entry list, e.g. a table computed on a
    /// host at provisioning time. Existing contents are discarded.
    ///
    /// Returns `Err(IndexError::Full)` when the list exceeds capacity `N`;
    /// entries up to capacity are kept.
    pub fn import<I>(&mut self, entries: I) -> Result<(), IndexError>
    where
        I: IntoIterator<Item = AssetEntry>,
    {
        self.entries.clear();
        for entry in entries {
            self.append(entry)?;
        }
        Ok(())
    }

    /// Look up an entry by tag, or `None` when the tag is not catalogued.
    pub fn find(&self, tag: AssetTag) -> Option<&AssetEntry> {
        self.entries.iter().find(|e| e.tag == tag)
    }

    /// Entry at zero-based `pos`, or `None`.
    pub fn get(&self, pos: usize) -> Option<&AssetEntry> {
        self.entries.get(pos)
    }

    /// All entries, in card order.
    pub fn entries(&self) -> &[AssetEntry] {
        &self.entries
    }

    /// Start addresses in card order, for components that enumerate
    /// browsable content without resolving tags.
    pub fn list_addresses(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|e| e.start_block)
    }

    /// First free block past the last catalogued asset, for provisioning
    /// the next one. `region_start` is returned for an empty index.
    pub fn next_free_block(&self, region_start: u32) -> u32 {
        self.entries
            .last()
            .map_or(region_start, |e| e.end_block)
    }

    /// Number of assets currently catalogued.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no assets are catalogued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove all entries, resetting length to zero.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Swap in a freshly decoded entry list.
    pub(crate) fn replace(&mut self, entries: Vec<AssetEntry, N>) {
        self.entries = entries;
    }
}

impl<const N: usize> Default for AssetIndex<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn entry(tag: [u8; 5], start: u32, end: u32) -> AssetEntry {
        AssetEntry {
            tag: AssetTag::new(tag),
            start_block: start,
            end_block: end,
        }
    }

    #[test]
    fn index_starts_empty() {
        let idx = SmallAssetIndex::new();
        assert_eq!(idx.len(), 0);
        assert!(idx.is_empty());
    }

    #[test]
    fn find_by_tag() {
        let mut idx = SmallAssetIndex::new();
        idx.append(entry([1, 1, 1, 1, 1], 100, 110)).unwrap();
        idx.append(entry([2, 2, 2, 2, 2], 110, 130)).unwrap();
        let found = idx.find(AssetTag::new([2, 2, 2, 2, 2])).expect("present");
        assert_eq!(found.start_block, 110);
        assert!(idx.find(AssetTag::new([9, 9, 9, 9, 9])).is_none());
    }

    #[test]
    fn append_past_capacity_errors() {
        let mut idx = AssetIndex::<2>::new();
        idx.append(entry([0, 0, 0, 0, 1], 0, 1)).unwrap();
        idx.append(entry([0, 0, 0, 0, 2], 1, 2)).unwrap();
        assert_eq!(
            idx.append(entry([0, 0, 0, 0, 3], 2, 3)),
            Err(IndexError::Full)
        );
    }

    #[test]
    fn next_free_block_tracks_last_entry() {
        let mut idx = SmallAssetIndex::new();
        assert_eq!(idx.next_free_block(15_000), 15_000);
        idx.append(entry([1, 1, 1, 1, 1], 15_000, 15_042)).unwrap();
        assert_eq!(idx.next_free_block(15_000), 15_042);
    }

    #[test]
    fn import_replaces_contents() {
        let mut idx = SmallAssetIndex::new();
        idx.append(entry([9, 9, 9, 9, 9], 0, 5)).unwrap();
        idx.import([
            entry([1, 1, 1, 1, 1], 100, 110),
            entry([2, 2, 2, 2, 2], 110, 120),
        ])
        .unwrap();
        assert_eq!(idx.len(), 2);
        assert!(idx.find(AssetTag::new([9, 9, 9, 9, 9])).is_none());
    }

    #[test]
    fn list_addresses_in_card_order() {
        let mut idx = SmallAssetIndex::new();
        idx.append(entry([1, 1, 1, 1, 1], 100, 110)).unwrap();
        idx.append(entry([2, 2, 2, 2, 2], 110, 120)).unwrap();
        let addrs: Vec<u32, 4> = idx.list_addresses().collect();
        assert_eq!(addrs.as_slice(), &[100, 110]);
    }

    #[test]
    fn clear_resets_length() {
        let mut idx = SmallAssetIndex::new();
        idx.append(entry([1, 1, 1, 1, 1], 0, 5)).unwrap();
        idx.clear();
        assert!(idx.is_empty());
    }
}
