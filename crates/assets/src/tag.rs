//! AssetTag — the fixed 5-byte identifier stamped on every stored asset.

use serde::{Deserialize, Serialize};

/// A 5-byte asset identifier.
///
/// Tags are opaque to this layer; the application assigns one per clip or
/// slide at provisioning time and resolves it back at playback time. The
/// length matches the descriptor field on card, so comparison is a plain
/// 5-byte equality check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AssetTag([u8; 5]);

impl AssetTag {
    /// Number of bytes in a tag.
    pub const LEN: usize = 5;

    /// Wrap raw tag bytes.
    pub const fn new(bytes: [u8; 5]) -> Self {
        AssetTag(bytes)
    }

    /// The raw bytes, as written into the descriptor block.
    pub const fn as_bytes(&self) -> &[u8; 5] {
        &self.0
    }
}

impl From<[u8; 5]> for AssetTag {
    fn from(bytes: [u8; 5]) -> Self {
        AssetTag(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_compare_by_bytes() {
        let a = AssetTag::new([1, 2, 3, 4, 5]);
        let b = AssetTag::new([1, 2, 3, 4, 5]);
        let c = AssetTag::new([1, 2, 3, 4, 6]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn tag_exposes_raw_bytes() {
        let tag = AssetTag::new([0x01, 0x28, 0x15, 0x72, 0x01]);
        assert_eq!(tag.as_bytes(), &[0x01, 0x28, 0x15, 0x72, 0x01]);
    }
}
