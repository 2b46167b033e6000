//! Reserved card layout.
//!
//! The card carries no filesystem; these block addresses partition it by
//! convention between the host-side import tool and the firmware. All
//! reserved structures sit far above the asset region so a host re-import
//! can never clobber them.

/// First block of the scannable asset region.
pub const ASSET_REGION_START: u32 = 15_000;

/// First block past the asset region.
pub const ASSET_REGION_END: u32 = 3_900_000;

/// First block of the persisted asset-index snapshot.
pub const INDEX_SNAPSHOT_BLOCK: u32 = 4_000_000;

/// Blocks reserved for the snapshot. Four blocks hold a full 128-entry
/// index with postcard overhead included.
pub const INDEX_SNAPSHOT_BLOCKS: u32 = 4;

/// Block holding the persisted startup record (last screen + audio state).
pub const STARTUP_RECORD_BLOCK: u32 = 4_005_000;
