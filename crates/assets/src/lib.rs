//! Asset catalogue — descriptor scan, in-memory index, snapshot persistence.
//!
//! Assets live in a raw block region of the card, each announced by a
//! one-block descriptor carrying a 5-byte tag and its payload length. The
//! scan walks descriptors into an [`AssetIndex`]; a checksummed snapshot of
//! the index is persisted near the end of the card so later boots skip the
//! scan entirely.
//!
//! # Modules
//!
//! - [`tag`] — `AssetTag`, the fixed 5-byte asset identifier
//! - [`entry`] — `AssetEntry` block-range record
//! - [`index`] — `AssetIndex<N>` fixed-capacity catalogue
//! - [`scanner`] — descriptor decode and the region walk
//! - [`snapshot`] — index persistence and the load-or-scan boot path

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod entry;
pub mod error;
pub mod index;
pub mod scanner;
pub mod snapshot;
pub mod tag;

pub use entry::AssetEntry;
pub use error::{IndexError, ScanError, SnapshotError};
pub use index::{AssetIndex, FullAssetIndex, SmallAssetIndex, MAX_ASSETS};
pub use scanner::{scan, AssetDescriptor};
pub use snapshot::{load, load_or_scan, save, IndexSource};
pub use tag::AssetTag;
