//! Error types for catalogue construction and persistence.

use thiserror_no_std::Error;

/// Index mutation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IndexError {
    /// The index has reached its compile-time capacity.
    #[error("index full")]
    Full,
}

/// Failure while walking the asset region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScanError<E> {
    /// Block device fault; the scan stops where it stands.
    #[error("device fault")]
    Device(E),
    /// More descriptors on card than the index can hold.
    #[error("index full during scan")]
    IndexFull,
}

/// Failure while loading or saving the index snapshot.
///
/// Any load-side variant means the snapshot cannot be trusted; the caller
/// falls back to a full region scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SnapshotError<E> {
    /// Block device fault.
    #[error("device fault")]
    Device(E),
    /// Snapshot header magic is not recognised.
    #[error("bad snapshot magic")]
    BadMagic,
    /// Snapshot was written by an incompatible firmware revision.
    #[error("unsupported snapshot version")]
    UnsupportedVersion,
    /// Payload length field exceeds the snapshot region.
    #[error("snapshot payload length out of range")]
    Truncated,
    /// Payload CRC32 does not match the header.
    #[error("snapshot checksum mismatch")]
    ChecksumMismatch,
    /// Postcard decode failed (corrupt payload or too many entries).
    #[error("snapshot decode failed")]
    Decode,
    /// The index does not fit in the snapshot region.
    #[error("index too large for the snapshot region")]
    TooLarge,
}
