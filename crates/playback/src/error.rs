//! Error type for the stream engine.

use thiserror_no_std::Error;

use crate::header::HeaderError;

/// Failure of a stream engine operation.
///
/// All variants are recoverable at the UI layer: a rejected start is
/// skipped, a mid-stream fault surfaces as "playback interrupted" and the
/// engine is already back in the idle state when it is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StreamError<E> {
    /// The requested tag is not in the asset index.
    #[error("asset not found")]
    AssetNotFound,
    /// The asset's header block did not parse as playable audio.
    #[error("malformed header: {0}")]
    MalformedHeader(#[from] HeaderError),
    /// `begin` called without a parsed header.
    #[error("no track loaded")]
    NotLoaded,
    /// `consume` called while not playing.
    #[error("not playing")]
    NotPlaying,
    /// Block device fault; the stream session has been closed.
    #[error("stream read fault")]
    StreamRead(E),
}
