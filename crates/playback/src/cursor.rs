//! PlaybackCursor — position within the active clip's block range.

use platform::BLOCK_SIZE;

/// Where the stream stands: the next block to fetch and the sample bytes
/// still owed to the output.
///
/// Pause keeps the cursor while the stream session closes; resume reopens
/// the session at `current_block`, so a paused clip never re-reads data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PlaybackCursor {
    /// Next block address to fetch.
    pub current_block: u32,
    /// Sample bytes not yet delivered.
    pub bytes_remaining: u32,
}

impl PlaybackCursor {
    /// Cursor at the start of a clip with `bytes` of sample data from
    /// block `start`.
    pub const fn new(start: u32, bytes: u32) -> Self {
        PlaybackCursor {
            current_block: start,
            bytes_remaining: bytes,
        }
    }

    /// Account for one fetched block.
    pub fn advance(&mut self) {
        self.current_block = self.current_block.saturating_add(1);
        self.bytes_remaining = self.bytes_remaining.saturating_sub(BLOCK_SIZE as u32);
    }

    /// True once every sample byte has been delivered.
    pub const fn finished(&self) -> bool {
        self.bytes_remaining == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_is_monotonic() {
        let mut cursor = PlaybackCursor::new(100, 1030);
        cursor.advance();
        assert_eq!(cursor.current_block, 101);
        assert_eq!(cursor.bytes_remaining, 518);
        assert!(!cursor.finished());
        cursor.advance();
        cursor.advance();
        // The final partial block drains the remainder without wrapping.
        assert_eq!(cursor.current_block, 103);
        assert!(cursor.finished());
    }
}
