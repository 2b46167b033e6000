//! Startup record codec.
//!
//! One raw block holds the screen to restore after a reset: magic, version,
//! the flattened `(kind, ordinal)` state pair, the transport state, and a
//! CRC32 over those header bytes. The codec is pure over [`Block`] buffers;
//! the application layer owns the block address and the device I/O.
//!
//! Layout (remaining block bytes are zero):
//!
//! | offset | size | field                          |
//! |--------|------|--------------------------------|
//! | 0      | 4    | magic `b"BOOT"`                |
//! | 4      | 1    | record version (1)             |
//! | 5      | 1    | state kind                     |
//! | 6      | 1    | substate ordinal               |
//! | 7      | 1    | audio state (0 idle, 1 playing, 2 paused) |
//! | 8      | 4    | CRC32 of bytes 0..8, LE        |

use platform::storage::Block;

use crate::dispatch::AudioState;
use crate::state::MainState;

const MAGIC: &[u8; 4] = b"BOOT";
const VERSION: u8 = 1;
const CRC_RANGE: usize = 8;

/// Outcome of decoding a startup record.
///
/// Anything short of a fully valid record collapses to `Corrupt`; boot then
/// falls back to the default screen. A half-written block after a power cut
/// must never select a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodedStartup {
    Valid { state: MainState, audio: AudioState },
    Corrupt,
}

/// Encode a startup record into a fresh block image.
#[allow(clippy::indexing_slicing)] // literal offsets inside a fixed 512-byte block
pub fn encode_startup(state: MainState, audio: AudioState) -> Block {
    let mut block = [0u8; platform::storage::BLOCK_SIZE];
    block[0..4].copy_from_slice(MAGIC);
    block[4] = VERSION;
    block[5] = state.kind() as u8;
    block[6] = state.substate_ordinal();
    block[7] = match audio {
        AudioState::Idle => 0,
        AudioState::Playing => 1,
        AudioState::Paused => 2,
    };
    let crc = crc32fast::hash(&block[..CRC_RANGE]);
    block[8..12].copy_from_slice(&crc.to_le_bytes());
    block
}

/// Decode a startup record read back from the card.
#[allow(clippy::indexing_slicing)] // literal offsets inside a fixed 512-byte block
pub fn decode_startup(block: &Block) -> DecodedStartup {
    if &block[0..4] != MAGIC || block[4] != VERSION {
        return DecodedStartup::Corrupt;
    }
    let stored = u32::from_le_bytes([block[8], block[9], block[10], block[11]]);
    if crc32fast::hash(&block[..CRC_RANGE]) != stored {
        return DecodedStartup::Corrupt;
    }
    let Some(state) = MainState::from_parts(block[5], block[6]) else {
        return DecodedStartup::Corrupt;
    };
    let audio = match block[7] {
        0 => AudioState::Idle,
        1 => AudioState::Playing,
        2 => AudioState::Paused,
        _ => return DecodedStartup::Corrupt,
    };
    DecodedStartup::Valid { state, audio }
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
    use crate::state::HomeSub;

    #[test]
    fn round_trips_a_content_screen() {
        let block = encode_startup(MainState::Portfolio { slide: 3 }, AudioState::Idle);
        assert_eq!(
            decode_startup(&block),
            DecodedStartup::Valid {
                state: MainState::Portfolio { slide: 3 },
                audio: AudioState::Idle,
            }
        );
    }

    #[test]
    fn round_trips_the_audio_screen_with_transport_state() {
        let block = encode_startup(MainState::Audio, AudioState::Playing);
        assert_eq!(
            decode_startup(&block),
            DecodedStartup::Valid {
                state: MainState::Audio,
                audio: AudioState::Playing,
            }
        );
    }

    #[test]
    fn flipped_payload_byte_is_corrupt() {
        let mut block = encode_startup(MainState::Skills { page: 1 }, AudioState::Idle);
        block[6] ^= 0x01;
        assert_eq!(decode_startup(&block), DecodedStartup::Corrupt);
    }

    #[test]
    fn wrong_magic_is_corrupt() {
        let mut block = encode_startup(MainState::default_state(), AudioState::Idle);
        block[0] = b'X';
        assert_eq!(decode_startup(&block), DecodedStartup::Corrupt);
    }

    #[test]
    fn unknown_version_is_corrupt() {
        let mut block = encode_startup(MainState::default_state(), AudioState::Idle);
        block[4] = 9;
        assert_eq!(decode_startup(&block), DecodedStartup::Corrupt);
    }

    #[test]
    fn blank_block_is_corrupt() {
        assert_eq!(
            decode_startup(&[0u8; platform::storage::BLOCK_SIZE]),
            DecodedStartup::Corrupt
        );
        assert_eq!(
            decode_startup(&[0xFF; platform::storage::BLOCK_SIZE]),
            DecodedStartup::Corrupt
        );
    }

    #[test]
    fn out_of_range_ordinal_with_valid_crc_is_corrupt() {
        // Hand-build a record naming home row 200: checksum passes, the
        // state validation must still reject it.
        let mut block = [0u8; platform::storage::BLOCK_SIZE];
        block[0..4].copy_from_slice(b"BOOT");
        block[4] = 1;
        block[5] = 1;
        block[6] = 200;
        let crc = crc32fast::hash(&block[..8]);
        block[8..12].copy_from_slice(&crc.to_le_bytes());
        assert_eq!(decode_startup(&block), DecodedStartup::Corrupt);
    }

    #[test]
    fn warning_overlay_flattens_to_a_rejected_ordinal() {
        // The overlay is never a restore target; its ordinal sits past the
        // grid bound on purpose.
        let block = encode_startup(
            MainState::Home(HomeSub::BatteryWarning),
            AudioState::Idle,
        );
        assert_eq!(decode_startup(&block), DecodedStartup::Corrupt);
    }
}
