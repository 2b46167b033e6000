//! Startup record I/O.
//!
//! The ui crate owns the record layout as a pure block codec; this module
//! owns the block address and the card traffic around it.

use platform::layout::STARTUP_RECORD_BLOCK;
use platform::{Block, BlockDevice, BLOCK_SIZE};
use ui::{AudioState, DecodedStartup, MainState, UiContext};

/// Read and decode the startup record.
///
/// Any device fault reads as a corrupt record; boot falls back to the
/// default screen rather than failing.
pub fn read_startup<D: BlockDevice>(device: &mut D) -> DecodedStartup {
    let mut block: Block = [0; BLOCK_SIZE];
    if device.read_block(STARTUP_RECORD_BLOCK, &mut block).is_err() {
        return DecodedStartup::Corrupt;
    }
    ui::decode_startup(&block)
}

/// Encode and write the startup record.
///
/// # Errors
///
/// The device write fault. Callers treat a failed persist as non-fatal; the
/// session continues and only the next boot loses the restore.
pub fn write_startup<D: BlockDevice>(
    device: &mut D,
    state: MainState,
    audio: AudioState,
) -> Result<(), D::Error> {
    let block = ui::encode_startup(state, audio);
    device.write_block(&block, STARTUP_RECORD_BLOCK)
}

/// Build the boot-time UI context from the startup record.
pub fn boot_context<D: BlockDevice>(device: &mut D) -> UiContext {
    match read_startup(device) {
        DecodedStartup::Valid { state, audio } => UiContext::restored(state, audio),
        DecodedStartup::Corrupt => UiContext::new(),
    }
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
    use platform::mocks::MockBlockDevice;

    #[test]
    fn round_trips_through_the_reserved_block() {
        let mut dev = MockBlockDevice::new();
        write_startup(&mut dev, MainState::Skills { page: 2 }, AudioState::Idle).unwrap();
        assert_eq!(dev.writes, vec![STARTUP_RECORD_BLOCK]);
        assert_eq!(
            read_startup(&mut dev),
            DecodedStartup::Valid {
                state: MainState::Skills { page: 2 },
                audio: AudioState::Idle,
            }
        );
    }

    #[test]
    fn blank_card_boots_into_the_intro() {
        let mut dev = MockBlockDevice::new();
        let ctx = boot_context(&mut dev);
        assert_eq!(ctx.state(), MainState::Intro);
    }

    #[test]
    fn corrupt_record_boots_into_the_intro() {
        let mut dev = MockBlockDevice::new();
        write_startup(&mut dev, MainState::Audio, AudioState::Playing).unwrap();
        let mut block = dev.block(STARTUP_RECORD_BLOCK);
        block[6] ^= 0xFF;
        dev.set_block(STARTUP_RECORD_BLOCK, block);
        let ctx = boot_context(&mut dev);
        assert_eq!(ctx.state(), MainState::Intro);
    }

    #[test]
    fn valid_record_restores_the_screen() {
        let mut dev = MockBlockDevice::new();
        write_startup(
            &mut dev,
            MainState::Portfolio { slide: 4 },
            AudioState::Idle,
        )
        .unwrap();
        let ctx = boot_context(&mut dev);
        assert_eq!(ctx.state(), MainState::Portfolio { slide: 4 });
    }

    #[test]
    fn read_fault_reads_as_corrupt() {
        let mut dev = MockBlockDevice::new();
        dev.fail_reads = usize::MAX;
        assert_eq!(read_startup(&mut dev), DecodedStartup::Corrupt);
    }
}
