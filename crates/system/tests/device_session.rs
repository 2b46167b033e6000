//! End-to-end sessions against the in-memory block device: boot, navigate,
//! play, sleep, reboot. The wire-level path is covered separately in
//! `card_pipeline.rs`; here the card image is a `MockBlockDevice`.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

use assets::{AssetDescriptor, AssetEntry, AssetTag, IndexSource};
use platform::layout::ASSET_REGION_START;
use platform::mocks::{MockBlockDevice, MockPower, MockSink};
use platform::{Block, Button, InputEvent, BLOCK_SIZE};
use playback::StreamState;
use system::{boot, BootReport, Cardlet, IndexStatus};
use ui::{AppId, AudioState, ClipId, HomeSub, MainState};

type TestCard = Cardlet<MockBlockDevice, MockSink, MockPower>;

/// Canonical 44-byte WAV header followed by zeroed sample bytes in block 0
/// of the payload.
fn wav_block(sample_rate: u32, bit_depth: u16, channels: u16, data_size: u32) -> Block {
    let mut block = [0u8; BLOCK_SIZE];
    let byte_rate = sample_rate * u32::from(channels) * u32::from(bit_depth) / 8;
    block[0..4].copy_from_slice(b"RIFF");
    block[4..8].copy_from_slice(&(36 + data_size).to_le_bytes());
    block[8..12].copy_from_slice(b"WAVE");
    block[12..16].copy_from_slice(b"fmt ");
    block[16..20].copy_from_slice(&16u32.to_le_bytes());
    block[20..22].copy_from_slice(&1u16.to_le_bytes());
    block[22..24].copy_from_slice(&channels.to_le_bytes());
    block[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    block[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    block[32..34].copy_from_slice(&((channels * bit_depth) / 8).to_le_bytes());
    block[34..36].copy_from_slice(&bit_depth.to_le_bytes());
    block[36..40].copy_from_slice(b"data");
    block[40..44].copy_from_slice(&data_size.to_le_bytes());
    block
}

/// Write one descriptor + WAV asset at `address`; returns the first block
/// past it.
fn provision_clip(dev: &mut MockBlockDevice, address: u32, tag: AssetTag, data_size: u32) -> u32 {
    let payload_blocks = (44 + data_size).div_ceil(BLOCK_SIZE as u32);
    let mut block = [0u8; BLOCK_SIZE];
    AssetDescriptor {
        tag,
        payload_blocks,
    }
    .encode_into(&mut block);
    dev.set_block(address, block);
    dev.set_block(address + 1, wav_block(22_050, 16, 1, data_size));
    for i in 1..payload_blocks {
        dev.set_block(address + 1 + i, [(i & 0xFF) as u8; BLOCK_SIZE]);
    }
    address + 1 + payload_blocks
}

/// Card image with the greeting (one payload block, one consume) and the
/// showcase track (8192 sample bytes, sixteen consumes).
fn provisioned_device() -> MockBlockDevice {
    let mut dev = MockBlockDevice::new();
    let next = provision_clip(&mut dev, ASSET_REGION_START, system::clips::GREETING, 400);
    provision_clip(&mut dev, next, system::clips::SHOWCASE, 8192);
    dev
}

fn press(card: &mut TestCard, button: Button) {
    card.publish(InputEvent::Press(button));
    card.tick();
}

/// Boot and run the greeting through to the home grid.
fn booted_home(dev: MockBlockDevice) -> (TestCard, BootReport) {
    let (mut card, report) = boot(Some(dev), MockSink::new(), MockPower::new());
    assert_eq!(card.state(), MainState::Intro);
    // One tick starts the greeting and, at one payload block, finishes it.
    card.tick();
    assert_eq!(card.state(), MainState::default_state());
    (card, report)
}

#[test]
fn fresh_boot_scans_the_card_and_plays_the_greeting() {
    let (card, report) = booted_home(provisioned_device());
    assert_eq!(report.index, IndexStatus::Loaded(IndexSource::Scan));
    assert_eq!(report.assets, 2);
    assert!(!report.restored);
    // The greeting went out through the sink before it finished.
    assert_eq!(card.sink().configured, Some((22_050, 16, 1)));
    assert!(!card.sink().enabled);
    assert_eq!(card.audio_state(), AudioState::Idle);
}

#[test]
fn second_boot_skips_the_scan() {
    let (card, first) = booted_home(provisioned_device());
    assert_eq!(first.index, IndexStatus::Loaded(IndexSource::Scan));
    let (storage, _, _) = card.into_parts();
    let (_, second) = boot(storage, MockSink::new(), MockPower::new());
    assert_eq!(second.index, IndexStatus::Loaded(IndexSource::Snapshot));
    assert_eq!(second.assets, 2);
}

#[test]
fn reboot_mid_playback_recovers_the_catalogue() {
    let (mut card, _) = booted_home(provisioned_device());
    for _ in 0..8 {
        press(&mut card, Button::Next);
    }
    press(&mut card, Button::Select);
    press(&mut card, Button::Select);
    assert_eq!(card.stream_state(), StreamState::Playing);

    // Tearing down with the showcase mid-stream must close the session,
    // or the next boot's block reads would all be rejected.
    let (storage, _, _) = card.into_parts();
    let (_, report) = boot(storage, MockSink::new(), MockPower::new());
    assert_eq!(report.index, IndexStatus::Loaded(IndexSource::Snapshot));
    assert_eq!(report.assets, 2);
}

#[test]
fn deep_sleep_persists_the_screen_and_reboot_restores_it() {
    let (mut card, _) = booted_home(provisioned_device());
    press(&mut card, Button::Select); // open about-me (row 0)
    assert_eq!(card.state(), MainState::AboutMe { page: 0 });

    card.publish(InputEvent::LongPress(Button::Power));
    card.tick();
    assert_eq!(card.state(), MainState::DeepSleep);
    assert_eq!(card.power().deep_sleeps, 1);
    assert!(!card.power().backlight);

    let (storage, _, _) = card.into_parts();
    let (card, report) = boot(storage, MockSink::new(), MockPower::new());
    assert!(report.restored);
    assert_eq!(card.state(), MainState::AboutMe { page: 0 });
}

#[test]
fn audio_screen_transport_cycle() {
    let (mut card, _) = booted_home(provisioned_device());
    for _ in 0..8 {
        press(&mut card, Button::Next);
    }
    press(&mut card, Button::Select);
    assert_eq!(card.state(), MainState::Audio);

    // Start: four of the sixteen showcase blocks go out this tick.
    press(&mut card, Button::Select);
    assert_eq!(card.stream_state(), StreamState::Playing);
    assert_eq!(card.sink().configured, Some((22_050, 16, 1)));
    assert_eq!(card.sink().blocks, 4);

    // Pause holds the cursor; idle ticks feed nothing.
    press(&mut card, Button::Select);
    assert_eq!(card.stream_state(), StreamState::Paused);
    assert_eq!(card.audio_state(), AudioState::Paused);
    card.tick();
    assert_eq!(card.sink().blocks, 4);

    // Resume picks up where pause left off.
    press(&mut card, Button::Select);
    assert_eq!(card.stream_state(), StreamState::Playing);
    assert_eq!(card.sink().blocks, 8);

    // Stop from the transport; the engine and footer agree.
    press(&mut card, Button::Previous);
    assert_eq!(card.stream_state(), StreamState::Idle);
    assert_eq!(card.audio_state(), AudioState::Idle);
    assert!(!card.sink().enabled);

    // Three sessions total, and no block was ever served twice.
    let (storage, _, _) = card.into_parts();
    let dev = storage.unwrap();
    assert_eq!(dev.stream_opens, 3); // greeting + start + resume
    assert_eq!(dev.stream_blocks, 9); // 1 greeting + 8 showcase, none re-read
}

#[test]
fn track_runs_out_and_reports_finished() {
    let (mut card, _) = booted_home(provisioned_device());
    for _ in 0..8 {
        press(&mut card, Button::Next);
    }
    press(&mut card, Button::Select);
    press(&mut card, Button::Select);
    // Sixteen sample blocks at four per tick: three more ticks finish it.
    card.tick();
    card.tick();
    card.tick();
    assert_eq!(card.stream_state(), StreamState::Idle);
    assert_eq!(card.audio_state(), AudioState::Idle);
    assert_eq!(card.state(), MainState::Audio);
    assert_eq!(card.sink().blocks, 16);
    assert!(!card.sink().enabled);
}

#[test]
fn mid_stream_fault_interrupts_playback() {
    let mut dev = provisioned_device();
    // Greeting consumes one stream block; the showcase faults on its third.
    dev.fail_stream_after = Some(3);
    let (mut card, _) = booted_home(dev);
    for _ in 0..8 {
        press(&mut card, Button::Next);
    }
    press(&mut card, Button::Select);
    press(&mut card, Button::Select);
    assert_eq!(card.stream_state(), StreamState::Idle);
    assert_eq!(card.audio_state(), AudioState::Idle);
    // Screen stays put; playback interrupted is not fatal.
    assert_eq!(card.state(), MainState::Audio);
    assert!(!card.sink().enabled);
}

#[test]
fn unprovisioned_clip_is_a_silent_skip() {
    // Only the greeting on card; every portfolio tag is missing.
    let mut dev = MockBlockDevice::new();
    provision_clip(&mut dev, ASSET_REGION_START, system::clips::GREETING, 400);
    let (mut card, _) = booted_home(dev);

    for _ in 0..5 {
        press(&mut card, Button::Next);
    }
    press(&mut card, Button::Select);
    assert_eq!(card.state(), MainState::Portfolio { slide: 0 });
    assert_eq!(card.audio_state(), AudioState::Idle);
    assert!(!card.sink().enabled);

    // No streaming session was opened for the missing clip.
    let (storage, _, _) = card.into_parts();
    assert_eq!(storage.unwrap().stream_opens, 1); // greeting only
}

#[test]
fn storage_unavailable_boot_still_navigates() {
    let (mut card, report) = boot(None, MockSink::new(), MockPower::new());
    assert!(!report.storage_available);
    assert_eq!(report.index, IndexStatus::NoStorage);

    // The greeting request degrades to a skip; the intro stays up.
    card.tick();
    assert_eq!(card.state(), MainState::Intro);
    assert_eq!(card.audio_state(), AudioState::Idle);

    press(&mut card, Button::Select);
    assert_eq!(card.state(), MainState::default_state());

    // The audio screen opens but the showcase cannot start.
    for _ in 0..8 {
        press(&mut card, Button::Next);
    }
    press(&mut card, Button::Select);
    press(&mut card, Button::Select);
    assert_eq!(card.state(), MainState::Audio);
    assert_eq!(card.audio_state(), AudioState::Idle);
    assert!(!card.sink().enabled);
}

#[test]
fn critical_battery_forces_the_shutdown() {
    let (mut card, _) = booted_home(provisioned_device());
    for _ in 0..8 {
        press(&mut card, Button::Next);
    }
    press(&mut card, Button::Select);
    press(&mut card, Button::Select);
    assert_eq!(card.stream_state(), StreamState::Playing);

    card.publish(InputEvent::BatterySample {
        percent: 5,
        external_power: false,
    });
    card.tick();
    // Below the critical threshold the only safe path is the hardware
    // shutdown, not the wakeable display sleep.
    assert_eq!(card.state(), MainState::DeepSleep);
    assert_eq!(card.stream_state(), StreamState::Idle);
    assert!(!card.sink().enabled);
    assert!(!card.power().backlight);
    assert_eq!(card.power().deep_sleeps, 1);

    // The audio screen was persisted on the way down and comes back up.
    let (storage, _, _) = card.into_parts();
    let (card, report) = boot(storage, MockSink::new(), MockPower::new());
    assert!(report.restored);
    assert_eq!(card.state(), MainState::Audio);
}

#[test]
fn low_battery_overlay_dismisses_to_the_same_screen() {
    let (mut card, _) = booted_home(provisioned_device());
    press(&mut card, Button::Next);
    press(&mut card, Button::Select); // company, row 1
    assert_eq!(card.state(), MainState::Company { page: 0 });

    card.publish(InputEvent::BatterySample {
        percent: 9,
        external_power: false,
    });
    card.tick();
    assert_eq!(card.state(), MainState::Home(HomeSub::BatteryWarning));

    press(&mut card, Button::Select);
    assert_eq!(card.state(), MainState::Company { page: 0 });
}

#[test]
fn appended_asset_plays_without_a_rescan() {
    // The showcase payload is on card but carries no descriptor, so the
    // boot scan only finds the greeting.
    let mut dev = MockBlockDevice::new();
    let next = provision_clip(&mut dev, ASSET_REGION_START, system::clips::GREETING, 400);
    dev.set_block(next + 1, wav_block(22_050, 16, 1, 4096));
    for i in 1..9u32 {
        dev.set_block(next + 1 + i, [0x42; BLOCK_SIZE]);
    }

    let (mut card, report) = booted_home(dev);
    assert_eq!(report.assets, 1);

    card.append_asset(AssetEntry {
        tag: system::clips::SHOWCASE,
        start_block: next,
        end_block: next + 10,
    })
    .unwrap();

    for _ in 0..8 {
        press(&mut card, Button::Next);
    }
    press(&mut card, Button::Select);
    press(&mut card, Button::Select);
    assert_eq!(card.stream_state(), StreamState::Playing);

    // The append refreshed the snapshot; the next boot sees both assets.
    let (storage, _, _) = card.into_parts();
    let (_, report) = boot(storage, MockSink::new(), MockPower::new());
    assert_eq!(report.index, IndexStatus::Loaded(IndexSource::Snapshot));
    assert_eq!(report.assets, 2);
}

#[test]
fn imported_table_replaces_the_scanned_catalogue() {
    let (mut card, _) = booted_home(provisioned_device());
    assert_eq!(card.index().len(), 2);

    let table = [AssetEntry {
        tag: AssetTag::new([9, 9, 9, 9, 9]),
        start_block: ASSET_REGION_START,
        end_block: ASSET_REGION_START + 2,
    }];
    card.import_assets(table).unwrap();
    assert_eq!(card.index().len(), 1);
    assert!(card.index().find(AssetTag::new([9, 9, 9, 9, 9])).is_some());

    let (storage, _, _) = card.into_parts();
    let (card, report) = boot(storage, MockSink::new(), MockPower::new());
    assert_eq!(report.index, IndexStatus::Loaded(IndexSource::Snapshot));
    assert_eq!(report.assets, 1);
    drop(card);
}

#[test]
fn slideshow_slide_change_swaps_the_clip() {
    let mut dev = provisioned_device();
    // Two device-story slides behind the standard clips.
    // Past the showcase: greeting (2 blocks) + showcase (18 blocks).
    let mut address = ASSET_REGION_START + 20;
    for slide in 0..2u8 {
        let tag = system::clips::clip_tag(ClipId::Slide(AppId::Device, slide)).unwrap();
        address = provision_clip(&mut dev, address, tag, 400);
    }

    let (mut card, report) = booted_home(dev);
    assert_eq!(report.assets, 4);
    for _ in 0..3 {
        press(&mut card, Button::Next);
    }
    press(&mut card, Button::Select);
    assert_eq!(card.state(), MainState::Device { slide: 0 });
    // One payload block: the slide clip already finished within the tick.
    assert_eq!(card.audio_state(), AudioState::Idle);

    press(&mut card, Button::Next);
    assert_eq!(card.state(), MainState::Device { slide: 1 });
    assert_eq!(card.sink().blocks, 1);
}
