//! Full-stack pipeline: `boot_with_card` over the byte-level fake SDHC
//! card, so the init handshake, the region scan, the snapshot write-back,
//! and the streaming reads all travel the real wire format.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

use assets::{AssetDescriptor, IndexSource};
use platform::layout::ASSET_REGION_START;
use platform::mocks::{MockPower, MockSink, MockTransport};
use platform::{Block, Button, InputEvent, BLOCK_SIZE};
use system::{boot_with_card, IndexStatus};
use ui::{AudioState, MainState};

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

/// Card image holding only the greeting: descriptor plus one payload block.
fn greeting_image() -> MockTransport {
    let mut transport = MockTransport::new();
    let mut descriptor = [0u8; BLOCK_SIZE];
    AssetDescriptor {
        tag: system::clips::GREETING,
        payload_blocks: 1,
    }
    .encode_into(&mut descriptor);
    transport.set_block(ASSET_REGION_START, descriptor);
    transport.set_block(ASSET_REGION_START + 1, wav_block(22_050, 16, 1, 400));
    transport
}

#[test]
fn first_boot_scans_over_the_wire_and_plays_the_greeting() {
    let (mut card, report) = boot_with_card(greeting_image(), MockSink::new(), MockPower::new());
    assert!(report.storage_available);
    assert_eq!(report.index, IndexStatus::Loaded(IndexSource::Scan));
    assert_eq!(report.assets, 1);
    assert_eq!(card.state(), MainState::Intro);

    // The greeting streams out and finishes within the tick.
    card.tick();
    assert_eq!(card.state(), MainState::default_state());
    assert_eq!(card.audio_state(), AudioState::Idle);
    assert_eq!(card.sink().configured, Some((22_050, 16, 1)));

    let (storage, _, _) = card.into_parts();
    let transport = storage.unwrap().release();
    // Init handshake went idle → interface condition → operating condition.
    assert_eq!(transport.command_log.first(), Some(&0));
    assert!(transport.command_log.contains(&8));
    assert!(transport.command_log.contains(&55));
    assert!(transport.command_log.contains(&41));
    assert!(transport.command_log.contains(&58));
    // Playback used one streaming session, opened and closed.
    assert_eq!(transport.stream_opens, 1);
    assert!(transport.command_log.contains(&18));
    assert!(transport.command_log.contains(&12));
    // The scan refreshed the snapshot: single-block writes happened.
    assert!(transport.command_log.contains(&24));
}

#[test]
fn second_boot_loads_the_snapshot_over_the_wire() {
    let (card, first) = boot_with_card(greeting_image(), MockSink::new(), MockPower::new());
    assert_eq!(first.index, IndexStatus::Loaded(IndexSource::Scan));
    let (storage, _, _) = card.into_parts();
    let transport = storage.unwrap().release();

    let (_, second) = boot_with_card(transport, MockSink::new(), MockPower::new());
    assert_eq!(second.index, IndexStatus::Loaded(IndexSource::Snapshot));
    assert_eq!(second.assets, 1);
}

#[test]
fn dead_card_boots_storage_less_and_the_ui_runs() {
    let mut transport = MockTransport::new();
    transport.absent = true;
    let (mut card, report) = boot_with_card(transport, MockSink::new(), MockPower::new());
    assert!(!report.storage_available);
    assert_eq!(report.index, IndexStatus::NoStorage);

    card.tick();
    card.publish(InputEvent::Press(Button::Select));
    card.tick();
    assert_eq!(card.state(), MainState::default_state());
}

#[test]
fn card_stuck_in_idle_boots_storage_less() {
    let mut transport = greeting_image();
    transport.never_ready = true;
    let (_, report) = boot_with_card(transport, MockSink::new(), MockPower::new());
    assert!(!report.storage_available);
}
