//! Boot sequence.
//!
//! Order matters and mirrors the hardware bring-up: card to ready first,
//! then the asset index (the snapshot shortcut skips the region walk), then
//! the startup record. A card that fails init is not fatal — the device
//! boots with storage marked unavailable, the UI runs on every non-audio
//! screen, and playback requests degrade to silent skips.

use assets::{snapshot, FullAssetIndex, IndexSource};
use platform::{AudioSink, BlockDevice, BlockTransport, PowerControl};
use sdcard::SdCard;
use ui::{DecodedStartup, UiContext};

use crate::runtime::Cardlet;
use crate::startup;

/// How the boot path came by the asset index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    /// Catalogue in hand, from the snapshot or a region walk.
    Loaded(IndexSource),
    /// The region walk faulted; the catalogue may be empty or partial.
    /// Lookups still work for whatever was catalogued before the fault.
    ScanFailed,
    /// No storage; the catalogue is empty.
    NoStorage,
}

/// What boot found, for the diagnostics screen and the integration tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootReport {
    /// Card reached the ready state and answers block commands.
    pub storage_available: bool,
    /// How the asset index was obtained.
    pub index: IndexStatus,
    /// Assets catalogued.
    pub assets: usize,
    /// A valid startup record restored the last screen.
    pub restored: bool,
}

/// Assemble the firmware from an already initialised block device.
///
/// Pass `None` when card init failed; everything storage-backed is then
/// disabled and the boot report says so.
pub fn boot<D, S, P>(mut storage: Option<D>, sink: S, power: P) -> (Cardlet<D, S, P>, BootReport)
where
    D: BlockDevice,
    S: AudioSink,
    P: PowerControl,
{
    let mut index = FullAssetIndex::new();
    let index_status = match storage.as_mut() {
        None => IndexStatus::NoStorage,
        Some(device) => {
            // Block commands require no open streaming session; a previous
            // session that never closed must not poison this boot.
            let _ = device.end_stream();
            match snapshot::load_or_scan(device, &mut index) {
                Ok(source) => IndexStatus::Loaded(source),
                Err(_) => IndexStatus::ScanFailed,
            }
        }
    };

    let (ctx, restored) = match storage.as_mut() {
        None => (UiContext::new(), false),
        Some(device) => match startup::read_startup(device) {
            DecodedStartup::Valid { state, audio } => (UiContext::restored(state, audio), true),
            DecodedStartup::Corrupt => (UiContext::new(), false),
        },
    };

    let report = BootReport {
        storage_available: storage.is_some(),
        index: index_status,
        assets: index.len(),
        restored,
    };
    (Cardlet::assemble(storage, index, ctx, sink, power), report)
}

/// Bring an SD card to ready over `transport`, then [`boot`] from it.
///
/// This is the hardware entry point; host tests drive [`boot`] directly
/// with a mock block device, or this function with a mock transport.
pub fn boot_with_card<T, S, P>(
    transport: T,
    sink: S,
    power: P,
) -> (Cardlet<SdCard<T>, S, P>, BootReport)
where
    T: BlockTransport,
    S: AudioSink,
    P: PowerControl,
{
    let mut card = SdCard::new(transport);
    let storage = match card.enter_ready_state() {
        Ok(_) => Some(card),
        // Init exhausted its retries; boot storage-less rather than halt.
        Err(_) => None,
    };
    boot(storage, sink, power)
}
