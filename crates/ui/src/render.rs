//! RenderModel — what the external display collaborator reads each tick.
//!
//! The UI core renders no pixels. It exposes this snapshot plus a change
//! flag so the renderer redraws only when something it shows has moved.

use crate::dispatch::AudioState;
use crate::state::StateKind;

/// Snapshot of everything the footer and screen renderer display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RenderModel {
    /// Active screen.
    pub state: StateKind,
    /// Substate ordinal (page, slide, row) within the active screen.
    pub substate: u8,
    /// Transport state for the footer icon.
    pub audio: AudioState,
    /// Last sampled battery percentage.
    pub battery_percent: u8,
    /// Whether the backlight is lit.
    pub backlight: bool,
}

impl RenderModel {
    pub(crate) const fn initial() -> Self {
        RenderModel {
            state: StateKind::Intro,
            substate: 0,
            audio: AudioState::Idle,
            battery_percent: 100,
            backlight: true,
        }
    }
}
