//! Events into the UI machine and the commands it hands back out.

use crate::state::AppId;

/// Navigation buttons on the face of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NavButton {
    Previous,
    Next,
    Select,
}

/// One event into the dispatcher. Produced by input handlers into a
/// single-slot latest-wins register; consumed at most once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MainEvent {
    /// A navigation button press.
    Nav(NavButton),
    /// Short power-button press: back / sleep / wake, depending on state.
    PowerShort,
    /// Long power-button press: deep sleep from anywhere.
    PowerLong,
    /// Periodic battery sample.
    Battery { percent: u8, external_power: bool },
    /// No button activity for the configured window.
    InactivityTimeout,
    /// Periodic tick with nothing else pending.
    Tick,
}

/// Semantic identifier of a stored clip. The application layer maps these
/// to asset tags; the UI machine never sees block addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClipId {
    /// Boot greeting played on the intro screen.
    Greeting,
    /// Clip paired with one slide of a slideshow screen.
    Slide(AppId, u8),
    /// Main track on the audio player screen.
    Showcase,
}

/// Audio transport request queued by a substate handler and drained by the
/// dispatcher at the end of the same tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AudioCommand {
    /// Stop whatever is playing, then start `ClipId`.
    Start(ClipId),
    /// Stop playback.
    Stop,
    /// Play/pause flip on the audio player screen.
    Toggle,
}

/// Power intent for the hardware layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerRequest {
    /// Backlight off, context retained.
    Sleep,
    /// Backlight on after a wake from sleep.
    Wake,
    /// Flush state and enter hardware deep sleep.
    DeepSleep,
}
