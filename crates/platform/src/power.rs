//! Power management seam.
//!
//! The MCU standby-mode register sequence and the backlight GPIO are external
//! collaborators; the UI state machine only expresses intent through this
//! trait.

/// Low-power levels the state machine can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SleepMode {
    /// Screen off, context retained, instant wake.
    Sleep,
    /// Standby: peripherals off, RAM lost, wake via power button only.
    DeepSleep,
}

/// Backlight and low-power entry control.
pub trait PowerControl {
    /// Turn the display backlight on.
    fn backlight_on(&mut self);

    /// Turn the display backlight off.
    fn backlight_off(&mut self);

    /// Enter hardware standby. On real hardware this does not return; the
    /// device resumes through the reset vector. Callers must flush persisted
    /// state before requesting it.
    fn enter_deep_sleep(&mut self);
}
