//! Input event types and the single-slot event register.

/// Physical buttons on the device face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    /// Main power button (short press wakes, long press powers down).
    Power,
    /// Navigate backwards within the active screen.
    Previous,
    /// Navigate forwards within the active screen.
    Next,
    /// Activate the highlighted item.
    Select,
}

/// Raw input events produced by interrupt/poll handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputEvent {
    /// Button pressed and released.
    Press(Button),
    /// Button held for an extended period.
    LongPress(Button),
    /// Periodic battery sample. `external_power` is true while USB is present.
    BatterySample {
        /// Charge level, 0..=100.
        percent: u8,
        /// USB power present.
        external_power: bool,
    },
    /// Inactivity timer expired.
    InactivityTimeout,
    /// Periodic tick with no other activity.
    Tick,
}

/// Single-producer/single-consumer register of depth 1, latest-wins.
///
/// Input handlers overwrite an unconsumed event rather than queueing; rapid
/// repeated events coalesce. This is the deliberate at-most-one-pending-event
/// policy for UI input — acceptable because nothing in the core requires
/// exact event counts.
#[derive(Debug, Default)]
pub struct EventSlot<T: Copy> {
    pending: Option<T>,
}

impl<T: Copy> EventSlot<T> {
    /// Create an empty slot.
    pub const fn new() -> Self {
        Self { pending: None }
    }

    /// Publish an event, replacing any unconsumed one.
    pub fn publish(&mut self, event: T) {
        self.pending = Some(event);
    }

    /// Consume the pending event, leaving the slot empty.
    pub fn take(&mut self) -> Option<T> {
        self.pending.take()
    }

    /// Peek without consuming.
    pub fn peek(&self) -> Option<T> {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_starts_empty() {
        let slot: EventSlot<InputEvent> = EventSlot::new();
        assert_eq!(slot.peek(), None);
    }

    #[test]
    fn publish_then_take() {
        let mut slot = EventSlot::new();
        slot.publish(InputEvent::Press(Button::Select));
        assert_eq!(slot.take(), Some(InputEvent::Press(Button::Select)));
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn latest_event_wins() {
        let mut slot = EventSlot::new();
        slot.publish(InputEvent::Press(Button::Next));
        slot.publish(InputEvent::Press(Button::Previous));
        // The unconsumed Next press was overwritten.
        assert_eq!(slot.take(), Some(InputEvent::Press(Button::Previous)));
    }
}
