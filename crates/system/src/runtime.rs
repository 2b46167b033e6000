//! The per-tick loop.
//!
//! [`Cardlet`] owns the one execution context: the block device, the asset
//! index, the stream engine, the UI context, the sink, and the power rails.
//! Input handlers publish into the latest-wins slot from interrupt context;
//! everything else happens inside [`Cardlet::tick`], so no entity is ever
//! shared across concurrent writers.
//!
//! Action order within a tick is load-bearing: audio first (a deep-sleep
//! request stops the stream), then the startup record (flushed before
//! power-down), then the power intent (deep-sleep entry does not return on
//! hardware).

use assets::{AssetEntry, FullAssetIndex, IndexError};
use platform::{AudioSink, Block, BlockDevice, Button, EventSlot, InputEvent, PowerControl, BLOCK_SIZE};
use playback::{Progress, StreamEngine, StreamState};
use ui::{
    Actions, AudioCommand, AudioState, MainEvent, MainState, NavButton, PowerRequest, RenderModel,
    UiContext,
};

use crate::clips;
use crate::startup;

/// Stream blocks fed to the sink per tick while playing. Sized to keep the
/// sink's double buffer ahead of the sample clock at the highest clip rate
/// (44.1 kHz stereo consumes ~172 blocks/s against a 100 Hz tick).
const PUMP_BLOCKS: usize = 4;

/// The assembled firmware: every component of the core behind one object,
/// advanced by [`tick`](Cardlet::tick).
pub struct Cardlet<D: BlockDevice, S: AudioSink, P: PowerControl> {
    /// `None` after a failed card init; audio degrades to silent skips.
    storage: Option<D>,
    index: FullAssetIndex,
    engine: StreamEngine,
    ui: UiContext,
    sink: S,
    power: P,
    events: EventSlot<InputEvent>,
}

impl<D: BlockDevice, S: AudioSink, P: PowerControl> Cardlet<D, S, P> {
    pub(crate) fn assemble(
        storage: Option<D>,
        index: FullAssetIndex,
        ui: UiContext,
        sink: S,
        power: P,
    ) -> Self {
        Cardlet {
            storage,
            index,
            engine: StreamEngine::new(),
            ui,
            sink,
            power,
            events: EventSlot::new(),
        }
    }

    /// Publish a raw input event into the latest-wins slot. Called from the
    /// input collaborator; an unconsumed event is overwritten.
    pub fn publish(&mut self, event: InputEvent) {
        self.events.publish(event);
    }

    /// Run one dispatch cycle: drain the event slot, route the event, apply
    /// the returned actions, feed the sink from the open stream.
    pub fn tick(&mut self) {
        let event = self.events.take().map_or(MainEvent::Tick, translate);
        let actions = self.ui.dispatch(event);
        self.apply(actions);
        self.pump();
    }

    fn apply(&mut self, actions: Actions) {
        if let Some(cmd) = actions.audio {
            self.apply_audio(cmd);
        }
        if let Some(state) = actions.persist {
            self.persist(state);
        }
        match actions.power {
            None => {}
            Some(PowerRequest::Wake) => self.power.backlight_on(),
            Some(PowerRequest::Sleep) => self.power.backlight_off(),
            Some(PowerRequest::DeepSleep) => {
                // Stream closed and record flushed above; on hardware this
                // call does not return.
                self.power.backlight_off();
                self.power.enter_deep_sleep();
            }
        }
    }

    fn apply_audio(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::Start(clip) => {
                let Some(device) = self.storage.as_mut() else {
                    self.ui.audio_failed();
                    return;
                };
                let Some(tag) = clips::clip_tag(clip) else {
                    // A slide with no recorded clip; same skip as a missing
                    // asset.
                    self.ui.audio_failed();
                    return;
                };
                match self.engine.start(device, &self.index, tag) {
                    Ok(header) => {
                        self.sink
                            .configure(header.sample_rate, header.bit_depth, header.channels);
                        self.sink.enable();
                        if self.engine.begin(device).is_err() {
                            self.sink.disable();
                            self.ui.audio_failed();
                        }
                    }
                    Err(_) => self.ui.audio_failed(),
                }
            }
            AudioCommand::Stop => {
                if let Some(device) = self.storage.as_mut() {
                    let _ = self.engine.stop(device);
                }
                self.sink.disable();
            }
            AudioCommand::Toggle => {
                let Some(device) = self.storage.as_mut() else {
                    self.ui.audio_failed();
                    return;
                };
                match self.engine.state() {
                    StreamState::Playing => {
                        if self.engine.pause(device).is_err() {
                            self.sink.disable();
                            self.ui.audio_failed();
                        }
                    }
                    StreamState::Paused => {
                        if self.engine.resume(device).is_err() {
                            self.sink.disable();
                            self.ui.audio_failed();
                        }
                    }
                    // Mirror and engine disagree (e.g. the track ran out on
                    // the same tick); resync the footer to idle.
                    StreamState::Idle | StreamState::HeaderParsed => self.ui.audio_failed(),
                }
            }
        }
    }

    /// Write the startup record. Non-fatal on failure: the session
    /// continues and only the next boot loses the restore.
    fn persist(&mut self, state: MainState) {
        let audio = self.ui.audio_state();
        if let Some(device) = self.storage.as_mut() {
            let _ = startup::write_startup(device, state, audio);
        }
    }

    /// Feed the sink while a stream is open.
    fn pump(&mut self) {
        let mut block: Block = [0; BLOCK_SIZE];
        for _ in 0..PUMP_BLOCKS {
            if self.engine.state() != StreamState::Playing {
                return;
            }
            let Some(device) = self.storage.as_mut() else {
                return;
            };
            match self.engine.consume(device, &mut block) {
                Ok(Progress::Streaming) => self.sink.push_block(&block),
                Ok(Progress::Finished) => {
                    self.sink.push_block(&block);
                    self.sink.disable();
                    self.ui.audio_finished();
                    return;
                }
                Err(_) => {
                    // Playback interrupted; the engine is already idle.
                    self.sink.disable();
                    self.ui.audio_failed();
                    return;
                }
            }
        }
    }

    // -- provisioning -------------------------------------------------------

    /// Adopt a host-computed asset table and refresh the snapshot.
    ///
    /// # Errors
    ///
    /// [`IndexError::Full`] when the table exceeds the index capacity. A
    /// failed snapshot refresh is swallowed; it only costs the next boot
    /// its scan shortcut.
    pub fn import_assets<I>(&mut self, entries: I) -> Result<(), IndexError>
    where
        I: IntoIterator<Item = AssetEntry>,
    {
        self.index.import(entries)?;
        self.refresh_snapshot();
        Ok(())
    }

    /// Catalogue one newly written asset without a rescan and refresh the
    /// snapshot.
    ///
    /// # Errors
    ///
    /// [`IndexError::Full`] when the index is at capacity.
    pub fn append_asset(&mut self, entry: AssetEntry) -> Result<(), IndexError> {
        self.index.append(entry)?;
        self.refresh_snapshot();
        Ok(())
    }

    fn refresh_snapshot(&mut self) {
        if let Some(device) = self.storage.as_mut() {
            let _ = assets::snapshot::save(device, &self.index);
        }
    }

    // -- observers ----------------------------------------------------------

    /// Active screen state.
    pub fn state(&self) -> MainState {
        self.ui.state()
    }

    /// Transport state as shown in the footer.
    pub fn audio_state(&self) -> AudioState {
        self.ui.audio_state()
    }

    /// Transport state of the stream engine itself.
    pub fn stream_state(&self) -> StreamState {
        self.engine.state()
    }

    /// The render snapshot if it changed since the last take. The display
    /// collaborator polls this each tick.
    pub fn render_update(&mut self) -> Option<RenderModel> {
        self.ui.take_render_update()
    }

    /// Current render snapshot, regardless of the change flag.
    pub fn render_model(&self) -> RenderModel {
        self.ui.render_model()
    }

    /// The card reached ready at boot and block commands are available.
    pub fn storage_available(&self) -> bool {
        self.storage.is_some()
    }

    /// The asset catalogue.
    pub fn index(&self) -> &FullAssetIndex {
        &self.index
    }

    /// The audio sink, for the output collaborator.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The power collaborator.
    pub fn power(&self) -> &P {
        &self.power
    }

    /// Tear the firmware apart, handing the collaborators back. Any open
    /// streaming session is closed first so the device accepts block
    /// commands again.
    pub fn into_parts(mut self) -> (Option<D>, S, P) {
        if let Some(device) = self.storage.as_mut() {
            let _ = self.engine.stop(device);
        }
        (self.storage, self.sink, self.power)
    }
}

/// Raw input to dispatcher event. Long presses of the navigation buttons
/// act like short ones; only the power button distinguishes the two.
fn translate(event: InputEvent) -> MainEvent {
    match event {
        InputEvent::Press(Button::Power) => MainEvent::PowerShort,
        InputEvent::LongPress(Button::Power) => MainEvent::PowerLong,
        InputEvent::Press(Button::Previous) | InputEvent::LongPress(Button::Previous) => {
            MainEvent::Nav(NavButton::Previous)
        }
        InputEvent::Press(Button::Next) | InputEvent::LongPress(Button::Next) => {
            MainEvent::Nav(NavButton::Next)
        }
        InputEvent::Press(Button::Select) | InputEvent::LongPress(Button::Select) => {
            MainEvent::Nav(NavButton::Select)
        }
        InputEvent::BatterySample {
            percent,
            external_power,
        } => MainEvent::Battery {
            percent,
            external_power,
        },
        InputEvent::InactivityTimeout => MainEvent::InactivityTimeout,
        InputEvent::Tick => MainEvent::Tick,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_button_maps_by_press_length() {
        assert_eq!(translate(InputEvent::Press(Button::Power)), MainEvent::PowerShort);
        assert_eq!(
            translate(InputEvent::LongPress(Button::Power)),
            MainEvent::PowerLong
        );
    }

    #[test]
    fn long_nav_presses_act_like_short_ones() {
        assert_eq!(
            translate(InputEvent::LongPress(Button::Next)),
            MainEvent::Nav(NavButton::Next)
        );
        assert_eq!(
            translate(InputEvent::Press(Button::Next)),
            MainEvent::Nav(NavButton::Next)
        );
    }
}
