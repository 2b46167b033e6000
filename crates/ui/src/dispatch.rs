//! The UI/Power dispatcher.
//!
//! One `UiContext` object holds everything the machine mutates: the active
//! state, the one-deep previous context, the mirrored transport state, the
//! pending audio request, and the battery latch. The dispatcher is a plain
//! function of (context, event) so every substate handler is unit-testable
//! without hardware.
//!
//! Per tick: route the event to the active state's handler, drain the
//! pending audio request into the returned [`Actions`], refresh the render
//! snapshot. Handlers never perform I/O; the application layer applies the
//! actions to the stream engine, the startup record, and the power rails.

use crate::event::{AudioCommand, ClipId, MainEvent, NavButton, PowerRequest};
use crate::render::RenderModel;
use crate::state::{
    home_target, AppId, HomeSub, HomeTarget, MainState, HOME_ROWS, SETTINGS_ROWS,
};

/// Battery percentage below which the warning overlay is raised once per
/// discharge.
pub const LOW_BATTERY_PERCENT: u8 = 10;
/// Battery percentage below which the device shuts down to deep sleep to
/// protect the cell.
pub const CRITICAL_BATTERY_PERCENT: u8 = 6;

/// Mirrored audio transport state, as shown in the footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AudioState {
    Idle,
    Playing,
    Paused,
}

/// What one dispatch asks the application layer to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Actions {
    /// Transport request drained from the pending slot.
    pub audio: Option<AudioCommand>,
    /// Durable transition: write this state to the startup record.
    pub persist: Option<MainState>,
    /// Power rail / backlight intent.
    pub power: Option<PowerRequest>,
}

/// The complete mutable state of the UI machine.
pub struct UiContext {
    state: MainState,
    /// One-deep context restored by overlays, settings exit, and wake.
    previous: Option<MainState>,
    audio: AudioState,
    /// Queued by substate handlers, drained once per dispatch.
    pending_audio: Option<AudioCommand>,
    battery_percent: u8,
    /// Warning shown already this discharge; rearmed by external power.
    low_battery_warned: bool,
    backlight: bool,
    last_render: RenderModel,
    render_changed: bool,
}

impl UiContext {
    /// Fresh boot: intro screen, greeting queued for the first tick.
    pub fn new() -> Self {
        let mut ctx = Self::with_state(MainState::Intro);
        ctx.pending_audio = Some(AudioCommand::Start(ClipId::Greeting));
        ctx
    }

    /// Boot from a valid startup record.
    ///
    /// A restored splash replays the greeting exactly as a fresh boot
    /// would; otherwise the recorded transport state only matters on the
    /// audio player screen, where a clip that was playing at shutdown is
    /// started again.
    pub fn restored(state: MainState, audio: AudioState) -> Self {
        let mut ctx = Self::with_state(state);
        match state {
            MainState::Intro => {
                ctx.pending_audio = Some(AudioCommand::Start(ClipId::Greeting));
            }
            MainState::Audio if audio == AudioState::Playing => {
                ctx.pending_audio = Some(AudioCommand::Start(ClipId::Showcase));
            }
            _ => {}
        }
        ctx
    }

    fn with_state(state: MainState) -> Self {
        let mut ctx = UiContext {
            state,
            previous: None,
            audio: AudioState::Idle,
            pending_audio: None,
            battery_percent: 100,
            low_battery_warned: false,
            backlight: true,
            last_render: RenderModel::initial(),
            render_changed: false,
        };
        ctx.refresh_render();
        // The first frame always draws, restored or not.
        ctx.render_changed = true;
        ctx
    }

    /// Active state.
    pub fn state(&self) -> MainState {
        self.state
    }

    /// Mirrored transport state.
    pub fn audio_state(&self) -> AudioState {
        self.audio
    }

    /// Last battery sample.
    pub fn battery_percent(&self) -> u8 {
        self.battery_percent
    }

    /// Current render snapshot, regardless of the change flag.
    pub fn render_model(&self) -> RenderModel {
        self.last_render
    }

    /// The render snapshot if it changed since the last take, clearing the
    /// flag. The renderer polls this each tick and skips unchanged frames.
    pub fn take_render_update(&mut self) -> Option<RenderModel> {
        if self.render_changed {
            self.render_changed = false;
            Some(self.last_render)
        } else {
            None
        }
    }

    /// The application layer reports that the playing clip ran out.
    ///
    /// On the intro screen the end of the greeting advances to home.
    pub fn audio_finished(&mut self) {
        self.audio = AudioState::Idle;
        if self.state == MainState::Intro {
            self.state = MainState::default_state();
        }
        self.refresh_render();
    }

    /// The application layer reports that a playback request failed; the
    /// footer falls back to idle and the screen stays put.
    pub fn audio_failed(&mut self) {
        self.audio = AudioState::Idle;
        self.refresh_render();
    }

    /// Route one event, drain the pending audio request, refresh the
    /// render snapshot.
    pub fn dispatch(&mut self, event: MainEvent) -> Actions {
        let mut actions = Actions::default();
        match event {
            MainEvent::Battery {
                percent,
                external_power,
            } => self.handle_battery(percent, external_power, &mut actions),
            MainEvent::PowerLong => self.enter_deep_sleep(&mut actions),
            MainEvent::InactivityTimeout => self.enter_sleep(&mut actions),
            MainEvent::PowerShort => self.handle_power_short(&mut actions),
            MainEvent::Nav(button) => self.handle_nav(button, &mut actions),
            MainEvent::Tick => {}
        }

        actions.audio = self.pending_audio.take();
        if let Some(cmd) = actions.audio {
            self.audio = match cmd {
                AudioCommand::Start(_) => AudioState::Playing,
                AudioCommand::Stop => AudioState::Idle,
                AudioCommand::Toggle => match self.audio {
                    AudioState::Playing => AudioState::Paused,
                    AudioState::Paused | AudioState::Idle => AudioState::Playing,
                },
            };
        }
        self.refresh_render();
        actions
    }

    // -- power and battery --------------------------------------------------

    /// The state worth restoring later: the active one, or the saved
    /// context when the active state is transient.
    fn durable_state(&self) -> MainState {
        match self.state {
            MainState::Sleep | MainState::DeepSleep | MainState::Home(HomeSub::BatteryWarning) => {
                self.previous.unwrap_or(MainState::default_state())
            }
            other => other,
        }
    }

    fn enter_deep_sleep(&mut self, actions: &mut Actions) {
        if self.state == MainState::DeepSleep {
            return;
        }
        self.pending_audio = Some(AudioCommand::Stop);
        // The record must name the screen the user was on, not DeepSleep.
        actions.persist = Some(self.durable_state());
        self.state = MainState::DeepSleep;
        self.backlight = false;
        actions.power = Some(PowerRequest::DeepSleep);
    }

    fn enter_sleep(&mut self, actions: &mut Actions) {
        if matches!(self.state, MainState::Sleep | MainState::DeepSleep) {
            return;
        }
        self.pending_audio = Some(AudioCommand::Stop);
        self.previous = Some(self.durable_state());
        self.state = MainState::Sleep;
        self.backlight = false;
        actions.power = Some(PowerRequest::Sleep);
    }

    fn wake(&mut self, actions: &mut Actions) {
        self.state = self.previous.take().unwrap_or(MainState::default_state());
        self.backlight = true;
        actions.power = Some(PowerRequest::Wake);
    }

    fn handle_battery(&mut self, percent: u8, external_power: bool, actions: &mut Actions) {
        self.battery_percent = percent;
        if external_power {
            // Charging: rearm the once-per-discharge warning.
            self.low_battery_warned = false;
            return;
        }
        if percent < CRITICAL_BATTERY_PERCENT {
            // The cell is about to brown out; only the hardware shutdown
            // path is safe.
            self.enter_deep_sleep(actions);
        } else if percent < LOW_BATTERY_PERCENT
            && !self.low_battery_warned
            && !matches!(
                self.state,
                MainState::Sleep | MainState::DeepSleep | MainState::Home(HomeSub::BatteryWarning)
            )
        {
            self.low_battery_warned = true;
            self.previous = Some(self.durable_state());
            self.state = MainState::Home(HomeSub::BatteryWarning);
        }
    }

    // -- navigation ---------------------------------------------------------

    fn handle_power_short(&mut self, actions: &mut Actions) {
        match self.state {
            MainState::Sleep => self.wake(actions),
            MainState::DeepSleep => {}
            MainState::Home(HomeSub::BatteryWarning) => self.dismiss_overlay(),
            MainState::Home(HomeSub::Grid { .. }) => self.enter_sleep(actions),
            _ => self.go_home(actions),
        }
    }

    fn handle_nav(&mut self, button: NavButton, actions: &mut Actions) {
        match self.state {
            MainState::Intro => self.go_home(actions),
            MainState::Sleep => self.wake(actions),
            MainState::DeepSleep => {}
            MainState::Home(HomeSub::BatteryWarning) => self.dismiss_overlay(),
            MainState::Home(HomeSub::Grid { row }) => self.nav_home(row, button, actions),
            MainState::AboutMe { page } => {
                self.nav_pages(button, page, crate::state::ABOUT_PAGES, actions, |p| {
                    MainState::AboutMe { page: p }
                });
            }
            MainState::Company { page } => {
                self.nav_pages(button, page, crate::state::COMPANY_PAGES, actions, |p| {
                    MainState::Company { page: p }
                });
            }
            MainState::Contact { page } => {
                self.nav_pages(button, page, crate::state::CONTACT_PAGES, actions, |p| {
                    MainState::Contact { page: p }
                });
            }
            MainState::Skills { page } => {
                self.nav_pages(button, page, crate::state::SKILL_PAGES, actions, |p| {
                    MainState::Skills { page: p }
                });
            }
            MainState::References { entry } => {
                self.nav_pages(button, entry, crate::state::REFERENCE_ENTRIES, actions, |e| {
                    MainState::References { entry: e }
                });
            }
            MainState::Device { slide } => {
                self.nav_slides(
                    button,
                    AppId::Device,
                    slide,
                    crate::state::DEVICE_SLIDES,
                    actions,
                    |s| MainState::Device { slide: s },
                );
            }
            MainState::Languages { slide } => {
                self.nav_slides(
                    button,
                    AppId::Languages,
                    slide,
                    crate::state::LANGUAGE_SLIDES,
                    actions,
                    |s| MainState::Languages { slide: s },
                );
            }
            MainState::Portfolio { slide } => {
                self.nav_slides(
                    button,
                    AppId::Portfolio,
                    slide,
                    crate::state::PORTFOLIO_SLIDES,
                    actions,
                    |s| MainState::Portfolio { slide: s },
                );
            }
            MainState::Settings { row } => self.nav_settings(row, button, actions),
            MainState::Audio => self.nav_audio(button),
        }
    }

    /// Back to the home grid; stops whatever is playing first.
    fn go_home(&mut self, actions: &mut Actions) {
        if self.audio != AudioState::Idle {
            self.pending_audio = Some(AudioCommand::Stop);
        }
        self.state = MainState::default_state();
        actions.persist = Some(self.state);
    }

    fn dismiss_overlay(&mut self) {
        self.state = self.previous.take().unwrap_or(MainState::default_state());
    }

    fn nav_home(&mut self, row: u8, button: NavButton, actions: &mut Actions) {
        match button {
            NavButton::Previous => {
                let next = if row == 0 {
                    HOME_ROWS.saturating_sub(1)
                } else {
                    row.saturating_sub(1)
                };
                self.state = MainState::Home(HomeSub::Grid { row: next });
            }
            NavButton::Next => {
                let next = row.saturating_add(1);
                let next = if next >= HOME_ROWS { 0 } else { next };
                self.state = MainState::Home(HomeSub::Grid { row: next });
            }
            NavButton::Select => match home_target(row) {
                HomeTarget::App(app) => {
                    self.state = MainState::app_entry(app);
                    if let Some(clip) = entry_clip(app) {
                        self.pending_audio = Some(AudioCommand::Start(clip));
                    }
                    actions.persist = Some(self.state);
                }
                HomeTarget::Audio => {
                    self.state = MainState::Audio;
                    actions.persist = Some(self.state);
                }
                HomeTarget::Settings => {
                    // Settings restores this context on exit.
                    self.previous = Some(self.state);
                    self.state = MainState::Settings { row: 0 };
                    actions.persist = Some(self.state);
                }
            },
        }
    }

    /// Page screens: clamp at both ends, select leaves for home. Scrolling
    /// is transient and never persisted.
    fn nav_pages(
        &mut self,
        button: NavButton,
        page: u8,
        count: u8,
        actions: &mut Actions,
        make: fn(u8) -> MainState,
    ) {
        match button {
            NavButton::Previous => self.state = make(page.saturating_sub(1)),
            NavButton::Next => {
                let last = count.saturating_sub(1);
                self.state = make(if page >= last { last } else { page.saturating_add(1) });
            }
            NavButton::Select => self.go_home(actions),
        }
    }

    /// Slideshow screens: wrap around and swap in the slide's paired clip.
    fn nav_slides(
        &mut self,
        button: NavButton,
        app: AppId,
        slide: u8,
        count: u8,
        actions: &mut Actions,
        make: fn(u8) -> MainState,
    ) {
        match button {
            NavButton::Previous | NavButton::Next => {
                let next = if button == NavButton::Previous {
                    if slide == 0 {
                        count.saturating_sub(1)
                    } else {
                        slide.saturating_sub(1)
                    }
                } else {
                    let n = slide.saturating_add(1);
                    if n >= count {
                        0
                    } else {
                        n
                    }
                };
                self.state = make(next);
                // Start implies stopping the previous clip first.
                self.pending_audio = Some(AudioCommand::Start(ClipId::Slide(app, next)));
            }
            NavButton::Select => self.go_home(actions),
        }
    }

    fn nav_settings(&mut self, row: u8, button: NavButton, actions: &mut Actions) {
        match button {
            NavButton::Previous => {
                self.state = MainState::Settings {
                    row: row.saturating_sub(1),
                };
            }
            NavButton::Next => {
                let last = SETTINGS_ROWS.saturating_sub(1);
                self.state = MainState::Settings {
                    row: if row >= last { last } else { row.saturating_add(1) },
                };
            }
            NavButton::Select => match row {
                0 => self.backlight = !self.backlight,
                1 => self.enter_sleep(actions),
                _ => {
                    self.state = self.previous.take().unwrap_or(MainState::default_state());
                    actions.persist = Some(self.state);
                }
            },
        }
    }

    fn nav_audio(&mut self, button: NavButton) {
        match button {
            NavButton::Select => {
                self.pending_audio = Some(match self.audio {
                    AudioState::Idle => AudioCommand::Start(ClipId::Showcase),
                    AudioState::Playing | AudioState::Paused => AudioCommand::Toggle,
                });
            }
            NavButton::Previous => {
                if self.audio != AudioState::Idle {
                    self.pending_audio = Some(AudioCommand::Stop);
                }
            }
            NavButton::Next => {}
        }
    }

    fn refresh_render(&mut self) {
        let model = RenderModel {
            state: self.state.kind(),
            substate: self.state.substate_ordinal(),
            audio: self.audio,
            battery_percent: self.battery_percent,
            backlight: self.backlight,
        };
        if model != self.last_render {
            self.last_render = model;
            self.render_changed = true;
        }
    }
}

impl Default for UiContext {
    fn default() -> Self {
        Self::new()
    }
}

/// The clip that starts when a slideshow screen is entered; page screens
/// are silent.
const fn entry_clip(app: AppId) -> Option<ClipId> {
    match app {
        AppId::Device | AppId::Languages | AppId::Portfolio => Some(ClipId::Slide(app, 0)),
        AppId::AboutMe
        | AppId::Company
        | AppId::Contact
        | AppId::References
        | AppId::Skills => None,
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
    use crate::state::{DEVICE_SLIDES, PORTFOLIO_SLIDES};

    fn at_home() -> UiContext {
        let mut ctx = UiContext::new();
        let _ = ctx.dispatch(MainEvent::Tick);
        ctx.audio_finished();
        assert_eq!(ctx.state(), MainState::default_state());
        ctx
    }

    /// Walk the home cursor to `row` and select it.
    fn open_row(ctx: &mut UiContext, row: u8) -> Actions {
        for _ in 0..row {
            let _ = ctx.dispatch(MainEvent::Nav(NavButton::Next));
        }
        ctx.dispatch(MainEvent::Nav(NavButton::Select))
    }

    #[test]
    fn boot_queues_greeting_and_finish_advances_home() {
        let mut ctx = UiContext::new();
        assert_eq!(ctx.state(), MainState::Intro);
        let actions = ctx.dispatch(MainEvent::Tick);
        assert_eq!(actions.audio, Some(AudioCommand::Start(ClipId::Greeting)));
        assert_eq!(ctx.audio_state(), AudioState::Playing);

        ctx.audio_finished();
        assert_eq!(ctx.state(), MainState::default_state());
        assert_eq!(ctx.audio_state(), AudioState::Idle);
    }

    #[test]
    fn any_button_skips_the_intro() {
        let mut ctx = UiContext::new();
        let _ = ctx.dispatch(MainEvent::Tick);
        let actions = ctx.dispatch(MainEvent::Nav(NavButton::Select));
        assert_eq!(ctx.state(), MainState::default_state());
        // Leaving the intro cuts the greeting short.
        assert_eq!(actions.audio, Some(AudioCommand::Stop));
        assert_eq!(actions.persist, Some(MainState::default_state()));
    }

    #[test]
    fn home_cursor_wraps_both_directions() {
        let mut ctx = at_home();
        let _ = ctx.dispatch(MainEvent::Nav(NavButton::Previous));
        assert_eq!(
            ctx.state(),
            MainState::Home(HomeSub::Grid { row: HOME_ROWS - 1 })
        );
        let _ = ctx.dispatch(MainEvent::Nav(NavButton::Next));
        assert_eq!(ctx.state(), MainState::Home(HomeSub::Grid { row: 0 }));
    }

    #[test]
    fn selecting_a_page_app_persists_and_stays_silent() {
        let mut ctx = at_home();
        let actions = open_row(&mut ctx, 0);
        assert_eq!(ctx.state(), MainState::AboutMe { page: 0 });
        assert_eq!(actions.persist, Some(MainState::AboutMe { page: 0 }));
        assert_eq!(actions.audio, None);
    }

    #[test]
    fn selecting_a_slideshow_app_starts_its_first_clip() {
        let mut ctx = at_home();
        let actions = open_row(&mut ctx, 3);
        assert_eq!(ctx.state(), MainState::Device { slide: 0 });
        assert_eq!(
            actions.audio,
            Some(AudioCommand::Start(ClipId::Slide(AppId::Device, 0)))
        );
        assert_eq!(ctx.audio_state(), AudioState::Playing);
    }

    #[test]
    fn page_scroll_clamps_at_both_ends_and_never_persists() {
        let mut ctx = at_home();
        let _ = open_row(&mut ctx, 0);
        let actions = ctx.dispatch(MainEvent::Nav(NavButton::Previous));
        assert_eq!(ctx.state(), MainState::AboutMe { page: 0 });
        assert_eq!(actions.persist, None);
        for _ in 0..10 {
            let _ = ctx.dispatch(MainEvent::Nav(NavButton::Next));
        }
        assert_eq!(
            ctx.state(),
            MainState::AboutMe {
                page: crate::state::ABOUT_PAGES - 1
            }
        );
    }

    #[test]
    fn slide_change_swaps_in_the_paired_clip() {
        let mut ctx = at_home();
        let _ = open_row(&mut ctx, 3);
        let actions = ctx.dispatch(MainEvent::Nav(NavButton::Next));
        assert_eq!(ctx.state(), MainState::Device { slide: 1 });
        assert_eq!(
            actions.audio,
            Some(AudioCommand::Start(ClipId::Slide(AppId::Device, 1)))
        );
        // Previous from slide 0 wraps to the last slide.
        let _ = ctx.dispatch(MainEvent::Nav(NavButton::Previous));
        let actions = ctx.dispatch(MainEvent::Nav(NavButton::Previous));
        assert_eq!(
            actions.audio,
            Some(AudioCommand::Start(ClipId::Slide(
                AppId::Device,
                DEVICE_SLIDES - 1
            )))
        );
    }

    #[test]
    fn leaving_a_screen_stops_playback() {
        let mut ctx = at_home();
        let _ = open_row(&mut ctx, 5);
        assert_eq!(ctx.state(), MainState::Portfolio { slide: 0 });
        assert_eq!(ctx.audio_state(), AudioState::Playing);
        let actions = ctx.dispatch(MainEvent::Nav(NavButton::Select));
        assert_eq!(ctx.state(), MainState::default_state());
        assert_eq!(actions.audio, Some(AudioCommand::Stop));
        assert_eq!(ctx.audio_state(), AudioState::Idle);
    }

    #[test]
    fn long_press_reaches_deep_sleep_in_one_dispatch_from_anywhere() {
        // Exercise a content screen, the home grid, and the audio player.
        let starts: [fn() -> UiContext; 3] = [
            || {
                let mut ctx = at_home();
                let _ = open_row(&mut ctx, 5);
                let _ = ctx.dispatch(MainEvent::Nav(NavButton::Next));
                ctx
            },
            at_home,
            || {
                let mut ctx = at_home();
                let _ = open_row(&mut ctx, 8);
                ctx
            },
        ];
        for start in starts {
            let mut ctx = start();
            let before = ctx.state();
            let actions = ctx.dispatch(MainEvent::PowerLong);
            assert_eq!(ctx.state(), MainState::DeepSleep);
            assert_eq!(actions.power, Some(PowerRequest::DeepSleep));
            assert_eq!(actions.audio, Some(AudioCommand::Stop));
            // The record names the screen the user was on.
            assert_eq!(actions.persist, Some(before));
        }
    }

    #[test]
    fn long_press_while_asleep_records_the_saved_context() {
        let mut ctx = at_home();
        let _ = open_row(&mut ctx, 2);
        let _ = ctx.dispatch(MainEvent::InactivityTimeout);
        assert_eq!(ctx.state(), MainState::Sleep);
        let actions = ctx.dispatch(MainEvent::PowerLong);
        assert_eq!(ctx.state(), MainState::DeepSleep);
        assert_eq!(actions.persist, Some(MainState::Contact { page: 0 }));
    }

    #[test]
    fn deep_sleep_ignores_further_input() {
        let mut ctx = at_home();
        let _ = ctx.dispatch(MainEvent::PowerLong);
        let actions = ctx.dispatch(MainEvent::Nav(NavButton::Select));
        assert_eq!(ctx.state(), MainState::DeepSleep);
        assert_eq!(actions, Actions::default());
    }

    #[test]
    fn inactivity_sleeps_and_any_button_restores_the_screen() {
        let mut ctx = at_home();
        let _ = open_row(&mut ctx, 0);
        let _ = ctx.dispatch(MainEvent::Nav(NavButton::Next));
        let actions = ctx.dispatch(MainEvent::InactivityTimeout);
        assert_eq!(ctx.state(), MainState::Sleep);
        assert_eq!(actions.power, Some(PowerRequest::Sleep));
        assert_eq!(actions.audio, Some(AudioCommand::Stop));
        assert!(!ctx.render_model().backlight);

        let actions = ctx.dispatch(MainEvent::Nav(NavButton::Next));
        assert_eq!(ctx.state(), MainState::AboutMe { page: 1 });
        assert_eq!(actions.power, Some(PowerRequest::Wake));
        assert!(ctx.render_model().backlight);
    }

    #[test]
    fn short_press_on_home_sleeps_and_wakes_back_to_home() {
        let mut ctx = at_home();
        let actions = ctx.dispatch(MainEvent::PowerShort);
        assert_eq!(ctx.state(), MainState::Sleep);
        assert_eq!(actions.power, Some(PowerRequest::Sleep));
        let _ = ctx.dispatch(MainEvent::PowerShort);
        assert_eq!(ctx.state(), MainState::default_state());
    }

    #[test]
    fn short_press_on_a_content_screen_goes_home() {
        let mut ctx = at_home();
        let _ = open_row(&mut ctx, 7);
        let actions = ctx.dispatch(MainEvent::PowerShort);
        assert_eq!(ctx.state(), MainState::default_state());
        assert_eq!(actions.persist, Some(MainState::default_state()));
    }

    #[test]
    fn low_battery_warns_once_per_discharge() {
        let mut ctx = at_home();
        let _ = open_row(&mut ctx, 9 - 2);
        let before = ctx.state();

        let _ = ctx.dispatch(MainEvent::Battery {
            percent: 9,
            external_power: false,
        });
        assert_eq!(ctx.state(), MainState::Home(HomeSub::BatteryWarning));
        let _ = ctx.dispatch(MainEvent::Nav(NavButton::Select));
        assert_eq!(ctx.state(), before);

        // Still low: latched, no second overlay.
        let _ = ctx.dispatch(MainEvent::Battery {
            percent: 8,
            external_power: false,
        });
        assert_eq!(ctx.state(), before);

        // Charging rearms the latch.
        let _ = ctx.dispatch(MainEvent::Battery {
            percent: 40,
            external_power: true,
        });
        let _ = ctx.dispatch(MainEvent::Battery {
            percent: 9,
            external_power: false,
        });
        assert_eq!(ctx.state(), MainState::Home(HomeSub::BatteryWarning));
    }

    #[test]
    fn critical_battery_forces_deep_sleep() {
        let mut ctx = at_home();
        let _ = open_row(&mut ctx, 5);
        let actions = ctx.dispatch(MainEvent::Battery {
            percent: 5,
            external_power: false,
        });
        assert_eq!(ctx.state(), MainState::DeepSleep);
        assert_eq!(actions.power, Some(PowerRequest::DeepSleep));
        assert_eq!(actions.audio, Some(AudioCommand::Stop));
        // The record names the screen the user was on.
        assert_eq!(actions.persist, Some(MainState::Portfolio { slide: 0 }));

        // A further critical sample must not re-run the shutdown sequence.
        let actions = ctx.dispatch(MainEvent::Battery {
            percent: 4,
            external_power: false,
        });
        assert_eq!(ctx.state(), MainState::DeepSleep);
        assert_eq!(actions, Actions::default());
    }

    #[test]
    fn settings_exit_restores_the_home_cursor() {
        let mut ctx = at_home();
        let _ = open_row(&mut ctx, 9);
        assert_eq!(ctx.state(), MainState::Settings { row: 0 });
        // Move to the exit row and select it.
        let _ = ctx.dispatch(MainEvent::Nav(NavButton::Next));
        let _ = ctx.dispatch(MainEvent::Nav(NavButton::Next));
        let _ = ctx.dispatch(MainEvent::Nav(NavButton::Select));
        assert_eq!(ctx.state(), MainState::Home(HomeSub::Grid { row: 9 }));
    }

    #[test]
    fn settings_toggles_the_backlight() {
        let mut ctx = at_home();
        let _ = open_row(&mut ctx, 9);
        assert!(ctx.render_model().backlight);
        let _ = ctx.dispatch(MainEvent::Nav(NavButton::Select));
        assert!(!ctx.render_model().backlight);
        let _ = ctx.dispatch(MainEvent::Nav(NavButton::Select));
        assert!(ctx.render_model().backlight);
    }

    #[test]
    fn audio_screen_select_cycles_the_transport() {
        let mut ctx = at_home();
        let _ = open_row(&mut ctx, 8);
        assert_eq!(ctx.state(), MainState::Audio);

        let actions = ctx.dispatch(MainEvent::Nav(NavButton::Select));
        assert_eq!(actions.audio, Some(AudioCommand::Start(ClipId::Showcase)));
        assert_eq!(ctx.audio_state(), AudioState::Playing);

        let actions = ctx.dispatch(MainEvent::Nav(NavButton::Select));
        assert_eq!(actions.audio, Some(AudioCommand::Toggle));
        assert_eq!(ctx.audio_state(), AudioState::Paused);

        let actions = ctx.dispatch(MainEvent::Nav(NavButton::Select));
        assert_eq!(actions.audio, Some(AudioCommand::Toggle));
        assert_eq!(ctx.audio_state(), AudioState::Playing);

        let actions = ctx.dispatch(MainEvent::Nav(NavButton::Previous));
        assert_eq!(actions.audio, Some(AudioCommand::Stop));
        assert_eq!(ctx.audio_state(), AudioState::Idle);
    }

    #[test]
    fn restored_audio_screen_resumes_the_showcase() {
        let mut ctx = UiContext::restored(MainState::Audio, AudioState::Playing);
        let actions = ctx.dispatch(MainEvent::Tick);
        assert_eq!(actions.audio, Some(AudioCommand::Start(ClipId::Showcase)));
    }

    #[test]
    fn restored_intro_replays_the_greeting() {
        let mut ctx = UiContext::restored(MainState::Intro, AudioState::Idle);
        let actions = ctx.dispatch(MainEvent::Tick);
        assert_eq!(actions.audio, Some(AudioCommand::Start(ClipId::Greeting)));
        // The splash still advances to home when the greeting ends.
        ctx.audio_finished();
        assert_eq!(ctx.state(), MainState::default_state());
    }

    #[test]
    fn restored_content_screen_stays_silent() {
        let mut ctx =
            UiContext::restored(MainState::Portfolio { slide: 2 }, AudioState::Idle);
        assert_eq!(ctx.state(), MainState::Portfolio { slide: 2 });
        assert!(ctx.state().substate_ordinal() < PORTFOLIO_SLIDES);
        let actions = ctx.dispatch(MainEvent::Tick);
        assert_eq!(actions.audio, None);
    }

    #[test]
    fn render_updates_only_when_something_moved() {
        let mut ctx = at_home();
        assert!(ctx.take_render_update().is_some());
        let _ = ctx.dispatch(MainEvent::Tick);
        assert!(ctx.take_render_update().is_none());
        let _ = ctx.dispatch(MainEvent::Nav(NavButton::Next));
        let model = ctx.take_render_update().unwrap();
        assert_eq!(model.state, crate::state::StateKind::Home);
        assert_eq!(model.substate, 1);
    }

    #[test]
    fn playback_failure_resets_the_footer() {
        let mut ctx = at_home();
        let _ = open_row(&mut ctx, 8);
        let _ = ctx.dispatch(MainEvent::Nav(NavButton::Select));
        assert_eq!(ctx.audio_state(), AudioState::Playing);
        ctx.audio_failed();
        assert_eq!(ctx.audio_state(), AudioState::Idle);
        assert_eq!(ctx.state(), MainState::Audio);
    }
}
