//! Screen state model — MainState variants carrying their own substate.
//!
//! Each variant owns the substate type that is meaningful for it, so an
//! invalid (state, substate) pair cannot be represented. Persistence flattens
//! a state to a `(StateKind, u8)` pair and [`MainState::from_parts`] is the
//! only way back, validating the ordinal against the per-state bound.

/// Content screens reachable from the home grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AppId {
    AboutMe,
    Company,
    Contact,
    Device,
    Languages,
    Portfolio,
    References,
    Skills,
}

/// Home-screen substate: the icon grid or the battery-warning overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HomeSub {
    /// Icon grid with the highlighted row.
    Grid { row: u8 },
    /// Low-battery overlay; any button dismisses it.
    BatteryWarning,
}

/// Rows on the home grid: the eight content screens, then the audio player
/// and settings.
pub const HOME_ROWS: u8 = 10;
/// Text pages on the about-me screen.
pub const ABOUT_PAGES: u8 = 3;
/// Text pages on the company screen.
pub const COMPANY_PAGES: u8 = 2;
/// Text pages on the contact screen.
pub const CONTACT_PAGES: u8 = 2;
/// Slides (with paired clips) on the device screen.
pub const DEVICE_SLIDES: u8 = 4;
/// Slides (with paired clips) on the languages screen.
pub const LANGUAGE_SLIDES: u8 = 3;
/// Slides (with paired clips) on the portfolio screen.
pub const PORTFOLIO_SLIDES: u8 = 6;
/// Entries on the references screen.
pub const REFERENCE_ENTRIES: u8 = 4;
/// Text pages on the skills screen.
pub const SKILL_PAGES: u8 = 3;
/// Rows on the settings screen.
pub const SETTINGS_ROWS: u8 = 3;

/// The outer state of the UI machine, each variant carrying its substate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MainState {
    /// Boot splash; plays the greeting clip, any button leaves it.
    Intro,
    /// Icon grid / battery-warning overlay.
    Home(HomeSub),
    AboutMe { page: u8 },
    Company { page: u8 },
    Contact { page: u8 },
    /// Slideshow; each slide pairs with an audio clip.
    Device { slide: u8 },
    /// Slideshow; each slide pairs with an audio clip.
    Languages { slide: u8 },
    /// Slideshow; each slide pairs with an audio clip.
    Portfolio { slide: u8 },
    References { entry: u8 },
    Skills { page: u8 },
    Settings { row: u8 },
    /// Audio player screen with transport controls.
    Audio,
    /// Backlight off, context retained; any button wakes.
    Sleep,
    /// Hardware low-power entry; terminal until reset.
    DeepSleep,
}

/// Flat discriminant used for persistence and rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StateKind {
    Intro = 0,
    Home = 1,
    AboutMe = 2,
    Company = 3,
    Contact = 4,
    Device = 5,
    Languages = 6,
    Portfolio = 7,
    References = 8,
    Skills = 9,
    Settings = 10,
    Audio = 11,
    Sleep = 12,
    DeepSleep = 13,
}

impl MainState {
    /// The state shown when no valid startup record exists.
    pub const fn default_state() -> Self {
        MainState::Home(HomeSub::Grid { row: 0 })
    }

    /// Flat discriminant of this state.
    pub const fn kind(&self) -> StateKind {
        match self {
            MainState::Intro => StateKind::Intro,
            MainState::Home(_) => StateKind::Home,
            MainState::AboutMe { .. } => StateKind::AboutMe,
            MainState::Company { .. } => StateKind::Company,
            MainState::Contact { .. } => StateKind::Contact,
            MainState::Device { .. } => StateKind::Device,
            MainState::Languages { .. } => StateKind::Languages,
            MainState::Portfolio { .. } => StateKind::Portfolio,
            MainState::References { .. } => StateKind::References,
            MainState::Skills { .. } => StateKind::Skills,
            MainState::Settings { .. } => StateKind::Settings,
            MainState::Audio => StateKind::Audio,
            MainState::Sleep => StateKind::Sleep,
            MainState::DeepSleep => StateKind::DeepSleep,
        }
    }

    /// Substate ordinal, for persistence and the footer.
    pub const fn substate_ordinal(&self) -> u8 {
        match self {
            MainState::Home(HomeSub::Grid { row }) => *row,
            // The warning overlay is transient and never persisted; its
            // ordinal only feeds the renderer.
            MainState::Home(HomeSub::BatteryWarning) => HOME_ROWS,
            MainState::AboutMe { page }
            | MainState::Company { page }
            | MainState::Contact { page }
            | MainState::Skills { page } => *page,
            MainState::Device { slide }
            | MainState::Languages { slide }
            | MainState::Portfolio { slide } => *slide,
            MainState::References { entry } => *entry,
            MainState::Settings { row } => *row,
            MainState::Intro | MainState::Audio | MainState::Sleep | MainState::DeepSleep => 0,
        }
    }

    /// Rebuild a state from its persisted `(kind, ordinal)` pair.
    ///
    /// Returns `None` for an unknown kind byte, an out-of-range ordinal, or
    /// a state that is never a restore target (sleep states and the warning
    /// overlay cannot be booted into).
    pub fn from_parts(kind: u8, sub: u8) -> Option<Self> {
        let state = match kind {
            0 if sub == 0 => MainState::Intro,
            1 if sub < HOME_ROWS => MainState::Home(HomeSub::Grid { row: sub }),
            2 if sub < ABOUT_PAGES => MainState::AboutMe { page: sub },
            3 if sub < COMPANY_PAGES => MainState::Company { page: sub },
            4 if sub < CONTACT_PAGES => MainState::Contact { page: sub },
            5 if sub < DEVICE_SLIDES => MainState::Device { slide: sub },
            6 if sub < LANGUAGE_SLIDES => MainState::Languages { slide: sub },
            7 if sub < PORTFOLIO_SLIDES => MainState::Portfolio { slide: sub },
            8 if sub < REFERENCE_ENTRIES => MainState::References { entry: sub },
            9 if sub < SKILL_PAGES => MainState::Skills { page: sub },
            10 if sub < SETTINGS_ROWS => MainState::Settings { row: sub },
            11 if sub == 0 => MainState::Audio,
            _ => return None,
        };
        Some(state)
    }

    /// Entry state for an app chosen on the home grid.
    pub const fn app_entry(app: AppId) -> Self {
        match app {
            AppId::AboutMe => MainState::AboutMe { page: 0 },
            AppId::Company => MainState::Company { page: 0 },
            AppId::Contact => MainState::Contact { page: 0 },
            AppId::Device => MainState::Device { slide: 0 },
            AppId::Languages => MainState::Languages { slide: 0 },
            AppId::Portfolio => MainState::Portfolio { slide: 0 },
            AppId::References => MainState::References { entry: 0 },
            AppId::Skills => MainState::Skills { page: 0 },
        }
    }
}

/// What a home-grid row opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HomeTarget {
    App(AppId),
    Audio,
    Settings,
}

/// Map a home-grid row to its target. Rows past the end open settings.
pub const fn home_target(row: u8) -> HomeTarget {
    match row {
        0 => HomeTarget::App(AppId::AboutMe),
        1 => HomeTarget::App(AppId::Company),
        2 => HomeTarget::App(AppId::Contact),
        3 => HomeTarget::App(AppId::Device),
        4 => HomeTarget::App(AppId::Languages),
        5 => HomeTarget::App(AppId::Portfolio),
        6 => HomeTarget::App(AppId::References),
        7 => HomeTarget::App(AppId::Skills),
        8 => HomeTarget::Audio,
        _ => HomeTarget::Settings,
    }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn from_parts_roundtrips_every_restorable_state() {
        for kind in 0u8..=13 {
            for sub in 0u8..12 {
                if let Some(state) = MainState::from_parts(kind, sub) {
                    assert_eq!(state.kind() as u8, kind);
                    assert_eq!(state.substate_ordinal(), sub);
                }
            }
        }
    }

    #[test]
    fn from_parts_rejects_sleep_states() {
        assert_eq!(MainState::from_parts(12, 0), None);
        assert_eq!(MainState::from_parts(13, 0), None);
        assert_eq!(MainState::from_parts(99, 0), None);
    }

    #[test]
    fn from_parts_rejects_out_of_range_ordinals() {
        assert_eq!(MainState::from_parts(2, ABOUT_PAGES), None);
        assert_eq!(MainState::from_parts(1, HOME_ROWS), None);
        assert!(MainState::from_parts(2, ABOUT_PAGES - 1).is_some());
    }

    #[test]
    fn every_home_row_has_a_target() {
        let mut apps = 0;
        for row in 0..HOME_ROWS {
            match home_target(row) {
                HomeTarget::App(_) => apps += 1,
                HomeTarget::Audio | HomeTarget::Settings => {}
            }
        }
        assert_eq!(apps, 8);
    }
}
