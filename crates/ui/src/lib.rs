//! UI and power state machine.
//!
//! A hierarchical machine: [`state::MainState`] variants own their substate,
//! [`dispatch::UiContext`] routes one [`event::MainEvent`] per tick and hands
//! back [`dispatch::Actions`] for the application layer to apply. The crate
//! performs no I/O; playback, persistence, and power rails stay behind the
//! action struct, which keeps every transition unit-testable.
//!
//! # Modules
//!
//! - [`state`] — `MainState`, substate bounds, persistence flattening
//! - [`event`] — events in, audio/power commands out
//! - [`dispatch`] — the per-tick dispatcher and `UiContext`
//! - [`persist`] — the checksummed startup record codec
//! - [`render`] — the snapshot the display collaborator reads

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod dispatch;
pub mod event;
pub mod persist;
pub mod render;
pub mod state;

pub use dispatch::{Actions, AudioState, UiContext};
pub use event::{AudioCommand, ClipId, MainEvent, NavButton, PowerRequest};
pub use persist::{decode_startup, encode_startup, DecodedStartup};
pub use render::RenderModel;
pub use state::{AppId, HomeSub, MainState, StateKind};
