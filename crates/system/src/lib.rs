//! Integration layer — the running cardlet firmware.
//!
//! The feature crates are pure and own no hardware; this crate ties them to
//! the platform seams. Boot brings the card to ready, loads the asset index
//! (snapshot shortcut, scan fallback), and restores the last screen from the
//! startup record. After boot, [`Cardlet::tick`] runs once per system tick:
//! drain the input slot, dispatch the UI machine, apply the returned actions
//! to the stream engine, the startup record, and the power rails, then feed
//! the audio sink from the open stream.
//!
//! # Modules
//!
//! - [`boot`] — card bring-up, index load-or-scan, screen restore
//! - [`clips`] — semantic clip identifiers to card asset tags
//! - [`runtime`] — [`Cardlet`] and the per-tick loop
//! - [`startup`] — startup record I/O on its reserved block

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod boot;
pub mod clips;
pub mod runtime;
pub mod startup;

pub use boot::{boot, boot_with_card, BootReport, IndexStatus};
pub use runtime::Cardlet;
