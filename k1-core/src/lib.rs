//! Board-agnostic core logic for K1 field device firmware
//!
//! This crate contains all device logic that does not depend on a specific
//! MCU:
//!
//! - Configuration record and its dual-slot, checksum-verified flash store
//! - Software CRC engine matching the MCU's CRC unit
//! - Bus address cache
//! - Push-button debounce and event detection

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod logging;

pub mod bus;
pub mod checksum;
pub mod input;
pub mod settings;

pub use checksum::Crc32Mpeg2;
pub use settings::{SettingsError, SettingsStore, Slot, SlotLayout};
