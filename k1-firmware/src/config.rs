//! Device profile
//!
//! Constants generated by build.rs from device.toml.

use k1_core::input::ButtonTiming;
use k1_core::SlotLayout;

include!(concat!(env!("OUT_DIR"), "/device_config.rs"));

/// Settings slot addresses
pub const SETTINGS_LAYOUT: SlotLayout = SlotLayout::new(SETTINGS_MAIN, SETTINGS_SPARE);

/// Push thresholds for the on-board buttons
pub fn button_timing() -> ButtonTiming {
    ButtonTiming {
        short_push_ms: SHORT_PUSH_MS,
        long_push_ms: LONG_PUSH_MS,
        release_ms: RELEASE_MS,
    }
}
