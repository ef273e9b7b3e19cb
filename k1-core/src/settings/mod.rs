//! Device settings persistence
//!
//! The device identity (type and bus addresses) lives in a small fixed
//! record kept twice in flash, each copy checksummed, so that a corrupted
//! or half-written copy can be detected and healed from the other.

pub mod error;
pub mod record;
pub mod slot;
pub mod store;

pub use error::{combine, SettingsError};
pub use record::{
    image_len, DeviceType, Settings, ADDR_BROADCAST, ADDR_MAX, ADDR_MIN, ADDR_PANEL,
    MAX_IMAGE_LEN, MAX_ITEMS, SETTINGS_VERSION,
};
pub use slot::{Slot, SlotLayout};
pub use store::SettingsStore;
