//! Settings bring-up
//!
//! Loads the device record at boot and provisions the configured device
//! type on a blank or reset record.

use defmt::*;

use k1_core::settings::DeviceType;
use k1_core::{SettingsError, SettingsStore, Slot};
use k1_hal_stm32f1::crc::HardwareCrc;
use k1_hal_stm32f1::flash::InternalFlash;

use crate::config::{DEVICE_TYPE, ITEMS};

/// Settings store wired to the internal flash and the CRC unit
pub type Store = SettingsStore<InternalFlash<'static>, HardwareCrc<'static>, ITEMS>;

/// Load the record, logging the outcome
///
/// A total failure leaves the store holding the default record, which is
/// then provisioned like a fresh device.
pub fn load_settings(store: &mut Store) {
    match store.load() {
        Ok(Slot::Main) => info!("Settings loaded from main copy"),
        Ok(Slot::Spare) => warn!("Settings loaded from spare copy, main restored"),
        Err(SettingsError::StorageFailure) if store.loaded_from().is_some() => {
            error!("Settings loaded but the other copy could not be rewritten");
        }
        Err(e) => warn!("No valid settings copy ({:?}), using defaults", e),
    }

    if store.settings().kind() == Some(DeviceType::Undefined) {
        info!("Provisioning device type {}", DEVICE_TYPE);
        if let Err(e) = store.set_device_type(DEVICE_TYPE) {
            error!("Failed to store device type: {:?}", e);
        }
    } else if store.device_type() != DEVICE_TYPE {
        warn!(
            "Stored device type {} differs from profile type {}",
            store.device_type(),
            DEVICE_TYPE
        );
    }

    for (item, addr) in store.addresses().iter().enumerate() {
        debug!("Item {}: address {}", item, addr);
    }
}
