//! K1 - Addressable Field Device Firmware
//!
//! Main firmware binary for STM32F103-based field devices on the K1
//! addressable loop. Restores the device identity from its dual-copy
//! settings record and runs the push-button control loop.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use {defmt_rtt as _, panic_probe as _};

use k1_core::bus::AddressTable;
use k1_hal_stm32f1::crc::HardwareCrc;
use k1_hal_stm32f1::flash::InternalFlash;
use k1_hal_stm32f1::gpio::ButtonPin;

use crate::config::{FLASH_PAGE_SIZE, SETTINGS_LAYOUT, SETTINGS_REGION};
use crate::settings::{load_settings, Store};

#[macro_use]
mod config;
mod settings;
mod tasks;

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("K1 firmware starting...");

    let p = embassy_stm32::init(Default::default());
    info!("Peripherals initialized");

    let flash = InternalFlash::new(p.FLASH, SETTINGS_REGION, FLASH_PAGE_SIZE);
    let crc = HardwareCrc::new(p.CRC);
    let mut store = Store::new(flash, Some(crc), SETTINGS_LAYOUT);
    load_settings(&mut store);

    let addresses = AddressTable::from_settings(store.settings());
    info!(
        "Device type {}, {} bus items",
        store.device_type(),
        addresses.len()
    );

    let button = ButtonPin::new(address_button_pin!(p));
    spawner.spawn(tasks::control_task(button, addresses).unwrap());

    info!("Initialization complete");
}
