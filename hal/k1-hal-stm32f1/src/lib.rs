//! STM32F1-specific HAL for the K1 field device firmware
//!
//! This crate implements the `k1-hal` traits on top of `embassy-stm32`:
//!
//! - [`flash::InternalFlash`] - settings pages in the MCU's internal flash
//! - [`crc::HardwareCrc`] - the MCU's CRC calculation unit
//! - [`gpio::ButtonPin`] - push-button input
//!
//! # Features
//!
//! - `stm32f103c8` - STM32F103C8 (64 KB flash, 1 KB pages)
//! - `stm32f103cb` - STM32F103CB (128 KB flash, 1 KB pages)
//! - `defmt` - Enable debug formatting support

#![no_std]

pub mod crc;
pub mod flash;
pub mod gpio;

// Re-export shared traits from k1-hal
pub use k1_hal::{BlockStorage, ChecksumEngine, InputPin};
