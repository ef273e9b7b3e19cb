//! K1 Hardware Abstraction Layer
//!
//! This crate defines the collaborator traits the device logic is written
//! against. Chip-specific HALs (STM32F1 today) implement them, and the
//! `mock` feature provides an in-memory flash for host tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (k1-firmware)              │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  k1-core (settings store, inputs, bus)  │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  k1-hal (this crate - traits)           │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  k1-hal-      │       │  mock::       │
//! │   stm32f1     │       │  MockFlash    │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`flash::BlockStorage`] - Erase-before-write word storage
//! - [`checksum::ChecksumEngine`] - 32-bit integrity codes
//! - [`gpio::InputPin`] - Digital input

#![no_std]
#![deny(unsafe_code)]

pub mod checksum;
pub mod flash;
pub mod gpio;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export key traits at crate root for convenience
pub use checksum::ChecksumEngine;
pub use flash::{BlockStorage, FlashError, WORD_SIZE};
pub use gpio::InputPin;
