//! K1 bus addressing
//!
//! Runtime view of the addresses this device answers to on the bus.

pub mod address;

pub use address::{AddressError, AddressTable};
