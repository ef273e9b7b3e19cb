//! Bus address cache
//!
//! Holds the address of every item on the device for the bus handler.
//! Populated from the settings record at boot.

use crate::settings::{Settings, ADDR_BROADCAST, ADDR_MAX, ADDR_MIN};

/// Address cache errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressError {
    /// Item number is not below the number of items on the device
    ItemOutOfRange,
}

/// Addresses of the `N` items on this device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AddressTable<const N: usize> {
    addresses: [u8; N],
}

impl<const N: usize> Default for AddressTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> AddressTable<N> {
    /// Create a table with no item addressed
    pub const fn new() -> Self {
        Self {
            addresses: [ADDR_BROADCAST; N],
        }
    }

    /// Build the table from a settings record
    pub fn from_settings(settings: &Settings<N>) -> Self {
        let mut table = Self::new();
        for (item, &addr) in settings.addresses.iter().enumerate() {
            // item is always in range here
            let _ = table.set(addr, item);
        }
        table
    }

    /// Set the address of `item`
    ///
    /// The broadcast address is not assignable: setting it leaves the
    /// current address untouched.
    pub fn set(&mut self, addr: u8, item: usize) -> Result<(), AddressError> {
        let slot = self
            .addresses
            .get_mut(item)
            .ok_or(AddressError::ItemOutOfRange)?;
        if addr != ADDR_BROADCAST {
            *slot = addr;
        }
        Ok(())
    }

    /// Address of `item`, or 0 when the item does not exist or is unaddressed
    pub fn get(&self, item: usize) -> u8 {
        self.addresses.get(item).copied().unwrap_or(ADDR_BROADCAST)
    }

    /// Whether `item` holds an address a panel can poll
    pub fn is_assigned(&self, item: usize) -> bool {
        (ADDR_MIN..=ADDR_MAX).contains(&self.get(item))
    }

    /// Item answering to `addr`, if any
    pub fn item_for(&self, addr: u8) -> Option<usize> {
        if addr == ADDR_BROADCAST {
            return None;
        }
        self.addresses.iter().position(|&a| a == addr)
    }

    /// Number of items on the device
    pub const fn len(&self) -> usize {
        N
    }

    pub const fn is_empty(&self) -> bool {
        N == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ADDR_PANEL;

    #[test]
    fn test_set_and_get() {
        let mut table = AddressTable::<2>::new();
        assert_eq!(table.set(17, 1), Ok(()));
        assert_eq!(table.get(1), 17);
        assert_eq!(table.get(0), 0);
    }

    #[test]
    fn test_out_of_range() {
        let mut table = AddressTable::<1>::new();
        assert_eq!(table.set(17, 1), Err(AddressError::ItemOutOfRange));
        assert_eq!(table.get(1), 0);
    }

    #[test]
    fn test_broadcast_is_ignored() {
        let mut table = AddressTable::<1>::new();
        table.set(30, 0).unwrap();
        assert_eq!(table.set(ADDR_BROADCAST, 0), Ok(()));
        assert_eq!(table.get(0), 30);
    }

    #[test]
    fn test_is_assigned() {
        let mut table = AddressTable::<3>::new();
        table.set(ADDR_MIN, 0).unwrap();
        table.set(ADDR_PANEL, 1).unwrap();
        assert!(table.is_assigned(0));
        assert!(!table.is_assigned(1));
        assert!(!table.is_assigned(2));
        assert!(!table.is_assigned(3));
    }

    #[test]
    fn test_from_settings() {
        let mut settings = Settings::<3>::new();
        settings.addresses = [4, 0, 200];
        let table = AddressTable::from_settings(&settings);
        assert_eq!(table.get(0), 4);
        assert_eq!(table.get(1), 0);
        assert_eq!(table.get(2), 200);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_item_for() {
        let mut table = AddressTable::<2>::new();
        table.set(9, 1).unwrap();
        assert_eq!(table.item_for(9), Some(1));
        assert_eq!(table.item_for(10), None);
        assert_eq!(table.item_for(ADDR_BROADCAST), None);
    }
}
