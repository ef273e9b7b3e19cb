//! Storage slots holding the two copies of the settings image

/// One of the two redundant copies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Slot {
    /// Preferred copy: read first on load, written first on update
    Main,
    /// Backup copy
    Spare,
}

impl Slot {
    /// The other copy
    pub fn other(self) -> Self {
        match self {
            Slot::Main => Slot::Spare,
            Slot::Spare => Slot::Main,
        }
    }
}

/// Base addresses of the two slots
///
/// Each slot must start on an erase block boundary and own that block
/// exclusively, since writing a slot erases its whole block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotLayout {
    pub main: u32,
    pub spare: u32,
}

impl SlotLayout {
    pub const fn new(main: u32, spare: u32) -> Self {
        Self { main, spare }
    }

    /// Base address of `slot`
    pub fn address(&self, slot: Slot) -> u32 {
        match slot {
            Slot::Main => self.main,
            Slot::Spare => self.spare,
        }
    }

    /// Check that both slots are block-aligned, that an image of
    /// `image_len` bytes fits in one block, and that the slots do not share
    /// a block
    pub fn fits(&self, block_size: u32, image_len: usize) -> bool {
        if block_size == 0 || image_len > block_size as usize {
            return false;
        }
        self.main % block_size == 0
            && self.spare % block_size == 0
            && self.main / block_size != self.spare / block_size
    }
}
