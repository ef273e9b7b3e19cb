//! Flash storage abstractions
//!
//! Provides the raw block storage primitives used by the settings store.
//! The medium is byte-addressable for reads, word-programmable, and
//! block-erasable: a word can only be programmed while it is in the erased
//! state, so a block has to be erased before any word in it is rewritten.

/// Size of a programmable word in bytes
pub const WORD_SIZE: usize = 4;

/// Value a byte reads back as after its block has been erased
pub const ERASED_BYTE: u8 = 0xFF;

/// Errors from flash storage operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// The controller refused to unlock, or an operation was attempted while locked
    Locked,
    /// Block erase failed
    Erase,
    /// Word programming failed
    Program,
    /// Read failed
    Read,
    /// Address outside the region managed by this driver
    OutOfBounds,
    /// Address not aligned to a word or block boundary
    Alignment,
}

/// Block storage trait
///
/// All calls are synchronous and block until the controller reports
/// completion. Addresses are absolute in the driver's address space.
pub trait BlockStorage {
    /// Size of one erasable block in bytes
    fn block_size(&self) -> u32;

    /// Unlock the controller for erase/program operations
    fn unlock(&mut self) -> Result<(), FlashError>;

    /// Re-lock the controller
    fn lock(&mut self) -> Result<(), FlashError>;

    /// Erase the block starting at `base_address`
    ///
    /// Every byte of the block reads back as [`ERASED_BYTE`] afterwards.
    fn erase_block(&mut self, base_address: u32) -> Result<(), FlashError>;

    /// Program one word at `address`
    ///
    /// `address` must be word-aligned and the word must be erased. The value
    /// is stored little-endian.
    fn program_word(&mut self, address: u32, value: u32) -> Result<(), FlashError>;

    /// Read `buffer.len()` bytes starting at `address`
    fn read(&mut self, address: u32, buffer: &mut [u8]) -> Result<(), FlashError>;
}

impl<T: BlockStorage + ?Sized> BlockStorage for &mut T {
    fn block_size(&self) -> u32 {
        (**self).block_size()
    }

    fn unlock(&mut self) -> Result<(), FlashError> {
        (**self).unlock()
    }

    fn lock(&mut self) -> Result<(), FlashError> {
        (**self).lock()
    }

    fn erase_block(&mut self, base_address: u32) -> Result<(), FlashError> {
        (**self).erase_block(base_address)
    }

    fn program_word(&mut self, address: u32, value: u32) -> Result<(), FlashError> {
        (**self).program_word(address, value)
    }

    fn read(&mut self, address: u32, buffer: &mut [u8]) -> Result<(), FlashError> {
        (**self).read(address, buffer)
    }
}
