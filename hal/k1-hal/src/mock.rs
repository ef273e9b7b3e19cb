//! Mock flash implementation for testing
//!
//! Provides an in-memory NOR-like medium for host tests. Supports:
//! - Erase-before-program enforcement and unlock/lock tracking
//! - Fault injection on unlock, erase and program
//! - Silent torn writes (power loss while programming)
//! - Bit flips for corruption tests
//! - Erase and program counters

use crate::flash::{BlockStorage, FlashError, ERASED_BYTE, WORD_SIZE};

/// In-memory flash region of `SIZE` bytes starting at `base`
///
/// # Example
///
/// ```
/// use k1_hal::flash::BlockStorage;
/// use k1_hal::mock::MockFlash;
///
/// let mut flash = MockFlash::<2048>::new(0x0800_F800, 1024);
/// flash.unlock().unwrap();
/// flash.erase_block(0x0800_F800).unwrap();
/// flash.program_word(0x0800_F800, 0x1234_5678).unwrap();
/// flash.lock().unwrap();
///
/// let mut buf = [0u8; 4];
/// flash.read(0x0800_F800, &mut buf).unwrap();
/// assert_eq!(buf, [0x78, 0x56, 0x34, 0x12]);
/// ```
#[derive(Debug, Clone)]
pub struct MockFlash<const SIZE: usize> {
    base: u32,
    block_size: u32,
    storage: [u8; SIZE],
    locked: bool,
    unlock_fails: bool,
    erase_fails: bool,
    /// Programs left before `program_word` starts returning errors
    fail_programs_after: Option<usize>,
    /// Programs left before `program_word` starts silently dropping words
    drop_programs_after: Option<usize>,
    erase_count: u32,
    program_count: u32,
}

impl<const SIZE: usize> MockFlash<SIZE> {
    /// Create a fully erased region
    pub fn new(base: u32, block_size: u32) -> Self {
        Self {
            base,
            block_size,
            storage: [ERASED_BYTE; SIZE],
            locked: true,
            unlock_fails: false,
            erase_fails: false,
            fail_programs_after: None,
            drop_programs_after: None,
            erase_count: 0,
            program_count: 0,
        }
    }

    /// Borrow `len` bytes at `address` (for test verification)
    pub fn contents(&self, address: u32, len: usize) -> &[u8] {
        let start = (address - self.base) as usize;
        &self.storage[start..start + len]
    }

    /// Overwrite bytes directly, bypassing erase rules and counters
    ///
    /// Used to stage slot contents before a test runs.
    pub fn preload(&mut self, address: u32, data: &[u8]) {
        let start = (address - self.base) as usize;
        self.storage[start..start + data.len()].copy_from_slice(data);
    }

    /// Flip a single bit at `address`
    pub fn flip_bit(&mut self, address: u32, bit: u8) {
        let index = (address - self.base) as usize;
        self.storage[index] ^= 1 << (bit % 8);
    }

    /// Make every subsequent `unlock` fail
    pub fn set_unlock_fails(&mut self, fails: bool) {
        self.unlock_fails = fails;
    }

    /// Make every subsequent `erase_block` fail
    pub fn set_erase_fails(&mut self, fails: bool) {
        self.erase_fails = fails;
    }

    /// Let `count` more words program normally, then fail with an error
    pub fn fail_programs_after(&mut self, count: usize) {
        self.fail_programs_after = Some(count);
    }

    /// Let `count` more words program normally, then report success
    /// without storing anything (power lost while programming)
    pub fn drop_programs_after(&mut self, count: usize) {
        self.drop_programs_after = Some(count);
    }

    /// Remove all injected faults
    pub fn clear_faults(&mut self) {
        self.unlock_fails = false;
        self.erase_fails = false;
        self.fail_programs_after = None;
        self.drop_programs_after = None;
    }

    /// Number of successful block erases
    pub fn erase_count(&self) -> u32 {
        self.erase_count
    }

    /// Number of words actually stored
    pub fn program_count(&self) -> u32 {
        self.program_count
    }

    /// Whether the controller is currently locked
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    fn offset(&self, address: u32, len: usize) -> Result<usize, FlashError> {
        let offset = address.checked_sub(self.base).ok_or(FlashError::OutOfBounds)? as usize;
        if offset + len > SIZE {
            return Err(FlashError::OutOfBounds);
        }
        Ok(offset)
    }

    /// Count down an injected fault budget; true once it is exhausted
    fn budget_spent(budget: &mut Option<usize>) -> bool {
        match budget {
            Some(0) => true,
            Some(left) => {
                *left -= 1;
                false
            }
            None => false,
        }
    }
}

impl<const SIZE: usize> BlockStorage for MockFlash<SIZE> {
    fn block_size(&self) -> u32 {
        self.block_size
    }

    fn unlock(&mut self) -> Result<(), FlashError> {
        if self.unlock_fails {
            return Err(FlashError::Locked);
        }
        self.locked = false;
        Ok(())
    }

    fn lock(&mut self) -> Result<(), FlashError> {
        self.locked = true;
        Ok(())
    }

    fn erase_block(&mut self, base_address: u32) -> Result<(), FlashError> {
        if self.locked {
            return Err(FlashError::Locked);
        }
        let start = self.offset(base_address, self.block_size as usize)?;
        if start % self.block_size as usize != 0 {
            return Err(FlashError::Alignment);
        }
        if self.erase_fails {
            return Err(FlashError::Erase);
        }

        self.storage[start..start + self.block_size as usize].fill(ERASED_BYTE);
        self.erase_count += 1;
        Ok(())
    }

    fn program_word(&mut self, address: u32, value: u32) -> Result<(), FlashError> {
        if self.locked {
            return Err(FlashError::Locked);
        }
        if address as usize % WORD_SIZE != 0 {
            return Err(FlashError::Alignment);
        }
        let start = self.offset(address, WORD_SIZE)?;
        if Self::budget_spent(&mut self.fail_programs_after) {
            return Err(FlashError::Program);
        }
        if Self::budget_spent(&mut self.drop_programs_after) {
            return Ok(());
        }

        let word = &mut self.storage[start..start + WORD_SIZE];
        if word.iter().any(|&b| b != ERASED_BYTE) {
            return Err(FlashError::Program);
        }
        word.copy_from_slice(&value.to_le_bytes());
        self.program_count += 1;
        Ok(())
    }

    fn read(&mut self, address: u32, buffer: &mut [u8]) -> Result<(), FlashError> {
        let start = self.offset(address, buffer.len())?;
        buffer.copy_from_slice(&self.storage[start..start + buffer.len()]);
        Ok(())
    }
}
