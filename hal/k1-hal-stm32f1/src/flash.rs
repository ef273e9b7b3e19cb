//! Internal flash driver for STM32F1
//!
//! Exposes the MCU's internal flash as [`BlockStorage`] using absolute
//! addresses (0x0800_0000 based), the same addresses the linker script and
//! the settings layout use.
//!
//! The embassy driver unlocks and re-locks the controller around every
//! erase and program on its own. `unlock`/`lock` here only gate which
//! operations this driver accepts, so that the caller's sequencing is still
//! enforced.

use embassy_stm32::flash::{Blocking, Flash, FLASH_BASE, FLASH_SIZE};
use embassy_stm32::peripherals::FLASH;
use embassy_stm32::Peri;

use k1_hal::flash::{BlockStorage, FlashError, WORD_SIZE};

/// Flash page size on low and medium density STM32F1 parts
pub const FLASH_PAGE_SIZE: u32 = 1024;

/// Blocking internal flash, restricted to `region`
pub struct InternalFlash<'d> {
    flash: Flash<'d, Blocking>,
    region: core::ops::Range<u32>,
    page_size: u32,
    unlocked: bool,
}

impl<'d> InternalFlash<'d> {
    /// Create a driver that only touches absolute addresses in `region`
    ///
    /// `region` must be page-aligned; the settings pages are the only part
    /// of flash this firmware ever erases.
    pub fn new(flash: Peri<'d, FLASH>, region: core::ops::Range<u32>, page_size: u32) -> Self {
        Self {
            flash: Flash::new_blocking(flash),
            region,
            page_size,
            unlocked: false,
        }
    }

    /// Translate an absolute address into an embassy flash offset
    fn offset(&self, address: u32, len: u32) -> Result<u32, FlashError> {
        let end = address.checked_add(len).ok_or(FlashError::OutOfBounds)?;
        if address < self.region.start || end > self.region.end {
            return Err(FlashError::OutOfBounds);
        }
        let offset = address - FLASH_BASE as u32;
        if offset + len > FLASH_SIZE as u32 {
            return Err(FlashError::OutOfBounds);
        }
        Ok(offset)
    }

    fn ensure_unlocked(&self) -> Result<(), FlashError> {
        if self.unlocked {
            Ok(())
        } else {
            Err(FlashError::Locked)
        }
    }
}

impl BlockStorage for InternalFlash<'_> {
    fn block_size(&self) -> u32 {
        self.page_size
    }

    fn unlock(&mut self) -> Result<(), FlashError> {
        self.unlocked = true;
        Ok(())
    }

    fn lock(&mut self) -> Result<(), FlashError> {
        self.unlocked = false;
        Ok(())
    }

    fn erase_block(&mut self, base_address: u32) -> Result<(), FlashError> {
        self.ensure_unlocked()?;
        if base_address % self.page_size != 0 {
            return Err(FlashError::Alignment);
        }
        let from = self.offset(base_address, self.page_size)?;
        self.flash
            .blocking_erase(from, from + self.page_size)
            .map_err(|_| FlashError::Erase)
    }

    fn program_word(&mut self, address: u32, value: u32) -> Result<(), FlashError> {
        self.ensure_unlocked()?;
        if address as usize % WORD_SIZE != 0 {
            return Err(FlashError::Alignment);
        }
        let offset = self.offset(address, WORD_SIZE as u32)?;
        self.flash
            .blocking_write(offset, &value.to_le_bytes())
            .map_err(|_| FlashError::Program)
    }

    fn read(&mut self, address: u32, buffer: &mut [u8]) -> Result<(), FlashError> {
        let offset = self.offset(address, buffer.len() as u32)?;
        self.flash
            .blocking_read(offset, buffer)
            .map_err(|_| FlashError::Read)
    }
}
