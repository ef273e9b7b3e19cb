//! Hardware CRC unit
//!
//! The STM32F1 CRC unit computes CRC-32/MPEG-2 over 32-bit words written to
//! its data register. Bytes are packed into little-endian words first, which
//! is the word order `k1_core::Crc32Mpeg2` reproduces in software.

use embassy_stm32::crc::Crc;
use embassy_stm32::peripherals::CRC;
use embassy_stm32::Peri;

use k1_hal::checksum::{le_words, ChecksumEngine};

/// Checksum engine backed by the CRC peripheral
pub struct HardwareCrc<'d> {
    crc: Crc<'d>,
}

impl<'d> HardwareCrc<'d> {
    pub fn new(crc: Peri<'d, CRC>) -> Self {
        Self { crc: Crc::new(crc) }
    }
}

impl ChecksumEngine for HardwareCrc<'_> {
    fn checksum(&mut self, bytes: &[u8]) -> u32 {
        self.crc.reset();
        let mut result = self.crc.read();
        for word in le_words(bytes) {
            result = self.crc.feed_word(word);
        }
        result
    }
}
