//! Software CRC engine
//!
//! CRC-32/MPEG-2 over 32-bit little-endian words, each word fed most
//! significant byte first. That is what the STM32 CRC unit computes when it
//! is fed the settings image word by word, so images written by either
//! engine verify with the other.

use crc::{Crc, CRC_32_MPEG_2};
use k1_hal::checksum::{le_words, ChecksumEngine};

/// CRC-32/MPEG-2: poly 0x04C11DB7, init 0xFFFFFFFF, no reflection, no xorout
const CRC32_MPEG2: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

/// Table-driven software implementation of the word-oriented CRC
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc32Mpeg2;

impl Crc32Mpeg2 {
    pub const fn new() -> Self {
        Self
    }
}

impl ChecksumEngine for Crc32Mpeg2 {
    fn checksum(&mut self, bytes: &[u8]) -> u32 {
        let mut digest = CRC32_MPEG2.digest();
        for word in le_words(bytes) {
            digest.update(&word.to_be_bytes());
        }
        digest.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_check_value() {
        assert_eq!(CRC32_MPEG2.checksum(b"123456789"), 0x0376_E6E7);
    }

    #[test]
    fn test_matches_hardware_unit() {
        // The STM32 CRC unit returns 0xDF8A8A2B after a reset and one write
        // of 0x12345678 to its data register.
        let mut engine = Crc32Mpeg2::new();
        assert_eq!(engine.checksum(&0x1234_5678u32.to_le_bytes()), 0xDF8A_8A2B);
    }

    #[test]
    fn test_empty_input_is_init_value() {
        assert_eq!(Crc32Mpeg2.checksum(&[]), 0xFFFF_FFFF);
    }

    #[test]
    fn test_word_byte_order() {
        let mut engine = Crc32Mpeg2::new();
        let bytes = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let swapped = [0x04, 0x03, 0x02, 0x01, 0x08, 0x07, 0x06, 0x05];
        assert_eq!(engine.checksum(&bytes), CRC32_MPEG2.checksum(&swapped));
    }

    #[test]
    fn test_partial_word_is_zero_padded() {
        let mut engine = Crc32Mpeg2::new();
        assert_eq!(
            engine.checksum(&[0xAB, 0xCD]),
            engine.checksum(&[0xAB, 0xCD, 0x00, 0x00])
        );
    }

    #[test]
    fn test_erased_record_body() {
        // Two erased words: the first cancels the init value
        let mut engine = Crc32Mpeg2::new();
        assert_eq!(engine.checksum(&[0xFF; 4]), 0);
        assert_eq!(engine.checksum(&[0xFF; 8]), 0xC704_DD7B);
    }

    #[test]
    fn test_detects_single_bit_flip() {
        let mut engine = Crc32Mpeg2::new();
        let data = [0x01, 0x00, 0x00, 0x00, 0x01, 0x05, 0x00, 0x00];
        let crc = engine.checksum(&data);

        for byte in 0..data.len() {
            for bit in 0..8 {
                let mut corrupted = data;
                corrupted[byte] ^= 1 << bit;
                assert_ne!(engine.checksum(&corrupted), crc);
            }
        }
    }
}
