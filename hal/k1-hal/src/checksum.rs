//! Checksum engine abstraction
//!
//! The settings image is protected by a 32-bit code. Whatever produces it
//! (a software table or the MCU's CRC unit) must give the same answer on the
//! write path and on the verify path, for the whole lifetime of the on-flash
//! format.

/// 32-bit checksum engine
///
/// Takes `&mut self` because hardware engines are stateful peripherals that
/// have to be reset and fed. Implementations must still be deterministic:
/// equal input, equal output.
pub trait ChecksumEngine {
    /// Compute the checksum of `bytes`
    fn checksum(&mut self, bytes: &[u8]) -> u32;
}

impl<T: ChecksumEngine + ?Sized> ChecksumEngine for &mut T {
    fn checksum(&mut self, bytes: &[u8]) -> u32 {
        (**self).checksum(bytes)
    }
}

/// Split a byte span into little-endian words, zero-padding the tail
///
/// Word-oriented engines (the STM32 CRC unit) consume the image this way.
pub fn le_words(bytes: &[u8]) -> impl Iterator<Item = u32> + '_ {
    bytes.chunks(4).map(|chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        u32::from_le_bytes(word)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_le_words_exact() {
        let bytes = [0x01, 0x00, 0x00, 0x00, 0x78, 0x56, 0x34, 0x12];
        let mut words = le_words(&bytes);
        assert_eq!(words.next(), Some(1));
        assert_eq!(words.next(), Some(0x1234_5678));
        assert_eq!(words.next(), None);
    }

    #[test]
    fn test_le_words_pads_tail() {
        let bytes = [0xAA, 0xBB, 0xCC, 0xDD, 0x01];
        let words: [u32; 2] = {
            let mut it = le_words(&bytes);
            [it.next().unwrap(), it.next().unwrap()]
        };
        assert_eq!(words, [0xDDCC_BBAA, 0x0000_0001]);
    }

    #[test]
    fn test_le_words_empty() {
        assert_eq!(le_words(&[]).count(), 0);
    }
}
