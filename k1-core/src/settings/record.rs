//! Configuration record and its flash image
//!
//! Image layout, all integers little-endian:
//!
//! ```text
//! ┌─────────┬─────────────┬──────────────┬─────────┬──────────┐
//! │ VERSION │ DEVICE_TYPE │ ADDRESSES    │ PADDING │ CHECKSUM │
//! │ 4B      │ 1B          │ N bytes      │ 0-3B    │ 4B       │
//! └─────────┴─────────────┴──────────────┴─────────┴──────────┘
//! ```
//!
//! Padding is zero and brings the body to a word boundary. The checksum
//! covers every byte before it, padding included.

use k1_hal::checksum::ChecksumEngine;
use k1_hal::WORD_SIZE;

use super::error::SettingsError;

/// Current format version of the settings image
pub const SETTINGS_VERSION: u32 = 1;

/// Largest number of bus items a single device may carry
pub const MAX_ITEMS: usize = 8;

/// Image length for the largest supported device
pub const MAX_IMAGE_LEN: usize = image_len(MAX_ITEMS);

/// Broadcast request address, never assigned to an item
pub const ADDR_BROADCAST: u8 = 0x00;
/// Lowest assignable bus address
pub const ADDR_MIN: u8 = 0x01;
/// Highest assignable bus address
pub const ADDR_MAX: u8 = 0xFE;
/// Address of the fire panel
pub const ADDR_PANEL: u8 = 0xFF;

const VERSION_OFFSET: usize = 0;
const DEVICE_TYPE_OFFSET: usize = 4;
const ADDRESSES_OFFSET: usize = 5;

/// Serialized image length for a device with `items` bus items
pub const fn image_len(items: usize) -> usize {
    let body = ADDRESSES_OFFSET + items;
    let padded = body.div_ceil(WORD_SIZE) * WORD_SIZE;
    padded + WORD_SIZE
}

/// Kind of field device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DeviceType {
    Undefined = 0,
    SmokeDetector = 1,
    HeatDetector = 2,
    SmokeHeatDetector = 3,
    /// Address label, 2 inputs
    AddressLabel2 = 4,
    /// Address label, 6 inputs
    AddressLabel6 = 5,
    ValveControlModule = 6,
    /// Relay module, 2 supervised outputs
    RelayModule2R = 7,
    /// Relay module, 6 supervised outputs
    RelayModule6R = 8,
    ShortCircuitIsolator = 9,
    /// Combined buzzer and light indicator
    SounderBeacon = 10,
    ExitSign = 11,
    /// Remote start of fire suppression
    FireSuppressionStart = 12,
    /// Remote start of smoke exhaust
    SmokeExhaustStart = 13,
    ManualCallPoint = 14,
    FanControlCabinet = 15,
    ValveActuatorCabinet = 16,
    AddressModule5 = 17,
    RelayModule2 = 18,
    RelayModule6 = 19,
    MagneticContact = 20,
    PowerSupply = 21,
    MotionSensor = 22,
}

impl DeviceType {
    /// Get the device type as a byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Create a device type from a byte value
    pub fn from_u8(value: u8) -> Option<Self> {
        use DeviceType::*;
        const ALL: [DeviceType; 23] = [
            Undefined,
            SmokeDetector,
            HeatDetector,
            SmokeHeatDetector,
            AddressLabel2,
            AddressLabel6,
            ValveControlModule,
            RelayModule2R,
            RelayModule6R,
            ShortCircuitIsolator,
            SounderBeacon,
            ExitSign,
            FireSuppressionStart,
            SmokeExhaustStart,
            ManualCallPoint,
            FanControlCabinet,
            ValveActuatorCabinet,
            AddressModule5,
            RelayModule2,
            RelayModule6,
            MagneticContact,
            PowerSupply,
            MotionSensor,
        ];
        ALL.get(value as usize).copied()
    }
}

/// Configuration record of a device with `N` bus items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Settings<const N: usize> {
    /// Format version of the image this record came from
    pub version: u32,
    /// Raw [`DeviceType`] code
    pub device_type: u8,
    /// Bus address of each item
    pub addresses: [u8; N],
    /// Checksum over the image body
    pub checksum: u32,
}

impl<const N: usize> Default for Settings<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Settings<N> {
    /// Length of the serialized image
    pub const IMAGE_LEN: usize = image_len(N);

    /// Offset of the checksum word, equal to the checksummed body length
    pub const CHECKSUM_OFFSET: usize = Self::IMAGE_LEN - WORD_SIZE;

    const ITEMS_SUPPORTED: () = assert!(N > 0 && N <= MAX_ITEMS, "unsupported item count");

    /// Create a default record: current version, undefined type, no addresses
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::ITEMS_SUPPORTED;
        Self {
            version: SETTINGS_VERSION,
            device_type: DeviceType::Undefined as u8,
            addresses: [ADDR_BROADCAST; N],
            checksum: 0,
        }
    }

    /// Device type, if the stored code is a known one
    pub fn kind(&self) -> Option<DeviceType> {
        DeviceType::from_u8(self.device_type)
    }

    /// Serialize into `image`, including the stored checksum
    ///
    /// `image` must be exactly [`Self::IMAGE_LEN`] bytes.
    pub fn encode(&self, image: &mut [u8]) {
        debug_assert_eq!(image.len(), Self::IMAGE_LEN);
        image.fill(0);
        image[VERSION_OFFSET..VERSION_OFFSET + 4].copy_from_slice(&self.version.to_le_bytes());
        image[DEVICE_TYPE_OFFSET] = self.device_type;
        image[ADDRESSES_OFFSET..ADDRESSES_OFFSET + N].copy_from_slice(&self.addresses);
        image[Self::CHECKSUM_OFFSET..].copy_from_slice(&self.checksum.to_le_bytes());
    }

    /// Deserialize from `image` without validating it
    ///
    /// `image` must be exactly [`Self::IMAGE_LEN`] bytes. Padding bytes are
    /// ignored here; they are covered by [`Self::verify`].
    pub fn decode(image: &[u8]) -> Self {
        debug_assert_eq!(image.len(), Self::IMAGE_LEN);
        let mut addresses = [0u8; N];
        addresses.copy_from_slice(&image[ADDRESSES_OFFSET..ADDRESSES_OFFSET + N]);
        Self {
            version: read_u32(image, VERSION_OFFSET),
            device_type: image[DEVICE_TYPE_OFFSET],
            addresses,
            checksum: read_u32(image, Self::CHECKSUM_OFFSET),
        }
    }

    /// Recompute the checksum, store it, and serialize into `image`
    pub fn seal<C: ChecksumEngine>(&mut self, engine: &mut C, image: &mut [u8]) {
        self.encode(image);
        self.checksum = engine.checksum(&image[..Self::CHECKSUM_OFFSET]);
        image[Self::CHECKSUM_OFFSET..].copy_from_slice(&self.checksum.to_le_bytes());
    }

    /// Validate a raw image this record was decoded from
    ///
    /// The checksum is recomputed over the raw body, so corruption in the
    /// padding is caught as well. Checksum is checked before version.
    pub fn verify<C: ChecksumEngine>(
        &self,
        engine: &mut C,
        image: &[u8],
    ) -> Result<(), SettingsError> {
        if engine.checksum(&image[..Self::CHECKSUM_OFFSET]) != self.checksum {
            return Err(SettingsError::ChecksumMismatch);
        }
        if self.version != SETTINGS_VERSION {
            return Err(SettingsError::VersionMismatch);
        }
        Ok(())
    }
}

fn read_u32(image: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&image[offset..offset + 4]);
    u32::from_le_bytes(word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::Crc32Mpeg2;

    #[test]
    fn test_image_len_is_word_multiple() {
        assert_eq!(image_len(1), 12);
        assert_eq!(image_len(3), 12);
        assert_eq!(image_len(4), 16);
        assert_eq!(image_len(8), 20);
        for items in 1..=MAX_ITEMS {
            assert_eq!(image_len(items) % WORD_SIZE, 0);
        }
        assert_eq!(Settings::<1>::CHECKSUM_OFFSET, 8);
    }

    #[test]
    fn test_default_record() {
        let settings = Settings::<2>::default();
        assert_eq!(settings.version, SETTINGS_VERSION);
        assert_eq!(settings.kind(), Some(DeviceType::Undefined));
        assert_eq!(settings.addresses, [0, 0]);
    }

    #[test]
    fn test_layout() {
        let settings = Settings::<1> {
            version: 1,
            device_type: DeviceType::SmokeDetector.as_u8(),
            addresses: [5],
            checksum: 0xB3F5_2116,
        };
        let mut image = [0xEEu8; 12];
        settings.encode(&mut image);
        assert_eq!(
            image,
            [0x01, 0x00, 0x00, 0x00, 0x01, 0x05, 0x00, 0x00, 0x16, 0x21, 0xF5, 0xB3]
        );
    }

    #[test]
    fn test_seal_then_verify() {
        let mut engine = Crc32Mpeg2::new();
        let mut settings = Settings::<1>::new();
        settings.device_type = DeviceType::SmokeDetector.as_u8();
        settings.addresses = [5];

        let mut image = [0u8; 12];
        settings.seal(&mut engine, &mut image);
        assert_eq!(settings.checksum, 0xB3F5_2116);

        let decoded = Settings::<1>::decode(&image);
        assert_eq!(decoded, settings);
        assert_eq!(decoded.verify(&mut engine, &image), Ok(()));
    }

    #[test]
    fn test_verify_detects_padding_corruption() {
        let mut engine = Crc32Mpeg2::new();
        let mut settings = Settings::<1>::new();
        let mut image = [0u8; 12];
        settings.seal(&mut engine, &mut image);

        image[7] ^= 0x80;
        let decoded = Settings::<1>::decode(&image);
        assert_eq!(decoded, settings);
        assert_eq!(
            decoded.verify(&mut engine, &image),
            Err(SettingsError::ChecksumMismatch)
        );
    }

    #[test]
    fn test_verify_version_mismatch() {
        let mut engine = Crc32Mpeg2::new();
        let mut settings = Settings::<1>::new();
        settings.version = SETTINGS_VERSION + 1;
        let mut image = [0u8; 12];
        settings.seal(&mut engine, &mut image);

        let decoded = Settings::<1>::decode(&image);
        assert_eq!(
            decoded.verify(&mut engine, &image),
            Err(SettingsError::VersionMismatch)
        );
    }

    #[test]
    fn test_erased_image_is_invalid() {
        let mut engine = Crc32Mpeg2::new();
        let image = [0xFFu8; 12];
        let decoded = Settings::<1>::decode(&image);
        assert_eq!(
            decoded.verify(&mut engine, &image),
            Err(SettingsError::ChecksumMismatch)
        );
    }

    #[test]
    fn test_device_type_codes() {
        assert_eq!(DeviceType::from_u8(0), Some(DeviceType::Undefined));
        assert_eq!(DeviceType::from_u8(14), Some(DeviceType::ManualCallPoint));
        assert_eq!(DeviceType::from_u8(22), Some(DeviceType::MotionSensor));
        assert_eq!(DeviceType::from_u8(23), None);
        for code in 0..=22u8 {
            assert_eq!(DeviceType::from_u8(code).map(DeviceType::as_u8), Some(code));
        }
    }
}
