//! Dual-slot settings store
//!
//! Keeps the single in-memory [`Settings`] record and two copies of its
//! image in flash. Loading reconciles the copies and heals whichever one is
//! stale or broken; every setter rewrites both.
//!
//! # Load
//!
//! ```text
//! read Main ── valid ──► rewrite Spare ──► Ok(Main)
//!    │
//!  invalid
//!    ▼
//! read Spare ── valid ──► rewrite Main ──► Ok(Spare)
//!    │
//!  invalid
//!    ▼
//! reset to defaults ──► Err(worst of both)
//! ```
//!
//! Main is always read before Spare and written before Spare. A reset
//! between the two writes of a setter leaves the copies divergent; the next
//! load keeps Main and resyncs Spare from it.

use k1_hal::checksum::ChecksumEngine;
use k1_hal::flash::BlockStorage;

use super::error::{combine, SettingsError};
use super::record::{Settings, MAX_IMAGE_LEN};
use super::slot::{Slot, SlotLayout};

/// Owner of the in-memory settings record and its flash copies
///
/// Operations block until flash work completes. The store is not shared:
/// setters take `&mut self`, and the firmware keeps it inside one task.
pub struct SettingsStore<S, C, const N: usize> {
    storage: S,
    checksum: Option<C>,
    layout: SlotLayout,
    settings: Settings<N>,
    loaded_from: Option<Slot>,
}

impl<S, C, const N: usize> SettingsStore<S, C, N>
where
    S: BlockStorage,
    C: ChecksumEngine,
{
    /// Create a store holding a default record
    ///
    /// `checksum` may be `None` when the engine could not be brought up;
    /// every operation that touches flash then fails with
    /// [`SettingsError::MissingChecksumEngine`].
    pub fn new(storage: S, checksum: Option<C>, layout: SlotLayout) -> Self {
        Self {
            storage,
            checksum,
            layout,
            settings: Settings::new(),
            loaded_from: None,
        }
    }

    /// Load the record from flash, repairing the other copy
    ///
    /// Returns the slot the record came from. When the repair write fails
    /// the record is still loaded, [`Self::loaded_from`] reports its source,
    /// and the write error is returned. When neither copy is valid the
    /// record is reset to defaults and the more severe of the two read
    /// errors is returned.
    pub fn load(&mut self) -> Result<Slot, SettingsError> {
        if self.checksum.is_none() {
            return Err(SettingsError::MissingChecksumEngine);
        }
        self.loaded_from = None;

        let main_err = match self.read(Slot::Main) {
            Ok(()) => return self.adopt(Slot::Main),
            Err(e) => e,
        };
        log_warn!("Main settings copy invalid: {:?}", main_err);

        let spare_err = match self.read(Slot::Spare) {
            Ok(()) => return self.adopt(Slot::Spare),
            Err(e) => e,
        };
        log_warn!("Spare settings copy invalid: {:?}", spare_err);

        self.settings = Settings::new();
        Err(main_err.worst(spare_err))
    }

    /// Serialize the record into `slot`, then read it back and compare
    ///
    /// A layout whose slots are unaligned, share an erase block, or are
    /// smaller than the image is refused with `StorageFailure` before
    /// anything is erased.
    pub fn write(&mut self, slot: Slot) -> Result<(), SettingsError> {
        let engine = self
            .checksum
            .as_mut()
            .ok_or(SettingsError::MissingChecksumEngine)?;

        if !self
            .layout
            .fits(self.storage.block_size(), Settings::<N>::IMAGE_LEN)
        {
            log_warn!("Settings slot layout does not fit the flash blocks: {:?}", self.layout);
            return Err(SettingsError::StorageFailure);
        }

        let mut buffer = [0u8; MAX_IMAGE_LEN];
        let image = &mut buffer[..Settings::<N>::IMAGE_LEN];
        self.settings.version = super::SETTINGS_VERSION;
        self.settings.seal(engine, image);

        let base = self.layout.address(slot);
        if let Err(e) = self.storage.unlock() {
            log_warn!("Flash unlock failed for {:?}: {:?}", slot, e);
            return Err(e.into());
        }
        let programmed = Self::erase_and_program(&mut self.storage, base, image);
        let locked = self.storage.lock();
        if let Err(e) = programmed.and(locked) {
            log_warn!("Writing {:?} settings copy failed: {:?}", slot, e);
            return Err(e.into());
        }

        let mut readback = [0u8; MAX_IMAGE_LEN];
        let readback = &mut readback[..Settings::<N>::IMAGE_LEN];
        self.storage.read(base, readback)?;
        if readback != image {
            log_warn!("{:?} settings copy failed verification", slot);
            return Err(SettingsError::StorageFailure);
        }

        log_debug!("Wrote {} bytes to {:?} settings copy", image.len(), slot);
        Ok(())
    }

    /// Raw device type code
    pub fn device_type(&self) -> u8 {
        self.settings.device_type
    }

    /// Bus address of item `index`
    ///
    /// An out-of-range index yields the address of item 0.
    pub fn address(&self, index: usize) -> u8 {
        self.settings
            .addresses
            .get(index)
            .copied()
            .unwrap_or(self.settings.addresses[0])
    }

    /// All item addresses
    pub fn addresses(&self) -> &[u8; N] {
        &self.settings.addresses
    }

    /// Borrow the in-memory record
    pub fn settings(&self) -> &Settings<N> {
        &self.settings
    }

    /// Slot the last successful load took the record from
    pub fn loaded_from(&self) -> Option<Slot> {
        self.loaded_from
    }

    /// Set the device type and rewrite both copies
    ///
    /// The new value stays in RAM even when a write fails.
    pub fn set_device_type(&mut self, value: u8) -> Result<(), SettingsError> {
        self.settings.device_type = value;
        self.write_both()
    }

    /// Set the address of item `index` and rewrite both copies
    ///
    /// Fails with [`SettingsError::IndexOutOfRange`] without touching flash
    /// when `index >= N`. Otherwise the new value stays in RAM even when a
    /// write fails.
    pub fn set_address(&mut self, value: u8, index: usize) -> Result<(), SettingsError> {
        let slot = self
            .settings
            .addresses
            .get_mut(index)
            .ok_or(SettingsError::IndexOutOfRange)?;
        *slot = value;
        self.write_both()
    }

    /// Give back the storage driver and checksum engine
    pub fn release(self) -> (S, Option<C>) {
        (self.storage, self.checksum)
    }

    fn write_both(&mut self) -> Result<(), SettingsError> {
        let main = self.write(Slot::Main);
        let spare = self.write(Slot::Spare);
        combine(main, spare)
    }

    /// Read `slot` into the record and validate it
    fn read(&mut self, slot: Slot) -> Result<(), SettingsError> {
        let engine = self
            .checksum
            .as_mut()
            .ok_or(SettingsError::MissingChecksumEngine)?;

        let mut buffer = [0u8; MAX_IMAGE_LEN];
        let image = &mut buffer[..Settings::<N>::IMAGE_LEN];
        self.storage.read(self.layout.address(slot), image)?;

        self.settings = Settings::decode(image);
        self.settings.verify(engine, image)
    }

    /// Accept the record just read from `source` and rewrite the other copy
    fn adopt(&mut self, source: Slot) -> Result<Slot, SettingsError> {
        self.loaded_from = Some(source);
        match source {
            Slot::Main => log_debug!("Settings loaded from Main, resyncing Spare"),
            Slot::Spare => log_info!("Settings loaded from Spare, promoting to Main"),
        }
        self.write(source.other())?;
        Ok(source)
    }

    fn erase_and_program(
        storage: &mut S,
        base: u32,
        image: &[u8],
    ) -> Result<(), k1_hal::FlashError> {
        storage.erase_block(base)?;
        for (address, word) in (base..).step_by(4).zip(image.chunks_exact(4)) {
            let value = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
            storage.program_word(address, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::Crc32Mpeg2;
    use crate::settings::record::{DeviceType, SETTINGS_VERSION};
    use k1_hal::mock::MockFlash;
    use proptest::prelude::*;

    const MAIN: u32 = 0x0800_F800;
    const SPARE: u32 = 0x0800_FC00;
    const PAGE: u32 = 1024;
    const LAYOUT: SlotLayout = SlotLayout::new(MAIN, SPARE);

    type Flash = MockFlash<2048>;
    type Store<'a, const N: usize> = SettingsStore<&'a mut Flash, Crc32Mpeg2, N>;

    fn flash() -> Flash {
        MockFlash::new(MAIN, PAGE)
    }

    fn open<const N: usize>(flash: &mut Flash) -> Store<'_, N> {
        SettingsStore::new(flash, Some(Crc32Mpeg2::new()), LAYOUT)
    }

    /// Build a sealed image for a record
    fn image<const N: usize>(device_type: u8, addresses: [u8; N]) -> [u8; MAX_IMAGE_LEN] {
        let mut settings = Settings::<N>::new();
        settings.device_type = device_type;
        settings.addresses = addresses;
        let mut buffer = [0u8; MAX_IMAGE_LEN];
        settings.seal(&mut Crc32Mpeg2::new(), &mut buffer[..Settings::<N>::IMAGE_LEN]);
        buffer
    }

    fn stage<const N: usize>(flash: &mut Flash, slot: u32, device_type: u8, addresses: [u8; N]) {
        let image = image(device_type, addresses);
        flash.preload(slot, &image[..Settings::<N>::IMAGE_LEN]);
    }

    fn slot_bytes(flash: &Flash, slot: u32) -> &[u8] {
        flash.contents(slot, Settings::<1>::IMAGE_LEN)
    }

    #[test]
    fn test_load_both_valid_identical() {
        let mut flash = flash();
        stage(&mut flash, MAIN, 1, [5]);
        stage(&mut flash, SPARE, 1, [5]);

        let mut store = open::<1>(&mut flash);
        assert_eq!(store.load(), Ok(Slot::Main));
        assert_eq!(store.device_type(), 1);
        assert_eq!(store.address(0), 5);
        assert_eq!(store.loaded_from(), Some(Slot::Main));
        drop(store);

        assert_eq!(slot_bytes(&flash, MAIN), slot_bytes(&flash, SPARE));
        // Spare is rewritten even though it already matched
        assert_eq!(flash.erase_count(), 1);
    }

    #[test]
    fn test_load_promotes_spare_when_main_corrupted() {
        let mut flash = flash();
        stage(&mut flash, MAIN, 1, [5]);
        stage(&mut flash, SPARE, 2, [9]);
        flash.flip_bit(MAIN + 5, 0);

        let mut store = open::<1>(&mut flash);
        assert_eq!(store.load(), Ok(Slot::Spare));
        assert_eq!(store.device_type(), 2);
        assert_eq!(store.address(0), 9);
        drop(store);

        assert_eq!(slot_bytes(&flash, MAIN), slot_bytes(&flash, SPARE));
        assert_eq!(slot_bytes(&flash, MAIN), &image(2, [9u8])[..12]);
    }

    #[test]
    fn test_load_prefers_main_when_both_valid_but_different() {
        let mut flash = flash();
        stage(&mut flash, MAIN, 3, [10]);
        stage(&mut flash, SPARE, 4, [20]);

        let mut store = open::<1>(&mut flash);
        assert_eq!(store.load(), Ok(Slot::Main));
        assert_eq!(store.device_type(), 3);
        assert_eq!(store.address(0), 10);
        drop(store);

        assert_eq!(slot_bytes(&flash, SPARE), &image(3, [10u8])[..12]);
    }

    #[test]
    fn test_load_erased_flash_fails_and_resets() {
        let mut flash = flash();
        let mut store = open::<1>(&mut flash);

        let result = store.load();
        assert!(matches!(
            result,
            Err(SettingsError::ChecksumMismatch) | Err(SettingsError::VersionMismatch)
        ));
        assert_eq!(store.settings(), &Settings::<1>::new());
        assert_eq!(store.loaded_from(), None);
        drop(store);

        assert_eq!(flash.erase_count(), 0);
        assert_eq!(flash.program_count(), 0);
    }

    #[test]
    fn test_load_checksum_failure_outranks_version_failure() {
        let mut flash = flash();

        // Main: valid checksum over a future format version
        let mut future = Settings::<1>::new();
        future.version = SETTINGS_VERSION + 1;
        let mut buffer = [0u8; 12];
        future.seal(&mut Crc32Mpeg2::new(), &mut buffer);
        flash.preload(MAIN, &buffer);
        // Spare: erased

        let mut store = open::<1>(&mut flash);
        assert_eq!(store.load(), Err(SettingsError::ChecksumMismatch));
    }

    #[test]
    fn test_load_version_mismatch_on_both() {
        let mut flash = flash();
        let mut future = Settings::<1>::new();
        future.version = SETTINGS_VERSION + 1;
        let mut buffer = [0u8; 12];
        future.seal(&mut Crc32Mpeg2::new(), &mut buffer);
        flash.preload(MAIN, &buffer);
        flash.preload(SPARE, &buffer);

        let mut store = open::<1>(&mut flash);
        assert_eq!(store.load(), Err(SettingsError::VersionMismatch));
    }

    #[test]
    fn test_load_without_engine() {
        let mut flash = flash();
        stage(&mut flash, MAIN, 1, [5]);
        let mut store: Store<'_, 1> = SettingsStore::new(&mut flash, None, LAYOUT);

        assert_eq!(store.load(), Err(SettingsError::MissingChecksumEngine));
        assert_eq!(
            store.set_device_type(2),
            Err(SettingsError::MissingChecksumEngine)
        );
        drop(store);
        assert_eq!(flash.erase_count(), 0);
    }

    #[test]
    fn test_load_reports_failed_resync() {
        let mut flash = flash();
        stage(&mut flash, MAIN, 1, [5]);
        flash.set_erase_fails(true);

        let mut store = open::<1>(&mut flash);
        assert_eq!(store.load(), Err(SettingsError::StorageFailure));
        // The record itself was loaded
        assert_eq!(store.loaded_from(), Some(Slot::Main));
        assert_eq!(store.address(0), 5);
    }

    #[test]
    fn test_setters_write_both_slots() {
        let mut flash = flash();
        let mut store = open::<1>(&mut flash);
        let _ = store.load();

        assert_eq!(store.set_device_type(DeviceType::HeatDetector.as_u8()), Ok(()));
        assert_eq!(store.set_address(42, 0), Ok(()));
        drop(store);

        assert_eq!(flash.erase_count(), 4);
        let expected = image(DeviceType::HeatDetector.as_u8(), [42u8]);
        assert_eq!(slot_bytes(&flash, MAIN), &expected[..12]);
        assert_eq!(slot_bytes(&flash, SPARE), &expected[..12]);
        assert!(flash.is_locked());

        let mut reloaded = open::<1>(&mut flash);
        assert_eq!(reloaded.load(), Ok(Slot::Main));
        assert_eq!(reloaded.device_type(), 2);
        assert_eq!(reloaded.address(0), 42);
    }

    #[test]
    fn test_set_address_out_of_range() {
        let mut flash = flash();
        let mut store = open::<2>(&mut flash);

        assert_eq!(store.set_address(7, 2), Err(SettingsError::IndexOutOfRange));
        assert_eq!(store.addresses(), &[0, 0]);
        drop(store);
        assert_eq!(flash.erase_count(), 0);
        assert_eq!(flash.program_count(), 0);
    }

    #[test]
    fn test_address_out_of_range_falls_back_to_first() {
        let mut flash = flash();
        let mut store = open::<2>(&mut flash);
        store.set_address(11, 0).unwrap();
        store.set_address(22, 1).unwrap();

        assert_eq!(store.address(1), 22);
        assert_eq!(store.address(2), 11);
        assert_eq!(store.address(usize::MAX), 11);
    }

    #[test]
    fn test_program_failure_is_storage_failure() {
        let mut flash = flash();
        let mut store = open::<1>(&mut flash);
        store.storage.fail_programs_after(1);

        assert_eq!(store.write(Slot::Main), Err(SettingsError::StorageFailure));
        assert!(store.storage.is_locked());
    }

    #[test]
    fn test_torn_write_caught_by_verification() {
        let mut flash = flash();
        let mut store = open::<1>(&mut flash);
        store.storage.drop_programs_after(2);

        assert_eq!(store.write(Slot::Main), Err(SettingsError::StorageFailure));
    }

    #[test]
    fn test_unlock_failure() {
        let mut flash = flash();
        flash.set_unlock_fails(true);
        let mut store = open::<1>(&mut flash);

        assert_eq!(store.set_device_type(5), Err(SettingsError::StorageFailure));
        // Value is live in RAM even though it was not persisted
        assert_eq!(store.device_type(), 5);
    }

    #[test]
    fn test_setter_reports_single_slot_failure() {
        let mut flash = flash();
        let mut store = open::<1>(&mut flash);
        // Main gets all three words, Spare fails on its first
        store.storage.fail_programs_after(3);

        assert_eq!(store.set_address(8, 0), Err(SettingsError::StorageFailure));
        drop(store);
        assert_eq!(slot_bytes(&flash, MAIN), &image(0, [8u8])[..12]);
    }

    #[test]
    fn test_reset_between_slot_writes_keeps_main() {
        let mut flash = flash();
        {
            let mut store = open::<1>(&mut flash);
            store.set_address(5, 0).unwrap();
        }
        {
            // Power lost after Main was written, before Spare
            let mut store = open::<1>(&mut flash);
            store.load().unwrap();
            store.settings.addresses[0] = 6;
            store.write(Slot::Main).unwrap();
        }
        assert_ne!(slot_bytes(&flash, MAIN), slot_bytes(&flash, SPARE));

        let mut store = open::<1>(&mut flash);
        assert_eq!(store.load(), Ok(Slot::Main));
        assert_eq!(store.address(0), 6);
        drop(store);
        assert_eq!(slot_bytes(&flash, MAIN), slot_bytes(&flash, SPARE));
    }

    #[test]
    fn test_multi_item_device() {
        let mut flash = flash();
        let mut store = open::<6>(&mut flash);
        for item in 0..6 {
            store.set_address(10 + item as u8, item).unwrap();
        }
        drop(store);

        let mut store = open::<6>(&mut flash);
        assert_eq!(store.load(), Ok(Slot::Main));
        assert_eq!(store.addresses(), &[10, 11, 12, 13, 14, 15]);
    }

    #[test]
    fn test_write_refuses_slots_sharing_a_block() {
        let mut flash = flash();
        stage(&mut flash, MAIN, 1, [5]);
        let layout = SlotLayout::new(MAIN, MAIN + PAGE / 2);
        let mut store: Store<'_, 1> =
            SettingsStore::new(&mut flash, Some(Crc32Mpeg2::new()), layout);

        assert_eq!(store.set_device_type(3), Err(SettingsError::StorageFailure));
        drop(store);

        assert_eq!(flash.erase_count(), 0);
        assert_eq!(slot_bytes(&flash, MAIN), &image(1, [5u8])[..12]);
    }

    #[test]
    fn test_write_refuses_unaligned_slot() {
        let mut flash = flash();
        let layout = SlotLayout::new(MAIN + 4, SPARE);
        let mut store: Store<'_, 1> =
            SettingsStore::new(&mut flash, Some(Crc32Mpeg2::new()), layout);

        assert_eq!(store.write(Slot::Main), Err(SettingsError::StorageFailure));
        assert_eq!(store.write(Slot::Spare), Err(SettingsError::StorageFailure));
        drop(store);

        assert_eq!(flash.erase_count(), 0);
    }

    #[test]
    fn test_release_returns_collaborators() {
        let mut flash = flash();
        let store = open::<1>(&mut flash);
        let (_storage, engine) = store.release();
        assert!(engine.is_some());
    }

    proptest! {
        #[test]
        fn prop_set_then_get(device_type in any::<u8>(), address in 1u8..=254, index in 0usize..4) {
            let mut flash = flash();
            let mut store = open::<4>(&mut flash);

            prop_assert_eq!(store.set_device_type(device_type), Ok(()));
            prop_assert_eq!(store.set_address(address, index), Ok(()));
            prop_assert_eq!(store.device_type(), device_type);
            prop_assert_eq!(store.address(index), address);
        }

        #[test]
        fn prop_single_bit_flip_in_spare_with_main_erased_resets(byte in 0usize..12, bit in 0u8..8) {
            let mut flash = flash();
            stage(&mut flash, SPARE, 2, [9]);
            flash.flip_bit(SPARE + byte as u32, bit);

            let mut store = open::<1>(&mut flash);
            prop_assert_eq!(store.load(), Err(SettingsError::ChecksumMismatch));
            prop_assert_eq!(store.settings(), &Settings::new());
            prop_assert_eq!(store.loaded_from(), None);
            drop(store);

            // Neither copy is touched when nothing valid was found
            prop_assert_eq!(flash.erase_count(), 0);
        }

        #[test]
        fn prop_single_bit_flip_invalidates_slot(byte in 0usize..12, bit in 0u8..8) {
            let mut flash = flash();
            stage(&mut flash, MAIN, 1, [5]);
            stage(&mut flash, SPARE, 2, [9]);
            flash.flip_bit(MAIN + byte as u32, bit);

            let mut store = open::<1>(&mut flash);
            prop_assert_eq!(store.load(), Ok(Slot::Spare));
            prop_assert_eq!(store.address(0), 9);
        }
    }
}
