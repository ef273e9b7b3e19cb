//! Settings error kinds and their combination rule

use k1_hal::FlashError;

/// Settings persistence errors
///
/// Variants are declared in ascending severity. When two outcomes are
/// combined (both slot writes of a setter, both slot reads of a load) the
/// more severe error is kept, see [`SettingsError::worst`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingsError {
    /// Condition not otherwise classified
    Unknown,
    /// Item index is not below the number of items on the device
    IndexOutOfRange,
    /// Stored format version differs from [`SETTINGS_VERSION`](super::SETTINGS_VERSION)
    VersionMismatch,
    /// Stored checksum differs from the recomputed one
    ChecksumMismatch,
    /// Unlock, erase, program, read or post-write verification failed
    StorageFailure,
    /// The store was built without a checksum engine
    MissingChecksumEngine,
}

impl SettingsError {
    /// Keep the more severe of two errors
    pub fn worst(self, other: Self) -> Self {
        self.max(other)
    }
}

impl From<FlashError> for SettingsError {
    fn from(_: FlashError) -> Self {
        SettingsError::StorageFailure
    }
}

/// Combine two outcomes: success only if both succeeded, otherwise the
/// more severe error
pub fn combine(
    first: Result<(), SettingsError>,
    second: Result<(), SettingsError>,
) -> Result<(), SettingsError> {
    match (first, second) {
        (Ok(()), Ok(())) => Ok(()),
        (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
        (Err(a), Err(b)) => Err(a.worst(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_outranks_version() {
        assert_eq!(
            SettingsError::VersionMismatch.worst(SettingsError::ChecksumMismatch),
            SettingsError::ChecksumMismatch
        );
        assert_eq!(
            SettingsError::ChecksumMismatch.worst(SettingsError::VersionMismatch),
            SettingsError::ChecksumMismatch
        );
    }

    #[test]
    fn test_storage_outranks_validation() {
        assert_eq!(
            SettingsError::ChecksumMismatch.worst(SettingsError::StorageFailure),
            SettingsError::StorageFailure
        );
    }

    #[test]
    fn test_combine() {
        assert_eq!(combine(Ok(()), Ok(())), Ok(()));
        assert_eq!(
            combine(Err(SettingsError::StorageFailure), Ok(())),
            Err(SettingsError::StorageFailure)
        );
        assert_eq!(
            combine(Ok(()), Err(SettingsError::StorageFailure)),
            Err(SettingsError::StorageFailure)
        );
        assert_eq!(
            combine(
                Err(SettingsError::Unknown),
                Err(SettingsError::MissingChecksumEngine)
            ),
            Err(SettingsError::MissingChecksumEngine)
        );
    }

    #[test]
    fn test_flash_errors_are_storage_failures() {
        for e in [
            FlashError::Locked,
            FlashError::Erase,
            FlashError::Program,
            FlashError::Read,
            FlashError::OutOfBounds,
            FlashError::Alignment,
        ] {
            assert_eq!(SettingsError::from(e), SettingsError::StorageFailure);
        }
    }
}
