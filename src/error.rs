//! Error taxonomy shared by the sizer, the storage core and the cursors.

/// Broad class of an [`Error`], mirroring the failure categories callers
/// usually branch on.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// A caller-supplied argument was unusable (size, duplicate key, buffer space).
    InvalidArgument,
    /// A buffer offset fell outside the buffer.
    OutOfRange,
    /// A lookup that requires presence found nothing.
    KeyNotFound,
    /// A cursor was used outside its valid window.
    InvalidOperation,
}

/// Errors returned by map, sizer and cursor operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A table size below zero was requested.
    #[error("table size must not be negative, got {0}")]
    NegativeSize(i32),
    /// The requested table size cannot be represented.
    #[error("requested capacity {requested} exceeds the maximum table length")]
    CapacityOverflow {
        /// Capacity the caller asked for.
        requested: usize,
    },
    /// `add` was called with a key that is already present.
    #[error("an entry with the same key already exists")]
    DuplicateKey,
    /// The export buffer cannot hold every live entry.
    #[error("buffer has room for {available} entries but {needed} are required")]
    InsufficientSpace {
        /// Live entries to export.
        needed: usize,
        /// Slots remaining after the start offset.
        available: usize,
    },
    /// The export offset lies beyond the buffer.
    #[error("index {index} is out of range for a buffer of length {len}")]
    OutOfRange {
        /// Offset supplied by the caller.
        index: usize,
        /// Buffer length.
        len: usize,
    },
    /// The key is not present in the map.
    #[error("the given key was not present in the map")]
    KeyNotFound,
    /// The map was modified after the cursor captured its version.
    #[error("map was modified; enumeration operation may not execute")]
    VersionMismatch,
    /// The cursor is positioned before the first element or after the last.
    #[error("enumeration has either not started or has already finished")]
    NoCurrent,
    /// The cursor was created by a different map.
    #[error("cursor does not belong to this map")]
    WrongMap,
}

impl Error {
    /// The broad category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NegativeSize(_)
            | Error::CapacityOverflow { .. }
            | Error::DuplicateKey
            | Error::InsufficientSpace { .. } => ErrorKind::InvalidArgument,
            Error::OutOfRange { .. } => ErrorKind::OutOfRange,
            Error::KeyNotFound => ErrorKind::KeyNotFound,
            Error::VersionMismatch | Error::NoCurrent | Error::WrongMap => {
                ErrorKind::InvalidOperation
            }
        }
    }
}
