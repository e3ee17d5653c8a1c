//! Error taxonomy for the RAID engine.

use thiserror::Error;

use crate::layout::scheme::Scheme;

/// RAID engine error.
#[derive(Error, Debug)]
pub enum RaidError {
    /// Scheme id is not one of the supported schemes.
    #[error("invalid RAID scheme id: {0}")]
    InvalidScheme(u8),

    /// The array has fewer disks than the scheme needs.
    #[error("{scheme} needs at least {needed} disks, array has {have}")]
    TooFewDisks {
        scheme: Scheme,
        needed: usize,
        have: usize,
    },

    /// A parity scheme was selected while its parity disk is failed.
    #[error("parity disk {disk} is not valid")]
    ParityUnavailable { disk: u32 },

    /// Virtual block outside the array capacity.
    #[error("block {block} is outside capacity {capacity}")]
    OutOfRange { block: u64, capacity: u64 },

    /// The disk holding the request has failed and nothing can stand in for it.
    #[error("disk {disk} is unavailable")]
    DiskUnavailable { disk: u32 },

    /// Both members of a mirror pair are failed.
    #[error("mirror pair {pair} has no valid member")]
    PairUnavailable { pair: usize },

    /// More disks are failed than the scheme tolerates.
    #[error("more disks failed than the scheme tolerates")]
    MultipleFailures,

    /// Disk id outside `[1, N]`.
    #[error("invalid disk id: {0}")]
    InvalidDiskId(u32),

    /// Operation needs an active scheme.
    #[error("no RAID scheme has been initialized")]
    NotInitialized,

    /// Request issued while no scheme is active.
    #[error("array is unavailable")]
    Unavailable,

    /// The array carries the destroyed marker.
    #[error("RAID structure was destroyed")]
    Destroyed,

    /// Metadata block could not be decoded.
    #[error("corrupt metadata: {0}")]
    CorruptMetadata(String),

    /// Devices or settings do not fit together.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error from a block device.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RaidError {
    /// Status code in the `0` / `-1` convention of the engine-facing API.
    #[must_use]
    pub const fn status(&self) -> i32 {
        -1
    }
}

/// Result type for RAID operations.
pub type RaidResult<T> = Result<T, RaidError>;

/// `status_of` collapses a result into the `0` / `-1` return convention.
pub fn status_of<T>(res: &RaidResult<T>) -> i32 {
    match res {
        Ok(_) => 0,
        Err(e) => e.status(),
    }
}
