//! Translate trait: virtual block addressing and redundancy for one scheme.

use crate::error::RaidResult;
use crate::layout::bits::Bits;
use crate::layout::scheme::Scheme;
use crate::retention::array::Array;
use crate::retention::parity::ParityClusters;

/// Translate maps virtual blocks onto physical disks and applies the
/// scheme's redundancy on read, write and repair.
pub trait Translate {
    /// SCHEME is the RAID level implemented by the translator.
    const SCHEME: Scheme;

    /// read fills `buf` with virtual block `vblk`.
    ///
    /// # Arguments
    /// * `array` - The disks backing the scheme.
    /// * `vblk` - Virtual block index, already range-checked.
    /// * `buf` - Output block.
    ///
    /// # Errors
    /// Returns an error if no redundant path can serve the block.
    fn read<const N: usize>(&self, array: &Array<N>, vblk: u64, buf: &mut Bits<N>)
    -> RaidResult<()>;

    /// write stores `buf` as virtual block `vblk`.
    ///
    /// # Errors
    /// Returns an error if no redundant path can take the block.
    fn write<const N: usize>(&self, array: &Array<N>, vblk: u64, buf: &Bits<N>) -> RaidResult<()>;

    /// repair resynchronizes failed disk index `disk` and marks it valid.
    ///
    /// # Errors
    /// Returns an error if the scheme has no surviving copy to rebuild from.
    fn repair<const N: usize>(&self, array: &Array<N>, disk: usize) -> RaidResult<()>;

    /// clusters exposes lazy parity state for parity schemes.
    fn clusters(&self) -> Option<&ParityClusters> {
        None
    }
}
