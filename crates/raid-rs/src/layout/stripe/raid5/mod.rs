//! RAID5 translator: striping with parity rotating across every disk.

mod translate_impl;

use crate::retention::parity::{ClusterBitmap, ParityArray, ParityPlacement};

/// RotatingParity puts stripe `s`'s parity on disk `s mod N` and its data on
/// the disks that follow, wrapping around.
#[derive(Clone, Copy, Debug, Default)]
pub struct RotatingParity;

impl ParityPlacement for RotatingParity {
    fn parity_disk(&self, stripe: u64, disks: usize) -> usize {
        (stripe % disks as u64) as usize
    }

    fn data_disk(&self, stripe: u64, position: usize, disks: usize) -> usize {
        (self.parity_disk(stripe, disks) + 1 + position) % disks
    }
}

/// RAID5 spreads parity so no single disk absorbs every parity update.
pub struct RAID5(ParityArray<RotatingParity>);

impl RAID5 {
    #[must_use]
    pub fn new(cluster_size: u64, loaded: ClusterBitmap) -> Self {
        Self(ParityArray::new(RotatingParity, cluster_size, loaded))
    }

    #[cfg(test)]
    pub(crate) const fn parity(&self) -> &ParityArray<RotatingParity> {
        &self.0
    }
}
