//! RAID4 translator: striping with parity on a dedicated last disk.

mod translate_impl;

use crate::retention::parity::{ClusterBitmap, ParityArray, ParityPlacement};

/// DedicatedParity keeps every stripe's parity on disk `N`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DedicatedParity;

impl ParityPlacement for DedicatedParity {
    fn parity_disk(&self, _stripe: u64, disks: usize) -> usize {
        disks - 1
    }

    fn data_disk(&self, _stripe: u64, position: usize, _disks: usize) -> usize {
        position
    }
}

/// RAID4 stores `N - 1` data blocks and one parity block per stripe.
pub struct RAID4(ParityArray<DedicatedParity>);

impl RAID4 {
    #[must_use]
    pub fn new(cluster_size: u64, loaded: ClusterBitmap) -> Self {
        Self(ParityArray::new(DedicatedParity, cluster_size, loaded))
    }

    #[cfg(test)]
    pub(crate) const fn parity(&self) -> &ParityArray<DedicatedParity> {
        &self.0
    }
}
