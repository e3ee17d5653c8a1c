//! Scheme translators and the tagged layout that dispatches between them.

pub mod raid0;
pub mod raid01;
pub mod raid1;
pub mod raid4;
pub mod raid5;
pub mod traits;


use crate::error::RaidResult;
use crate::layout::bits::Bits;
use crate::layout::scheme::Scheme;
use crate::layout::stripe::raid0::RAID0;
use crate::layout::stripe::raid01::RAID01;
use crate::layout::stripe::raid1::RAID1;
use crate::layout::stripe::raid4::RAID4;
use crate::layout::stripe::raid5::RAID5;
use crate::layout::stripe::traits::translate::Translate;
use crate::retention::array::Array;
use crate::retention::parity::{ClusterBitmap, ParityClusters};

/// Layout is the active scheme together with its coordination state.
/// Rebuilding it discards every pair and cluster of the previous scheme.
pub enum Layout {
    Raid0(RAID0),
    Raid1(RAID1),
    Raid01(RAID01),
    Raid4(RAID4),
    Raid5(RAID5),
}

impl Layout {
    /// `build` wires up `scheme` over `disks` disks. Parity schemes start from
    /// `loaded`; the bitmap is ignored otherwise.
    #[must_use]
    pub fn build(scheme: Scheme, disks: usize, cluster_size: u64, loaded: ClusterBitmap) -> Self {
        match scheme {
            Scheme::Raid0 => Self::Raid0(RAID0),
            Scheme::Raid1 => Self::Raid1(RAID1::new(disks)),
            Scheme::Raid01 => Self::Raid01(RAID01::new(disks)),
            Scheme::Raid4 => Self::Raid4(RAID4::new(cluster_size, loaded)),
            Scheme::Raid5 => Self::Raid5(RAID5::new(cluster_size, loaded)),
        }
    }

    #[must_use]
    pub const fn scheme(&self) -> Scheme {
        match self {
            Self::Raid0(_) => RAID0::SCHEME,
            Self::Raid1(_) => RAID1::SCHEME,
            Self::Raid01(_) => RAID01::SCHEME,
            Self::Raid4(_) => RAID4::SCHEME,
            Self::Raid5(_) => RAID5::SCHEME,
        }
    }

    /// # Errors
    /// Returns the translator's error when no path can serve the block.
    pub fn read<const N: usize>(
        &self,
        array: &Array<N>,
        vblk: u64,
        buf: &mut Bits<N>,
    ) -> RaidResult<()> {
        match self {
            Self::Raid0(t) => t.read(array, vblk, buf),
            Self::Raid1(t) => t.read(array, vblk, buf),
            Self::Raid01(t) => t.read(array, vblk, buf),
            Self::Raid4(t) => t.read(array, vblk, buf),
            Self::Raid5(t) => t.read(array, vblk, buf),
        }
    }

    /// # Errors
    /// Returns the translator's error when no path can take the block.
    pub fn write<const N: usize>(&self, array: &Array<N>, vblk: u64, buf: &Bits<N>) -> RaidResult<()> {
        match self {
            Self::Raid0(t) => t.write(array, vblk, buf),
            Self::Raid1(t) => t.write(array, vblk, buf),
            Self::Raid01(t) => t.write(array, vblk, buf),
            Self::Raid4(t) => t.write(array, vblk, buf),
            Self::Raid5(t) => t.write(array, vblk, buf),
        }
    }

    /// # Errors
    /// Returns the translator's error when the disk cannot be rebuilt.
    pub fn repair<const N: usize>(&self, array: &Array<N>, disk: usize) -> RaidResult<()> {
        match self {
            Self::Raid0(t) => t.repair(array, disk),
            Self::Raid1(t) => t.repair(array, disk),
            Self::Raid01(t) => t.repair(array, disk),
            Self::Raid4(t) => t.repair(array, disk),
            Self::Raid5(t) => t.repair(array, disk),
        }
    }

    #[must_use]
    pub fn clusters(&self) -> Option<&ParityClusters> {
        match self {
            Self::Raid0(t) => t.clusters(),
            Self::Raid1(t) => t.clusters(),
            Self::Raid01(t) => t.clusters(),
            Self::Raid4(t) => t.clusters(),
            Self::Raid5(t) => t.clusters(),
        }
    }
}
