use crate::error::RaidResult;
use crate::layout::bits::Bits;
use crate::layout::scheme::Scheme;
use crate::layout::stripe::raid5::RAID5;
use crate::layout::stripe::traits::translate::Translate;
use crate::retention::array::Array;
use crate::retention::parity::ParityClusters;

impl Translate for RAID5 {
    const SCHEME: Scheme = Scheme::Raid5;

    fn read<const N: usize>(&self, array: &Array<N>, vblk: u64, buf: &mut Bits<N>) -> RaidResult<()> {
        self.0.read(array, vblk, buf)
    }

    fn write<const N: usize>(&self, array: &Array<N>, vblk: u64, buf: &Bits<N>) -> RaidResult<()> {
        self.0.write(array, vblk, buf)
    }

    fn repair<const N: usize>(&self, array: &Array<N>, disk: usize) -> RaidResult<()> {
        self.0.repair(array, disk)
    }

    fn clusters(&self) -> Option<&ParityClusters> {
        Some(self.0.clusters())
    }
}
