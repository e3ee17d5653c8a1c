use crate::error::{RaidError, RaidResult};
use crate::layout::bits::Bits;
use crate::layout::scheme::Scheme;
use crate::layout::stripe::raid1::RAID1;
use crate::layout::stripe::traits::translate::Translate;
use crate::retention::array::Array;
use crate::retention::mirror::MirrorPair;

impl RAID1 {
    fn pair_for<const N: usize>(&self, array: &Array<N>, vblk: u64) -> RaidResult<(&MirrorPair, u64)> {
        let (pair, block) = Self::locate(vblk, array.disk_blocks());
        self.pairs
            .get(pair)
            .map(|p| (p, block))
            .ok_or(RaidError::OutOfRange {
                block: vblk,
                capacity: array.disk_blocks() * self.pairs.len() as u64,
            })
    }
}

impl Translate for RAID1 {
    const SCHEME: Scheme = Scheme::Raid1;

    fn read<const N: usize>(&self, array: &Array<N>, vblk: u64, buf: &mut Bits<N>) -> RaidResult<()> {
        let (pair, block) = self.pair_for(array, vblk)?;
        pair.read(array, block, buf)
    }

    fn write<const N: usize>(&self, array: &Array<N>, vblk: u64, buf: &Bits<N>) -> RaidResult<()> {
        let (pair, block) = self.pair_for(array, vblk)?;
        pair.write(array, block, buf)
    }

    fn repair<const N: usize>(&self, array: &Array<N>, disk: usize) -> RaidResult<()> {
        let pair = self
            .pairs
            .get(disk / 2)
            .ok_or(RaidError::InvalidDiskId(array.disk_id(disk)))?;
        pair.resync(array, disk)
    }
}
