use tracing::info;

use crate::error::RaidResult;
use crate::layout::bits::Bits;
use crate::layout::scheme::Scheme;
use crate::layout::stripe::raid01::RAID01;
use crate::layout::stripe::traits::translate::Translate;
use crate::retention::array::Array;

impl Translate for RAID01 {
    const SCHEME: Scheme = Scheme::Raid01;

    fn read<const N: usize>(&self, array: &Array<N>, vblk: u64, buf: &mut Bits<N>) -> RaidResult<()> {
        let (pair, block) = Self::locate(vblk, self.pairs.len());
        self.pairs[pair].read(array, block, buf)
    }

    fn write<const N: usize>(&self, array: &Array<N>, vblk: u64, buf: &Bits<N>) -> RaidResult<()> {
        let (pair, block) = Self::locate(vblk, self.pairs.len());
        self.pairs[pair].write(array, block, buf)
    }

    fn repair<const N: usize>(&self, array: &Array<N>, disk: usize) -> RaidResult<()> {
        match self.pair_of(disk) {
            Some(pair) => pair.resync(array, disk),
            None => {
                info!(disk = array.disk_id(disk), "spare disk holds no data, marking valid");
                array.set_valid(disk, true);
                Ok(())
            }
        }
    }
}
