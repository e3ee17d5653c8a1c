use crate::error::{RaidError, RaidResult};
use crate::layout::bits::Bits;
use crate::layout::scheme::Scheme;
use crate::layout::stripe::raid0::RAID0;
use crate::layout::stripe::traits::translate::Translate;
use crate::retention::array::Array;

impl Translate for RAID0 {
    const SCHEME: Scheme = Scheme::Raid0;

    fn read<const N: usize>(&self, array: &Array<N>, vblk: u64, buf: &mut Bits<N>) -> RaidResult<()> {
        let (disk, block) = Self::locate(vblk, array.disk_count());
        if !array.is_valid(disk) {
            return Err(RaidError::DiskUnavailable {
                disk: array.disk_id(disk),
            });
        }
        array.read_block(disk, block, buf)
    }

    fn write<const N: usize>(&self, array: &Array<N>, vblk: u64, buf: &Bits<N>) -> RaidResult<()> {
        let (disk, block) = Self::locate(vblk, array.disk_count());
        if !array.is_valid(disk) {
            return Err(RaidError::DiskUnavailable {
                disk: array.disk_id(disk),
            });
        }
        array.write_block(disk, block, buf)
    }

    fn repair<const N: usize>(&self, array: &Array<N>, disk: usize) -> RaidResult<()> {
        Err(RaidError::DiskUnavailable {
            disk: array.disk_id(disk),
        })
    }
}
