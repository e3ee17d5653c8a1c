//! RAID0+1 translator: stripes across mirrored halves of the array.

mod translate_impl;

use crate::retention::mirror::MirrorPair;

/// RAID01 couples disk `i` with disk `i + N/2` and stripes consecutive
/// virtual blocks across the pairs. With an odd disk count the last disk is
/// a spare that holds no data.
pub struct RAID01 {
    pairs: Vec<MirrorPair>,
}

impl RAID01 {
    #[must_use]
    pub fn new(disks: usize) -> Self {
        let half = disks / 2;
        let pairs = (0..half)
            .map(|i| MirrorPair::new(i, [Some(i), Some(i + half)]))
            .collect();
        Self { pairs }
    }

    #[cfg(test)]
    pub(crate) fn pairs(&self) -> &[MirrorPair] {
        &self.pairs
    }

    /// locate returns `(pair index, block within the pair)` for `vblk`.
    #[must_use]
    pub const fn locate(vblk: u64, pairs: usize) -> (usize, u64) {
        let half = pairs as u64;
        ((vblk % half) as usize, vblk / half)
    }

    /// Pair holding disk index `disk`, or `None` for the spare.
    #[must_use]
    pub fn pair_of(&self, disk: usize) -> Option<&MirrorPair> {
        let half = self.pairs.len();
        if half == 0 {
            return None;
        }
        if disk < 2 * half {
            self.pairs.get(disk % half)
        } else {
            None
        }
    }
}
