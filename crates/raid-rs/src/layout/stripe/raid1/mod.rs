//! RAID1 translator: each pair of consecutive disks mirrors one slice of the
//! virtual address space.

mod translate_impl;

use crate::retention::mirror::MirrorPair;

/// RAID1 couples disk `2i` with disk `2i + 1`. With an odd disk count the
/// last disk forms a pair of its own and carries unmirrored data.
pub struct RAID1 {
    pairs: Vec<MirrorPair>,
}

impl RAID1 {
    #[must_use]
    pub fn new(disks: usize) -> Self {
        let pairs = (0..disks.div_ceil(2))
            .map(|i| {
                let second = 2 * i + 1;
                MirrorPair::new(i, [Some(2 * i), (second < disks).then_some(second)])
            })
            .collect();
        Self { pairs }
    }

    #[cfg(test)]
    pub(crate) fn pairs(&self) -> &[MirrorPair] {
        &self.pairs
    }

    /// locate returns `(pair index, block within the pair)` for `vblk`.
    #[must_use]
    pub const fn locate(vblk: u64, disk_blocks: u64) -> (usize, u64) {
        ((vblk / disk_blocks) as usize, vblk % disk_blocks)
    }
}
