//! RAID0 translator: plain striping, no redundancy.

mod translate_impl;

/// RAID0 spreads consecutive virtual blocks round-robin across every disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct RAID0;

impl RAID0 {
    /// locate returns `(disk index, physical block)` for `vblk`.
    #[must_use]
    pub const fn locate(vblk: u64, disks: usize) -> (usize, u64) {
        let n = disks as u64;
        ((vblk % n) as usize, vblk / n)
    }
}
