//! Multi-reader/single-writer coordination over a two-disk mirror.
//!
//! The coordination lock guards only the condition flags. Block I/O happens
//! under the per-disk locks after the flags are set, so readers on distinct
//! members run in parallel while a writer excludes everyone.

#[cfg(test)]
mod mirror_tests;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info};

use crate::error::{RaidError, RaidResult};
use crate::layout::bits::Bits;
use crate::retention::array::Array;

#[derive(Default, Debug)]
struct PairState {
    writing: bool,
    reading: [bool; 2],
}

/// MirrorPair couples two disks holding identical content. A missing member
/// (odd disk count under RAID1) is permanently invalid.
pub struct MirrorPair {
    index: usize,
    members: [Option<usize>; 2],
    state: Mutex<PairState>,
    cond: Condvar,
}

impl MirrorPair {
    #[must_use]
    pub fn new(index: usize, members: [Option<usize>; 2]) -> Self {
        Self {
            index,
            members,
            state: Mutex::new(PairState::default()),
            cond: Condvar::new(),
        }
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[cfg(test)]
    pub(crate) const fn members(&self) -> [Option<usize>; 2] {
        self.members
    }

    /// Position (0 or 1) of disk `disk` within this pair.
    #[must_use]
    pub fn position_of(&self, disk: usize) -> Option<usize> {
        self.members.iter().position(|m| *m == Some(disk))
    }

    fn member_valid<const N: usize>(&self, array: &Array<N>, pos: usize) -> bool {
        self.members[pos].is_some_and(|d| array.is_valid(d))
    }

    fn any_valid<const N: usize>(&self, array: &Array<N>) -> bool {
        (0..2).any(|pos| self.member_valid(array, pos))
    }

    /// Reads `block` from any valid member that is not already being read.
    ///
    /// # Errors
    /// Returns `PairUnavailable` if both members are invalid, or the device error.
    pub fn read<const N: usize>(
        &self,
        array: &Array<N>,
        block: u64,
        buf: &mut Bits<N>,
    ) -> RaidResult<()> {
        let mut st = self.state.lock();
        let pos = loop {
            if !self.any_valid(array) {
                return Err(RaidError::PairUnavailable { pair: self.index });
            }
            if st.writing {
                self.cond.wait(&mut st);
                continue;
            }
            if let Some(pos) = (0..2).find(|&p| !st.reading[p] && self.member_valid(array, p)) {
                st.reading[pos] = true;
                break pos;
            }
            self.cond.wait(&mut st);
        };
        drop(st);

        let _reading = ReadingGuard { pair: self, pos };
        let Some(disk) = self.members[pos] else {
            return Err(RaidError::PairUnavailable { pair: self.index });
        };
        array.read_block(disk, block, buf)
    }

    /// Writes `block` to every valid member with readers and other writers excluded.
    ///
    /// # Errors
    /// Returns `PairUnavailable` if both members are invalid, or the device error.
    pub fn write<const N: usize>(
        &self,
        array: &Array<N>,
        block: u64,
        buf: &Bits<N>,
    ) -> RaidResult<()> {
        let _exclusive = self.exclusive(array)?;

        let mut written = false;
        for pos in 0..2 {
            if let Some(disk) = self.members[pos].filter(|&d| array.is_valid(d)) {
                array.write_block(disk, block, buf)?;
                written = true;
            }
        }
        if written {
            Ok(())
        } else {
            Err(RaidError::PairUnavailable { pair: self.index })
        }
    }

    /// Copies every data block from the surviving member onto `disk` and marks
    /// it valid. Reads and writes to the pair wait until the copy completes.
    ///
    /// # Errors
    /// Returns `PairUnavailable` if `disk` has no valid partner, or the device error.
    pub fn resync<const N: usize>(&self, array: &Array<N>, disk: usize) -> RaidResult<()> {
        let Some(pos) = self.position_of(disk) else {
            return Err(RaidError::Config(format!(
                "disk index {disk} is not a member of pair {}",
                self.index
            )));
        };
        let partner_pos = 1 - pos;
        let Some(source) = self.members[partner_pos].filter(|&d| array.is_valid(d)) else {
            return Err(RaidError::PairUnavailable { pair: self.index });
        };

        let _exclusive = self.exclusive(array)?;
        info!(
            pair = self.index,
            from = array.disk_id(source),
            to = array.disk_id(disk),
            "resyncing mirror"
        );

        {
            let mut disks = array.lock_many(&[source, disk]);
            let mut buf = Bits::<N>::zero();
            for block in 0..array.disk_blocks() {
                disks.read(source, block, &mut buf)?;
                disks.write(disk, block, &buf)?;
            }
            array.set_valid(disk, true);
        }

        debug!(pair = self.index, blocks = array.disk_blocks(), "mirror resync complete");
        Ok(())
    }

    /// Waits until no writer and no reader is active, then marks a writer active.
    fn exclusive<const N: usize>(&self, array: &Array<N>) -> RaidResult<ExclusiveGuard<'_>> {
        let mut st = self.state.lock();
        loop {
            if !self.any_valid(array) {
                return Err(RaidError::PairUnavailable { pair: self.index });
            }
            if st.writing || st.reading.iter().any(|&r| r) {
                self.cond.wait(&mut st);
                continue;
            }
            st.writing = true;
            return Ok(ExclusiveGuard { pair: self });
        }
    }

    #[cfg(test)]
    fn flags(&self) -> (bool, [bool; 2]) {
        let st = self.state.lock();
        (st.writing, st.reading)
    }
}

struct ReadingGuard<'a> {
    pair: &'a MirrorPair,
    pos: usize,
}

impl Drop for ReadingGuard<'_> {
    fn drop(&mut self) {
        self.pair.state.lock().reading[self.pos] = false;
        self.pair.cond.notify_all();
    }
}

struct ExclusiveGuard<'a> {
    pair: &'a MirrorPair,
}

impl Drop for ExclusiveGuard<'_> {
    fn drop(&mut self) {
        self.pair.state.lock().writing = false;
        self.pair.cond.notify_all();
    }
}
