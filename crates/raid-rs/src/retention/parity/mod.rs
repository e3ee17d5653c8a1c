//! Parity clusters and the shared RAID4/RAID5 read, write and repair paths.
//!
//! Parity is materialized lazily, one cluster of consecutive stripes at a
//! time, and only while every disk is valid: parity built around a failed
//! disk would pass off its lost blocks as zeros. A cluster's parity is
//! trustworthy iff its bit is set. Stripe `s`
//! lives at physical block `s` on every disk; placements decide which disk
//! holds the parity block of each stripe.

mod barrier;
mod bitmap;

pub use barrier::{RepairBarrier, RepairTicket, WriteTicket};
pub use bitmap::ClusterBitmap;

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info};

use crate::error::{RaidError, RaidResult};
use crate::layout::bits::Bits;
use crate::retention::array::{Array, LockSet};

/// ParityPlacement maps stripe positions onto disks.
pub trait ParityPlacement: Send + Sync {
    /// Disk index holding the parity block of `stripe`.
    fn parity_disk(&self, stripe: u64, disks: usize) -> usize;

    /// Disk index holding data position `position` (`0..disks-1`) of `stripe`.
    fn data_disk(&self, stripe: u64, position: usize, disks: usize) -> usize;
}

/// StripeLoc is the physical location of one virtual block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StripeLoc {
    pub stripe: u64,
    pub parity: usize,
    pub data: usize,
}

struct ClusterState {
    loaded: ClusterBitmap,
    loading: Vec<u64>,
}

/// ParityClusters owns the cluster-loaded bitmap and sequences cluster loads.
pub struct ParityClusters {
    cluster_size: u64,
    state: Mutex<ClusterState>,
    cond: Condvar,
    dirty: AtomicBool,
}

impl ParityClusters {
    #[must_use]
    pub fn new(cluster_size: u64, loaded: ClusterBitmap) -> Self {
        Self {
            cluster_size,
            state: Mutex::new(ClusterState {
                loaded,
                loading: Vec::new(),
            }),
            cond: Condvar::new(),
            dirty: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub const fn cluster_size(&self) -> u64 {
        self.cluster_size
    }

    #[must_use]
    pub const fn cluster_of(&self, stripe: u64) -> u64 {
        stripe / self.cluster_size
    }

    #[must_use]
    pub fn is_loaded(&self, cluster: u64) -> bool {
        self.state.lock().loaded.get(cluster)
    }

    #[must_use]
    pub fn snapshot(&self) -> ClusterBitmap {
        self.state.lock().loaded.clone()
    }

    /// Returns true once after any cluster bit was set.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    /// Runs `load` for `cluster` unless it is already loaded. Concurrent callers
    /// for the same cluster wait for the first; other clusters are not blocked.
    ///
    /// # Errors
    /// Propagates the loader's error; the bit stays unset in that case.
    pub fn ensure_loaded<F>(&self, cluster: u64, load: F) -> RaidResult<()>
    where
        F: FnOnce() -> RaidResult<()>,
    {
        let mut st = self.state.lock();
        loop {
            if st.loaded.get(cluster) {
                return Ok(());
            }
            if st.loading.contains(&cluster) {
                self.cond.wait(&mut st);
                continue;
            }
            st.loading.push(cluster);
            break;
        }
        drop(st);

        let res = load();

        let mut st = self.state.lock();
        st.loading.retain(|&c| c != cluster);
        if res.is_ok() {
            st.loaded.set(cluster, true);
            self.dirty.store(true, Ordering::Release);
        }
        drop(st);
        self.cond.notify_all();
        res
    }
}

/// ParityArray is the RAID4/RAID5 engine, generic over parity placement.
pub struct ParityArray<P> {
    placement: P,
    clusters: ParityClusters,
    barrier: RepairBarrier,
}

impl<P: ParityPlacement> ParityArray<P> {
    #[must_use]
    pub fn new(placement: P, cluster_size: u64, loaded: ClusterBitmap) -> Self {
        Self {
            placement,
            clusters: ParityClusters::new(cluster_size, loaded),
            barrier: RepairBarrier::default(),
        }
    }

    #[must_use]
    pub const fn clusters(&self) -> &ParityClusters {
        &self.clusters
    }

    #[cfg(test)]
    pub(crate) const fn barrier(&self) -> &RepairBarrier {
        &self.barrier
    }

    /// Maps a virtual block onto its stripe, parity disk and data disk.
    #[must_use]
    pub fn locate(&self, vblk: u64, disks: usize) -> StripeLoc {
        let width = (disks - 1) as u64;
        let stripe = vblk / width;
        let position = (vblk % width) as usize;
        StripeLoc {
            stripe,
            parity: self.placement.parity_disk(stripe, disks),
            data: self.placement.data_disk(stripe, position, disks),
        }
    }

    /// # Errors
    /// `MultipleFailures` with two or more failed disks, `DiskUnavailable` when
    /// the target is failed and its cluster never had parity, or the device error.
    pub fn read<const N: usize>(
        &self,
        array: &Array<N>,
        vblk: u64,
        buf: &mut Bits<N>,
    ) -> RaidResult<()> {
        let loc = self.locate(vblk, array.disk_count());
        let invalid = array.invalid_disks();
        if invalid.len() > 1 {
            return Err(RaidError::MultipleFailures);
        }
        if array.is_valid(loc.data) {
            return array.read_block(loc.data, loc.stripe, buf);
        }

        if !self.clusters.is_loaded(self.clusters.cluster_of(loc.stripe)) {
            return Err(RaidError::DiskUnavailable {
                disk: array.disk_id(loc.data),
            });
        }
        let mut disks = array.lock_all();
        *buf = reconstruct(&mut disks, loc.stripe, loc.data)?;
        Ok(())
    }

    /// Writes one block and keeps the stripe's parity consistent.
    ///
    /// # Errors
    /// `MultipleFailures` with two or more failed disks, `DiskUnavailable` when
    /// the target is failed and its cluster never had parity, or the device error.
    pub fn write<const N: usize>(
        &self,
        array: &Array<N>,
        vblk: u64,
        buf: &Bits<N>,
    ) -> RaidResult<()> {
        let _ticket = self.barrier.enter_write();

        let loc = self.locate(vblk, array.disk_count());
        if array.invalid_disks().len() > 1 {
            return Err(RaidError::MultipleFailures);
        }
        let data_valid = array.is_valid(loc.data);
        let parity_valid = array.is_valid(loc.parity);

        let cluster = self.clusters.cluster_of(loc.stripe);
        if array.invalid_disks().is_empty() {
            self.clusters
                .ensure_loaded(cluster, || self.load_cluster(array, cluster))?;
        }
        let loaded = self.clusters.is_loaded(cluster);

        match (data_valid, parity_valid) {
            (true, true) if loaded => {
                let mut disks = array.lock_many(&[loc.data, loc.parity]);
                let mut old_data = Bits::<N>::zero();
                let mut parity = Bits::<N>::zero();
                disks.read(loc.data, loc.stripe, &mut old_data)?;
                disks.read(loc.parity, loc.stripe, &mut parity)?;
                parity ^= &old_data;
                parity ^= buf;
                disks.write(loc.data, loc.stripe, buf)?;
                disks.write(loc.parity, loc.stripe, &parity)
            }
            // Parity stays unbuilt until the array is whole again.
            (true, _) => array.write_block(loc.data, loc.stripe, buf),
            (false, true) if loaded => {
                let mut disks = array.lock_all();
                let old_data = reconstruct(&mut disks, loc.stripe, loc.data)?;
                let mut parity = Bits::<N>::zero();
                disks.read(loc.parity, loc.stripe, &mut parity)?;
                parity ^= &old_data;
                parity ^= buf;
                disks.write(loc.parity, loc.stripe, &parity)
            }
            (false, true) => Err(RaidError::DiskUnavailable {
                disk: array.disk_id(loc.data),
            }),
            (false, false) => Err(RaidError::MultipleFailures),
        }
    }

    /// Rebuilds `disk` from the other disks for every loaded cluster, then marks it valid.
    ///
    /// # Errors
    /// `MultipleFailures` if any other disk is failed, or the device error.
    pub fn repair<const N: usize>(&self, array: &Array<N>, disk: usize) -> RaidResult<()> {
        let _ticket = self.barrier.begin_repair();
        if array.is_valid(disk) {
            return Ok(());
        }
        if (0..array.disk_count()).any(|d| d != disk && !array.is_valid(d)) {
            return Err(RaidError::MultipleFailures);
        }

        let loaded = self.clusters.snapshot();
        info!(
            disk = array.disk_id(disk),
            loaded_clusters = loaded.count_set(),
            "rebuilding disk from parity"
        );

        let mut disks = array.lock_all();
        let mut rebuilt = 0u64;
        for block in 0..array.disk_blocks() {
            if !loaded.get(self.clusters.cluster_of(block)) {
                continue;
            }
            let value = reconstruct(&mut disks, block, disk)?;
            disks.write(disk, block, &value)?;
            rebuilt += 1;
        }
        array.set_valid(disk, true);
        drop(disks);

        debug!(disk = array.disk_id(disk), rebuilt, "parity rebuild complete");
        Ok(())
    }

    /// Computes parity for every stripe of `cluster` from its data disks.
    ///
    /// # Errors
    /// `DiskUnavailable` if a disk failed before the locks were taken.
    fn load_cluster<const N: usize>(&self, array: &Array<N>, cluster: u64) -> RaidResult<()> {
        let size = self.clusters.cluster_size();
        let first = cluster * size;
        let end = (first + size).min(array.disk_blocks());
        let count = array.disk_count();

        let mut disks = array.lock_all();
        if let Some(&failed) = array.invalid_disks().first() {
            return Err(RaidError::DiskUnavailable {
                disk: array.disk_id(failed),
            });
        }
        let mut buf = Bits::<N>::zero();
        for stripe in first..end {
            let parity_disk = self.placement.parity_disk(stripe, count);
            let mut parity = Bits::<N>::zero();
            for d in (0..count).filter(|&d| d != parity_disk) {
                disks.read(d, stripe, &mut buf)?;
                parity ^= &buf;
            }
            disks.write(parity_disk, stripe, &parity)?;
        }

        debug!(cluster, stripes = end.saturating_sub(first), "parity cluster loaded");
        Ok(())
    }
}

/// XOR of every held disk except `missing` at `block`.
fn reconstruct<const N: usize>(
    disks: &mut LockSet<'_, N>,
    block: u64,
    missing: usize,
) -> RaidResult<Bits<N>> {
    let mut acc = Bits::<N>::zero();
    let mut buf = Bits::<N>::zero();
    for d in disks.indices().into_iter().filter(|&d| d != missing) {
        disks.read(d, block, &mut buf)?;
        acc ^= &buf;
    }
    Ok(acc)
}
