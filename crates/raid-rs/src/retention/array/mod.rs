//! Disk registry: per-disk validity, identifiers and locks.

#[cfg(test)]
mod array_tests;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::{Mutex, MutexGuard};

use crate::config::MAX_DISKS;
use crate::error::{RaidError, RaidResult};
use crate::layout::bits::Bits;
use crate::metrics::{self, DiskOp, IoOpType};
use crate::retention::disk::BlockDevice;

/// DiskSlot is the engine's view of one physical disk.
pub struct DiskSlot {
    id: u32,
    valid: AtomicBool,
    dev: Mutex<Box<dyn BlockDevice>>,
}

impl DiskSlot {
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }
}

/// Array owns the physical disks. Disks are numbered `1..=N` externally and
/// indexed `0..N` internally.
pub struct Array<const N: usize> {
    slots: Vec<DiskSlot>,
    device_blocks: u64,
}

impl<const N: usize> Array<N> {
    /// # Errors
    /// Returns an error if the devices disagree on geometry, use a block size
    /// other than `N`, or are too small to hold data plus the metadata block.
    pub fn new(devices: Vec<Box<dyn BlockDevice>>) -> RaidResult<Self> {
        if devices.is_empty() || devices.len() > MAX_DISKS {
            return Err(RaidError::Config(format!(
                "array needs 1..={MAX_DISKS} disks, got {}",
                devices.len()
            )));
        }
        let device_blocks = devices[0].block_count();
        for (i, dev) in devices.iter().enumerate() {
            if dev.block_size() != N {
                return Err(RaidError::Config(format!(
                    "disk {} has block size {}, array uses {N}",
                    i + 1,
                    dev.block_size()
                )));
            }
            if dev.block_count() != device_blocks {
                return Err(RaidError::Config(format!(
                    "disk {} has {} blocks, disk 1 has {device_blocks}",
                    i + 1,
                    dev.block_count()
                )));
            }
        }
        if device_blocks < 2 {
            return Err(RaidError::Config(
                "disks need at least one data block and the metadata block".into(),
            ));
        }

        let slots = devices
            .into_iter()
            .zip(1u32..)
            .map(|(dev, id)| DiskSlot {
                id,
                valid: AtomicBool::new(true),
                dev: Mutex::new(dev),
            })
            .collect();

        Ok(Self {
            slots,
            device_blocks,
        })
    }

    #[must_use]
    pub fn disk_count(&self) -> usize {
        self.slots.len()
    }

    /// Data blocks per disk; the last device block is reserved for metadata.
    #[must_use]
    pub const fn disk_blocks(&self) -> u64 {
        self.device_blocks - 1
    }

    /// Index of the reserved metadata block.
    #[must_use]
    pub const fn meta_block(&self) -> u64 {
        self.device_blocks - 1
    }

    pub fn slots(&self) -> impl Iterator<Item = &DiskSlot> {
        self.slots.iter()
    }

    #[must_use]
    pub fn disk_id(&self, i: usize) -> u32 {
        self.slots.get(i).map_or(0, DiskSlot::id)
    }

    /// `index_of` maps an external disk id to its internal index.
    ///
    /// # Errors
    /// Returns `InvalidDiskId` if the id is outside `[1, N]`.
    pub fn index_of(&self, id: u32) -> RaidResult<usize> {
        let i = usize::try_from(id).map_err(|_| RaidError::InvalidDiskId(id))?;
        if i == 0 || i > self.slots.len() {
            return Err(RaidError::InvalidDiskId(id));
        }
        Ok(i - 1)
    }

    /// Unknown indices count as invalid.
    #[must_use]
    pub fn is_valid(&self, i: usize) -> bool {
        self.slots.get(i).is_some_and(DiskSlot::is_valid)
    }

    pub fn set_valid(&self, i: usize, valid: bool) {
        if let Some(slot) = self.slots.get(i) {
            slot.valid.store(valid, Ordering::Release);
        }
    }

    #[must_use]
    pub fn invalid_disks(&self) -> Vec<usize> {
        (0..self.slots.len()).filter(|&i| !self.is_valid(i)).collect()
    }

    #[cfg(test)]
    pub(crate) fn validity(&self) -> Vec<bool> {
        self.slots.iter().map(DiskSlot::is_valid).collect()
    }

    /// Locks a single disk.
    ///
    /// # Panics
    /// Panics if `i` is not a disk index.
    #[must_use]
    pub fn lock(&self, i: usize) -> DiskHandle<'_, N> {
        let slot = &self.slots[i];
        DiskHandle {
            index: i,
            id: slot.id,
            dev: slot.dev.lock(),
        }
    }

    /// Locks the given disks in ascending index order. Duplicates are locked once.
    #[must_use]
    pub fn lock_many(&self, disks: &[usize]) -> LockSet<'_, N> {
        let mut order = disks.to_vec();
        order.sort_unstable();
        order.dedup();
        LockSet {
            handles: order.into_iter().map(|i| self.lock(i)).collect(),
        }
    }

    /// Locks every disk in ascending index order.
    #[must_use]
    pub fn lock_all(&self) -> LockSet<'_, N> {
        LockSet {
            handles: (0..self.slots.len()).map(|i| self.lock(i)).collect(),
        }
    }

    /// Reads one block from disk `i` under its lock.
    ///
    /// # Errors
    /// Returns an error if the device read fails.
    pub fn read_block(&self, i: usize, block: u64, buf: &mut Bits<N>) -> RaidResult<()> {
        self.lock(i).read(block, buf)
    }

    /// Writes one block to disk `i` under its lock.
    ///
    /// # Errors
    /// Returns an error if the device write fails.
    pub fn write_block(&self, i: usize, block: u64, buf: &Bits<N>) -> RaidResult<()> {
        self.lock(i).write(block, buf)
    }
}

/// DiskHandle is a locked disk. Dropping it releases the per-disk lock.
pub struct DiskHandle<'a, const N: usize> {
    index: usize,
    id: u32,
    dev: MutexGuard<'a, Box<dyn BlockDevice>>,
}

impl<const N: usize> DiskHandle<'_, N> {
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// # Errors
    /// Returns an error if the device read fails.
    pub fn read(&mut self, block: u64, buf: &mut Bits<N>) -> RaidResult<()> {
        let started = metrics::is_enabled().then(Instant::now);
        let res = self.dev.read_block(block, buf.as_bytes_mut());
        self.record(IoOpType::Read, block, started, res.is_err());
        Ok(res?)
    }

    /// # Errors
    /// Returns an error if the device write fails.
    pub fn write(&mut self, block: u64, buf: &Bits<N>) -> RaidResult<()> {
        let started = metrics::is_enabled().then(Instant::now);
        let res = self.dev.write_block(block, buf.as_bytes());
        self.record(IoOpType::Write, block, started, res.is_err());
        Ok(res?)
    }

    fn record(&self, op: IoOpType, block: u64, started: Option<Instant>, error: bool) {
        if let Some(started) = started {
            metrics::record_disk_op(DiskOp {
                disk_id: self.id,
                op,
                block,
                bytes: N as u64,
                latency_seconds: started.elapsed().as_secs_f64(),
                error,
            });
        }
    }
}

/// LockSet holds several disk locks acquired in ascending order.
pub struct LockSet<'a, const N: usize> {
    handles: Vec<DiskHandle<'a, N>>,
}

impl<'a, const N: usize> LockSet<'a, N> {
    /// Handle for disk `i`, if this set holds its lock.
    pub fn get_mut(&mut self, i: usize) -> Option<&mut DiskHandle<'a, N>> {
        self.handles.iter_mut().find(|h| h.index == i)
    }

    /// Locked disk indices, ascending.
    #[must_use]
    pub fn indices(&self) -> Vec<usize> {
        self.handles.iter().map(DiskHandle::index).collect()
    }

    /// # Errors
    /// Returns `Config` if the disk is not held by this set, or the device error.
    pub fn read(&mut self, i: usize, block: u64, buf: &mut Bits<N>) -> RaidResult<()> {
        self.held(i)?.read(block, buf)
    }

    /// # Errors
    /// Returns `Config` if the disk is not held by this set, or the device error.
    pub fn write(&mut self, i: usize, block: u64, buf: &Bits<N>) -> RaidResult<()> {
        self.held(i)?.write(block, buf)
    }

    fn held(&mut self, i: usize) -> RaidResult<&mut DiskHandle<'a, N>> {
        self.get_mut(i)
            .ok_or_else(|| RaidError::Config(format!("disk index {i} is not locked")))
    }
}
