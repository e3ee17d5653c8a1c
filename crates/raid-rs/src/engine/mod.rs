//! RaidEngine: owns the disk array, the active layout and the persisted
//! metadata, and routes every request through them.
//!
//! Lock order is layout, then generation, then cluster or pair coordination,
//! then per-disk locks. Scheme selection and destroy take the layout write
//! lock; requests, fault injection and repair share its read lock.


use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, trace, warn};

use crate::config::EngineConfig;
use crate::error::{RaidError, RaidResult};
use crate::layout::bits::Bits;
use crate::layout::scheme::Scheme;
use crate::layout::stripe::Layout;
use crate::metrics::{self, IoOpType, RaidOp};
use crate::retention::array::Array;
use crate::retention::meta::{DiskEntry, Marker, MetaBlock, MetaRecord};
use crate::retention::parity::{ClusterBitmap, ParityClusters};

/// RaidInfo describes the virtual device exposed by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RaidInfo {
    pub block_count: u64,
    pub block_size: usize,
    pub disk_count: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiskStatus {
    pub id: u32,
    pub valid: bool,
}

/// ArrayStatus is a point-in-time view of the array health.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArrayStatus {
    pub scheme: Option<Scheme>,
    pub disks: Vec<DiskStatus>,
    pub loaded_clusters: u64,
    pub total_clusters: u64,
}

impl fmt::Display for ArrayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scheme {
            Some(scheme) => writeln!(f, "scheme: {scheme}")?,
            None => writeln!(f, "scheme: none")?,
        }
        for disk in &self.disks {
            let state = if disk.valid { "OK" } else { "FAILED" };
            writeln!(f, "disk {}: {state}", disk.id)?;
        }
        if self.total_clusters > 0 {
            writeln!(
                f,
                "parity clusters loaded: {}/{}",
                self.loaded_clusters, self.total_clusters
            )?;
        }
        Ok(())
    }
}

/// RaidEngine serves block requests for the active scheme over `N`-byte blocks.
pub struct RaidEngine<const N: usize> {
    array: Array<N>,
    config: EngineConfig,
    layout: RwLock<Option<Layout>>,
    generation: Mutex<u64>,
    destroyed: AtomicBool,
}

impl<const N: usize> RaidEngine<N> {
    /// `boot` loads the newest metadata found on the array, or writes fresh
    /// metadata if none of the disks were ever initialized.
    ///
    /// # Errors
    /// * `Destroyed` if any disk carries the destroyed marker.
    /// * `Config` if the metadata does not fit a block or does not match the
    ///   attached disks and `config`.
    /// * `CorruptMetadata` if no disk holds a readable record but some hold garbage.
    pub fn boot(array: Array<N>, config: EngineConfig) -> RaidResult<Self> {
        config.validate()?;
        let clusters = config.cluster_count(array.disk_blocks());
        let needed = MetaRecord::encoded_len(array.disk_count(), clusters);
        if needed > N {
            return Err(RaidError::Config(format!(
                "metadata for {} disks and {clusters} clusters needs {needed} bytes, block size is {N}",
                array.disk_count()
            )));
        }

        let mut engine = Self {
            array,
            config,
            layout: RwLock::new(None),
            generation: Mutex::new(0),
            destroyed: AtomicBool::new(false),
        };

        match engine.newest_record()? {
            Some(record) => engine.restore(record)?,
            None => {
                info!(disks = engine.array.disk_count(), "no metadata found, initializing array");
                engine.persist(None)?;
            }
        }
        Ok(engine)
    }

    /// `select_scheme_id` is [`Self::select_scheme`] for a raw scheme id.
    ///
    /// # Errors
    /// Returns `InvalidScheme` for an unknown id, otherwise as `select_scheme`.
    pub fn select_scheme_id(&self, id: u8) -> RaidResult<()> {
        self.select_scheme(Scheme::try_from(id)?)
    }

    /// `select_scheme` activates `scheme` with fresh coordination state and
    /// every parity cluster unloaded, then persists the metadata.
    ///
    /// # Errors
    /// * `TooFewDisks` if the array is smaller than the scheme needs.
    /// * `ParityUnavailable` if a parity scheme's parity disk is failed.
    pub fn select_scheme(&self, scheme: Scheme) -> RaidResult<()> {
        self.check_live()?;
        let disks = self.array.disk_count();
        if disks < scheme.min_disks() {
            return Err(RaidError::TooFewDisks {
                scheme,
                needed: scheme.min_disks(),
                have: disks,
            });
        }

        let mut guard = self.layout.write();
        self.check_live()?;
        match scheme {
            Scheme::Raid4 if !self.array.is_valid(disks - 1) => {
                return Err(RaidError::ParityUnavailable {
                    disk: self.array.disk_id(disks - 1),
                });
            }
            Scheme::Raid5 => {
                if let Some(&d) = self.array.invalid_disks().first() {
                    return Err(RaidError::ParityUnavailable {
                        disk: self.array.disk_id(d),
                    });
                }
            }
            _ => {}
        }

        let layout = Layout::build(
            scheme,
            disks,
            self.config.cluster_size,
            ClusterBitmap::new(self.cluster_count()),
        );
        self.persist(Some(&layout))?;
        *guard = Some(layout);

        info!(
            %scheme,
            disks,
            capacity = scheme.capacity(disks, self.array.disk_blocks()),
            "scheme selected"
        );
        Ok(())
    }

    /// Reads virtual block `vblk` into `buf`.
    ///
    /// # Errors
    /// * `Unavailable` if no scheme is active.
    /// * `OutOfRange` if `vblk` is not below [`Self::capacity`].
    /// * The scheme's error when no redundant path can serve the block.
    pub fn read(&self, vblk: u64, buf: &mut Bits<N>) -> RaidResult<()> {
        self.check_live()?;
        let guard = self.layout.read();
        self.check_live()?;
        let layout = guard.as_ref().ok_or(RaidError::Unavailable)?;
        self.check_range(layout, vblk)?;

        let started = metrics::is_enabled().then(Instant::now);
        let res = layout.read(&self.array, vblk, buf);
        record_op::<N>(layout.scheme(), IoOpType::Read, vblk, started, res.is_err());
        if let Err(e) = &res {
            debug!(vblk, error = %e, "read failed");
        }
        res
    }

    /// Writes `buf` as virtual block `vblk`.
    ///
    /// # Errors
    /// * `Unavailable` if no scheme is active.
    /// * `OutOfRange` if `vblk` is not below [`Self::capacity`].
    /// * The scheme's error when no redundant path can take the block.
    pub fn write(&self, vblk: u64, buf: &Bits<N>) -> RaidResult<()> {
        self.check_live()?;
        let guard = self.layout.read();
        self.check_live()?;
        let layout = guard.as_ref().ok_or(RaidError::Unavailable)?;
        self.check_range(layout, vblk)?;

        let started = metrics::is_enabled().then(Instant::now);
        let res = layout.write(&self.array, vblk, buf);
        record_op::<N>(layout.scheme(), IoOpType::Write, vblk, started, res.is_err());
        if let Err(e) = &res {
            debug!(vblk, error = %e, "write failed");
        }
        res?;

        // A newly loaded parity cluster must survive a restart.
        if layout.clusters().is_some_and(ParityClusters::take_dirty) {
            self.persist(Some(layout))?;
        }
        Ok(())
    }

    /// Addressable virtual blocks of the active scheme, zero if none is active.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.layout
            .read()
            .as_ref()
            .map_or(0, |layout| self.capacity_of(layout))
    }

    #[must_use]
    pub fn info(&self) -> RaidInfo {
        RaidInfo {
            block_count: self.capacity(),
            block_size: N,
            disk_count: self.array.disk_count(),
        }
    }

    #[must_use]
    pub fn scheme(&self) -> Option<Scheme> {
        self.layout.read().as_ref().map(Layout::scheme)
    }

    #[must_use]
    pub fn status(&self) -> ArrayStatus {
        let guard = self.layout.read();
        let disks = self
            .array
            .slots()
            .map(|slot| DiskStatus {
                id: slot.id(),
                valid: slot.is_valid(),
            })
            .collect();
        let (loaded_clusters, total_clusters) = guard
            .as_ref()
            .and_then(Layout::clusters)
            .map_or((0, 0), |c| (c.snapshot().count_set(), self.cluster_count()));
        ArrayStatus {
            scheme: guard.as_ref().map(Layout::scheme),
            disks,
            loaded_clusters,
            total_clusters,
        }
    }

    #[must_use]
    pub const fn array(&self) -> &Array<N> {
        &self.array
    }

    /// `fail_disk` marks disk `id` failed and persists the metadata. Nothing is
    /// reconstructed; later requests degrade per scheme.
    ///
    /// # Errors
    /// Returns `InvalidDiskId` if `id` is outside `[1, N]`.
    pub fn fail_disk(&self, id: u32) -> RaidResult<()> {
        self.check_live()?;
        let disk = self.array.index_of(id)?;
        let guard = self.layout.read();
        self.check_live()?;
        self.array.set_valid(disk, false);
        warn!(disk = id, "disk marked failed");
        self.persist(guard.as_ref())
    }

    /// `repair_disk` resynchronizes disk `id` from its redundancy and marks it
    /// valid. Repairing a valid disk is a no-op.
    ///
    /// # Errors
    /// * `InvalidDiskId` if `id` is outside `[1, N]`.
    /// * `NotInitialized` if no scheme is active.
    /// * The scheme's error if nothing survives to rebuild from.
    pub fn repair_disk(&self, id: u32) -> RaidResult<()> {
        self.check_live()?;
        let disk = self.array.index_of(id)?;
        if self.array.is_valid(disk) {
            return Ok(());
        }
        let guard = self.layout.read();
        self.check_live()?;
        let layout = guard.as_ref().ok_or(RaidError::NotInitialized)?;

        info!(disk = id, scheme = %layout.scheme(), "repairing disk");
        if let Err(e) = layout.repair(&self.array, disk) {
            warn!(disk = id, error = %e, "repair failed");
            return Err(e);
        }
        self.persist(Some(layout))?;
        info!(disk = id, "disk repaired");
        Ok(())
    }

    /// `destroy` stamps every disk's metadata block with the destroyed marker
    /// and a final snapshot. The engine and any later boot refuse to serve.
    ///
    /// # Errors
    /// Returns `Destroyed` if already destroyed, or the device error.
    pub fn destroy(&self) -> RaidResult<()> {
        self.check_live()?;
        let mut guard = self.layout.write();
        let mut generation = self.generation.lock();
        self.check_live()?;
        *generation += 1;

        let record = self.record(guard.as_ref(), *generation);
        let mut block = Bits::<N>::zero();
        record.encode(block.as_bytes_mut(), Marker::Destroyed)?;

        // Flagged under the generation lock: every later persist sees it.
        self.destroyed.store(true, Ordering::Release);
        *guard = None;

        let meta = self.array.meta_block();
        let mut disks = self.array.lock_all();
        for disk in disks.indices() {
            disks.write(disk, meta, &block)?;
        }
        drop(disks);

        error!(generation = *generation, "array destroyed");
        Ok(())
    }

    fn check_live(&self) -> RaidResult<()> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(RaidError::Destroyed);
        }
        Ok(())
    }

    fn check_range(&self, layout: &Layout, vblk: u64) -> RaidResult<()> {
        let capacity = self.capacity_of(layout);
        if vblk >= capacity {
            return Err(RaidError::OutOfRange {
                block: vblk,
                capacity,
            });
        }
        Ok(())
    }

    fn capacity_of(&self, layout: &Layout) -> u64 {
        layout
            .scheme()
            .capacity(self.array.disk_count(), self.array.disk_blocks())
    }

    const fn cluster_count(&self) -> u64 {
        self.config.cluster_count(self.array.disk_blocks())
    }

    /// Reads every disk's metadata block, disk 1 first, and keeps the record
    /// with the highest generation. Failed disks stop receiving updates, so
    /// their records are older.
    fn newest_record(&self) -> RaidResult<Option<MetaRecord>> {
        let meta = self.array.meta_block();
        let mut newest: Option<MetaRecord> = None;
        let mut unreadable = None;
        let mut buf = Bits::<N>::zero();

        for disk in 0..self.array.disk_count() {
            self.array.read_block(disk, meta, &mut buf)?;
            match MetaBlock::decode(buf.as_bytes()) {
                Ok(MetaBlock::Empty) => {}
                Ok(MetaBlock::Live(record)) => {
                    if newest
                        .as_ref()
                        .is_none_or(|n| record.generation > n.generation)
                    {
                        newest = Some(record);
                    }
                }
                Ok(MetaBlock::Destroyed(_)) => {
                    error!(
                        disk = self.array.disk_id(disk),
                        "metadata carries the destroyed marker, refusing to boot"
                    );
                    return Err(RaidError::Destroyed);
                }
                Err(e) => {
                    warn!(disk = self.array.disk_id(disk), error = %e, "unreadable metadata block");
                    unreadable.get_or_insert(e);
                }
            }
        }

        match (newest, unreadable) {
            (None, Some(e)) => Err(e),
            (newest, _) => Ok(newest),
        }
    }

    fn restore(&mut self, record: MetaRecord) -> RaidResult<()> {
        let disks = self.array.disk_count();
        if record.disks.len() != disks {
            return Err(RaidError::Config(format!(
                "metadata describes {} disks, {disks} attached",
                record.disks.len()
            )));
        }
        if record.disk_blocks != self.array.disk_blocks() {
            return Err(RaidError::Config(format!(
                "metadata describes {} blocks per disk, disks hold {}",
                record.disk_blocks,
                self.array.disk_blocks()
            )));
        }
        if record.cluster_size != self.config.cluster_size {
            return Err(RaidError::Config(format!(
                "metadata uses cluster size {}, configured {}",
                record.cluster_size, self.config.cluster_size
            )));
        }
        if record.clusters.len() != self.cluster_count() {
            return Err(RaidError::Config(format!(
                "metadata tracks {} clusters, expected {}",
                record.clusters.len(),
                self.cluster_count()
            )));
        }
        for (disk, entry) in record.disks.iter().enumerate() {
            if entry.id != self.array.disk_id(disk) {
                return Err(RaidError::Config(format!(
                    "metadata lists disk {} in slot {}",
                    entry.id,
                    disk + 1
                )));
            }
        }

        for (disk, entry) in record.disks.iter().enumerate() {
            self.array.set_valid(disk, entry.valid);
        }
        let layout = record.scheme.map(|scheme| {
            Layout::build(scheme, disks, record.cluster_size, record.clusters.clone())
        });
        *self.layout.get_mut() = layout;
        *self.generation.get_mut() = record.generation;

        info!(
            scheme = ?record.scheme,
            generation = record.generation,
            failed = ?self.array.invalid_disks().iter().map(|&d| d + 1).collect::<Vec<_>>(),
            loaded_clusters = record.clusters.count_set(),
            "metadata restored"
        );
        Ok(())
    }

    fn record(&self, layout: Option<&Layout>, generation: u64) -> MetaRecord {
        MetaRecord {
            scheme: layout.map(Layout::scheme),
            cluster_size: self.config.cluster_size,
            disk_blocks: self.array.disk_blocks(),
            generation,
            disks: self
                .array
                .slots()
                .map(|slot| DiskEntry {
                    id: slot.id(),
                    valid: slot.is_valid(),
                })
                .collect(),
            clusters: layout
                .and_then(Layout::clusters)
                .map_or_else(|| ClusterBitmap::new(self.cluster_count()), ParityClusters::snapshot),
        }
    }

    /// Writes the current state to the metadata block of every valid disk.
    /// The caller passes the layout it already holds so the layout lock is
    /// never taken twice. Fails with `Destroyed` once the marker is down.
    fn persist(&self, layout: Option<&Layout>) -> RaidResult<()> {
        let mut generation = self.generation.lock();
        self.check_live()?;
        *generation += 1;

        let record = self.record(layout, *generation);
        let mut block = Bits::<N>::zero();
        record.encode(block.as_bytes_mut(), Marker::Live)?;

        let meta = self.array.meta_block();
        let mut disks = self.array.lock_all();
        let mut written = 0usize;
        for disk in disks.indices() {
            if self.array.is_valid(disk) {
                disks.write(disk, meta, &block)?;
                written += 1;
            }
        }
        trace!(generation = *generation, disks = written, "metadata persisted");
        Ok(())
    }
}

fn record_op<const N: usize>(scheme: Scheme, op: IoOpType, block: u64, started: Option<Instant>, error: bool) {
    if let Some(started) = started {
        metrics::record_raid_op(RaidOp {
            scheme,
            op,
            block,
            bytes: N as u64,
            latency_seconds: started.elapsed().as_secs_f64(),
            error,
        });
    }
}
