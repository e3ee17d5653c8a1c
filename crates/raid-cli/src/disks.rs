use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use raid_rs::retention::array::Array;
use raid_rs::retention::disk::{BlockDevice, Disk};
use raid_rs::{EngineConfig, RaidEngine};
use tracing::debug;

use crate::BLOCK_SIZE;
use crate::cli::ArrayArgs;

/// `disk_paths` returns `disk-1.img ..= disk-N.img` under `disk_dir`, creating the directory.
pub fn disk_paths(disk_dir: &Path, disks: usize) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(disk_dir)
        .with_context(|| format!("failed to create disk directory {}", disk_dir.display()))?;
    Ok((1..=disks)
        .map(|i| disk_dir.join(format!("disk-{i}.img")))
        .collect())
}

/// `open_engine` maps every image (creating missing ones) and boots the engine.
pub fn open_engine(args: &ArrayArgs) -> Result<RaidEngine<BLOCK_SIZE>> {
    let mut devices: Vec<Box<dyn BlockDevice>> = Vec::with_capacity(args.disks);
    for path in disk_paths(&args.disk_dir, args.disks)? {
        let disk = Disk::open_prealloc(&path, BLOCK_SIZE, args.disk_blocks)
            .with_context(|| format!("failed to open disk image {}", path.display()))?;
        if disk.created {
            debug!(path = %path.display(), "created disk image");
        }
        devices.push(Box::new(disk));
    }

    let array = Array::new(devices).context("disk images do not form an array")?;
    let config = EngineConfig {
        cluster_size: args.cluster_size,
    };
    RaidEngine::boot(array, config).context("failed to boot RAID engine")
}
