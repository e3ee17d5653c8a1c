//! Array constants and engine settings.

use crate::error::{RaidError, RaidResult};

/// DEFAULT_BLOCK_SIZE is the block size in bytes used by the CLI.
pub const DEFAULT_BLOCK_SIZE: usize = 1024;
/// DEFAULT_DISKS is the default number of physical disks.
pub const DEFAULT_DISKS: usize = 4;
/// DEFAULT_DISK_BLOCKS is the default device length in blocks, metadata block included.
pub const DEFAULT_DISK_BLOCKS: u64 = 1024;
/// DEFAULT_CLUSTER_SIZE is the number of stripes whose parity is loaded together.
pub const DEFAULT_CLUSTER_SIZE: u64 = 16;
/// MAX_DISKS bounds the disk count so ids fit the metadata table.
pub const MAX_DISKS: usize = 255;

/// META_MAGIC identifies a metadata block.
pub const META_MAGIC: [u8; 8] = *b"RAIDMETA";
/// META_VERSION is the metadata format version.
pub const META_VERSION: u16 = 1;
/// DESTROYED_MARKER is the last byte of a destroyed metadata block.
pub const DESTROYED_MARKER: u8 = 0xFF;

/// EngineConfig holds settings that are not implied by the attached devices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Consecutive stripes per parity cluster.
    pub cluster_size: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cluster_size: DEFAULT_CLUSTER_SIZE,
        }
    }
}

impl EngineConfig {
    /// # Errors
    /// Returns an error if the cluster size is zero.
    pub fn validate(&self) -> RaidResult<()> {
        if self.cluster_size == 0 {
            return Err(RaidError::Config("cluster size must be at least 1".into()));
        }
        Ok(())
    }

    #[must_use]
    pub const fn cluster_count(&self, disk_blocks: u64) -> u64 {
        disk_blocks.div_ceil(self.cluster_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_cluster_size_is_rejected() {
        let cfg = EngineConfig { cluster_size: 0 };
        assert!(matches!(cfg.validate(), Err(RaidError::Config(_))));
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn cluster_count_rounds_up() {
        let cfg = EngineConfig { cluster_size: 4 };
        assert_eq!(cfg.cluster_count(8), 2);
        assert_eq!(cfg.cluster_count(9), 3);
        assert_eq!(cfg.cluster_count(0), 0);
    }
}
