use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use raid_rs::Scheme;
use raid_rs::config::{DEFAULT_CLUSTER_SIZE, DEFAULT_DISK_BLOCKS, DEFAULT_DISKS};

#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub array: ArrayArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Where the disk images live and how they are shaped.
#[derive(Args, Debug, Clone)]
pub struct ArrayArgs {
    #[arg(long, env = "RAID_DISK_DIR", default_value = "disks")]
    pub disk_dir: PathBuf,

    #[arg(long, env = "RAID_DISKS", default_value_t = DEFAULT_DISKS)]
    pub disks: usize,

    /// Blocks per image, the metadata block included.
    #[arg(long, env = "RAID_DISK_BLOCKS", default_value_t = DEFAULT_DISK_BLOCKS)]
    pub disk_blocks: u64,

    /// Stripes per lazily initialized parity cluster.
    #[arg(long, env = "RAID_CLUSTER_SIZE", default_value_t = DEFAULT_CLUSTER_SIZE)]
    pub cluster_size: u64,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Select the RAID scheme, resetting its coordination state.
    Init {
        #[arg(value_enum)]
        scheme: RaidMode,
    },

    /// Print the virtual device geometry.
    Info,

    /// Print the scheme and per-disk health.
    Status,

    /// Write a UTF-8 string at a byte offset.
    WriteBytes {
        #[arg(long, default_value_t = 0)]
        offset: u64,

        #[arg(long)]
        data: String,
    },

    /// Read bytes at a byte offset and print them.
    ReadBytes {
        #[arg(long, default_value_t = 0)]
        offset: u64,

        #[arg(long)]
        len: usize,
    },

    /// Fill leading blocks with a reproducible pattern.
    Fill {
        /// Defaults to the whole capacity.
        #[arg(long)]
        blocks: Option<u64>,

        /// Seed for pseudo-random content; without it block `i` byte `j` is `(i + j) mod 256`.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Check blocks written by `fill` with the same arguments.
    Verify {
        #[arg(long)]
        blocks: Option<u64>,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Mark a disk (1-based) as failed.
    Fail {
        #[arg(long)]
        disk: u32,
    },

    /// Resynchronize a failed disk (1-based).
    Repair {
        #[arg(long)]
        disk: u32,
    },

    /// Stamp every disk with the destroyed marker.
    Destroy,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum RaidMode {
    Raid0,
    Raid1,
    #[value(name = "raid0-1")]
    Raid01,
    Raid4,
    Raid5,
}

impl From<RaidMode> for Scheme {
    fn from(mode: RaidMode) -> Self {
        match mode {
            RaidMode::Raid0 => Self::Raid0,
            RaidMode::Raid1 => Self::Raid1,
            RaidMode::Raid01 => Self::Raid01,
            RaidMode::Raid4 => Self::Raid4,
            RaidMode::Raid5 => Self::Raid5,
        }
    }
}
