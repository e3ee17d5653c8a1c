//! Supported redundancy schemes and their capacity rules.

use std::fmt;

use crate::error::RaidError;


/// Scheme identifies one of the supported RAID levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Scheme {
    /// Striping without redundancy.
    Raid0 = 0,
    /// Mirroring of adjacent disk pairs.
    Raid1 = 1,
    /// Striping across mirrored halves.
    Raid01 = 2,
    /// Striping with a dedicated parity disk.
    Raid4 = 3,
    /// Striping with rotating parity.
    Raid5 = 4,
}

impl Scheme {
    pub const ALL: [Self; 5] = [
        Self::Raid0,
        Self::Raid1,
        Self::Raid01,
        Self::Raid4,
        Self::Raid5,
    ];

    #[must_use]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// `min_disks` is the smallest array the scheme can be laid out on.
    #[must_use]
    pub const fn min_disks(self) -> usize {
        match self {
            Self::Raid0 => 1,
            Self::Raid1 | Self::Raid01 => 2,
            Self::Raid4 | Self::Raid5 => 3,
        }
    }

    #[must_use]
    pub const fn is_parity(self) -> bool {
        matches!(self, Self::Raid4 | Self::Raid5)
    }

    /// `capacity` returns the addressable virtual blocks for `disks` disks of
    /// `disk_blocks` data blocks each.
    ///
    /// RAID1 on an odd disk count keeps the last disk as unmirrored capacity.
    #[must_use]
    pub const fn capacity(self, disks: usize, disk_blocks: u64) -> u64 {
        let disks = disks as u64;
        match self {
            Self::Raid0 => disk_blocks * disks,
            Self::Raid1 => disk_blocks * disks.div_ceil(2),
            Self::Raid01 => disk_blocks * (disks / 2),
            Self::Raid4 | Self::Raid5 => disk_blocks * disks.saturating_sub(1),
        }
    }
}

impl TryFrom<u8> for Scheme {
    type Error = RaidError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Raid0),
            1 => Ok(Self::Raid1),
            2 => Ok(Self::Raid01),
            3 => Ok(Self::Raid4),
            4 => Ok(Self::Raid5),
            other => Err(RaidError::InvalidScheme(other)),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Raid0 => "RAID0",
            Self::Raid1 => "RAID1",
            Self::Raid01 => "RAID0+1",
            Self::Raid4 => "RAID4",
            Self::Raid5 => "RAID5",
        };
        f.write_str(name)
    }
}
