//! Versioned metadata block stored in the last block of every disk.
//!
//! Little-endian layout:
//!
//! | offset | size | field |
//! |---|---|---|
//! | 0 | 8 | magic `RAIDMETA` |
//! | 8 | 2 | format version |
//! | 10 | 1 | scheme id, `0xFF` for none |
//! | 11 | 1 | disk count |
//! | 12 | 4 | cluster size in stripes |
//! | 16 | 8 | data blocks per disk |
//! | 24 | 8 | generation |
//! | 32 | 4 | cluster count |
//! | 36 | 2 per disk | disk id, valid flag |
//! | .. | `ceil(clusters / 8)` | cluster-loaded bitmap |
//! | .. | 32 | SHA-256 of every preceding byte |
//! | last | 1 | `0x00` live, `0xFF` destroyed |


use sha2::{Digest, Sha256};

use crate::config::{DESTROYED_MARKER, META_MAGIC, META_VERSION};
use crate::error::{RaidError, RaidResult};
use crate::layout::scheme::Scheme;
use crate::retention::parity::ClusterBitmap;

const HEADER_LEN: usize = 36;
const DIGEST_LEN: usize = 32;
const NO_SCHEME: u8 = 0xFF;
const LIVE_MARKER: u8 = 0x00;

/// DiskEntry is the persisted state of one disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiskEntry {
    pub id: u32,
    pub valid: bool,
}

/// MetaRecord is the array state that survives a restart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetaRecord {
    pub scheme: Option<Scheme>,
    pub cluster_size: u64,
    pub disk_blocks: u64,
    pub generation: u64,
    pub disks: Vec<DiskEntry>,
    pub clusters: ClusterBitmap,
}

/// Marker is the state byte closing a metadata block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marker {
    Live,
    Destroyed,
}

/// MetaBlock is a decoded metadata block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetaBlock {
    /// The block was never written.
    Empty,
    Live(MetaRecord),
    /// The array was destroyed; the final snapshot is kept when it still decodes.
    Destroyed(Option<MetaRecord>),
}

impl MetaRecord {
    /// Bytes needed to encode `disks` disks and `clusters` cluster bits, marker included.
    #[must_use]
    pub const fn encoded_len(disks: usize, clusters: u64) -> usize {
        HEADER_LEN + 2 * disks + clusters.div_ceil(8) as usize + DIGEST_LEN + 1
    }

    /// `encode` writes the record into `block` and closes it with `marker`.
    /// Unused bytes are zeroed for a live block and set to `0xFF` for a
    /// destroyed one.
    ///
    /// # Errors
    /// Returns `Config` if the record does not fit in `block` or a field
    /// exceeds its on-disk width.
    pub fn encode(&self, block: &mut [u8], marker: Marker) -> RaidResult<()> {
        let needed = Self::encoded_len(self.disks.len(), self.clusters.len());
        if needed > block.len() {
            return Err(RaidError::Config(format!(
                "metadata needs {needed} bytes, block holds {}",
                block.len()
            )));
        }
        let disk_count = u8::try_from(self.disks.len())
            .map_err(|_| RaidError::Config("too many disks for metadata".into()))?;
        let cluster_size = u32::try_from(self.cluster_size)
            .map_err(|_| RaidError::Config("cluster size exceeds metadata width".into()))?;
        let cluster_count = u32::try_from(self.clusters.len())
            .map_err(|_| RaidError::Config("cluster count exceeds metadata width".into()))?;

        let mut out = Vec::with_capacity(needed);
        out.extend_from_slice(&META_MAGIC);
        out.extend_from_slice(&META_VERSION.to_le_bytes());
        out.push(self.scheme.map_or(NO_SCHEME, Scheme::id));
        out.push(disk_count);
        out.extend_from_slice(&cluster_size.to_le_bytes());
        out.extend_from_slice(&self.disk_blocks.to_le_bytes());
        out.extend_from_slice(&self.generation.to_le_bytes());
        out.extend_from_slice(&cluster_count.to_le_bytes());
        for disk in &self.disks {
            let id = u8::try_from(disk.id)
                .map_err(|_| RaidError::Config(format!("disk id {} exceeds metadata width", disk.id)))?;
            out.push(id);
            out.push(u8::from(disk.valid));
        }
        out.extend_from_slice(self.clusters.as_bytes());
        let digest = Sha256::digest(&out);
        out.extend_from_slice(&digest);

        let (fill, last) = match marker {
            Marker::Live => (0x00, LIVE_MARKER),
            Marker::Destroyed => (DESTROYED_MARKER, DESTROYED_MARKER),
        };
        block.fill(fill);
        block[..out.len()].copy_from_slice(&out);
        if let Some(b) = block.last_mut() {
            *b = last;
        }
        Ok(())
    }
}

impl MetaBlock {
    /// `decode` classifies and parses a metadata block.
    ///
    /// # Errors
    /// Returns `CorruptMetadata` for a bad magic, version, checksum or state byte.
    pub fn decode(block: &[u8]) -> RaidResult<Self> {
        if block.iter().all(|&b| b == 0) {
            return Ok(Self::Empty);
        }
        match block.last() {
            Some(&DESTROYED_MARKER) => Ok(Self::Destroyed(decode_record(block).ok())),
            Some(&LIVE_MARKER) => decode_record(block).map(Self::Live),
            Some(other) => Err(RaidError::CorruptMetadata(format!(
                "unknown state marker {other:#04x}"
            ))),
            None => Err(RaidError::CorruptMetadata("empty block".into())),
        }
    }
}

fn decode_record(block: &[u8]) -> RaidResult<MetaRecord> {
    let mut r = Reader { buf: block, pos: 0 };
    if r.take(8)? != META_MAGIC {
        return Err(RaidError::CorruptMetadata("bad magic".into()));
    }
    let version = u16::from_le_bytes(r.array()?);
    if version != META_VERSION {
        return Err(RaidError::CorruptMetadata(format!(
            "unsupported version {version}"
        )));
    }
    let scheme = match r.u8()? {
        NO_SCHEME => None,
        id => Some(
            Scheme::try_from(id)
                .map_err(|_| RaidError::CorruptMetadata(format!("unknown scheme id {id}")))?,
        ),
    };
    let disk_count = usize::from(r.u8()?);
    let cluster_size = u64::from(u32::from_le_bytes(r.array()?));
    let disk_blocks = u64::from_le_bytes(r.array()?);
    let generation = u64::from_le_bytes(r.array()?);
    let cluster_count = u64::from(u32::from_le_bytes(r.array()?));

    let mut disks = Vec::with_capacity(disk_count);
    for _ in 0..disk_count {
        let id = u32::from(r.u8()?);
        let valid = match r.u8()? {
            0 => false,
            1 => true,
            other => {
                return Err(RaidError::CorruptMetadata(format!(
                    "disk {id} has validity byte {other}"
                )));
            }
        };
        disks.push(DiskEntry { id, valid });
    }

    let bitmap_len = usize::try_from(cluster_count.div_ceil(8))
        .map_err(|_| RaidError::CorruptMetadata("cluster count too large".into()))?;
    let clusters = ClusterBitmap::from_bytes(r.take(bitmap_len)?, cluster_count)
        .ok_or_else(|| RaidError::CorruptMetadata("bitmap length mismatch".into()))?;

    let body_end = r.pos;
    let stored = r.take(DIGEST_LEN)?;
    if Sha256::digest(&block[..body_end]).as_slice() != stored {
        return Err(RaidError::CorruptMetadata("checksum mismatch".into()));
    }

    Ok(MetaRecord {
        scheme,
        cluster_size,
        disk_blocks,
        generation,
        disks,
        clusters,
    })
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> RaidResult<&'a [u8]> {
        // The final byte is the state marker, never part of the record.
        let limit = self.buf.len().saturating_sub(1);
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= limit)
            .ok_or_else(|| RaidError::CorruptMetadata("record runs past the block".into()))?;
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn array<const L: usize>(&mut self) -> RaidResult<[u8; L]> {
        let mut out = [0u8; L];
        out.copy_from_slice(self.take(L)?);
        Ok(out)
    }

    fn u8(&mut self) -> RaidResult<u8> {
        Ok(self.take(1)?[0])
    }
}
