#[cfg(test)]
mod disk_tests;

use memmap2::{MmapMut, MmapOptions};
use std::io;
use std::path::{Path, PathBuf};

/// BlockDevice is the physical block I/O primitive: one fixed-size block per call.
pub trait BlockDevice: Send {
    /// Size of one block in bytes.
    fn block_size(&self) -> usize;

    /// Number of addressable blocks.
    fn block_count(&self) -> u64;

    /// # Errors
    /// Returns an error if `block` is out of range or `buf` is not one block long.
    fn read_block(&mut self, block: u64, buf: &mut [u8]) -> io::Result<()>;

    /// # Errors
    /// Returns an error if `block` is out of range or `buf` is not one block long.
    fn write_block(&mut self, block: u64, buf: &[u8]) -> io::Result<()>;
}

fn block_range(block: u64, block_size: usize, blocks: u64, buf_len: usize) -> io::Result<usize> {
    if buf_len != block_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("buffer is {buf_len} bytes, block size is {block_size}"),
        ));
    }
    if block >= blocks {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("block {block} out of range ({blocks} blocks)"),
        ));
    }
    usize::try_from(block)
        .ok()
        .and_then(|b| b.checked_mul(block_size))
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "block offset overflow"))
}

/// Disk is a pre-allocated image file mapped into memory.
pub struct Disk {
    path: PathBuf,
    map: MmapMut,
    block_size: usize,
    blocks: u64,
    /// True if the image did not exist (or was empty) before opening.
    pub created: bool,
}

impl Disk {
    /// # Errors
    /// Returns an error if the disk image cannot be created/opened or mapped.
    pub fn open_prealloc(path: impl AsRef<Path>, block_size: usize, blocks: u64) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let existed = path.exists();

        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let prev_len = file.metadata().map(|m| m.len()).unwrap_or(0);
        let len = (block_size as u64)
            .checked_mul(blocks)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "disk length overflow"))?;
        file.set_len(len)?;

        let map_len = usize::try_from(len).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("disk length {len} exceeds addressable size"),
            )
        })?;
        // SAFETY: the file stays open for the lifetime of the mapping and is owned by this
        // process; concurrent access goes through the per-disk lock.
        let map = unsafe { MmapOptions::new().len(map_len).map_mut(&file)? };

        Ok(Self {
            path,
            map,
            block_size,
            blocks,
            created: !existed || prev_len == 0,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn len(&self) -> u64 {
        self.blocks * self.block_size as u64
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.blocks == 0
    }

    /// # Errors
    /// Returns an error if the mapping cannot be flushed to the image file.
    pub fn flush(&self) -> io::Result<()> {
        self.map.flush()
    }
}

impl BlockDevice for Disk {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn block_count(&self) -> u64 {
        self.blocks
    }

    fn read_block(&mut self, block: u64, buf: &mut [u8]) -> io::Result<()> {
        let off = block_range(block, self.block_size, self.blocks, buf.len())?;
        buf.copy_from_slice(&self.map[off..off + self.block_size]);
        Ok(())
    }

    fn write_block(&mut self, block: u64, buf: &[u8]) -> io::Result<()> {
        let off = block_range(block, self.block_size, self.blocks, buf.len())?;
        self.map[off..off + self.block_size].copy_from_slice(buf);
        Ok(())
    }
}

impl Drop for Disk {
    fn drop(&mut self) {
        if let Err(e) = self.map.flush() {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to flush disk image");
        }
    }
}

/// MemDisk is a zero-filled in-memory device.
pub struct MemDisk {
    data: Vec<u8>,
    block_size: usize,
    blocks: u64,
}

impl MemDisk {
    #[must_use]
    pub fn new(block_size: usize, blocks: u64) -> Self {
        let len = usize::try_from(blocks).map_or(0, |b| b * block_size);
        Self {
            data: vec![0u8; len],
            block_size,
            blocks,
        }
    }
}

impl BlockDevice for MemDisk {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn block_count(&self) -> u64 {
        self.blocks
    }

    fn read_block(&mut self, block: u64, buf: &mut [u8]) -> io::Result<()> {
        let off = block_range(block, self.block_size, self.blocks, buf.len())?;
        buf.copy_from_slice(&self.data[off..off + self.block_size]);
        Ok(())
    }

    fn write_block(&mut self, block: u64, buf: &[u8]) -> io::Result<()> {
        let off = block_range(block, self.block_size, self.blocks, buf.len())?;
        self.data[off..off + self.block_size].copy_from_slice(buf);
        Ok(())
    }
}
