//! Byte-addressed view over a [`RaidEngine`].

mod mapper;
#[cfg(test)]
mod mapper_tests;

use mapper::{end_offset, locate_byte};

use crate::engine::RaidEngine;
use crate::error::{RaidError, RaidResult};
use crate::layout::bits::Bits;

/// Volume reads and writes arbitrary byte ranges. Partial blocks go through
/// read-modify-write; each block is updated atomically but a multi-block
/// request is not.
pub struct Volume<'a, const N: usize> {
    engine: &'a RaidEngine<N>,
}

impl<'a, const N: usize> Volume<'a, N> {
    #[must_use]
    pub const fn new(engine: &'a RaidEngine<N>) -> Self {
        Self { engine }
    }

    #[must_use]
    pub fn capacity_bytes(&self) -> u64 {
        self.engine.capacity().saturating_mul(N as u64)
    }

    /// `write_bytes` stores `payload` starting at `byte_offset`.
    ///
    /// # Errors
    /// Returns `OutOfRange` if the range passes the end of the volume, or the
    /// engine's error for the first block that fails.
    pub fn write_bytes(&self, byte_offset: u64, payload: &[u8]) -> RaidResult<()> {
        self.check_range(byte_offset, payload.len())?;
        let mut block = Bits::<N>::zero();

        let mut written = 0usize;
        let total = payload.len();
        while written < total {
            let (vblk, in_block) = self.locate(byte_offset, written)?;
            let take = (N - in_block).min(total - written);

            if take < N {
                self.engine.read(vblk, &mut block)?;
            }
            block.as_bytes_mut()[in_block..in_block + take]
                .copy_from_slice(&payload[written..written + take]);
            self.engine.write(vblk, &block)?;
            written += take;
        }
        Ok(())
    }

    /// `read_bytes` fills `out` starting at `byte_offset`.
    ///
    /// # Errors
    /// Returns `OutOfRange` if the range passes the end of the volume, or the
    /// engine's error for the first block that fails.
    pub fn read_bytes(&self, byte_offset: u64, out: &mut [u8]) -> RaidResult<()> {
        self.check_range(byte_offset, out.len())?;
        let mut block = Bits::<N>::zero();

        let mut read = 0usize;
        let total = out.len();
        while read < total {
            let (vblk, in_block) = self.locate(byte_offset, read)?;
            let take = (N - in_block).min(total - read);

            self.engine.read(vblk, &mut block)?;
            out[read..read + take].copy_from_slice(&block.as_bytes()[in_block..in_block + take]);
            read += take;
        }
        Ok(())
    }

    fn check_range(&self, byte_offset: u64, len: usize) -> RaidResult<()> {
        let capacity = self.engine.capacity();
        let end = end_offset(byte_offset, len).ok_or(RaidError::OutOfRange {
            block: u64::MAX,
            capacity,
        })?;
        if end > self.capacity_bytes() {
            return Err(RaidError::OutOfRange {
                block: end.saturating_sub(1) / N as u64,
                capacity,
            });
        }
        Ok(())
    }

    fn locate(&self, byte_offset: u64, delta: usize) -> RaidResult<(u64, usize)> {
        locate_byte(byte_offset, delta, N).ok_or(RaidError::OutOfRange {
            block: u64::MAX,
            capacity: self.engine.capacity(),
        })
    }
}
