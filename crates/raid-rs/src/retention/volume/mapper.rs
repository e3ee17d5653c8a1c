//! Helpers for mapping byte offsets onto virtual blocks.

/// `locate_byte` maps a byte offset to its block index and in-block offset.
///
/// # Arguments
/// * `byte_offset` - Starting byte offset of the request.
/// * `byte_delta` - Bytes already handled within the request.
/// * `block_size` - Bytes per virtual block.
///
/// # Returns
/// `(block, in_block_offset)`, or `None` if the offset overflows.
#[must_use]
pub fn locate_byte(byte_offset: u64, byte_delta: usize, block_size: usize) -> Option<(u64, usize)> {
    let absolute = byte_offset.checked_add(u64::try_from(byte_delta).ok()?)?;
    let size = block_size as u64;
    let in_block = usize::try_from(absolute % size).ok()?;
    Some((absolute / size, in_block))
}

/// `end_offset` returns the exclusive end of a `len`-byte request, or `None`
/// if it overflows.
#[must_use]
pub fn end_offset(byte_offset: u64, len: usize) -> Option<u64> {
    byte_offset.checked_add(u64::try_from(len).ok()?)
}
