//! Fixed-width block buffers with XOR helpers for parity arithmetic.

use std::ops::{BitXor, BitXorAssign};


#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
/// Bits stores one block of `N` bytes.
pub struct Bits<const N: usize>(pub [u8; N]);

impl<const N: usize> Bits<N> {
    #[inline]
    #[must_use]
    /// `zero` returns a zero-initialized block.
    pub const fn zero() -> Self {
        Self([0u8; N])
    }

    #[inline]
    #[must_use]
    /// `filled` returns a block with every byte set to `byte`.
    pub const fn filled(byte: u8) -> Self {
        Self([byte; N])
    }

    #[inline]
    #[must_use]
    /// `as_bytes` returns a shared reference to the underlying byte array.
    pub const fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }

    #[inline]
    /// `as_bytes_mut` returns a mutable reference to the underlying byte array.
    pub const fn as_bytes_mut(&mut self) -> &mut [u8; N] {
        &mut self.0
    }

    #[must_use]
    /// `is_zero` reports whether every byte of the block is zero.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    #[inline]
    /// `xor_in_place` performs an in-place XOR with another block.
    ///
    /// # Arguments
    /// * `rhs` - The block to XOR into this one.
    pub fn xor_in_place(&mut self, rhs: &Self) {
        for (a, b) in self.0.iter_mut().zip(rhs.0.iter()) {
            *a ^= *b;
        }
    }

    /// `xor_of` folds a sequence of blocks into their XOR.
    pub fn xor_of<'a, I>(blocks: I) -> Self
    where
        I: IntoIterator<Item = &'a Self>,
    {
        let mut acc = Self::zero();
        for b in blocks {
            acc.xor_in_place(b);
        }
        acc
    }
}

impl<const N: usize> BitXor for Bits<N> {
    type Output = Self;
    #[inline]
    fn bitxor(mut self, rhs: Self) -> Self::Output {
        self.xor_in_place(&rhs);
        self
    }
}

impl<const N: usize> BitXorAssign for Bits<N> {
    #[inline]
    fn bitxor_assign(&mut self, rhs: Self) {
        self.xor_in_place(&rhs);
    }
}

impl<const N: usize> BitXor<&Self> for Bits<N> {
    type Output = Self;
    #[inline]
    fn bitxor(mut self, rhs: &Self) -> Self::Output {
        self.xor_in_place(rhs);
        self
    }
}

impl<const N: usize> BitXorAssign<&Self> for Bits<N> {
    #[inline]
    fn bitxor_assign(&mut self, rhs: &Self) {
        self.xor_in_place(rhs);
    }
}
