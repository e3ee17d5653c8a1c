//! Cluster-loaded bitmap.

/// ClusterBitmap tracks which parity clusters hold materialized parity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterBitmap {
    bytes: Vec<u8>,
    len: u64,
}

impl ClusterBitmap {
    #[must_use]
    pub fn new(len: u64) -> Self {
        let bytes = usize::try_from(len.div_ceil(8)).unwrap_or(0);
        Self {
            bytes: vec![0u8; bytes],
            len,
        }
    }

    /// `from_bytes` rebuilds a bitmap of `len` bits from its persisted bytes.
    /// Returns `None` if the byte count does not match.
    #[must_use]
    pub fn from_bytes(bytes: &[u8], len: u64) -> Option<Self> {
        let expected = usize::try_from(len.div_ceil(8)).ok()?;
        (bytes.len() == expected).then(|| Self {
            bytes: bytes.to_vec(),
            len,
        })
    }

    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Bits past the end read as unset.
    #[must_use]
    pub fn get(&self, i: u64) -> bool {
        if i >= self.len {
            return false;
        }
        let (byte, bit) = ((i >> 3) as usize, i & 7);
        (self.bytes[byte] >> bit) & 1 == 1
    }

    /// Bits past the end are ignored.
    pub fn set(&mut self, i: u64, val: bool) {
        if i >= self.len {
            return;
        }
        let (byte, bit) = ((i >> 3) as usize, i & 7);
        let m = 1u8 << bit;
        if val {
            self.bytes[byte] |= m;
        } else {
            self.bytes[byte] &= !m;
        }
    }

    #[must_use]
    pub fn count_set(&self) -> u64 {
        self.bytes.iter().map(|b| u64::from(b.count_ones())).sum()
    }
}
