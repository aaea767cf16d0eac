//! CRC-32 (IEEE, reflected 0xEDB88320) used by the gzip wrapper.
//!
//! Table lookup and slicing live in `crc32fast`; this wrapper adds the
//! rolling interface the codec needs.

/// Rolling CRC-32 accumulator that remembers how many bytes it has seen
#[derive(Clone)]
pub struct Crc32 {
    hasher: crc32fast::Hasher,
}

impl Crc32 {
    pub fn new() -> Self {
        Self { hasher: crc32fast::Hasher::new() }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Current checksum value (the accumulator stays usable)
    pub fn finish(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    /// Append another accumulator's bytes, as if they had been fed to `self`
    pub fn combine(&mut self, other: &Crc32) {
        self.hasher.combine(&other.hasher);
    }

    pub fn reset(&mut self) {
        self.hasher.reset();
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Crc32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crc32").field("value", &format_args!("{:#010x}", self.finish())).finish()
    }
}

/// Calculate the CRC-32 of `data`
#[must_use]
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Checksum of `A || B` given `crc32(A)`, `crc32(B)` and `len(B)`
#[must_use]
pub fn crc32_combine(crc1: u32, crc2: u32, len2: u64) -> u32 {
    let mut first = crc32fast::Hasher::new_with_initial(crc1);
    let second = crc32fast::Hasher::new_with_initial_len(crc2, len2);
    first.combine(&second);
    first.finalize()
}
