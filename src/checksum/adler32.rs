//! Adler-32 checksum (RFC 1950) used by the zlib wrapper.

/// Largest prime smaller than 65536
const MOD_ADLER: u32 = 65_521;

/// Largest n such that 255*n*(n+1)/2 + (n+1)*(MOD_ADLER-1) fits in a u32
const NMAX: usize = 5552;

/// Rolling Adler-32 accumulator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adler32 {
    s1: u32,
    s2: u32,
}

impl Adler32 {
    pub fn new() -> Self {
        Self { s1: 1, s2: 0 }
    }

    /// Resume from a previously finished checksum value
    pub fn from_checksum(value: u32) -> Self {
        Self { s1: value & 0xFFFF, s2: value >> 16 }
    }

    pub fn update(&mut self, data: &[u8]) {
        let (mut s1, mut s2) = (self.s1, self.s2);
        // Defer the modulo to chunk boundaries
        for chunk in data.chunks(NMAX) {
            for &b in chunk {
                s1 += b as u32;
                s2 += s1;
            }
            s1 %= MOD_ADLER;
            s2 %= MOD_ADLER;
        }
        self.s1 = s1;
        self.s2 = s2;
    }

    pub fn finish(&self) -> u32 {
        (self.s2 << 16) | self.s1
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

/// Calculate the Adler-32 checksum of `data`
#[must_use]
pub fn adler32(data: &[u8]) -> u32 {
    let mut adler = Adler32::new();
    adler.update(data);
    adler.finish()
}

/// Checksum of `A || B` given `adler32(A)`, `adler32(B)` and `len(B)`
#[must_use]
pub fn adler32_combine(adler1: u32, adler2: u32, len2: u64) -> u32 {
    let base = MOD_ADLER as u64;
    let rem = len2 % base;
    let mut sum1 = adler1 as u64 & 0xFFFF;
    let mut sum2 = (rem * sum1) % base;
    sum1 += (adler2 as u64 & 0xFFFF) + base - 1;
    sum2 += ((adler1 as u64 >> 16) & 0xFFFF) + ((adler2 as u64 >> 16) & 0xFFFF) + base - rem;
    if sum1 >= base {
        sum1 -= base;
    }
    if sum1 >= base {
        sum1 -= base;
    }
    if sum2 >= base << 1 {
        sum2 -= base << 1;
    }
    if sum2 >= base {
        sum2 -= base;
    }
    (sum1 | (sum2 << 16)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adler32_empty() {
        assert_eq!(adler32(&[]), 1);
    }

    #[test]
    fn test_adler32_known_values() {
        assert_eq!(adler32(b"hello"), 0x062C0215);
        assert_eq!(adler32(b"Adler-32"), 0x0C34027B);
        assert_eq!(adler32(b"123456789"), 0x091E01DE);
    }

    #[test]
    fn test_adler32_incremental() {
        let data: Vec<u8> = (0..20_000u32).map(|i| (i * 7 % 251) as u8).collect();
        let mut adler = Adler32::new();
        for chunk in data.chunks(333) {
            adler.update(chunk);
        }
        assert_eq!(adler.finish(), adler32(&data));
    }

    #[test]
    fn test_adler32_large_run_does_not_overflow() {
        // 0xFF bytes stress the deferred modulo right at the NMAX boundary
        let data = vec![0xFFu8; NMAX * 3 + 17];
        let mut slow = Adler32::new();
        for b in &data {
            slow.update(std::slice::from_ref(b));
        }
        assert_eq!(slow.finish(), adler32(&data));
    }

    #[test]
    fn test_adler32_combine() {
        let a = b"The quick brown fox ";
        let b = b"jumps over the lazy dog";
        let whole: Vec<u8> = a.iter().chain(b.iter()).copied().collect();
        let combined = adler32_combine(adler32(a), adler32(b), b.len() as u64);
        assert_eq!(combined, adler32(&whole));
    }

    #[test]
    fn test_adler32_combine_empty_tail() {
        let a = b"payload";
        assert_eq!(adler32_combine(adler32(a), adler32(&[]), 0), adler32(a));
    }

    #[test]
    fn test_from_checksum_resumes() {
        let mut first = Adler32::new();
        first.update(b"abc");
        let mut resumed = Adler32::from_checksum(first.finish());
        resumed.update(b"def");
        assert_eq!(resumed.finish(), adler32(b"abcdef"));
    }
}
