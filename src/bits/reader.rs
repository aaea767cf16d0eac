use crate::stream::Source;

/// Resumable bit accumulator for DEFLATE input
///
/// DEFLATE uses LSB-first bit ordering within bytes. Unlike a reader that
/// owns its input, the accumulator only holds the bits pulled so far, so the
/// decoder can suspend whenever the caller's input runs dry and pick up
/// where it left off on the next call.
#[derive(Clone, Debug, Default)]
pub struct BitAccumulator {
    /// Buffer holding up to 64 bits
    hold: u64,
    /// Number of valid bits in hold (0-64)
    bits: u32,
}

impl BitAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pull one byte from `src`; false when the input is exhausted
    #[inline]
    pub fn pull_byte(&mut self, src: &mut Source<'_>) -> bool {
        debug_assert!(self.bits <= 56);
        match src.next_byte() {
            Some(byte) => {
                self.hold |= (byte as u64) << self.bits;
                self.bits += 8;
                true
            }
            None => false,
        }
    }

    /// Ensure at least `n` bits (n <= 32) are held, pulling single bytes
    ///
    /// Returns false when input runs out first; bits pulled so far stay held.
    #[inline]
    pub fn need(&mut self, src: &mut Source<'_>, n: u32) -> bool {
        debug_assert!(n <= 32, "Cannot request more than 32 bits at once");
        while self.bits < n {
            if !self.pull_byte(src) {
                return false;
            }
        }
        true
    }

    /// Top up the buffer to at least 56 bits from `src` while input lasts
    #[inline]
    pub fn refill(&mut self, src: &mut Source<'_>) {
        while self.bits <= 56 && self.pull_byte(src) {}
    }

    /// Look at the low `n` held bits without consuming them
    #[inline]
    pub fn peek(&self, n: u32) -> u32 {
        debug_assert!(n <= 32);
        (self.hold & ((1u64 << n) - 1)) as u32
    }

    /// Consume `n` held bits
    #[inline]
    pub fn drop_bits(&mut self, n: u32) {
        debug_assert!(n <= self.bits, "Cannot consume more bits than available");
        self.hold >>= n;
        self.bits -= n;
    }

    /// Consume and return `n` held bits
    #[inline]
    pub fn take(&mut self, n: u32) -> u32 {
        let value = self.peek(n);
        self.drop_bits(n);
        value
    }

    /// Discard remaining bits in the current byte
    pub fn align_to_byte(&mut self) {
        let discard = self.bits % 8;
        self.drop_bits(discard);
    }

    /// Number of bits held
    #[inline]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Return whole unconsumed bytes to `src`, as far as this call's input allows
    pub fn give_back(&mut self, src: &mut Source<'_>) {
        let returned = src.give_back((self.bits / 8) as usize) as u32;
        self.bits -= returned * 8;
        self.hold &= if self.bits == 0 { 0 } else { u64::MAX >> (64 - self.bits) };
    }

    pub fn clear(&mut self) {
        self.hold = 0;
        self.bits = 0;
    }
}
