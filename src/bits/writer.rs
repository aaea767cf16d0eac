use crate::stream::Sink;

/// Bit-level writer for DEFLATE output
///
/// Writes bits LSB-first to match DEFLATE format. Whole bytes move to the
/// pending buffer as soon as they are complete; the pending buffer is then
/// drained into the caller's output slice across as many calls as needed.
pub struct BitWriter {
    /// Completed bytes not yet handed to the caller
    pending: Vec<u8>,
    /// Start of the undrained region of `pending`
    drained: usize,
    /// Bits waiting for a full byte
    bit_buf: u64,
    /// Number of valid bits in `bit_buf` (0-7 between calls)
    bit_count: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { pending: Vec::with_capacity(capacity), drained: 0, bit_buf: 0, bit_count: 0 }
    }

    /// Write `n` bits (0-32) from value in LSB-first order
    #[inline]
    pub fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 32);
        debug_assert!(n == 32 || value >> n == 0, "value {value:#x} wider than {n} bits");

        self.bit_buf |= (value as u64) << self.bit_count;
        self.bit_count += n;
        while self.bit_count >= 8 {
            self.pending.push(self.bit_buf as u8);
            self.bit_buf >>= 8;
            self.bit_count -= 8;
        }
    }

    /// Write a Huffman code that has already been bit-reversed
    #[inline]
    pub fn write_code(&mut self, code: u16, len: u8) {
        self.write_bits(code as u32, len as u32);
    }

    /// Pad to byte boundary with zero bits
    pub fn align_to_byte(&mut self) {
        if self.bit_count > 0 {
            self.pending.push(self.bit_buf as u8);
            self.bit_buf = 0;
            self.bit_count = 0;
        }
    }

    /// Write raw bytes (must be byte-aligned)
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        debug_assert_eq!(self.bit_count, 0, "unaligned byte write");
        self.pending.extend_from_slice(bytes);
    }

    /// Write a 16-bit value in little-endian
    pub fn write_u16_le(&mut self, value: u16) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Write a 16-bit value in big-endian
    pub fn write_u16_be(&mut self, value: u16) {
        self.write_bytes(&value.to_be_bytes());
    }

    /// Write a 32-bit value in little-endian
    pub fn write_u32_le(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Write a 32-bit value in big-endian
    pub fn write_u32_be(&mut self, value: u32) {
        self.write_bytes(&value.to_be_bytes());
    }

    /// Complete bytes waiting to be drained
    pub fn pending_len(&self) -> usize {
        self.pending.len() - self.drained
    }

    /// Whether every complete byte has been handed out
    pub fn is_drained(&self) -> bool {
        self.pending_len() == 0
    }

    /// Move as many pending bytes as fit into `sink`
    pub fn drain_into(&mut self, sink: &mut Sink<'_>) -> usize {
        let n = sink.extend(&self.pending[self.drained..]);
        self.drained += n;
        if self.drained == self.pending.len() {
            self.pending.clear();
            self.drained = 0;
        }
        n
    }

    /// Drain everything (pads the last partial byte)
    pub fn finish(mut self) -> Vec<u8> {
        self.align_to_byte();
        self.pending.split_off(self.drained)
    }

    /// Clear the writer for reuse
    pub fn clear(&mut self) {
        self.pending.clear();
        self.drained = 0;
        self.bit_buf = 0;
        self.bit_count = 0;
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Reverse the bottom `n` bits of `value`
pub fn reverse_bits(value: u32, n: u8) -> u32 {
    if n == 0 {
        return 0;
    }
    value.reverse_bits() >> (32 - n as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_bits() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b011, 3); // bits 0-2
        writer.write_bits(0b11010, 5); // bits 3-7
        let output = writer.finish();
        assert_eq!(output, vec![0xD3]); // 11010_011 = 0xD3
    }

    #[test]
    fn test_write_cross_byte() {
        let mut writer = BitWriter::new();
        writer.write_bits(0xFFF, 12);
        assert_eq!(writer.pending_len(), 1);
        let output = writer.finish();
        assert_eq!(output, vec![0xFF, 0x0F]);
    }

    #[test]
    fn test_write_full_word() {
        let mut writer = BitWriter::new();
        writer.write_bits(1, 1);
        writer.write_bits(0xFFFF_FFFF, 32);
        let output = writer.finish();
        assert_eq!(output, vec![0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
    }

    #[test]
    fn test_byte_order_helpers() {
        let mut writer = BitWriter::new();
        writer.write_u16_le(0x1234);
        writer.write_u16_be(0x1234);
        writer.write_u32_be(0xDEADBEEF);
        writer.write_u32_le(0xDEADBEEF);
        assert_eq!(
            writer.finish(),
            vec![0x34, 0x12, 0x12, 0x34, 0xDE, 0xAD, 0xBE, 0xEF, 0xEF, 0xBE, 0xAD, 0xDE]
        );
    }

    #[test]
    fn test_drain_across_small_outputs() {
        let mut writer = BitWriter::new();
        writer.write_bytes(b"hello world");
        let mut collected = Vec::new();
        while !writer.is_drained() {
            let mut buf = [0u8; 3];
            let mut sink = Sink::new(&mut buf);
            writer.drain_into(&mut sink);
            collected.extend_from_slice(sink.filled());
        }
        assert_eq!(collected, b"hello world");
        assert_eq!(writer.pending_len(), 0);
    }

    #[test]
    fn test_reverse_bits() {
        assert_eq!(reverse_bits(0b1100, 4), 0b0011);
        assert_eq!(reverse_bits(0b10101, 5), 0b10101);
        assert_eq!(reverse_bits(0b11110000, 8), 0b00001111);
        assert_eq!(reverse_bits(1, 15), 1 << 14);
    }
}
