use super::{BL_CODES, MAX_BITS};
use crate::bits::reverse_bits;

/// Node storage for the largest alphabet: leaves plus internal nodes
pub const HEAP_SIZE: usize = 2 * super::L_CODES + 1;

/// Dynamic Huffman tree for one alphabet
///
/// Frequencies are accumulated while a block is collected; `build` then
/// assigns length-limited code lengths and bit-reversed canonical codes.
#[derive(Clone, Debug)]
pub struct HuffmanTree {
    /// Symbol frequencies, followed by internal node sums during a build
    pub freq: Vec<u32>,
    /// Bit-reversed code per symbol
    pub code: Vec<u16>,
    /// Code length per symbol (0 = unused)
    pub len: Vec<u8>,
    /// Largest symbol with a non-zero code length after `build`
    pub max_code: usize,
    elems: usize,
    max_length: u8,
}

/// Work arrays shared by all three trees of a compressor
#[derive(Clone, Debug)]
pub struct TreeScratch {
    /// 1-based binary heap; the sorted node order is built from the top end
    heap: Vec<usize>,
    /// Subtree depth per node, used to break frequency ties
    depth: Vec<u8>,
    /// Parent index per node
    parent: Vec<usize>,
    /// Depth-derived length per node
    node_len: Vec<u8>,
    /// Leaves per code length
    bl_count: [u16; MAX_BITS as usize + 1],
}

impl TreeScratch {
    pub fn new() -> Self {
        Self {
            heap: vec![0; HEAP_SIZE + 1],
            depth: vec![0; HEAP_SIZE],
            parent: vec![0; HEAP_SIZE],
            node_len: vec![0; HEAP_SIZE],
            bl_count: [0; MAX_BITS as usize + 1],
        }
    }
}

impl Default for TreeScratch {
    fn default() -> Self {
        Self::new()
    }
}

impl HuffmanTree {
    /// Tree over `elems` symbols with codes capped at `max_length` bits
    pub fn new(elems: usize, max_length: u8) -> Self {
        Self {
            freq: vec![0; 2 * elems + 1],
            code: vec![0; elems],
            len: vec![0; elems],
            max_code: 0,
            elems,
            max_length,
        }
    }

    /// Forget the frequencies of the previous block
    pub fn reset(&mut self) {
        self.freq.fill(0);
    }

    /// Number of symbols in the alphabet
    pub fn elems(&self) -> usize {
        self.elems
    }

    /// Assign code lengths and codes from the current frequencies
    ///
    /// With fewer than two used symbols the tree is padded with forced
    /// symbols so every alphabet has at least one complete pair of codes.
    /// Forced symbols get a code but keep a zero frequency, so they never
    /// count towards the block cost.
    pub fn build(&mut self, s: &mut TreeScratch) {
        let elems = self.elems;
        let mut heap_len = 0usize;
        let mut heap_max = HEAP_SIZE;
        let mut max_code: isize = -1;

        for n in 0..elems {
            if self.freq[n] != 0 {
                heap_len += 1;
                s.heap[heap_len] = n;
                max_code = n as isize;
                s.depth[n] = 0;
            } else {
                self.len[n] = 0;
            }
        }

        let mut forced = [usize::MAX; 2];
        let mut forced_count = 0;
        while heap_len < 2 {
            let node = if max_code < 2 {
                max_code += 1;
                max_code as usize
            } else {
                0
            };
            heap_len += 1;
            s.heap[heap_len] = node;
            self.freq[node] = 1;
            s.depth[node] = 0;
            forced[forced_count] = node;
            forced_count += 1;
        }
        self.max_code = max_code as usize;

        for n in (1..=heap_len / 2).rev() {
            self.sift_down(s, heap_len, n);
        }

        // Combine the two least frequent nodes until one root remains
        let mut node = elems;
        loop {
            let n = s.heap[1];
            s.heap[1] = s.heap[heap_len];
            heap_len -= 1;
            self.sift_down(s, heap_len, 1);
            let m = s.heap[1];

            heap_max -= 1;
            s.heap[heap_max] = n;
            heap_max -= 1;
            s.heap[heap_max] = m;

            self.freq[node] = self.freq[n] + self.freq[m];
            s.depth[node] = s.depth[n].max(s.depth[m]) + 1;
            s.parent[n] = node;
            s.parent[m] = node;

            s.heap[1] = node;
            node += 1;
            self.sift_down(s, heap_len, 1);
            if heap_len < 2 {
                break;
            }
        }
        heap_max -= 1;
        s.heap[heap_max] = s.heap[1];

        self.gen_bitlen(s, heap_max);
        self.assign_codes(&s.bl_count);

        for &n in &forced[..forced_count] {
            self.freq[n] = 0;
        }
    }

    /// Ordering used by the heap: frequency, then subtree depth
    #[inline]
    fn smaller(&self, s: &TreeScratch, n: usize, m: usize) -> bool {
        self.freq[n] < self.freq[m] || (self.freq[n] == self.freq[m] && s.depth[n] <= s.depth[m])
    }

    fn sift_down(&self, s: &mut TreeScratch, heap_len: usize, mut k: usize) {
        let v = s.heap[k];
        let mut j = k << 1;
        while j <= heap_len {
            if j < heap_len && self.smaller(s, s.heap[j + 1], s.heap[j]) {
                j += 1;
            }
            if self.smaller(s, v, s.heap[j]) {
                break;
            }
            s.heap[k] = s.heap[j];
            k = j;
            j <<= 1;
        }
        s.heap[k] = v;
    }

    /// Lengths from tree depth, capped at `max_length` with overflow repair
    fn gen_bitlen(&mut self, s: &mut TreeScratch, heap_max: usize) {
        let max_length = self.max_length as usize;
        s.bl_count = [0; MAX_BITS as usize + 1];

        // The root sits at heap_max; parents always precede their children
        s.node_len[s.heap[heap_max]] = 0;
        let mut overflow = 0u32;
        for h in heap_max + 1..HEAP_SIZE {
            let n = s.heap[h];
            let mut bits = s.node_len[s.parent[n]] as usize + 1;
            if bits > max_length {
                bits = max_length;
                overflow += 1;
            }
            s.node_len[n] = bits as u8;
            if n > self.max_code {
                continue; // internal node
            }
            s.bl_count[bits] += 1;
        }
        if overflow == 0 {
            for n in 0..=self.max_code {
                self.len[n] = if self.freq[n] != 0 { s.node_len[n] } else { 0 };
            }
            return;
        }
        log::trace!("huffman: {overflow} codes over {max_length} bits, rebalancing");

        // Move leaves from the deepest non-full level below the cap
        while overflow > 0 {
            let mut bits = max_length - 1;
            while s.bl_count[bits] == 0 {
                bits -= 1;
            }
            s.bl_count[bits] -= 1;
            s.bl_count[bits + 1] += 2;
            s.bl_count[max_length] -= 1;
            overflow = overflow.saturating_sub(2);
        }

        // Hand the repaired lengths back out, least frequent symbols first
        let mut h = HEAP_SIZE;
        for bits in (1..=max_length).rev() {
            let mut n = s.bl_count[bits];
            while n != 0 {
                h -= 1;
                let m = s.heap[h];
                if m > self.max_code {
                    continue;
                }
                s.node_len[m] = bits as u8;
                n -= 1;
            }
        }
        for n in 0..=self.max_code {
            self.len[n] = if self.freq[n] != 0 { s.node_len[n] } else { 0 };
        }
    }

    fn assign_codes(&mut self, bl_count: &[u16; MAX_BITS as usize + 1]) {
        let mut next = first_codes(bl_count);
        for n in 0..=self.max_code {
            let len = self.len[n];
            if len != 0 {
                self.code[n] = reverse_bits(next[len as usize] as u32, len) as u16;
                next[len as usize] += 1;
            }
        }
    }

    /// Bits needed to send the current frequencies with this tree's codes
    pub fn cost(&self, extra_bits: &[u8], extra_base: usize) -> u64 {
        (0..=self.max_code.min(self.elems - 1))
            .map(|n| {
                let extra = if n >= extra_base { extra_bits[n - extra_base] } else { 0 };
                self.freq[n] as u64 * (self.len[n] as u64 + extra as u64)
            })
            .sum()
    }

    /// Bits needed to send the current frequencies with fixed code lengths
    pub fn static_cost(&self, lengths: &[u8], extra_bits: &[u8], extra_base: usize) -> u64 {
        (0..self.elems)
            .filter(|&n| self.freq[n] != 0)
            .map(|n| {
                let extra = if n >= extra_base { extra_bits[n - extra_base] } else { 0 };
                self.freq[n] as u64 * (lengths[n] as u64 + extra as u64)
            })
            .sum()
    }
}

/// First canonical code of each length (RFC 1951 section 3.2.2)
fn first_codes(bl_count: &[u16; MAX_BITS as usize + 1]) -> [u16; MAX_BITS as usize + 1] {
    let mut next_code = [0u16; MAX_BITS as usize + 1];
    let mut code = 0u16;
    for bits in 1..=MAX_BITS as usize {
        code = (code + bl_count[bits - 1]) << 1;
        next_code[bits] = code;
    }
    next_code
}

/// Bit-reversed canonical codes for the given code lengths
pub fn gen_codes(lengths: &[u8]) -> Vec<u16> {
    let mut bl_count = [0u16; MAX_BITS as usize + 1];
    for &len in lengths {
        if len > 0 {
            bl_count[len as usize] += 1;
        }
    }
    let mut next = first_codes(&bl_count);
    lengths
        .iter()
        .map(|&len| {
            if len == 0 {
                return 0;
            }
            let code = reverse_bits(next[len as usize] as u32, len) as u16;
            next[len as usize] += 1;
            code
        })
        .collect()
}

/// Repeat previous length 3-6 times (2 extra bits)
pub const REP_3_6: u8 = 16;
/// Repeat a zero length 3-10 times (3 extra bits)
pub const REPZ_3_10: u8 = 17;
/// Repeat a zero length 11-138 times (7 extra bits)
pub const REPZ_11_138: u8 = 18;

/// Extra bits per code-length symbol
pub const EXTRA_BL_BITS: [u8; BL_CODES] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 3, 7];

/// RLE encode code lengths using symbols 16, 17, 18
///
/// Returns `(symbol, extra_value)` pairs. Runs never cross the end of the
/// slice, so the literal/length and distance trees are encoded separately.
pub fn rle_encode_lengths(lengths: &[u8]) -> Vec<(u8, u8)> {
    let mut result = Vec::with_capacity(lengths.len());
    let mut i = 0;

    while i < lengths.len() {
        let len = lengths[i];
        let run = lengths[i..].iter().take_while(|&&l| l == len).count();
        let mut left = run;

        if len == 0 {
            while left > 0 {
                let count = if left >= 11 {
                    let count = left.min(138);
                    result.push((REPZ_11_138, (count - 11) as u8));
                    count
                } else if left >= 3 {
                    result.push((REPZ_3_10, (left - 3) as u8));
                    left
                } else {
                    result.push((0, 0));
                    1
                };
                left -= count;
            }
        } else {
            // The first length goes out literally, the rest as repeats
            result.push((len, 0));
            left -= 1;
            while left > 0 {
                let count = if left >= 3 {
                    let count = left.min(6);
                    result.push((REP_3_6, (count - 3) as u8));
                    count
                } else {
                    result.push((len, 0));
                    1
                };
                left -= count;
            }
        }

        i += run;
    }

    result
}
