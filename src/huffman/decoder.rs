use super::MAX_BITS;
use crate::bits::{reverse_bits, BitAccumulator};
use crate::error::{Error, Result, TableKind};
use crate::stream::Source;

/// Root table size for the literal/length alphabet
pub const LITLEN_ROOT_BITS: u32 = 9;
/// Root table size for the distance alphabet
pub const DIST_ROOT_BITS: u32 = 6;
/// Root table size for the code-length alphabet
pub const CODELEN_ROOT_BITS: u32 = 7;

/// One slot of a decode table
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Entry {
    /// No code maps here
    #[default]
    Invalid,
    /// A complete code: `bits` is the full code length
    Symbol { value: u16, bits: u8 },
    /// Codes longer than the root: index the sub-table at `offset` with
    /// the next `bits` bits
    Link { offset: u16, bits: u8 },
}

/// Two-level table for canonical Huffman decoding
///
/// The root table is indexed by the next `root_bits` input bits (LSB-first,
/// so indices are bit-reversed codes). Codes longer than the root spill into
/// sub-tables appended after the root.
#[derive(Clone, Debug)]
pub struct DecodeTable {
    entries: Vec<Entry>,
    root_bits: u32,
    kind: TableKind,
}

impl DecodeTable {
    /// Empty table; every lookup is invalid until `rebuild` succeeds
    pub fn new(kind: TableKind) -> Self {
        Self { entries: vec![Entry::Invalid; 2], root_bits: 1, kind }
    }

    /// Build from code lengths (for dynamic Huffman blocks)
    pub fn build(lengths: &[u8], kind: TableKind) -> Result<Self> {
        let mut table = Self::new(kind);
        table.rebuild(lengths)?;
        Ok(table)
    }

    /// Build one of the fixed RFC 1951 tables, which are known to be complete
    pub(crate) fn fixed(lengths: &[u8], kind: TableKind) -> Self {
        let mut table = Self::new(kind);
        table.fill(lengths, &count_lengths(lengths));
        table
    }

    /// Replace this table's contents, reusing its allocation
    ///
    /// Over-subscribed code sets are rejected. Incomplete sets are rejected
    /// too, except a lone one-bit code in the code-length or distance
    /// alphabet; the unused half of such a table stays invalid.
    pub fn rebuild(&mut self, lengths: &[u8]) -> Result<()> {
        let count = count_lengths(lengths);
        if let Some(&bad) = lengths.iter().find(|&&l| l > MAX_BITS) {
            return Err(Error::InvalidCodeLength(bad));
        }

        let max = (1..=MAX_BITS as usize).rev().find(|&l| count[l] != 0).unwrap_or(0);
        let mut left: i32 = 1;
        for &c in &count[1..] {
            left <<= 1;
            left -= c as i32;
            if left < 0 {
                return Err(Error::HuffmanOversubscribed(self.kind));
            }
        }
        // Encoders emit a lone 1-bit distance code when a block uses one distance
        if max > 0 && left > 0 && (self.kind == TableKind::LiteralLength || max != 1) {
            return Err(Error::HuffmanIncomplete(self.kind));
        }

        self.fill(lengths, &count);
        Ok(())
    }

    fn fill(&mut self, lengths: &[u8], count: &[u16; MAX_BITS as usize + 1]) {
        let config_root = match self.kind {
            TableKind::LiteralLength => LITLEN_ROOT_BITS,
            TableKind::Distance => DIST_ROOT_BITS,
            TableKind::CodeLengths => CODELEN_ROOT_BITS,
        };
        let max = (1..=MAX_BITS as u32).rev().find(|&l| count[l as usize] != 0).unwrap_or(1);
        let root = config_root.min(max);
        let root_size = 1usize << root;

        let mut next_code = [0u32; MAX_BITS as usize + 1];
        let mut code = 0u32;
        for bits in 1..=MAX_BITS as usize {
            code = (code + count[bits - 1] as u32) << 1;
            next_code[bits] = code;
        }
        let codes: Vec<u32> = lengths
            .iter()
            .map(|&len| {
                if len == 0 {
                    return 0;
                }
                let c = reverse_bits(next_code[len as usize], len);
                next_code[len as usize] += 1;
                c
            })
            .collect();

        // Each root prefix needs a sub-table wide enough for its longest code
        let mut sub_bits = vec![0u8; root_size];
        for (&len, &c) in lengths.iter().zip(&codes) {
            if len as u32 > root {
                let prefix = (c as usize) & (root_size - 1);
                sub_bits[prefix] = sub_bits[prefix].max(len - root as u8);
            }
        }

        self.entries.clear();
        self.entries.resize(root_size, Entry::Invalid);
        self.root_bits = root;
        for (prefix, &bits) in sub_bits.iter().enumerate() {
            if bits > 0 {
                let offset = self.entries.len();
                self.entries[prefix] = Entry::Link { offset: offset as u16, bits };
                self.entries.resize(offset + (1 << bits), Entry::Invalid);
            }
        }

        for (symbol, (&len, &c)) in lengths.iter().zip(&codes).enumerate() {
            if len == 0 {
                continue;
            }
            let entry = Entry::Symbol { value: symbol as u16, bits: len };
            if len as u32 <= root {
                let mut index = c as usize;
                while index < root_size {
                    self.entries[index] = entry;
                    index += 1 << len;
                }
            } else if let Entry::Link { offset, bits } = self.entries[c as usize & (root_size - 1)]
            {
                let step = 1usize << (len as u32 - root);
                let mut index = (c >> root) as usize;
                while index < 1 << bits {
                    self.entries[offset as usize + index] = entry;
                    index += step;
                }
            }
        }
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn root_bits(&self) -> u32 {
        self.root_bits
    }

    /// Resolve the code at the front of `acc` without consuming it
    ///
    /// Yields `(symbol, code_length)`, or `None` when more bits must be
    /// pulled before the code can be told apart.
    #[inline]
    pub fn resolve(&self, acc: &BitAccumulator) -> Result<Option<(u16, u32)>> {
        let held = acc.bits();
        let entry = self.entries[acc.peek(self.root_bits) as usize];
        let entry = match entry {
            Entry::Link { offset, bits } => {
                let index = acc.peek(self.root_bits + bits as u32) >> self.root_bits;
                match self.entries[offset as usize + index as usize] {
                    Entry::Invalid if self.root_bits + bits as u32 <= held => {
                        return Err(Error::InvalidHuffmanCode(self.kind))
                    }
                    sub => sub,
                }
            }
            Entry::Invalid if self.root_bits <= held => {
                return Err(Error::InvalidHuffmanCode(self.kind))
            }
            root => root,
        };
        match entry {
            Entry::Symbol { value, bits } if bits as u32 <= held => Ok(Some((value, bits as u32))),
            _ => Ok(None),
        }
    }

    /// Decode one symbol, pulling single bytes from `src` as needed
    ///
    /// Returns `Ok(None)` when the input ran out first; the bits pulled so
    /// far stay in `acc` for the next attempt.
    #[inline]
    pub fn decode(&self, acc: &mut BitAccumulator, src: &mut Source<'_>) -> Result<Option<u16>> {
        loop {
            if let Some((symbol, bits)) = self.resolve(acc)? {
                acc.drop_bits(bits);
                return Ok(Some(symbol));
            }
            if !acc.pull_byte(src) {
                return Ok(None);
            }
        }
    }
}

fn count_lengths(lengths: &[u8]) -> [u16; MAX_BITS as usize + 1] {
    let mut count = [0u16; MAX_BITS as usize + 1];
    for &len in lengths {
        if len > 0 && len <= MAX_BITS {
            count[len as usize] += 1;
        }
    }
    count
}
