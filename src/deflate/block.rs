//! Block assembly: symbol buffering, tree construction and emission.

use super::tables::{
    distance_extra_bits, dist_code, length_code, length_extra_bits, CODE_LENGTH_ORDER,
    DISTANCE_TABLE, LENGTH_TABLE,
};
use super::tokens::{BlockType, LZ77Token};
use crate::bits::BitWriter;
use crate::huffman::encoder::{rle_encode_lengths, EXTRA_BL_BITS};
use crate::huffman::tables::{fixed_distance_lengths, fixed_literal_lengths, static_trees};
use crate::huffman::{HuffmanTree, TreeScratch, BL_CODES, D_CODES, END_BLOCK, L_CODES};
use crate::huffman::{MAX_BITS, MAX_BL_BITS};
use crate::Strategy;

/// Largest payload of a single stored block
pub const MAX_STORED: usize = 65_535;

/// Collects the symbols of the current block and writes finished blocks
pub struct BlockWriter {
    symbols: Vec<LZ77Token>,
    /// Symbols that fit before the block must be flushed
    sym_limit: usize,
    ltree: HuffmanTree,
    dtree: HuffmanTree,
    bltree: HuffmanTree,
    scratch: TreeScratch,
    lit_extra: [u8; 29],
    dist_extra: [u8; 30],
}

/// Size estimates for the three ways to send a block, in bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockCost {
    pub dynamic: u64,
    pub fixed: u64,
    pub stored: u64,
}

impl BlockWriter {
    /// Writer whose symbol buffer holds `lit_bufsize - 1` symbols
    pub fn new(lit_bufsize: usize) -> crate::Result<Self> {
        let mut symbols = Vec::new();
        symbols
            .try_reserve_exact(lit_bufsize)
            .map_err(|_| crate::Error::OutOfMemory(lit_bufsize * std::mem::size_of::<LZ77Token>()))?;
        let mut writer = Self {
            symbols,
            sym_limit: lit_bufsize - 1,
            ltree: HuffmanTree::new(L_CODES, MAX_BITS),
            dtree: HuffmanTree::new(D_CODES, MAX_BITS),
            bltree: HuffmanTree::new(BL_CODES, MAX_BL_BITS),
            scratch: TreeScratch::new(),
            lit_extra: length_extra_bits(),
            dist_extra: distance_extra_bits(),
        };
        writer.init_block();
        Ok(writer)
    }

    /// Start a new block: clear frequencies and the symbol buffer
    pub fn init_block(&mut self) {
        self.ltree.reset();
        self.dtree.reset();
        self.bltree.reset();
        self.ltree.freq[END_BLOCK] = 1;
        self.symbols.clear();
    }

    /// Number of buffered symbols
    pub fn pending_symbols(&self) -> usize {
        self.symbols.len()
    }

    /// Record a literal; true when the buffer is full and the block must be flushed
    #[inline]
    pub fn tally_lit(&mut self, byte: u8) -> bool {
        self.symbols.push(LZ77Token::Literal(byte));
        self.ltree.freq[byte as usize] += 1;
        self.symbols.len() == self.sym_limit
    }

    /// Record a match; true when the buffer is full and the block must be flushed
    #[inline]
    pub fn tally_dist(&mut self, distance: usize, length: usize) -> bool {
        debug_assert!((1..=32_768).contains(&distance));
        debug_assert!((3..=258).contains(&length));
        self.symbols.push(LZ77Token::Copy { length: length as u16, distance: distance as u16 });
        self.ltree.freq[length_code(length) + END_BLOCK + 1] += 1;
        self.dtree.freq[dist_code(distance)] += 1;
        self.symbols.len() == self.sym_limit
    }

    /// Build the dynamic trees for the buffered symbols and estimate each encoding
    ///
    /// Returns the estimates and the number of code-length codes to send.
    fn plan(&mut self, stored_len: usize) -> (BlockCost, usize) {
        self.ltree.build(&mut self.scratch);
        self.dtree.build(&mut self.scratch);

        // Code-length symbol frequencies come from the RLE of both trees
        let lit_rle = rle_encode_lengths(&self.ltree.len[..=self.ltree.max_code]);
        let dist_rle = rle_encode_lengths(&self.dtree.len[..=self.dtree.max_code]);
        for &(sym, _) in lit_rle.iter().chain(&dist_rle) {
            self.bltree.freq[sym as usize] += 1;
        }
        self.bltree.build(&mut self.scratch);

        // At least 4 code-length codes are always sent
        let mut max_blindex = BL_CODES - 1;
        while max_blindex >= 3 && self.bltree.len[CODE_LENGTH_ORDER[max_blindex]] == 0 {
            max_blindex -= 1;
        }
        let max_blindex = max_blindex.max(3);

        let opt_bits = self.ltree.cost(&self.lit_extra, END_BLOCK + 1)
            + self.dtree.cost(&self.dist_extra, 0)
            + self.bltree.cost(&EXTRA_BL_BITS, 0)
            + 3 * (max_blindex as u64 + 1)
            + 5
            + 5
            + 4;
        let static_bits = self.ltree.static_cost(
            &fixed_literal_lengths(),
            &self.lit_extra,
            END_BLOCK + 1,
        ) + self.dtree.static_cost(&fixed_distance_lengths(), &self.dist_extra, 0);

        let cost = BlockCost {
            // Three header bits, rounded up to whole bytes
            dynamic: (opt_bits + 3 + 7) >> 3,
            fixed: (static_bits + 3 + 7) >> 3,
            stored: stored_len as u64 + 4,
        };
        (cost, max_blindex + 1)
    }

    /// Emit the buffered symbols as one block, choosing the cheapest encoding
    ///
    /// `stored` is the raw input covered by the block when it is still in the
    /// window; without it a stored block cannot be produced.
    pub fn flush_block(
        &mut self,
        out: &mut BitWriter,
        stored: Option<&[u8]>,
        stored_len: usize,
        last: bool,
        level: u8,
        strategy: Strategy,
    ) -> BlockType {
        let block_type = if level == 0 {
            BlockType::Stored
        } else {
            let (cost, blcodes) = self.plan(stored_len);
            let mut best = cost.dynamic;
            if cost.fixed <= best || strategy == Strategy::Fixed {
                best = cost.fixed;
            }
            log::trace!(
                "block: {} symbols, {stored_len} input bytes, estimates dynamic={} fixed={} stored={}",
                self.symbols.len(),
                cost.dynamic,
                cost.fixed,
                cost.stored
            );
            if cost.stored <= best && stored.is_some() {
                BlockType::Stored
            } else if best == cost.fixed {
                self.compress_block(out, BlockType::FixedHuffman, last, blcodes);
                BlockType::FixedHuffman
            } else {
                self.compress_block(out, BlockType::DynamicHuffman, last, blcodes);
                BlockType::DynamicHuffman
            }
        };

        if block_type == BlockType::Stored {
            // Level 0 always has the data in the window
            write_stored(out, stored.unwrap_or(&[]), last);
        }
        self.init_block();
        if last {
            out.align_to_byte();
        }
        block_type
    }

    fn compress_block(&self, out: &mut BitWriter, kind: BlockType, last: bool, blcodes: usize) {
        out.write_bits(((kind as u32) << 1) | last as u32, 3);
        match kind {
            BlockType::FixedHuffman => {
                let trees = static_trees();
                self.send_symbols(out, &trees.literal, &trees.distance);
            }
            _ => {
                self.send_all_trees(out, blcodes);
                let lit: Vec<(u16, u8)> =
                    self.ltree.code.iter().copied().zip(self.ltree.len.iter().copied()).collect();
                let dist: Vec<(u16, u8)> =
                    self.dtree.code.iter().copied().zip(self.dtree.len.iter().copied()).collect();
                self.send_symbols(out, &lit, &dist);
            }
        }
    }

    /// Dynamic block header: counts, code-length code lengths, then both trees
    fn send_all_trees(&self, out: &mut BitWriter, blcodes: usize) {
        let lcodes = self.ltree.max_code + 1;
        let dcodes = self.dtree.max_code + 1;
        out.write_bits((lcodes - 257) as u32, 5);
        out.write_bits((dcodes - 1) as u32, 5);
        out.write_bits((blcodes - 4) as u32, 4);
        for &sym in CODE_LENGTH_ORDER.iter().take(blcodes) {
            out.write_bits(self.bltree.len[sym] as u32, 3);
        }
        for lengths in [&self.ltree.len[..lcodes], &self.dtree.len[..dcodes]] {
            for (sym, extra) in rle_encode_lengths(lengths) {
                out.write_code(self.bltree.code[sym as usize], self.bltree.len[sym as usize]);
                let extra_bits = EXTRA_BL_BITS[sym as usize];
                if extra_bits > 0 {
                    out.write_bits(extra as u32, extra_bits as u32);
                }
            }
        }
    }

    fn send_symbols(&self, out: &mut BitWriter, lit: &[(u16, u8)], dist: &[(u16, u8)]) {
        for token in &self.symbols {
            match *token {
                LZ77Token::Literal(byte) => {
                    let (code, len) = lit[byte as usize];
                    out.write_code(code, len);
                }
                LZ77Token::Copy { length, distance } => {
                    let lc = length_code(length as usize);
                    let (code, len) = lit[lc + END_BLOCK + 1];
                    out.write_code(code, len);
                    let (base, extra) = LENGTH_TABLE[lc];
                    if extra > 0 {
                        out.write_bits((length - base) as u32, extra as u32);
                    }

                    let dc = dist_code(distance as usize);
                    let (code, len) = dist[dc];
                    out.write_code(code, len);
                    let (base, extra) = DISTANCE_TABLE[dc];
                    if extra > 0 {
                        out.write_bits((distance - base) as u32, extra as u32);
                    }
                }
            }
        }
        let (code, len) = lit[END_BLOCK];
        out.write_code(code, len);
    }
}

/// Write `data` as stored blocks of at most 65535 bytes
///
/// Only the final piece carries the `last` flag. Empty input still produces
/// one (empty) block.
pub fn write_stored(out: &mut BitWriter, data: &[u8], last: bool) {
    let mut chunks = data.chunks(MAX_STORED).peekable();
    if chunks.peek().is_none() {
        stored_header(out, 0, last);
        return;
    }
    while let Some(chunk) = chunks.next() {
        stored_header(out, chunk.len() as u16, last && chunks.peek().is_none());
        out.write_bytes(chunk);
    }
}

fn stored_header(out: &mut BitWriter, len: u16, last: bool) {
    out.write_bits(((BlockType::Stored as u32) << 1) | last as u32, 3);
    out.align_to_byte();
    out.write_u16_le(len);
    out.write_u16_le(!len);
}
