//! Hash-chained LZ77 match finder over a doubled sliding window.

use super::tables::{MAX_MATCH, MIN_MATCH};
use crate::checksum::RunningCheck;
use crate::error::{zeroed, Result};
use crate::stream::Source;

/// Lookahead kept available so a match can always run to full length
pub const MIN_LOOKAHEAD: usize = MAX_MATCH + MIN_MATCH + 1;

/// Chain terminator; position 0 can therefore never be matched
const NIL: u16 = 0;

/// Matches of length 3 further back than this are not worth their distance code
pub const TOO_FAR: usize = 4096;

/// Search effort for one compression level
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchParams {
    /// Halve the chain budget once the current match reaches this length
    pub good_length: usize,
    /// Skip lazy evaluation (or insertion, for greedy levels) above this length
    pub max_lazy: usize,
    /// Stop searching once a match this long is found
    pub nice_length: usize,
    /// Maximum chain links followed per search
    pub max_chain: usize,
}

/// Sliding window, hash chains and the cursor over the input
pub struct MatchFinder {
    /// Two window halves; matches may reach back one full half
    pub window: Vec<u8>,
    pub w_size: usize,
    w_mask: usize,
    /// Most recent position per hash value
    head: Vec<u16>,
    /// Previous position with the same hash, indexed by position & w_mask
    prev: Vec<u16>,
    ins_h: usize,
    hash_mask: usize,
    hash_shift: u32,
    /// Next byte to be processed
    pub strstart: usize,
    /// Valid bytes from `strstart`
    pub lookahead: usize,
    /// Start of the longest match found by the last search
    pub match_start: usize,
    /// Bytes before `strstart` still waiting to be hashed
    pub insert: usize,
    /// Window offset where the current block began; negative once slid past
    pub block_start: isize,
    pub params: SearchParams,
}

impl MatchFinder {
    pub fn new(w_bits: u8, mem_level: u8, params: SearchParams) -> Result<Self> {
        let w_size = 1usize << w_bits;
        let hash_bits = mem_level as u32 + 7;
        let hash_size = 1usize << hash_bits;
        Ok(Self {
            window: zeroed(2 * w_size)?,
            w_size,
            w_mask: w_size - 1,
            head: zeroed(hash_size)?,
            prev: zeroed(w_size)?,
            ins_h: 0,
            hash_mask: hash_size - 1,
            hash_shift: (hash_bits + MIN_MATCH as u32 - 1) / MIN_MATCH as u32,
            strstart: 0,
            lookahead: 0,
            match_start: 0,
            insert: 0,
            block_start: 0,
            params,
        })
    }

    /// Farthest distance a match may reach back
    #[inline]
    pub fn max_dist(&self) -> usize {
        self.w_size - MIN_LOOKAHEAD
    }

    /// Forget all history, as at the start of a stream
    pub fn reset(&mut self) {
        self.clear_hash();
        self.strstart = 0;
        self.lookahead = 0;
        self.match_start = 0;
        self.insert = 0;
        self.block_start = 0;
        self.ins_h = 0;
    }

    /// Empty the hash chains so no later match refers to earlier data
    pub fn clear_hash(&mut self) {
        self.head.fill(NIL);
    }

    #[inline]
    fn update_hash(&self, h: usize, byte: u8) -> usize {
        ((h << self.hash_shift) ^ byte as usize) & self.hash_mask
    }

    /// Start the rolling hash at `pos` (needs the two following bytes)
    #[inline]
    pub fn reset_hash_at(&mut self, pos: usize) {
        self.ins_h = self.update_hash(self.window[pos] as usize, self.window[pos + 1]);
    }

    /// Hash the string at `pos`, link it into its chain and return the previous head
    #[inline]
    pub fn insert_string(&mut self, pos: usize) -> usize {
        self.ins_h = self.update_hash(self.ins_h, self.window[pos + MIN_MATCH - 1]);
        let head = self.head[self.ins_h];
        self.prev[pos & self.w_mask] = head;
        self.head[self.ins_h] = pos as u16;
        head as usize
    }

    /// Move the upper half of the window down and rebase every chain entry
    fn slide(&mut self) {
        let w_size = self.w_size;
        self.window.copy_within(w_size..2 * w_size, 0);
        self.match_start = self.match_start.saturating_sub(w_size);
        self.strstart -= w_size;
        self.block_start -= w_size as isize;
        if self.insert > self.strstart {
            self.insert = self.strstart;
        }
        let rebase = |entry: &mut u16| {
            *entry = if *entry as usize >= w_size { *entry - w_size as u16 } else { NIL };
        };
        self.head.iter_mut().for_each(rebase);
        self.prev.iter_mut().for_each(rebase);
    }

    /// Top up the lookahead from `src`, sliding the window when needed
    ///
    /// Bytes read are fed to `check`. Returns when the lookahead reaches
    /// `MIN_LOOKAHEAD` or the input is exhausted.
    pub fn fill_window(&mut self, src: &mut Source<'_>, check: &mut RunningCheck) {
        loop {
            let mut more = self.window.len() - self.lookahead - self.strstart;

            if self.strstart >= self.w_size + self.max_dist() {
                self.slide();
                more += self.w_size;
            }
            if src.is_empty() {
                break;
            }

            let start = self.strstart + self.lookahead;
            let bytes = src.take(more);
            self.window[start..start + bytes.len()].copy_from_slice(bytes);
            check.update(bytes);
            self.lookahead += bytes.len();

            // Hash the bytes left unhashed before the last block boundary
            if self.lookahead + self.insert >= MIN_MATCH {
                let mut pos = self.strstart - self.insert;
                self.reset_hash_at(pos);
                while self.insert > 0 {
                    self.insert_string(pos);
                    pos += 1;
                    self.insert -= 1;
                    if self.lookahead + self.insert < MIN_MATCH {
                        break;
                    }
                }
            }

            if self.lookahead >= MIN_LOOKAHEAD || src.is_empty() {
                break;
            }
        }
    }

    /// Longest match at `strstart` along the chain starting at `cur_match`
    ///
    /// Only matches longer than `prev_length` are considered. Sets
    /// `match_start` and returns the length, never more than the lookahead.
    pub fn longest_match(&mut self, mut cur_match: usize, prev_length: usize) -> usize {
        let SearchParams { good_length, nice_length, max_chain, .. } = self.params;
        let mut chain_length = max_chain;
        let scan = self.strstart;
        let mut best_len = prev_length;
        let nice = nice_length.min(self.lookahead);
        let limit = self.strstart.saturating_sub(self.max_dist());

        if prev_length >= good_length {
            chain_length >>= 1;
        }

        let window = &self.window;
        let mut scan_end1 = window[scan + best_len - 1];
        let mut scan_end = window[scan + best_len];

        loop {
            let m = cur_match;
            // Reject on the bytes that would extend the best match before a full compare
            if window[m + best_len] == scan_end
                && window[m + best_len - 1] == scan_end1
                && window[m] == window[scan]
                && window[m + 1] == window[scan + 1]
            {
                let len = window[scan + 2..scan + MAX_MATCH]
                    .iter()
                    .zip(&window[m + 2..m + MAX_MATCH])
                    .take_while(|(a, b)| a == b)
                    .count()
                    + 2;

                if len > best_len {
                    self.match_start = m;
                    best_len = len;
                    if len >= nice {
                        break;
                    }
                    scan_end1 = window[scan + best_len - 1];
                    scan_end = window[scan + best_len];
                }
            }

            cur_match = self.prev[cur_match & self.w_mask] as usize;
            chain_length = chain_length.saturating_sub(1);
            if cur_match <= limit || chain_length == 0 {
                break;
            }
        }

        best_len.min(self.lookahead)
    }

    /// Load a preset dictionary into the window and hash every string in it
    ///
    /// Only the last `w_size` bytes are kept. The bytes are history, not
    /// input: they are not checksummed and are never emitted.
    pub fn load_dictionary(&mut self, dictionary: &[u8]) {
        let dictionary = if dictionary.len() >= self.w_size {
            self.reset();
            &dictionary[dictionary.len() - self.w_size..]
        } else {
            dictionary
        };

        let mut src = Source::new(dictionary);
        let mut no_check = RunningCheck::None;
        self.fill_window(&mut src, &mut no_check);
        while self.lookahead >= MIN_MATCH {
            let mut pos = self.strstart;
            let n = self.lookahead - (MIN_MATCH - 1);
            for _ in 0..n {
                self.insert_string(pos);
                pos += 1;
            }
            self.strstart = pos;
            self.lookahead = MIN_MATCH - 1;
            self.fill_window(&mut src, &mut no_check);
        }
        self.strstart += self.lookahead;
        self.block_start = self.strstart as isize;
        self.insert = self.lookahead;
        self.lookahead = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: SearchParams =
        SearchParams { good_length: 8, max_lazy: 16, nice_length: 128, max_chain: 128 };

    fn finder_with(data: &[u8]) -> MatchFinder {
        let mut mf = MatchFinder::new(15, 8, PARAMS).unwrap();
        let mut src = Source::new(data);
        mf.fill_window(&mut src, &mut RunningCheck::None);
        mf
    }

    #[test]
    fn test_fill_window_checksums_input() {
        let data = b"hello hello hello";
        let mut mf = MatchFinder::new(15, 8, PARAMS).unwrap();
        let mut check = RunningCheck::adler();
        mf.fill_window(&mut Source::new(data), &mut check);
        assert_eq!(mf.lookahead, data.len());
        assert_eq!(check.value(), crate::checksum::adler32(data));
    }

    #[test]
    fn test_finds_repeated_string() {
        let data = b"xabcdefgh-abcdefgh-tail";
        let mut mf = finder_with(data);
        // Hash every position up to the second copy of "abcdefgh"
        mf.reset_hash_at(0);
        for pos in 0..10 {
            mf.insert_string(pos);
        }
        mf.strstart = 10;
        mf.lookahead = data.len() - 10;
        let head = mf.insert_string(10);
        assert_eq!(head, 1);
        let len = mf.longest_match(head, MIN_MATCH - 1);
        assert_eq!(len, 9, "abcdefgh- repeats");
        assert_eq!(mf.match_start, 1);
    }

    #[test]
    fn test_match_clamped_to_lookahead() {
        let data = vec![b'z'; 40];
        let mut mf = finder_with(&data);
        mf.reset_hash_at(0);
        for pos in 1..5 {
            mf.insert_string(pos);
        }
        mf.strstart = 5;
        mf.lookahead = 10;
        let head = mf.insert_string(5);
        assert_eq!(mf.longest_match(head, MIN_MATCH - 1), 10);
    }

    #[test]
    fn test_slide_rebases_chains() {
        let mut mf = MatchFinder::new(9, 1, PARAMS).unwrap();
        let data: Vec<u8> = (0..4096u32).map(|i| (i % 7) as u8).collect();
        let mut src = Source::new(&data);
        mf.fill_window(&mut src, &mut RunningCheck::None);
        assert_eq!(mf.lookahead, 1024, "window holds two halves of 512 bytes");
        mf.reset_hash_at(0);
        for pos in 0..800 {
            mf.insert_string(pos);
        }
        mf.strstart = 800;
        mf.lookahead -= 800;
        mf.fill_window(&mut src, &mut RunningCheck::None);
        assert_eq!(mf.strstart, 288);
        assert_eq!(mf.lookahead, 224 + 512);
        // Every surviving chain entry points into the slid window
        assert!(mf.head.iter().all(|&p| (p as usize) < 288));
        assert!(mf.prev.iter().all(|&p| (p as usize) < 288));
    }

    #[test]
    fn test_dictionary_becomes_history() {
        let mut mf = MatchFinder::new(15, 8, PARAMS).unwrap();
        mf.load_dictionary(b"the quick brown fox");
        assert_eq!(mf.strstart, 19);
        assert_eq!(mf.block_start, 19);
        assert_eq!(mf.lookahead, 0);
        assert_eq!(&mf.window[..19], b"the quick brown fox");
    }
}
