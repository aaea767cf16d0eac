//! The compression loops: one per match-finding policy.
//!
//! Each loop consumes input into the window, tallies symbols and flushes a
//! block whenever the symbol buffer fills. They stop early when the caller's
//! output fills up, leaving the state ready to resume.

use super::matcher::{MIN_LOOKAHEAD, TOO_FAR};
use super::tables::{MAX_MATCH, MIN_MATCH};
use super::Deflater;
use crate::stream::{Sink, Source};
use crate::{Flush, Strategy};

/// Outcome of one run of a compression loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockState {
    /// More input or output space is needed
    NeedMore,
    /// A block was completed for the requested flush
    BlockDone,
    /// The final block was started but not fully written out
    FinishStarted,
    /// The final block has been written
    FinishDone,
}

/// Which loop a level runs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Policy {
    Stored,
    Fast,
    Slow,
}

/// Flush the current block; bail out of the loop if the output filled up
macro_rules! flush_block {
    ($self:ident, $sink:ident, $last:expr) => {
        $self.flush_block_only($sink, $last);
        if $sink.is_full() {
            return if $last { BlockState::FinishStarted } else { BlockState::NeedMore };
        }
    };
}

impl Deflater {
    /// Close the current block at `strstart` and push pending output to `sink`
    pub(super) fn flush_block_only(&mut self, sink: &mut Sink<'_>, last: bool) {
        let mf = &self.mf;
        let stored_len = (mf.strstart as isize - mf.block_start) as usize;
        let stored = if mf.block_start >= 0 {
            Some(&mf.window[mf.block_start as usize..mf.strstart])
        } else {
            None
        };
        self.blocks.flush_block(
            &mut self.out,
            stored,
            stored_len,
            last,
            self.config.level.level(),
            self.config.strategy,
        );
        self.mf.block_start = self.mf.strstart as isize;
        self.out.drain_into(sink);
    }

    /// The end of every loop: flush what is left according to `flush`
    fn finish_loop(&mut self, sink: &mut Sink<'_>, flush: Flush) -> BlockState {
        if flush == Flush::Finish {
            flush_block!(self, sink, true);
            return BlockState::FinishDone;
        }
        if self.blocks.pending_symbols() > 0 {
            flush_block!(self, sink, false);
        }
        BlockState::BlockDone
    }

    /// Level 0: copy input into stored blocks without searching for matches
    pub(super) fn deflate_stored(
        &mut self,
        src: &mut Source<'_>,
        sink: &mut Sink<'_>,
        flush: Flush,
    ) -> BlockState {
        let max_block_size = super::block::MAX_STORED as isize;
        loop {
            if self.mf.lookahead <= 1 {
                self.mf.fill_window(src, &mut self.check);
                if self.mf.lookahead == 0 {
                    if flush == Flush::None {
                        return BlockState::NeedMore;
                    }
                    break;
                }
            }
            self.mf.strstart += self.mf.lookahead;
            self.mf.lookahead = 0;

            let max_start = self.mf.block_start + max_block_size;
            if self.mf.strstart as isize >= max_start {
                self.mf.lookahead = (self.mf.strstart as isize - max_start) as usize;
                self.mf.strstart = max_start as usize;
                flush_block!(self, sink, false);
            }
            // Flush before the window slides the block's data away
            if self.mf.strstart as isize - self.mf.block_start >= self.mf.max_dist() as isize {
                flush_block!(self, sink, false);
            }
        }
        self.mf.insert = 0;
        if flush == Flush::Finish {
            flush_block!(self, sink, true);
            return BlockState::FinishDone;
        }
        if self.mf.strstart as isize > self.mf.block_start {
            flush_block!(self, sink, false);
        }
        BlockState::BlockDone
    }

    /// Greedy matching: take the longest match at each position
    pub(super) fn deflate_fast(
        &mut self,
        src: &mut Source<'_>,
        sink: &mut Sink<'_>,
        flush: Flush,
    ) -> BlockState {
        let mut match_length;
        loop {
            if self.mf.lookahead < MIN_LOOKAHEAD {
                self.mf.fill_window(src, &mut self.check);
                if self.mf.lookahead < MIN_LOOKAHEAD && flush == Flush::None {
                    return BlockState::NeedMore;
                }
                if self.mf.lookahead == 0 {
                    break;
                }
            }

            let mut hash_head = 0;
            if self.mf.lookahead >= MIN_MATCH {
                hash_head = self.mf.insert_string(self.mf.strstart);
            }
            match_length = 0;
            if hash_head != 0 && self.mf.strstart - hash_head <= self.mf.max_dist() {
                match_length = self.mf.longest_match(hash_head, MIN_MATCH - 1);
            }

            let bflush;
            if match_length >= MIN_MATCH {
                let distance = self.mf.strstart - self.mf.match_start;
                bflush = self.blocks.tally_dist(distance, match_length);
                self.mf.lookahead -= match_length;

                // Short matches get every string hashed; long ones only restart the hash
                if match_length <= self.mf.params.max_lazy && self.mf.lookahead >= MIN_MATCH {
                    for _ in 1..match_length {
                        self.mf.strstart += 1;
                        self.mf.insert_string(self.mf.strstart);
                    }
                    self.mf.strstart += 1;
                } else {
                    self.mf.strstart += match_length;
                    self.mf.reset_hash_at(self.mf.strstart);
                }
            } else {
                bflush = self.blocks.tally_lit(self.mf.window[self.mf.strstart]);
                self.mf.lookahead -= 1;
                self.mf.strstart += 1;
            }
            if bflush {
                flush_block!(self, sink, false);
            }
        }
        self.mf.insert = self.mf.strstart.min(MIN_MATCH - 1);
        self.finish_loop(sink, flush)
    }

    /// Lazy matching: emit a match only if the next position has no longer one
    pub(super) fn deflate_slow(
        &mut self,
        src: &mut Source<'_>,
        sink: &mut Sink<'_>,
        flush: Flush,
    ) -> BlockState {
        loop {
            if self.mf.lookahead < MIN_LOOKAHEAD {
                self.mf.fill_window(src, &mut self.check);
                if self.mf.lookahead < MIN_LOOKAHEAD && flush == Flush::None {
                    return BlockState::NeedMore;
                }
                if self.mf.lookahead == 0 {
                    break;
                }
            }

            let mut hash_head = 0;
            if self.mf.lookahead >= MIN_MATCH {
                hash_head = self.mf.insert_string(self.mf.strstart);
            }

            self.prev_length = self.match_length;
            self.prev_match = self.mf.match_start;
            self.match_length = MIN_MATCH - 1;

            if hash_head != 0
                && self.prev_length < self.mf.params.max_lazy
                && self.mf.strstart - hash_head <= self.mf.max_dist()
            {
                self.match_length = self.mf.longest_match(hash_head, self.prev_length);
                let too_far = self.match_length == MIN_MATCH
                    && self.mf.strstart - self.mf.match_start > TOO_FAR;
                if self.match_length <= 5
                    && (self.config.strategy == Strategy::Filtered || too_far)
                {
                    self.match_length = MIN_MATCH - 1;
                }
            }

            if self.prev_length >= MIN_MATCH && self.match_length <= self.prev_length {
                // The previous match wins: emit it and hash the strings it covers
                let max_insert = self.mf.strstart + self.mf.lookahead - MIN_MATCH;
                let distance = self.mf.strstart - 1 - self.prev_match;
                let bflush = self.blocks.tally_dist(distance, self.prev_length);

                self.mf.lookahead -= self.prev_length - 1;
                for _ in 0..self.prev_length - 2 {
                    self.mf.strstart += 1;
                    if self.mf.strstart <= max_insert {
                        self.mf.insert_string(self.mf.strstart);
                    }
                }
                self.match_available = false;
                self.match_length = MIN_MATCH - 1;
                self.mf.strstart += 1;

                if bflush {
                    flush_block!(self, sink, false);
                }
            } else if self.match_available {
                // The previous position had no better match: emit its byte
                let bflush = self.blocks.tally_lit(self.mf.window[self.mf.strstart - 1]);
                if bflush {
                    self.flush_block_only(sink, false);
                }
                self.mf.strstart += 1;
                self.mf.lookahead -= 1;
                if sink.is_full() {
                    return BlockState::NeedMore;
                }
            } else {
                // Defer the decision to the next position
                self.match_available = true;
                self.mf.strstart += 1;
                self.mf.lookahead -= 1;
            }
        }

        if self.match_available {
            self.blocks.tally_lit(self.mf.window[self.mf.strstart - 1]);
            self.match_available = false;
        }
        self.mf.insert = self.mf.strstart.min(MIN_MATCH - 1);
        self.finish_loop(sink, flush)
    }

    /// Run-length matching: only distance-1 matches are searched
    pub(super) fn deflate_rle(
        &mut self,
        src: &mut Source<'_>,
        sink: &mut Sink<'_>,
        flush: Flush,
    ) -> BlockState {
        loop {
            if self.mf.lookahead <= MAX_MATCH {
                self.mf.fill_window(src, &mut self.check);
                if self.mf.lookahead <= MAX_MATCH && flush == Flush::None {
                    return BlockState::NeedMore;
                }
                if self.mf.lookahead == 0 {
                    break;
                }
            }

            let mut match_length = 0;
            let strstart = self.mf.strstart;
            if self.mf.lookahead >= MIN_MATCH && strstart > 0 {
                let window = &self.mf.window;
                let prev = window[strstart - 1];
                match_length = window[strstart..strstart + MAX_MATCH]
                    .iter()
                    .take_while(|&&b| b == prev)
                    .count()
                    .min(self.mf.lookahead);
            }

            let bflush = if match_length >= MIN_MATCH {
                let bflush = self.blocks.tally_dist(1, match_length);
                self.mf.lookahead -= match_length;
                self.mf.strstart += match_length;
                bflush
            } else {
                let bflush = self.blocks.tally_lit(self.mf.window[strstart]);
                self.mf.lookahead -= 1;
                self.mf.strstart += 1;
                bflush
            };
            if bflush {
                flush_block!(self, sink, false);
            }
        }
        self.mf.insert = 0;
        self.finish_loop(sink, flush)
    }

    /// Literals only, for data where matches do not pay off
    pub(super) fn deflate_huff(
        &mut self,
        src: &mut Source<'_>,
        sink: &mut Sink<'_>,
        flush: Flush,
    ) -> BlockState {
        loop {
            if self.mf.lookahead == 0 {
                self.mf.fill_window(src, &mut self.check);
                if self.mf.lookahead == 0 {
                    if flush == Flush::None {
                        return BlockState::NeedMore;
                    }
                    break;
                }
            }
            let bflush = self.blocks.tally_lit(self.mf.window[self.mf.strstart]);
            self.mf.lookahead -= 1;
            self.mf.strstart += 1;
            if bflush {
                flush_block!(self, sink, false);
            }
        }
        self.mf.insert = 0;
        self.finish_loop(sink, flush)
    }
}
