//! Decoding loop for when input and output are both plentiful.
//!
//! Entered from the literal/length state with at least 6 input bytes and
//! 258 bytes of output space, so a whole length/distance pair (at most 48
//! bits) can be decoded and copied without checking for suspension. The
//! loop runs while that holds, then hands unused whole bytes back to the
//! input.

use super::{Inflater, State};
use crate::deflate::tables::{DISTANCE_TABLE, LENGTH_TABLE};
use crate::error::{Error, Result};
use crate::huffman::tables::{fixed_distance_table, fixed_literal_table};
use crate::huffman::{D_CODES, END_BLOCK};
use crate::stream::{Sink, Source};

/// Input bytes that cover the longest length/distance pair
const MIN_INPUT: usize = 6;
/// Output space for the longest match
const MIN_OUTPUT: usize = 258;

impl Inflater {
    pub(super) fn inflate_fast(&mut self, src: &mut Source<'_>, sink: &mut Sink<'_>) -> Result<()> {
        let (lit, dist) = if self.use_fixed {
            (fixed_literal_table(), fixed_distance_table())
        } else {
            (&self.lit_table, &self.dist_table)
        };

        let result = loop {
            self.acc.refill(src);
            let Some((symbol, bits)) = lit.resolve(&self.acc)? else {
                break Ok(());
            };
            self.acc.drop_bits(bits);

            if symbol < 256 {
                sink.push(symbol as u8);
            } else if symbol as usize == END_BLOCK {
                self.state = State::Type;
                break Ok(());
            } else {
                let Some(&(base, extra)) = LENGTH_TABLE.get(symbol as usize - 257) else {
                    break Err(Error::InvalidLengthCode(symbol));
                };
                let length = base as usize + self.acc.take(extra as u32) as usize;

                let Some((symbol, bits)) = dist.resolve(&self.acc)? else {
                    // Not reachable with a full accumulator; resume in the slow path
                    self.length = length;
                    self.state = State::Dist;
                    break Ok(());
                };
                self.acc.drop_bits(bits);
                if symbol as usize >= D_CODES {
                    break Err(Error::InvalidDistanceCode(symbol));
                }
                let (base, extra) = DISTANCE_TABLE[symbol as usize];
                let distance = base as usize + self.acc.take(extra as u32) as usize;
                if distance > self.dmax {
                    break Err(Error::InvalidBackReference {
                        distance: distance as u32,
                        available: self.dmax,
                    });
                }

                let mut copied = 0;
                while copied < length {
                    copied += self.copy_match(sink, distance, length - copied)?;
                }
            }

            if src.available() < MIN_INPUT || sink.space() < MIN_OUTPUT {
                break Ok(());
            }
        };
        self.acc.give_back(src);
        result
    }
}
