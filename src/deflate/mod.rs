//! Streaming DEFLATE compressor.

pub mod block;
pub mod matcher;
pub mod strategy;
pub mod tables;
pub mod tokens;

pub use tokens::{BlockType, LZ77Token};

use crate::bits::BitWriter;
use crate::checksum::RunningCheck;
use crate::error::{Error, Result};
use crate::gzip::GzipHeader;
use crate::stream::{Sink, Source};
use crate::{zlib, CompressionLevel, DeflateConfig, Flush, Status, Strategy, Wrap};
use block::BlockWriter;
use matcher::{MatchFinder, SearchParams};
use strategy::{BlockState, Policy};
use tables::MIN_MATCH;

/// Search parameters and loop per level (good, lazy, nice, chain)
const LEVELS: [(SearchParams, Policy); 10] = [
    (params(0, 0, 0, 0), Policy::Stored),
    (params(4, 4, 8, 4), Policy::Fast),
    (params(4, 5, 16, 8), Policy::Fast),
    (params(4, 6, 32, 32), Policy::Fast),
    (params(4, 4, 16, 16), Policy::Slow),
    (params(8, 16, 32, 32), Policy::Slow),
    (params(8, 16, 128, 128), Policy::Slow),
    (params(8, 32, 128, 256), Policy::Slow),
    (params(32, 128, 258, 1024), Policy::Slow),
    (params(32, 258, 258, 4096), Policy::Slow),
];

const fn params(good: usize, lazy: usize, nice: usize, chain: usize) -> SearchParams {
    SearchParams { good_length: good, max_lazy: lazy, nice_length: nice, max_chain: chain }
}

/// Where the compressor is in the stream
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    /// Nothing written yet; the header goes out on the first call
    Init,
    /// Compressing
    Busy,
    /// The final block is being written; only `Flush::Finish` is accepted
    Finishing,
    /// The trailer has been queued
    Done,
}

/// Resumable DEFLATE compressor with optional zlib or gzip framing
///
/// Each call to [`Deflater::deflate`] consumes as much input and fills as
/// much output as it can, then reports how far it got through
/// [`total_in`](Deflater::total_in) and [`total_out`](Deflater::total_out).
pub struct Deflater {
    config: DeflateConfig,
    w_bits: u8,
    state: State,
    pub(crate) mf: MatchFinder,
    pub(crate) blocks: BlockWriter,
    /// Pending output, drained into the caller's buffers
    pub(crate) out: BitWriter,
    pub(crate) check: RunningCheck,
    policy: Policy,
    /// Lazy-matching state carried between positions (and calls)
    pub(crate) match_length: usize,
    pub(crate) prev_length: usize,
    pub(crate) prev_match: usize,
    pub(crate) match_available: bool,
    /// Flush mode of the previous call; `None` once progress was cut short
    last_flush: Option<Flush>,
    /// Adler-32 of the preset dictionary, announced in the zlib header
    dict_id: Option<u32>,
    total_in: u64,
    total_out: u64,
    last_error: Option<String>,
}

impl Deflater {
    pub fn new(config: DeflateConfig) -> Result<Self> {
        config.validate()?;
        // A 256-byte window cannot hold a full match plus lookahead
        let w_bits = config.window_bits.max(9);
        let (search, policy) = LEVELS[config.level.level() as usize];
        let lit_bufsize = 1usize << (config.mem_level + 6);
        let check = match config.wrap {
            Wrap::Zlib => RunningCheck::adler(),
            Wrap::Gzip => RunningCheck::crc(),
            Wrap::Raw | Wrap::Auto => RunningCheck::None,
        };
        log::debug!(
            "deflate init: level {} {:?} {} window 2^{w_bits} mem_level {}",
            config.level.level(),
            config.strategy,
            config.wrap.name(),
            config.mem_level
        );
        Ok(Self {
            mf: MatchFinder::new(w_bits, config.mem_level, search)?,
            blocks: BlockWriter::new(lit_bufsize)?,
            out: BitWriter::with_capacity(lit_bufsize * 4),
            check,
            policy,
            w_bits,
            state: State::Init,
            match_length: MIN_MATCH - 1,
            prev_length: MIN_MATCH - 1,
            prev_match: 0,
            match_available: false,
            last_flush: None,
            dict_id: None,
            total_in: 0,
            total_out: 0,
            last_error: None,
            config,
        })
    }

    /// Shorthand for a default configuration at `level` with `wrap`
    pub fn with_level(level: CompressionLevel, wrap: Wrap) -> Result<Self> {
        Self::new(DeflateConfig::new(level, wrap))
    }

    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Running checksum of the input consumed so far (0 for raw streams)
    pub fn checksum(&self) -> u32 {
        self.check.value()
    }

    /// Message of the most recent error, if any
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn config(&self) -> &DeflateConfig {
        &self.config
    }

    /// Whether every byte of the stream has been produced
    pub fn is_finished(&self) -> bool {
        self.state == State::Done && self.out.is_drained()
    }

    fn fail<T>(&mut self, err: Error) -> Result<T> {
        self.last_error = Some(err.to_string());
        Err(err)
    }

    /// Compress `input` into `output`
    ///
    /// Returns [`Status::StreamEnd`] once `Flush::Finish` has produced the
    /// whole stream, [`Status::BufError`] when no progress was possible, and
    /// [`Status::Ok`] otherwise.
    pub fn deflate(&mut self, input: &[u8], output: &mut [u8], flush: Flush) -> Result<Status> {
        let mut src = Source::new(input);
        let mut sink = Sink::new(output);
        let result = self.deflate_inner(&mut src, &mut sink, flush);
        self.total_in += src.consumed() as u64;
        self.total_out += sink.written() as u64;
        result
    }

    fn deflate_inner(
        &mut self,
        src: &mut Source<'_>,
        sink: &mut Sink<'_>,
        flush: Flush,
    ) -> Result<Status> {
        if matches!(self.state, State::Finishing | State::Done) && flush != Flush::Finish {
            return self.fail(Error::StreamFinished);
        }
        if sink.space() == 0 {
            return Ok(Status::BufError);
        }

        let old_flush = self.last_flush;
        self.last_flush = Some(flush);

        // Earlier output goes first
        if !self.out.is_drained() {
            self.out.drain_into(sink);
            if !self.out.is_drained() {
                self.last_flush = None;
                return Ok(Status::Ok);
            }
        } else if src.is_empty()
            && old_flush.is_some_and(|old| flush <= old)
            && flush != Flush::Finish
        {
            // Repeating a call that cannot do anything new
            return Ok(Status::BufError);
        }

        if matches!(self.state, State::Finishing | State::Done) && !src.is_empty() {
            return Ok(Status::BufError);
        }

        if self.state == State::Init {
            self.write_header();
            self.state = State::Busy;
            self.out.drain_into(sink);
            if !self.out.is_drained() {
                self.last_flush = None;
                return Ok(Status::Ok);
            }
        }

        if !src.is_empty()
            || self.mf.lookahead != 0
            || (flush != Flush::None && self.state == State::Busy)
        {
            let bstate = match (self.policy, self.config.strategy) {
                (Policy::Stored, _) => self.deflate_stored(src, sink, flush),
                (_, Strategy::HuffmanOnly) => self.deflate_huff(src, sink, flush),
                (_, Strategy::Rle) => self.deflate_rle(src, sink, flush),
                (Policy::Fast, _) => self.deflate_fast(src, sink, flush),
                (Policy::Slow, _) => self.deflate_slow(src, sink, flush),
            };

            if matches!(bstate, BlockState::FinishStarted | BlockState::FinishDone) {
                self.state = State::Finishing;
            }
            match bstate {
                BlockState::NeedMore | BlockState::FinishStarted => {
                    if sink.is_full() {
                        // Room was the limit: the next call must not report BufError
                        self.last_flush = None;
                    }
                    return Ok(Status::Ok);
                }
                BlockState::BlockDone => {
                    if flush != Flush::None {
                        // Partial, Sync and Full all end on a byte-aligned empty stored block
                        block::write_stored(&mut self.out, &[], false);
                        if flush == Flush::Full {
                            self.mf.clear_hash();
                            if self.mf.lookahead == 0 {
                                self.mf.strstart = 0;
                                self.mf.block_start = 0;
                                self.mf.insert = 0;
                            }
                        }
                        log::trace!("deflate: {flush:?} flush point at input offset {}", self.total_in + src.consumed() as u64);
                    }
                    self.out.drain_into(sink);
                    if !self.out.is_drained() {
                        self.last_flush = None;
                        return Ok(Status::Ok);
                    }
                }
                BlockState::FinishDone => {}
            }
        }

        if flush != Flush::Finish {
            return Ok(Status::Ok);
        }

        if self.state != State::Done {
            self.write_trailer(src.consumed() as u64);
            self.state = State::Done;
        }
        self.out.drain_into(sink);
        if self.out.is_drained() {
            log::debug!(
                "deflate end: {} bytes in, {} bytes out",
                self.total_in + src.consumed() as u64,
                self.total_out + sink.written() as u64
            );
            Ok(Status::StreamEnd)
        } else {
            Ok(Status::Ok)
        }
    }

    fn write_header(&mut self) {
        match self.config.wrap {
            Wrap::Zlib => {
                zlib::write_header(
                    &mut self.out,
                    self.w_bits,
                    self.config.level,
                    self.config.strategy,
                    self.dict_id,
                );
            }
            Wrap::Gzip => {
                let default = GzipHeader::default();
                let header = self.config.gzip_header.as_ref().unwrap_or(&default);
                header.write(&mut self.out, self.config.level, self.config.strategy);
            }
            Wrap::Raw | Wrap::Auto => {}
        }
        if self.config.wrap != Wrap::Raw {
            log::debug!("deflate: {} header written", self.config.wrap.name());
        }
    }

    /// Queue the trailer; `consumed_now` covers input not yet in `total_in`
    fn write_trailer(&mut self, consumed_now: u64) {
        match self.config.wrap {
            Wrap::Zlib => self.out.write_u32_be(self.check.value()),
            Wrap::Gzip => {
                self.out.write_u32_le(self.check.value());
                // ISIZE is the input length modulo 2^32
                self.out.write_u32_le((self.total_in + consumed_now) as u32);
            }
            Wrap::Raw | Wrap::Auto => {}
        }
    }

    /// Prime the window with a preset dictionary
    ///
    /// zlib streams accept a dictionary only before the first call; raw
    /// streams accept one at the start or right after a flush point, when no
    /// block is open. gzip has no way to announce a dictionary.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        match self.config.wrap {
            Wrap::Gzip | Wrap::Auto => {
                return self.fail(Error::DictionaryRejected("gzip streams cannot carry one"))
            }
            Wrap::Zlib if self.state != State::Init => {
                return self.fail(Error::DictionaryRejected("compression already started"))
            }
            _ => {}
        }
        // Held symbols and lookahead both belong to the open block
        let block_open = self.blocks.pending_symbols() != 0
            || self.mf.block_start != self.mf.strstart as isize;
        if self.mf.lookahead != 0 || block_open {
            return self.fail(Error::DictionaryRejected("input is still buffered"));
        }

        if self.config.wrap == Wrap::Zlib {
            self.dict_id = Some(crate::checksum::adler32(dictionary));
        }
        self.mf.load_dictionary(dictionary);
        self.match_length = MIN_MATCH - 1;
        self.prev_length = MIN_MATCH - 1;
        self.match_available = false;
        log::debug!("deflate: {} byte preset dictionary loaded", dictionary.len());
        Ok(())
    }

    /// Start a new stream with the same configuration, keeping allocations
    pub fn reset(&mut self) {
        self.mf.reset();
        self.blocks.init_block();
        self.out.clear();
        self.check.reset();
        self.state = State::Init;
        self.match_length = MIN_MATCH - 1;
        self.prev_length = MIN_MATCH - 1;
        self.prev_match = 0;
        self.match_available = false;
        self.last_flush = None;
        self.dict_id = None;
        self.total_in = 0;
        self.total_out = 0;
        self.last_error = None;
    }

    /// Release the compressor
    ///
    /// Fails with [`Error::Unfinished`] when a stream was started but not
    /// finished, since the remaining data is lost.
    pub fn end(self) -> Result<()> {
        if self.state == State::Busy {
            log::warn!("deflate ended mid-stream after {} input bytes", self.total_in);
            return Err(Error::Unfinished);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Deflater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deflater")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("total_in", &self.total_in)
            .field("total_out", &self.total_out)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decompress, CompressionLevel, Wrap};

    fn compress_chunked(deflater: &mut Deflater, data: &[u8], in_chunk: usize, out_chunk: usize) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = vec![0u8; out_chunk];
        let mut pos = 0;
        loop {
            let end = (pos + in_chunk).min(data.len());
            let flush = if end == data.len() { Flush::Finish } else { Flush::None };
            let before_in = deflater.total_in();
            let before_out = deflater.total_out();
            let status = deflater.deflate(&data[pos..end], &mut buf, flush).unwrap();
            pos += (deflater.total_in() - before_in) as usize;
            out.extend_from_slice(&buf[..(deflater.total_out() - before_out) as usize]);
            if status == Status::StreamEnd {
                return out;
            }
        }
    }

    fn sample_text(len: usize) -> Vec<u8> {
        let words = ["alpha ", "beta ", "gamma ", "delta ", "epsilon ", "zeta "];
        let mut state = 12345u32;
        let mut out = Vec::with_capacity(len);
        while out.len() < len {
            state = state.wrapping_mul(1103515245).wrapping_add(12345);
            out.extend_from_slice(words[(state >> 16) as usize % words.len()].as_bytes());
        }
        out.truncate(len);
        out
    }

    #[test]
    fn test_every_level_roundtrips_with_tiny_buffers() {
        let data = sample_text(20_000);
        for level in 0..=9 {
            let mut deflater =
                Deflater::with_level(CompressionLevel::from_level(level), Wrap::Zlib).unwrap();
            let compressed = compress_chunked(&mut deflater, &data, 7, 5);
            assert_eq!(decompress(&compressed, Wrap::Zlib).unwrap(), data, "level {level}");
            assert!(deflater.is_finished());
        }
    }

    #[test]
    fn test_strategies_roundtrip() {
        let mut data = sample_text(30_000);
        data.extend(std::iter::repeat(b'r').take(1000));
        for strategy in [
            Strategy::Default,
            Strategy::Filtered,
            Strategy::HuffmanOnly,
            Strategy::Rle,
            Strategy::Fixed,
        ] {
            let config = DeflateConfig { strategy, wrap: Wrap::Raw, ..DeflateConfig::default() };
            let mut deflater = Deflater::new(config).unwrap();
            let compressed = compress_chunked(&mut deflater, &data, 4096, 4096);
            assert_eq!(decompress(&compressed, Wrap::Raw).unwrap(), data, "{strategy:?}");
        }
    }

    #[test]
    fn test_empty_finish_stream() {
        let mut deflater = Deflater::with_level(CompressionLevel::Level6, Wrap::Zlib).unwrap();
        let mut buf = [0u8; 64];
        assert_eq!(deflater.deflate(&[], &mut buf, Flush::Finish).unwrap(), Status::StreamEnd);
        let n = deflater.total_out() as usize;
        // Header, an empty fixed block, and the Adler-32 of nothing
        assert_eq!(&buf[..n], &[0x78, 0x9C, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn test_output_space_of_zero_is_buf_error() {
        let mut deflater = Deflater::with_level(CompressionLevel::Level1, Wrap::Raw).unwrap();
        assert_eq!(deflater.deflate(b"abc", &mut [], Flush::None).unwrap(), Status::BufError);
    }

    #[test]
    fn test_repeated_call_without_progress_is_buf_error() {
        let mut deflater = Deflater::with_level(CompressionLevel::Level6, Wrap::Raw).unwrap();
        let mut buf = [0u8; 256];
        assert_eq!(deflater.deflate(b"some input", &mut buf, Flush::None).unwrap(), Status::Ok);
        assert_eq!(deflater.deflate(&[], &mut buf, Flush::None).unwrap(), Status::BufError);
        // A stronger flush is progress
        assert_eq!(deflater.deflate(&[], &mut buf, Flush::Sync).unwrap(), Status::Ok);
    }

    #[test]
    fn test_sync_flush_ends_with_marker() {
        let mut deflater = Deflater::with_level(CompressionLevel::Level6, Wrap::Raw).unwrap();
        let mut buf = [0u8; 256];
        deflater.deflate(b"flush me", &mut buf, Flush::Sync).unwrap();
        let n = deflater.total_out() as usize;
        assert_eq!(&buf[n - 4..n], &[0x00, 0x00, 0xFF, 0xFF]);
        // Everything so far decodes without the final block
        let mut inflater = crate::Inflater::new(crate::InflateConfig::new(Wrap::Raw)).unwrap();
        let mut out = [0u8; 64];
        inflater.inflate(&buf[..n], &mut out, Flush::Sync).unwrap();
        assert_eq!(&out[..inflater.total_out() as usize], b"flush me");
    }

    #[test]
    fn test_only_finish_after_finish() {
        let mut deflater = Deflater::with_level(CompressionLevel::Level6, Wrap::Raw).unwrap();
        let mut buf = [0u8; 4];
        // Too little room to finish in one call
        deflater.deflate(b"abcdefghijklmnopqrstuvwxyz", &mut buf, Flush::Finish).unwrap();
        let err = deflater.deflate(&[], &mut buf, Flush::None).unwrap_err();
        assert_eq!(err, Error::StreamFinished);
        assert!(deflater.last_error().is_some());
    }

    #[test]
    fn test_gzip_trailer_has_size() {
        let data = sample_text(1000);
        let mut deflater = Deflater::with_level(CompressionLevel::Level6, Wrap::Gzip).unwrap();
        let compressed = compress_chunked(&mut deflater, &data, 100, 64);
        let n = compressed.len();
        assert_eq!(&compressed[n - 4..], &1000u32.to_le_bytes());
        assert_eq!(&compressed[n - 8..n - 4], &crate::crc32(&data).to_le_bytes());
        assert_eq!(deflater.checksum(), crate::crc32(&data));
    }

    #[test]
    fn test_dictionary_rules() {
        let mut gzip = Deflater::with_level(CompressionLevel::Level6, Wrap::Gzip).unwrap();
        assert!(matches!(gzip.set_dictionary(b"dict"), Err(Error::DictionaryRejected(_))));

        let mut zlib = Deflater::with_level(CompressionLevel::Level6, Wrap::Zlib).unwrap();
        zlib.set_dictionary(b"dictionary").unwrap();
        let mut buf = [0u8; 64];
        zlib.deflate(b"x", &mut buf, Flush::None).unwrap();
        assert!(zlib.set_dictionary(b"late").is_err());
        // FDICT is set and the dictionary id follows the header
        assert_eq!(buf[1] & 0x20, 0x20);
        assert_eq!(&buf[2..6], &crate::adler32(b"dictionary").to_be_bytes());
    }

    #[test]
    fn test_end_mid_stream_is_unfinished() {
        let mut deflater = Deflater::with_level(CompressionLevel::Level6, Wrap::Zlib).unwrap();
        let mut buf = [0u8; 64];
        deflater.deflate(b"data", &mut buf, Flush::None).unwrap();
        assert_eq!(deflater.end(), Err(Error::Unfinished));

        let fresh = Deflater::with_level(CompressionLevel::Level6, Wrap::Zlib).unwrap();
        assert!(fresh.end().is_ok());
    }

    #[test]
    fn test_reset_produces_identical_stream() {
        let data = sample_text(5000);
        let mut deflater = Deflater::with_level(CompressionLevel::Level9, Wrap::Gzip).unwrap();
        let first = compress_chunked(&mut deflater, &data, 5000, 1 << 16);
        deflater.reset();
        let second = compress_chunked(&mut deflater, &data, 5000, 1 << 16);
        assert_eq!(first, second);
    }

    #[test]
    fn test_thirty_bytes_of_a() {
        let data = [b'a'; 30];
        let compressed = crate::compress(&data, CompressionLevel::Level6, Wrap::Raw).unwrap();
        assert!(compressed.len() <= 8, "got {} bytes", compressed.len());
    }
}
