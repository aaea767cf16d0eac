pub mod bits;
pub mod checksum;
pub mod deflate;
pub mod error;
pub mod gzip;
pub mod huffman;
pub mod inflate;
pub mod session;
pub mod stream;
pub mod zlib;

pub use checksum::{adler32, adler32_combine, crc32, crc32_combine};
pub use deflate::Deflater;
pub use error::{Error, ErrorKind, Result, StatusCode};
pub use gzip::GzipHeader;
pub use inflate::{Inflater, SyncStatus};
pub use session::{Mode, Session};

/// Library version reported by [`check_version`]
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compression level (0-9)
///
/// - Level 0: stored blocks only
/// - Levels 1-3: greedy matching, short hash chains
/// - Levels 4-9: lazy matching, progressively longer chains
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum CompressionLevel {
    Level0 = 0,
    Level1 = 1,
    Level2 = 2,
    Level3 = 3,
    Level4 = 4,
    Level5 = 5,
    #[default]
    Level6 = 6,
    Level7 = 7,
    Level8 = 8,
    Level9 = 9,
}

impl CompressionLevel {
    /// Create from numeric level (0-9), clamped to valid range
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Self::Level0,
            1 => Self::Level1,
            2 => Self::Level2,
            3 => Self::Level3,
            4 => Self::Level4,
            5 => Self::Level5,
            6 => Self::Level6,
            7 => Self::Level7,
            8 => Self::Level8,
            _ => Self::Level9,
        }
    }

    /// Get numeric level (0-9)
    pub fn level(&self) -> u8 {
        *self as u8
    }

    pub fn none() -> Self {
        Self::Level0
    }

    pub fn fast() -> Self {
        Self::Level1
    }

    pub fn best() -> Self {
        Self::Level9
    }
}

/// Match-finding policy for the compressor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Strategy {
    /// Level-selected greedy or lazy matching
    #[default]
    Default,
    /// Lazy matching that drops short matches, for data with small random variations
    Filtered,
    /// Literals only: Huffman coding without string matching
    HuffmanOnly,
    /// Run-length matching at distance 1 only
    Rle,
    /// Never emit dynamic Huffman trees
    Fixed,
}

/// Framing around the raw DEFLATE data
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Wrap {
    /// Bare RFC 1951 stream, no header or trailer
    Raw,
    /// RFC 1950: 2-byte header, Adler-32 trailer
    #[default]
    Zlib,
    /// RFC 1952: gzip member with CRC-32 and size trailer
    Gzip,
    /// Detect zlib or gzip from the first bytes (decompression only)
    Auto,
}

impl Wrap {
    pub fn name(&self) -> &'static str {
        match self {
            Wrap::Raw => "raw",
            Wrap::Zlib => "zlib",
            Wrap::Gzip => "gzip",
            Wrap::Auto => "auto",
        }
    }
}

/// How much of the buffered input a call must push out
///
/// Variants are ordered by strength; the compressor compares a new request
/// against the previous one to decide whether repeated calls make progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Flush {
    #[default]
    None,
    /// Treated as [`Flush::Sync`]
    Partial,
    /// Byte-align the output and emit an empty stored block
    Sync,
    /// Like `Sync`, and forget all history so decoding can restart here
    Full,
    /// Compress everything and write the trailer
    Finish,
}

/// Non-error outcome of a `deflate`/`inflate`/`process` call
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    /// Progress was made; call again with more input or output space
    Ok,
    /// The whole stream has been produced or consumed
    StreamEnd,
    /// The zlib header asks for a preset dictionary
    NeedDict,
    /// No progress was possible with the buffers given
    BufError,
}

impl Status {
    pub fn code(&self) -> StatusCode {
        match self {
            Status::Ok => StatusCode::Ok,
            Status::StreamEnd => StatusCode::StreamEnd,
            Status::NeedDict => StatusCode::NeedDict,
            Status::BufError => StatusCode::BufError,
        }
    }
}

/// Configuration for compression
#[derive(Clone, Debug)]
pub struct DeflateConfig {
    pub level: CompressionLevel,
    pub strategy: Strategy,
    /// Base-2 log of the window size (8-15); 8 is raised to 9
    pub window_bits: u8,
    /// Memory used for the match finder and symbol buffer (1-9)
    pub mem_level: u8,
    pub wrap: Wrap,
    /// Header fields written by the gzip wrapper (defaults when `None`)
    pub gzip_header: Option<GzipHeader>,
}

impl DeflateConfig {
    pub fn new(level: CompressionLevel, wrap: Wrap) -> Self {
        Self { level, wrap, ..Self::default() }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(8..=15).contains(&self.window_bits) {
            return Err(Error::InvalidWindowBits(self.window_bits));
        }
        if !(1..=9).contains(&self.mem_level) {
            return Err(Error::InvalidMemLevel(self.mem_level));
        }
        if self.wrap == Wrap::Auto {
            return Err(Error::UnsupportedWrap(self.wrap.name()));
        }
        if let Some(extra) = self.gzip_header.as_ref().and_then(|h| h.extra.as_ref()) {
            if extra.len() > u16::MAX as usize {
                return Err(Error::GzipExtraTooLong(extra.len()));
            }
        }
        Ok(())
    }
}

impl Default for DeflateConfig {
    fn default() -> Self {
        Self {
            level: CompressionLevel::default(),
            strategy: Strategy::Default,
            window_bits: 15,
            mem_level: 8,
            wrap: Wrap::Zlib,
            gzip_header: None,
        }
    }
}

/// Configuration for decompression
#[derive(Clone, Debug)]
pub struct InflateConfig {
    /// Largest window the stream may use (8-15)
    ///
    /// For wrapped streams 8 is raised to 9, matching what the compressor
    /// writes in the zlib header for a 256-byte window.
    pub window_bits: u8,
    pub wrap: Wrap,
}

impl InflateConfig {
    pub fn new(wrap: Wrap) -> Self {
        Self { wrap, ..Self::default() }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(8..=15).contains(&self.window_bits) {
            return Err(Error::InvalidWindowBits(self.window_bits));
        }
        Ok(())
    }

    /// Window size the decoder actually allocates and enforces
    pub(crate) fn effective_window_bits(&self) -> u8 {
        match self.wrap {
            Wrap::Raw => self.window_bits,
            Wrap::Zlib | Wrap::Gzip | Wrap::Auto => self.window_bits.max(9),
        }
    }
}

impl Default for InflateConfig {
    fn default() -> Self {
        Self { window_bits: 15, wrap: Wrap::Zlib }
    }
}

/// Verify that the caller was built against a compatible library version
///
/// Versions are compatible when their first two components agree.
pub fn check_version(expected: &str) -> Result<()> {
    let major_minor = |v: &str| {
        let mut parts = v.split('.');
        (parts.next().map(str::to_owned), parts.next().map(str::to_owned))
    };
    if major_minor(expected) == major_minor(VERSION) {
        Ok(())
    } else {
        Err(Error::IncompatibleVersion { expected: expected.to_owned(), found: VERSION })
    }
}

/// Output chunk size used by the one-shot helpers
const CHUNK: usize = 64 * 1024;

/// Compress `data` in one call
pub fn compress(data: &[u8], level: CompressionLevel, wrap: Wrap) -> Result<Vec<u8>> {
    compress_with(data, &DeflateConfig::new(level, wrap))
}

/// Compress `data` in one call with full control over the parameters
pub fn compress_with(data: &[u8], config: &DeflateConfig) -> Result<Vec<u8>> {
    let mut deflater = Deflater::new(config.clone())?;
    let mut out = Vec::with_capacity(data.len() / 2 + 64);
    let mut chunk = vec![0u8; CHUNK];
    let mut pos = 0;
    loop {
        let before_in = deflater.total_in();
        let before_out = deflater.total_out();
        let status = deflater.deflate(&data[pos..], &mut chunk, Flush::Finish)?;
        pos += (deflater.total_in() - before_in) as usize;
        let produced = (deflater.total_out() - before_out) as usize;
        out.extend_from_slice(&chunk[..produced]);
        if status == Status::StreamEnd {
            return Ok(out);
        }
    }
}

/// Decompress `data` in one call
///
/// With [`Wrap::Gzip`] or [`Wrap::Auto`], concatenated gzip members are
/// decoded in sequence. Trailing bytes after a raw or zlib stream are ignored.
pub fn decompress(data: &[u8], wrap: Wrap) -> Result<Vec<u8>> {
    let mut inflater = Inflater::new(InflateConfig::new(wrap))?;
    let mut out = Vec::with_capacity(data.len().saturating_mul(3));
    let mut chunk = vec![0u8; CHUNK];
    let mut pos = 0;
    loop {
        let before_in = inflater.total_in();
        let before_out = inflater.total_out();
        let status = inflater.inflate(&data[pos..], &mut chunk, Flush::None)?;
        let consumed = (inflater.total_in() - before_in) as usize;
        pos += consumed;
        let produced = (inflater.total_out() - before_out) as usize;
        out.extend_from_slice(&chunk[..produced]);
        match status {
            Status::StreamEnd => {
                let another_member = inflater.gzip_header().is_some()
                    && data.len() - pos >= 2
                    && data[pos] == gzip::MAGIC[0]
                    && data[pos + 1] == gzip::MAGIC[1];
                if !another_member {
                    return Ok(out);
                }
                log::debug!("gzip member ended at input offset {pos}, decoding next member");
                inflater.reset();
            }
            Status::NeedDict => return Err(Error::DictionaryRejected("one-shot decompression")),
            Status::Ok | Status::BufError => {
                if produced == 0 && (consumed == 0 || pos == data.len()) {
                    return Err(Error::UnexpectedEof);
                }
            }
        }
    }
}
