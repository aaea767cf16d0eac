use thiserror::Error;

/// Which alphabet a Huffman table was being built for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableKind {
    CodeLengths,
    LiteralLength,
    Distance,
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TableKind::CodeLengths => "code lengths",
            TableKind::LiteralLength => "literal/length",
            TableKind::Distance => "distance",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Usage errors
    #[error("Invalid window bits: {0} (expected 8-15)")]
    InvalidWindowBits(u8),

    #[error("Invalid memory level: {0} (expected 1-9)")]
    InvalidMemLevel(u8),

    #[error("Wrapper {0} cannot be used for compression")]
    UnsupportedWrap(&'static str),

    #[error("Stream already finished: only Flush::Finish may follow")]
    StreamFinished,

    #[error("Gzip extra field too long: {0} bytes (max 65535)")]
    GzipExtraTooLong(usize),

    #[error("Preset dictionary not accepted here: {0}")]
    DictionaryRejected(&'static str),

    #[error("Stream ended before completion")]
    Unfinished,

    #[error("Decompressor is searching for a flush point: call sync until one is found")]
    SyncInProgress,

    #[error("Incompatible library version: caller expects {expected}, library is {found}")]
    IncompatibleVersion { expected: String, found: &'static str },

    // Header errors
    #[error("Invalid gzip magic bytes: expected 0x1f8b, got 0x{0:04x}")]
    InvalidGzipMagic(u16),

    #[error("Incorrect zlib header check")]
    ZlibHeaderCheck,

    #[error("Unsupported compression method: {0} (only DEFLATE/8 supported)")]
    UnsupportedCompressionMethod(u8),

    #[error("Invalid window size in header: {0} bits exceeds configured {1}")]
    InvalidWindowSize(u8, u8),

    #[error("Unknown gzip header flags set: 0x{0:02x}")]
    ReservedFlags(u8),

    #[error("Gzip header CRC mismatch: expected 0x{expected:04x}, got 0x{found:04x}")]
    GzipHeaderCrcMismatch { expected: u16, found: u16 },

    #[error("Incorrect preset dictionary: expected id 0x{expected:08x}, got 0x{found:08x}")]
    IncorrectDictionary { expected: u32, found: u32 },

    // DEFLATE errors
    #[error("Invalid DEFLATE block type: {0}")]
    InvalidBlockType(u8),

    #[error("Stored block length mismatch: LEN={len}, NLEN={nlen}")]
    StoredBlockLengthMismatch { len: u16, nlen: u16 },

    #[error("Too many symbols: {literals} literal/length, {distances} distance")]
    TooManySymbols { literals: usize, distances: usize },

    #[error("Invalid Huffman code length: {0} (max 15)")]
    InvalidCodeLength(u8),

    #[error("Huffman code oversubscribed in {0} table")]
    HuffmanOversubscribed(TableKind),

    #[error("Huffman code incomplete in {0} table")]
    HuffmanIncomplete(TableKind),

    #[error("Invalid code length repeat")]
    InvalidLengthRepeat,

    #[error("Missing end-of-block code")]
    MissingEndOfBlock,

    #[error("Invalid Huffman code in {0} table")]
    InvalidHuffmanCode(TableKind),

    #[error("Invalid length code: {0}")]
    InvalidLengthCode(u16),

    #[error("Invalid distance code: {0}")]
    InvalidDistanceCode(u16),

    #[error("Back-reference distance {distance} exceeds available window {available}")]
    InvalidBackReference { distance: u32, available: usize },

    // Checksum errors
    #[error("Adler-32 mismatch: expected 0x{expected:08x}, got 0x{found:08x}")]
    Adler32Mismatch { expected: u32, found: u32 },

    #[error("CRC32 mismatch: expected 0x{expected:08x}, got 0x{found:08x}")]
    Crc32Mismatch { expected: u32, found: u32 },

    #[error("Size mismatch: expected {expected} bytes, got {found}")]
    SizeMismatch { expected: u32, found: u32 },

    #[error("Unexpected end of input")]
    UnexpectedEof,

    // Resource errors
    #[error("Failed to allocate {0} bytes")]
    OutOfMemory(usize),
}

/// Broad classes of failure, mirroring the zlib status families
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller misuse: bad parameters or call order
    Stream,
    /// Corrupt or truncated compressed data
    Data,
    /// Allocation failure
    Mem,
    /// Version handshake failure
    Version,
}

/// zlib-compatible numeric status codes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i8)]
pub enum StatusCode {
    Ok = 0,
    StreamEnd = 1,
    NeedDict = 2,
    StreamError = -2,
    DataError = -3,
    MemError = -4,
    BufError = -5,
    VersionError = -6,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidWindowBits(_)
            | Error::InvalidMemLevel(_)
            | Error::UnsupportedWrap(_)
            | Error::GzipExtraTooLong(_)
            | Error::StreamFinished
            | Error::SyncInProgress
            | Error::DictionaryRejected(_) => ErrorKind::Stream,
            Error::IncompatibleVersion { .. } => ErrorKind::Version,
            Error::OutOfMemory(_) => ErrorKind::Mem,
            _ => ErrorKind::Data,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Stream => StatusCode::StreamError,
            ErrorKind::Data => StatusCode::DataError,
            ErrorKind::Mem => StatusCode::MemError,
            ErrorKind::Version => StatusCode::VersionError,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Allocate a zero-filled buffer, reporting allocation failure instead of aborting
pub(crate) fn zeroed<T: Clone + Default>(len: usize) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| Error::OutOfMemory(len.saturating_mul(std::mem::size_of::<T>())))?;
    buf.resize(len, T::default());
    Ok(buf)
}
