//! One handle for either direction.
//!
//! A [`Session`] wraps a compressor or a decompressor behind the same
//! `process`/`set_dictionary`/`end` calls, for callers that pick the
//! direction at run time.

use crate::error::Result;
use crate::{
    CompressionLevel, DeflateConfig, Deflater, Flush, InflateConfig, Inflater, Status, Wrap,
};

/// Direction of a [`Session`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Compress,
    Decompress,
}

#[derive(Debug)]
pub enum Session {
    Compress(Box<Deflater>),
    Decompress(Box<Inflater>),
}

impl Session {
    /// Create a session; `level` is ignored when decompressing
    pub fn init(mode: Mode, level: CompressionLevel, window_bits: u8, wrap: Wrap) -> Result<Self> {
        match mode {
            Mode::Compress => {
                Self::from_deflate(DeflateConfig { level, window_bits, wrap, ..DeflateConfig::default() })
            }
            Mode::Decompress => Self::from_inflate(InflateConfig { window_bits, wrap }),
        }
    }

    /// Compression session with full control over strategy, memory and gzip header
    pub fn from_deflate(config: DeflateConfig) -> Result<Self> {
        Ok(Session::Compress(Box::new(Deflater::new(config)?)))
    }

    pub fn from_inflate(config: InflateConfig) -> Result<Self> {
        Ok(Session::Decompress(Box::new(Inflater::new(config)?)))
    }

    pub fn mode(&self) -> Mode {
        match self {
            Session::Compress(_) => Mode::Compress,
            Session::Decompress(_) => Mode::Decompress,
        }
    }

    /// Run one step of compression or decompression
    pub fn process(&mut self, input: &[u8], output: &mut [u8], flush: Flush) -> Result<Status> {
        match self {
            Session::Compress(d) => d.deflate(input, output, flush),
            Session::Decompress(i) => i.inflate(input, output, flush),
        }
    }

    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        match self {
            Session::Compress(d) => d.set_dictionary(dictionary),
            Session::Decompress(i) => i.set_dictionary(dictionary),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Session::Compress(d) => d.reset(),
            Session::Decompress(i) => i.reset(),
        }
    }

    pub fn total_in(&self) -> u64 {
        match self {
            Session::Compress(d) => d.total_in(),
            Session::Decompress(i) => i.total_in(),
        }
    }

    pub fn total_out(&self) -> u64 {
        match self {
            Session::Compress(d) => d.total_out(),
            Session::Decompress(i) => i.total_out(),
        }
    }

    /// Adler-32 or CRC-32 of the uncompressed data so far
    pub fn checksum(&self) -> u32 {
        match self {
            Session::Compress(d) => d.checksum(),
            Session::Decompress(i) => i.checksum(),
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        match self {
            Session::Compress(d) => d.last_error(),
            Session::Decompress(i) => i.last_error(),
        }
    }

    /// Release the session, reporting a stream left unfinished
    pub fn end(self) -> Result<()> {
        match self {
            Session::Compress(d) => d.end(),
            Session::Decompress(i) => i.end(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn run(session: &mut Session, input: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 1024];
        let mut pos = 0;
        loop {
            let before_in = session.total_in();
            let before_out = session.total_out();
            let status = session.process(&input[pos..], &mut buf, Flush::Finish).unwrap();
            pos += (session.total_in() - before_in) as usize;
            out.extend_from_slice(&buf[..(session.total_out() - before_out) as usize]);
            if status == Status::StreamEnd {
                return out;
            }
        }
    }

    #[test]
    fn test_session_roundtrip() {
        let data = b"sessions work in both directions ".repeat(200);
        for wrap in [Wrap::Raw, Wrap::Zlib, Wrap::Gzip] {
            let mut compress = Session::init(Mode::Compress, CompressionLevel::Level6, 15, wrap).unwrap();
            assert_eq!(compress.mode(), Mode::Compress);
            let compressed = run(&mut compress, &data);
            let checksum = compress.checksum();
            compress.end().unwrap();

            let mut decompress = Session::init(Mode::Decompress, CompressionLevel::Level6, 15, wrap).unwrap();
            assert_eq!(run(&mut decompress, &compressed), data);
            assert_eq!(decompress.checksum(), checksum);
            decompress.end().unwrap();
        }
    }

    #[test]
    fn test_session_rejects_bad_parameters() {
        let err = Session::init(Mode::Compress, CompressionLevel::Level6, 16, Wrap::Zlib).unwrap_err();
        assert_eq!(err, Error::InvalidWindowBits(16));
        let err = Session::init(Mode::Compress, CompressionLevel::Level6, 15, Wrap::Auto).unwrap_err();
        assert_eq!(err, Error::UnsupportedWrap("auto"));
        assert!(Session::init(Mode::Decompress, CompressionLevel::Level6, 15, Wrap::Auto).is_ok());
    }

    #[test]
    fn test_session_raw_dictionary() {
        let dictionary = b"a shared preamble for every record";
        let record = b"a shared preamble for every record, then the body";

        let mut compress = Session::init(Mode::Compress, CompressionLevel::Level9, 15, Wrap::Raw).unwrap();
        compress.set_dictionary(dictionary).unwrap();
        let compressed = run(&mut compress, record);

        let mut decompress = Session::init(Mode::Decompress, CompressionLevel::Level9, 15, Wrap::Raw).unwrap();
        decompress.set_dictionary(dictionary).unwrap();
        assert_eq!(run(&mut decompress, &compressed), record);
    }

    #[test]
    fn test_session_from_full_configs() {
        let data = b"rrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrr runs compress well ".repeat(50);
        let config = DeflateConfig {
            strategy: crate::Strategy::Rle,
            mem_level: 1,
            ..DeflateConfig::new(CompressionLevel::Level4, Wrap::Gzip)
        };
        let mut compress = Session::from_deflate(config).unwrap();
        let compressed = run(&mut compress, &data);
        assert!(compressed.len() < data.len() / 2);

        let mut decompress = Session::from_inflate(InflateConfig::new(Wrap::Auto)).unwrap();
        assert_eq!(decompress.mode(), Mode::Decompress);
        assert_eq!(run(&mut decompress, &compressed), data);
    }
}
