//! gzip (RFC 1952) member framing.

mod header;

pub use header::{GzipHeader, OS_UNKNOWN};
pub(crate) use header::{FCOMMENT, FEXTRA, FHCRC, FNAME, FRESERVED, FTEXT};

use crate::{CompressionLevel, Strategy};

/// Magic bytes opening every gzip member
pub const MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Compression method byte for DEFLATE
pub const METHOD_DEFLATE: u8 = 8;

/// XFL byte advertising how hard the compressor worked
pub fn extra_flags(level: CompressionLevel, strategy: Strategy) -> u8 {
    if level == CompressionLevel::Level9 {
        2
    } else if level.level() < 2
        || matches!(strategy, Strategy::HuffmanOnly | Strategy::Rle | Strategy::Fixed)
    {
        4
    } else {
        0
    }
}
