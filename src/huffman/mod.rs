pub mod decoder;
pub mod encoder;
pub mod tables;

pub use decoder::{DecodeTable, Entry};
pub use encoder::{HuffmanTree, TreeScratch};

/// Longest code in the literal/length and distance alphabets
pub const MAX_BITS: u8 = 15;

/// Longest code in the code-length alphabet
pub const MAX_BL_BITS: u8 = 7;

/// Literal/length symbols in use (the fixed tree defines 288)
pub const L_CODES: usize = 286;

/// Distance symbols in use (the fixed tree defines 32)
pub const D_CODES: usize = 30;

/// Code-length alphabet size
pub const BL_CODES: usize = 19;

/// End-of-block symbol
pub const END_BLOCK: usize = 256;
