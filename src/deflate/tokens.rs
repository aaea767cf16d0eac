/// Represents a single token in the LZ77 stream
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LZ77Token {
    /// A literal byte
    Literal(u8),
    /// A back-reference: copy `length` bytes from `distance` bytes back
    Copy { length: u16, distance: u16 },
}

/// DEFLATE block encodings (BTYPE)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum BlockType {
    Stored = 0,
    FixedHuffman = 1,
    DynamicHuffman = 2,
}

impl BlockType {
    /// Decode the 2-bit BTYPE field; 3 is reserved
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(BlockType::Stored),
            1 => Some(BlockType::FixedHuffman),
            2 => Some(BlockType::DynamicHuffman),
            _ => None,
        }
    }
}
