use super::decoder::DecodeTable;
use super::encoder::gen_codes;
use crate::error::TableKind;
use std::sync::OnceLock;

/// Fixed Huffman literal/length code lengths (RFC 1951 section 3.2.6)
pub fn fixed_literal_lengths() -> [u8; 288] {
    let mut lengths = [0u8; 288];
    lengths[0..=143].fill(8); // 0-143: 8 bits
    lengths[144..=255].fill(9); // 144-255: 9 bits
    lengths[256..=279].fill(7); // 256-279: 7 bits
    lengths[280..=287].fill(8); // 280-287: 8 bits
    lengths
}

/// Fixed Huffman distance code lengths (all 5 bits)
pub fn fixed_distance_lengths() -> [u8; 32] {
    [5u8; 32]
}

/// Bit-reversed codes and lengths of the fixed trees, ready for emission
pub struct StaticTrees {
    pub literal: Vec<(u16, u8)>,
    pub distance: Vec<(u16, u8)>,
}

/// Encoder-side fixed trees
pub fn static_trees() -> &'static StaticTrees {
    static TREES: OnceLock<StaticTrees> = OnceLock::new();
    TREES.get_or_init(|| {
        let lit_lengths = fixed_literal_lengths();
        let dist_lengths = fixed_distance_lengths();
        let literal = gen_codes(&lit_lengths).into_iter().zip(lit_lengths).collect();
        let distance = gen_codes(&dist_lengths).into_iter().zip(dist_lengths).collect();
        StaticTrees { literal, distance }
    })
}

/// Decoder-side fixed literal/length table
pub fn fixed_literal_table() -> &'static DecodeTable {
    static TABLE: OnceLock<DecodeTable> = OnceLock::new();
    TABLE.get_or_init(|| DecodeTable::fixed(&fixed_literal_lengths(), TableKind::LiteralLength))
}

/// Decoder-side fixed distance table
pub fn fixed_distance_table() -> &'static DecodeTable {
    static TABLE: OnceLock<DecodeTable> = OnceLock::new();
    TABLE.get_or_init(|| DecodeTable::fixed(&fixed_distance_lengths(), TableKind::Distance))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_literal_codes() {
        let trees = static_trees();
        assert_eq!(trees.literal.len(), 288);
        // Symbols 0-143: 8 bits starting at 00110000, stored reversed
        assert_eq!(trees.literal[0], (0b0000_1100, 8));
        assert_eq!(trees.literal[143].1, 8);
        assert_eq!(trees.literal[144].1, 9);
        assert_eq!(trees.literal[255].1, 9);
        // End of block is seven zero bits
        assert_eq!(trees.literal[256], (0, 7));
        assert_eq!(trees.literal[280].1, 8);
    }

    #[test]
    fn test_static_distance_codes() {
        let trees = static_trees();
        assert_eq!(trees.distance.len(), 32);
        assert_eq!(trees.distance[1], (0b10000, 5));
        assert!(trees.distance.iter().all(|&(_, len)| len == 5));
    }
}
