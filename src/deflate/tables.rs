use std::sync::OnceLock;

/// Length codes 257-285: base length and extra bits
/// Index by (code - 257)
pub const LENGTH_TABLE: [(u16, u8); 29] = [
    // (base_length, extra_bits)
    (3, 0),   // 257
    (4, 0),   // 258
    (5, 0),   // 259
    (6, 0),   // 260
    (7, 0),   // 261
    (8, 0),   // 262
    (9, 0),   // 263
    (10, 0),  // 264
    (11, 1),  // 265
    (13, 1),  // 266
    (15, 1),  // 267
    (17, 1),  // 268
    (19, 2),  // 269
    (23, 2),  // 270
    (27, 2),  // 271
    (31, 2),  // 272
    (35, 3),  // 273
    (43, 3),  // 274
    (51, 3),  // 275
    (59, 3),  // 276
    (67, 4),  // 277
    (83, 4),  // 278
    (99, 4),  // 279
    (115, 4), // 280
    (131, 5), // 281
    (163, 5), // 282
    (195, 5), // 283
    (227, 5), // 284
    (258, 0), // 285 - special case
];

/// Distance codes 0-29: base distance and extra bits
pub const DISTANCE_TABLE: [(u16, u8); 30] = [
    // (base_distance, extra_bits)
    (1, 0),      // 0
    (2, 0),      // 1
    (3, 0),      // 2
    (4, 0),      // 3
    (5, 1),      // 4
    (7, 1),      // 5
    (9, 2),      // 6
    (13, 2),     // 7
    (17, 3),     // 8
    (25, 3),     // 9
    (33, 4),     // 10
    (49, 4),     // 11
    (65, 5),     // 12
    (97, 5),     // 13
    (129, 6),    // 14
    (193, 6),    // 15
    (257, 7),    // 16
    (385, 7),    // 17
    (513, 8),    // 18
    (769, 8),    // 19
    (1025, 9),   // 20
    (1537, 9),   // 21
    (2049, 10),  // 22
    (3073, 10),  // 23
    (4097, 11),  // 24
    (6145, 11),  // 25
    (8193, 12),  // 26
    (12289, 12), // 27
    (16385, 13), // 28
    (24577, 13), // 29
];

/// Order of code length alphabet for dynamic Huffman blocks
pub const CODE_LENGTH_ORDER: [usize; 19] =
    [16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15];

/// Shortest match length
pub const MIN_MATCH: usize = 3;
/// Longest match length
pub const MAX_MATCH: usize = 258;

/// Reverse lookups from match lengths and distances to their codes
struct CodeLookup {
    /// Length code index (0-28) for `length - 3`
    length: [u8; 256],
    /// Distance code for `dist - 1` below 256, then for `256 + ((dist - 1) >> 7)`
    distance: [u8; 512],
}

fn lookup() -> &'static CodeLookup {
    static LOOKUP: OnceLock<CodeLookup> = OnceLock::new();
    LOOKUP.get_or_init(|| {
        let mut length = [0u8; 256];
        for (code, &(base, extra)) in LENGTH_TABLE.iter().enumerate().take(28) {
            let start = base as usize - MIN_MATCH;
            length[start..start + (1 << extra)].fill(code as u8);
        }
        // 258 has its own code even though 284 could also express it
        length[255] = 28;

        let mut distance = [0u8; 512];
        for (code, &(base, extra)) in DISTANCE_TABLE.iter().enumerate() {
            let first = base as usize - 1;
            let last = first + (1usize << extra) - 1;
            for d in first..=last {
                let slot = if d < 256 { d } else { 256 + (d >> 7) };
                distance[slot] = code as u8;
            }
        }
        CodeLookup { length, distance }
    })
}

/// Length code index (0-28, i.e. symbol - 257) for a match length of 3-258
#[inline]
pub fn length_code(length: usize) -> usize {
    lookup().length[length - MIN_MATCH] as usize
}

/// Distance code (0-29) for a distance of 1-32768
#[inline]
pub fn dist_code(distance: usize) -> usize {
    let d = distance - 1;
    lookup().distance[if d < 256 { d } else { 256 + (d >> 7) }] as usize
}

/// Extra bits per length code index
pub fn length_extra_bits() -> [u8; 29] {
    LENGTH_TABLE.map(|(_, extra)| extra)
}

/// Extra bits per distance code
pub fn distance_extra_bits() -> [u8; 30] {
    DISTANCE_TABLE.map(|(_, extra)| extra)
}
