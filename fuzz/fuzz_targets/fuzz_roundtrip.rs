#![no_main]

use libfuzzer_sys::fuzz_target;
use flate2::read::ZlibDecoder;
use std::io::Read;
use zflate::{compress_with, decompress, CompressionLevel, DeflateConfig, Strategy, Wrap};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // Limit data size to avoid slowdowns
    let (params, data) = data.split_at(2);
    let data = if data.len() > 64 * 1024 { &data[..64 * 1024] } else { data };

    let strategy = match params[1] % 5 {
        0 => Strategy::Default,
        1 => Strategy::Filtered,
        2 => Strategy::HuffmanOnly,
        3 => Strategy::Rle,
        _ => Strategy::Fixed,
    };
    let config = DeflateConfig {
        level: CompressionLevel::from_level(params[0] % 10),
        strategy,
        window_bits: 8 + (params[0] >> 4) % 8,
        mem_level: 1 + (params[1] >> 4) % 9,
        wrap: Wrap::Zlib,
        gzip_header: None,
    };

    let compressed = compress_with(data, &config).expect("compression never fails");

    // Our own decoder and a reference decoder must both restore the input
    let restored = decompress(&compressed, Wrap::Zlib).expect("own output decodes");
    assert_eq!(restored, data, "Round-trip mismatch");

    let mut reference = Vec::new();
    ZlibDecoder::new(&compressed[..]).read_to_end(&mut reference).expect("flate2 decodes");
    assert_eq!(reference, data, "Reference decoder mismatch");
});
