#![no_main]

use libfuzzer_sys::fuzz_target;
use zflate::{Flush, InflateConfig, Inflater, Wrap};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // First byte picks the framing and the output chunk size
    let wrap = match data[0] % 3 {
        0 => Wrap::Raw,
        1 => Wrap::Zlib,
        _ => Wrap::Auto,
    };
    let chunk = 1 + (data[0] as usize >> 2) * 37;
    let input = &data[1..];

    let mut inflater = Inflater::new(InflateConfig::new(wrap)).unwrap();
    let mut buf = vec![0u8; chunk];
    let mut pos = 0;

    // Decoding may fail on invalid input - that's OK
    // We're looking for panics/hangs, not errors
    for _ in 0..100_000 {
        let before_in = inflater.total_in();
        let before_out = inflater.total_out();
        match inflater.inflate(&input[pos..], &mut buf, Flush::None) {
            Ok(zflate::Status::Ok) => {}
            _ => break,
        }
        pos += (inflater.total_in() - before_in) as usize;
        if inflater.total_in() == before_in && inflater.total_out() == before_out {
            break;
        }
    }
});
