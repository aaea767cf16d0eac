//! zlib (RFC 1950) stream framing.

use crate::bits::BitWriter;
use crate::error::{Error, Result};
use crate::{CompressionLevel, Strategy};

/// FDICT bit in the FLG byte
pub const PRESET_DICT: u8 = 0x20;

/// CM value for DEFLATE
pub const METHOD_DEFLATE: u8 = 8;

/// Fields of a parsed CMF/FLG pair
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZlibHeader {
    /// Base-2 log of the encoder's window (8-15)
    pub window_bits: u8,
    /// FLEVEL: 0 fastest .. 3 maximum compression
    pub level_flags: u8,
    /// A 4-byte dictionary id follows the header
    pub has_dictionary: bool,
}

/// FLEVEL advertised for a level and strategy
pub fn level_flags(level: CompressionLevel, strategy: Strategy) -> u8 {
    let level = level.level();
    if matches!(strategy, Strategy::HuffmanOnly | Strategy::Rle | Strategy::Fixed) || level < 2 {
        0
    } else if level < 6 {
        1
    } else if level == 6 {
        2
    } else {
        3
    }
}

/// Queue the 2-byte header, plus the dictionary id when one is set
pub(crate) fn write_header(
    out: &mut BitWriter,
    window_bits: u8,
    level: CompressionLevel,
    strategy: Strategy,
    dict_id: Option<u32>,
) {
    let cmf = u16::from(METHOD_DEFLATE) | (u16::from(window_bits - 8) << 4);
    let mut header = (cmf << 8) | (u16::from(level_flags(level, strategy)) << 6);
    if dict_id.is_some() {
        header |= u16::from(PRESET_DICT);
    }
    header += 31 - header % 31;
    out.write_u16_be(header);
    if let Some(id) = dict_id {
        out.write_u32_be(id);
    }
}

/// Validate a CMF/FLG pair against the largest window the decoder accepts
pub fn parse_header(cmf: u8, flg: u8, max_window_bits: u8) -> Result<ZlibHeader> {
    if (u16::from(cmf) << 8 | u16::from(flg)) % 31 != 0 {
        return Err(Error::ZlibHeaderCheck);
    }
    if cmf & 0x0F != METHOD_DEFLATE {
        return Err(Error::UnsupportedCompressionMethod(cmf & 0x0F));
    }
    let window_bits = (cmf >> 4) + 8;
    if window_bits > max_window_bits {
        return Err(Error::InvalidWindowSize(window_bits, max_window_bits));
    }
    Ok(ZlibHeader {
        window_bits,
        level_flags: flg >> 6,
        has_dictionary: flg & PRESET_DICT != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(bits: u8, level: CompressionLevel, dict: Option<u32>) -> Vec<u8> {
        let mut out = BitWriter::new();
        write_header(&mut out, bits, level, Strategy::Default, dict);
        out.finish()
    }

    #[test]
    fn test_common_headers() {
        assert_eq!(header_bytes(15, CompressionLevel::Level6, None), vec![0x78, 0x9C]);
        assert_eq!(header_bytes(15, CompressionLevel::Level1, None), vec![0x78, 0x01]);
        assert_eq!(header_bytes(15, CompressionLevel::Level9, None), vec![0x78, 0xDA]);
        assert_eq!(header_bytes(15, CompressionLevel::Level4, None), vec![0x78, 0x5E]);
    }

    #[test]
    fn test_dictionary_header() {
        let bytes = header_bytes(15, CompressionLevel::Level6, Some(0x0102_0304));
        assert_eq!(bytes, vec![0x78, 0xBB, 0x01, 0x02, 0x03, 0x04]);
        let parsed = parse_header(bytes[0], bytes[1], 15).unwrap();
        assert!(parsed.has_dictionary);
        assert_eq!(parsed.level_flags, 2);
    }

    #[test]
    fn test_parse_rejects_bad_headers() {
        assert_eq!(parse_header(0x78, 0x9D, 15), Err(Error::ZlibHeaderCheck));
        // CM = 7, with a valid check
        let mut h: u16 = 0x7700;
        h += 31 - h % 31;
        assert_eq!(
            parse_header((h >> 8) as u8, h as u8, 15),
            Err(Error::UnsupportedCompressionMethod(7))
        );
        assert_eq!(parse_header(0x78, 0x9C, 12), Err(Error::InvalidWindowSize(15, 12)));
        assert_eq!(parse_header(0x08, 0x1D, 15).unwrap().window_bits, 8);
    }
}
