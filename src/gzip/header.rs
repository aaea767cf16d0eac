use super::{extra_flags, MAGIC, METHOD_DEFLATE};
use crate::bits::BitWriter;
use crate::checksum::crc32;
use crate::{CompressionLevel, Strategy};

/// Gzip header flags (RFC 1952)
pub(crate) const FTEXT: u8 = 1 << 0;
pub(crate) const FHCRC: u8 = 1 << 1;
pub(crate) const FEXTRA: u8 = 1 << 2;
pub(crate) const FNAME: u8 = 1 << 3;
pub(crate) const FCOMMENT: u8 = 1 << 4;
pub(crate) const FRESERVED: u8 = 0xE0;

/// OS byte for "unknown"
pub const OS_UNKNOWN: u8 = 255;

/// gzip member header (RFC 1952)
///
/// Supplied to the compressor through `DeflateConfig::gzip_header`, and
/// filled in by the decompressor as it parses a member. Name and comment
/// are kept as raw bytes; gzip specifies ISO-8859-1 but writers rarely agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GzipHeader {
    /// FTEXT: the content is probably text
    pub text: bool,
    /// Modification time, seconds since the Unix epoch (0 if unknown)
    pub mtime: u32,
    /// XFL byte as read; computed from the level when writing
    pub extra_flags: u8,
    pub os: u8,
    /// FEXTRA subfields, at most 65535 bytes
    pub extra: Option<Vec<u8>>,
    /// Original file name, without the terminating zero
    pub filename: Option<Vec<u8>>,
    pub comment: Option<Vec<u8>>,
    /// FHCRC: a CRC-16 of the header precedes the compressed data
    pub header_crc: bool,
}

impl Default for GzipHeader {
    fn default() -> Self {
        Self {
            text: false,
            mtime: 0,
            extra_flags: 0,
            os: OS_UNKNOWN,
            extra: None,
            filename: None,
            comment: None,
            header_crc: false,
        }
    }
}

impl GzipHeader {
    pub fn with_filename(filename: impl Into<Vec<u8>>) -> Self {
        Self { filename: Some(filename.into()), ..Self::default() }
    }

    /// FLG byte for the fields present
    pub fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.text {
            flags |= FTEXT;
        }
        if self.header_crc {
            flags |= FHCRC;
        }
        if self.extra.is_some() {
            flags |= FEXTRA;
        }
        if self.filename.is_some() {
            flags |= FNAME;
        }
        if self.comment.is_some() {
            flags |= FCOMMENT;
        }
        flags
    }

    /// Queue the encoded header on `out`
    pub(crate) fn write(&self, out: &mut BitWriter, level: CompressionLevel, strategy: Strategy) {
        let mut bytes = Vec::with_capacity(10);
        bytes.extend_from_slice(&MAGIC);
        bytes.push(METHOD_DEFLATE);
        bytes.push(self.flags());
        bytes.extend_from_slice(&self.mtime.to_le_bytes());
        bytes.push(extra_flags(level, strategy));
        bytes.push(self.os);

        if let Some(extra) = &self.extra {
            // XLEN is 16 bits; DeflateConfig::validate rejects longer fields
            let len = extra.len().min(u16::MAX as usize);
            bytes.extend_from_slice(&(len as u16).to_le_bytes());
            bytes.extend_from_slice(&extra[..len]);
        }
        for field in [&self.filename, &self.comment].into_iter().flatten() {
            // A zero byte would end the field early
            bytes.extend(field.iter().copied().take_while(|&b| b != 0));
            bytes.push(0);
        }
        if self.header_crc {
            let crc = crc32(&bytes) as u16;
            bytes.extend_from_slice(&crc.to_le_bytes());
        }
        out.write_bytes(&bytes);
    }

    /// File name as text, falling back to Latin-1 when it is not UTF-8
    pub fn filename_str(&self) -> Option<String> {
        self.filename.as_deref().map(decode_text)
    }

    pub fn comment_str(&self) -> Option<String> {
        self.comment.as_deref().map(decode_text)
    }
}

fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_owned(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(header: &GzipHeader) -> Vec<u8> {
        let mut out = BitWriter::new();
        header.write(&mut out, CompressionLevel::Level6, Strategy::Default);
        out.finish()
    }

    #[test]
    fn test_minimal_header() {
        let bytes = encode(&GzipHeader::default());
        assert_eq!(bytes, vec![0x1f, 0x8b, 0x08, 0x00, 0, 0, 0, 0, 0x00, 0xff]);
    }

    #[test]
    fn test_header_with_filename() {
        let header = GzipHeader { mtime: 0x01020304, os: 3, ..GzipHeader::with_filename("test.txt") };
        let bytes = encode(&header);
        assert_eq!(bytes[3], FNAME);
        assert_eq!(&bytes[4..8], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(bytes[9], 3);
        assert_eq!(&bytes[10..], b"test.txt\0");
    }

    #[test]
    fn test_all_fields_and_header_crc() {
        let header = GzipHeader {
            text: true,
            extra: Some(vec![b'A', b'B', 2, 0, 7, 8]),
            filename: Some(b"f".to_vec()),
            comment: Some(b"c".to_vec()),
            header_crc: true,
            ..GzipHeader::default()
        };
        let bytes = encode(&header);
        assert_eq!(bytes[3], FTEXT | FHCRC | FEXTRA | FNAME | FCOMMENT);
        assert_eq!(&bytes[10..12], &[6, 0]);
        assert_eq!(&bytes[12..18], &[b'A', b'B', 2, 0, 7, 8]);
        assert_eq!(&bytes[18..22], b"f\0c\0");
        let body = &bytes[..bytes.len() - 2];
        let crc = crc32(body) as u16;
        assert_eq!(&bytes[bytes.len() - 2..], &crc.to_le_bytes());
    }

    #[test]
    fn test_latin1_fallback() {
        let header = GzipHeader::with_filename(vec![b'c', 0xE9]);
        assert_eq!(header.filename_str().as_deref(), Some("c\u{e9}"));
    }
}
