pub mod adler32;
pub mod crc32;

pub use adler32::{adler32, adler32_combine, Adler32};
pub use crc32::{crc32, crc32_combine, Crc32};

/// The integrity check a wrapper carries over the uncompressed bytes
#[derive(Clone, Debug, Default)]
pub enum RunningCheck {
    /// Raw DEFLATE: nothing to track
    #[default]
    None,
    /// zlib trailer
    Adler(Adler32),
    /// gzip trailer
    Crc(Crc32),
}

impl RunningCheck {
    pub fn adler() -> Self {
        RunningCheck::Adler(Adler32::new())
    }

    pub fn crc() -> Self {
        RunningCheck::Crc(Crc32::new())
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            RunningCheck::None => {}
            RunningCheck::Adler(adler) => adler.update(data),
            RunningCheck::Crc(crc) => crc.update(data),
        }
    }

    /// Current value; raw streams report 0
    pub fn value(&self) -> u32 {
        match self {
            RunningCheck::None => 0,
            RunningCheck::Adler(adler) => adler.finish(),
            RunningCheck::Crc(crc) => crc.finish(),
        }
    }

    /// Start over with the same algorithm
    pub fn reset(&mut self) {
        match self {
            RunningCheck::None => {}
            RunningCheck::Adler(adler) => adler.reset(),
            RunningCheck::Crc(crc) => crc.reset(),
        }
    }
}
