pub mod reader;
pub mod writer;

pub use reader::BitAccumulator;
pub use writer::{reverse_bits, BitWriter};
