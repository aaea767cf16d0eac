use crate::error::{zeroed, Result};
use crate::stream::Sink;

/// Circular history buffer for back-references across calls
///
/// Holds the last `2^bits` bytes produced by earlier calls. Back-references
/// into the current call's output are served from the caller's buffer, so
/// the window only needs updating once per call.
pub struct Window {
    buffer: Vec<u8>,
    mask: usize,
    /// Next write position
    write_pos: usize,
    /// Valid bytes, at most the buffer size
    have: usize,
}

impl Window {
    pub fn new(bits: u8) -> Result<Self> {
        let size = 1usize << bits;
        Ok(Self { buffer: zeroed(size)?, mask: size - 1, write_pos: 0, have: 0 })
    }

    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes of history available for back-references
    pub fn available(&self) -> usize {
        self.have
    }

    /// Append `bytes`, keeping only the most recent `size()` of them
    pub fn update(&mut self, bytes: &[u8]) {
        let size = self.size();
        if bytes.len() >= size {
            self.buffer.copy_from_slice(&bytes[bytes.len() - size..]);
            self.write_pos = 0;
            self.have = size;
            return;
        }
        let first = bytes.len().min(size - self.write_pos);
        self.buffer[self.write_pos..self.write_pos + first].copy_from_slice(&bytes[..first]);
        let rest = &bytes[first..];
        self.buffer[..rest.len()].copy_from_slice(rest);
        self.write_pos = (self.write_pos + bytes.len()) & self.mask;
        self.have = (self.have + bytes.len()).min(size);
    }

    /// Copy `len` bytes starting `back` bytes before the end of the history
    ///
    /// The caller guarantees `len <= back <= available()` and room in `sink`.
    pub fn copy_out(&self, back: usize, len: usize, sink: &mut Sink<'_>) {
        debug_assert!(len <= back && back <= self.have);
        let start = (self.write_pos + self.size() - back) & self.mask;
        let first = len.min(self.size() - start);
        sink.extend(&self.buffer[start..start + first]);
        sink.extend(&self.buffer[..len - first]);
    }

    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.have = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn copy(window: &Window, back: usize, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        let mut sink = Sink::new(&mut buf);
        window.copy_out(back, len, &mut sink);
        assert_eq!(sink.written(), len);
        buf
    }

    #[test]
    fn test_window_basic() {
        let mut window = Window::new(8).unwrap();
        window.update(b"ABC");

        assert_eq!(window.available(), 3);
        assert_eq!(copy(&window, 1, 1), b"C");
        assert_eq!(copy(&window, 2, 1), b"B");
        assert_eq!(copy(&window, 3, 3), b"ABC");
    }

    #[test]
    fn test_window_wrap() {
        let mut window = Window::new(8).unwrap();
        let data: Vec<u8> = (0..300u32).map(|i| i as u8).collect();
        for chunk in data.chunks(7) {
            window.update(chunk);
        }
        assert_eq!(window.available(), 256);
        // Most recent byte is 299 & 0xFF
        assert_eq!(copy(&window, 1, 1), vec![43]);
        // A copy spanning the wrap point
        assert_eq!(copy(&window, 256, 256), data[44..].to_vec());
    }

    #[test]
    fn test_window_oversized_update() {
        let mut window = Window::new(8).unwrap();
        window.update(b"xyz");
        let data: Vec<u8> = (0..1000u32).map(|i| (i * 7) as u8).collect();
        window.update(&data);
        assert_eq!(window.available(), 256);
        assert_eq!(copy(&window, 256, 10), data[744..754].to_vec());
    }

    #[test]
    fn test_window_clear() {
        let mut window = Window::new(9).unwrap();
        window.update(b"history");
        window.clear();
        assert_eq!(window.available(), 0);
        assert_eq!(window.size(), 512);
    }
}
