//! Per-call input and output cursors shared by both engines.

/// Read cursor over the caller's input slice
#[derive(Debug)]
pub struct Source<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Source<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed
    #[inline]
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    #[inline]
    pub fn available(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos == self.data.len()
    }

    /// Bytes consumed since this cursor was created
    #[inline]
    pub fn consumed(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn next_byte(&mut self) -> Option<u8> {
        let byte = self.data.get(self.pos).copied()?;
        self.pos += 1;
        Some(byte)
    }

    /// Consume up to `n` bytes and return them
    #[inline]
    pub fn take(&mut self, n: usize) -> &'a [u8] {
        let n = n.min(self.available());
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        bytes
    }

    /// Skip up to `n` bytes
    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos += n.min(self.available());
    }

    /// Return up to `n` of the bytes consumed by this cursor; yields how many were returned
    #[inline]
    pub fn give_back(&mut self, n: usize) -> usize {
        let n = n.min(self.pos);
        self.pos -= n;
        n
    }
}

/// Write cursor over the caller's output slice
#[derive(Debug)]
pub struct Sink<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Sink<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Free space left
    #[inline]
    pub fn space(&self) -> usize {
        self.buf.len() - self.pos
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.pos == self.buf.len()
    }

    /// Bytes produced since this cursor was created
    #[inline]
    pub fn written(&self) -> usize {
        self.pos
    }

    /// The bytes produced so far
    #[inline]
    pub fn filled(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    /// Append one byte; the caller checks `space()` first
    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.buf[self.pos] = byte;
        self.pos += 1;
    }

    /// Append as much of `bytes` as fits, returning the count copied
    #[inline]
    pub fn extend(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.space());
        self.buf[self.pos..self.pos + n].copy_from_slice(&bytes[..n]);
        self.pos += n;
        n
    }

    /// Copy `len` bytes starting `distance` back in this call's output
    ///
    /// Overlapping copies replicate the pattern byte by byte. The caller
    /// guarantees `distance <= written()` and `len <= space()`.
    #[inline]
    pub fn copy_back(&mut self, distance: usize, len: usize) {
        let start = self.pos - distance;
        if distance >= len {
            self.buf.copy_within(start..start + len, self.pos);
        } else {
            for i in 0..len {
                self.buf[self.pos + i] = self.buf[start + i];
            }
        }
        self.pos += len;
    }
}
