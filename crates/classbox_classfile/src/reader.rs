//! Bounds-checked big-endian cursor over a class-file byte sequence.
//!
//! All multi-byte quantities in a class file are big-endian. Every read is
//! bounds-checked and reports the failing offset, so truncated containers
//! surface as [`ErrorKind::MalformedClass`] with a useful position.
//!
//! [`ErrorKind::MalformedClass`]: classbox_foundation::ErrorKind

use classbox_foundation::{Error, Result};

/// A cursor over an immutable byte slice.
#[derive(Clone, Debug)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader positioned at the start of the slice.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Current byte offset.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    /// Returns true when the cursor has consumed the whole slice.
    #[must_use]
    pub fn is_at_end(&self) -> bool {
        self.pos == self.bytes.len()
    }

    /// Reads a single byte.
    pub fn u8(&mut self) -> Result<u8> {
        let b = *self
            .bytes
            .get(self.pos)
            .ok_or_else(|| self.truncated("u8"))?;
        self.pos += 1;
        Ok(b)
    }

    /// Reads a big-endian `u16`.
    pub fn u16(&mut self) -> Result<u16> {
        let raw = self.take(2, "u16")?;
        Ok(u16::from_be_bytes([raw[0], raw[1]]))
    }

    /// Reads a big-endian `u32`.
    pub fn u32(&mut self) -> Result<u32> {
        let raw = self.take(4, "u32")?;
        Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    /// Reads a big-endian `u64` (used for `Long`/`Double` constant payloads).
    pub fn u64(&mut self) -> Result<u64> {
        let raw = self.take(8, "u64")?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(raw);
        Ok(u64::from_be_bytes(buf))
    }

    /// Reads `n` raw bytes.
    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n, "bytes")
    }

    /// Skips `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n, "skip")?;
        Ok(())
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| self.truncated(what))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn truncated(&self, what: &str) -> Error {
        Error::malformed(format!("unexpected end of input reading {what}"), self.pos)
    }
}
