//! Bounds-checked little-endian cursor over a byte slice.
//!
//! Every read returns `None` instead of panicking when the input is too
//! short, which lets the decoders stop cleanly on truncated streams.

use byteorder::{ByteOrder, LittleEndian};

/// Forward-only reader over untrusted bytes.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Start reading at `pos` (clamped to the end of the input).
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self {
            data,
            pos: pos.min(data.len()),
        }
    }

    /// Current offset from the start of the input.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Borrow the next `len` bytes and advance past them.
    pub fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let slice = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    /// Advance `len` bytes, failing if that would pass the end.
    pub fn skip(&mut self, len: usize) -> Option<()> {
        self.take(len).map(|_| ())
    }

    /// Skip the padding that aligns a value of `len` bytes to 4 bytes.
    ///
    /// Padding missing at the very end of the input is tolerated.
    pub fn skip_padding(&mut self, len: usize) {
        let pad = padding_to_4(len);
        self.pos = self.pos.saturating_add(pad).min(self.data.len());
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    pub fn read_u16(&mut self) -> Option<u16> {
        self.take(2).map(LittleEndian::read_u16)
    }

    pub fn read_u32(&mut self) -> Option<u32> {
        self.take(4).map(LittleEndian::read_u32)
    }
}

/// Number of padding bytes needed to align `len` to a 4-byte boundary.
pub fn padding_to_4(len: usize) -> usize {
    (4 - len % 4) % 4
}

/// Little-endian `u32` at the start of `data`, if there are 4 bytes.
pub fn le_u32(data: &[u8]) -> Option<u32> {
    data.get(..4).map(LittleEndian::read_u32)
}
