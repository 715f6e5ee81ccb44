//! Bounds-checked reader over a DNS message.

use super::message::DecodeError;

/// Two high bits of a length byte marking a compression pointer.
const POINTER_MASK: u8 = 0xC0;

/// Forward-only reader. Every read advances the position and fails with
/// [`DecodeError::Truncated`] instead of reading past the end of the buffer.
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let bytes = self.read_bytes(1)?;
        Ok(bytes[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed: len,
            });
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), DecodeError> {
        self.read_bytes(len).map(|_| ())
    }

    /// Read an uncompressed name as its list of raw labels.
    ///
    /// Stops after the terminating zero byte. A pointer or extended label
    /// type is rejected, since question names are never compressed.
    pub fn read_labels(&mut self) -> Result<Vec<&'a [u8]>, DecodeError> {
        let mut labels = Vec::new();
        loop {
            let offset = self.position();
            let len = self.read_u8()?;
            if len == 0 {
                return Ok(labels);
            }
            if len & POINTER_MASK != 0 {
                return Err(DecodeError::UnsupportedLabel(offset));
            }
            labels.push(self.read_bytes(len as usize)?);
        }
    }

    /// Skip a possibly compressed name.
    ///
    /// A pointer ends the name immediately; its target is never followed.
    pub fn skip_name(&mut self) -> Result<(), DecodeError> {
        loop {
            let offset = self.position();
            let len = self.read_u8()?;
            if len == 0 {
                return Ok(());
            }
            if len & POINTER_MASK == POINTER_MASK {
                return self.skip(1);
            }
            if len & POINTER_MASK != 0 {
                return Err(DecodeError::UnsupportedLabel(offset));
            }
            self.skip(len as usize)?;
        }
    }
}
