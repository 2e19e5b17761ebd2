//! Per-endpoint scratch buffer.
//!
//! Stages the raw write payload and the formatted read record. Incoming
//! payloads longer than the capacity are truncated silently.

use alloc::boxed::Box;
use alloc::vec;
use core::fmt;

use crate::error::{Error, Result};
use crate::record::Record;
use crate::user::UserSource;

/// Fixed-capacity staging buffer.
pub struct ScratchBuffer {
    bytes: Box<[u8]>,
    len: usize,
}

impl ScratchBuffer {
    /// Create an empty buffer holding at most `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy a write payload in, truncated to capacity.
    ///
    /// The staged content is NUL-terminated only when it is shorter than the
    /// capacity. Returns the number of bytes staged.
    pub fn stage<S: UserSource + ?Sized>(&mut self, src: &S) -> Result<usize> {
        let len = src.len().min(self.capacity());
        if src.copy_to(&mut self.bytes[..len]).is_err() {
            error!("Error copying data from user");
            self.len = 0;
            return Err(Error::TransportFault);
        }
        if len < self.capacity() {
            self.bytes[len] = 0;
        }
        self.len = len;
        Ok(len)
    }

    /// The staged bytes.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Render `record` into the buffer, replacing its content.
    ///
    /// Fails with [`Error::BufferTooSmall`] if the record does not fit.
    pub fn format<R: Record + ?Sized>(&mut self, record: &R) -> Result<usize> {
        let mut cursor = Cursor {
            buf: &mut self.bytes,
            pos: 0,
        };
        let written = record.write_record(&mut cursor).map(|()| cursor.pos);
        match written {
            Ok(len) => {
                self.len = len;
                Ok(len)
            }
            Err(fmt::Error) => {
                self.len = 0;
                Err(Error::BufferTooSmall)
            }
        }
    }
}

/// `fmt::Write` adapter that refuses to write past the end of the buffer.
struct Cursor<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl fmt::Write for Cursor<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.pos + s.len();
        let dst = self.buf.get_mut(self.pos..end).ok_or(fmt::Error)?;
        dst.copy_from_slice(s.as_bytes());
        self.pos = end;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_truncates_at_capacity() {
        let mut buf = ScratchBuffer::with_capacity(4);
        assert_eq!(buf.stage("123456"), Ok(4));
        assert_eq!(buf.payload(), b"1234");
    }
}
