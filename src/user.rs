//! User-space transport.
//!
//! Write payloads arrive through a [`UserSource`] and read records leave
//! through a [`UserSink`]. Either side may fault, in which case the endpoint
//! reports [`Error::TransportFault`](crate::Error::TransportFault).

/// A copy to or from user memory failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault;

/// User memory holding a write payload.
pub trait UserSource {
    /// Number of bytes the caller passed.
    fn len(&self) -> usize;

    /// Returns true if the caller passed no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the first `dst.len()` bytes of the payload into `dst`.
    fn copy_to(&self, dst: &mut [u8]) -> Result<(), Fault>;
}

/// User memory receiving a read record.
pub trait UserSink {
    /// Number of bytes the caller can accept.
    fn capacity(&self) -> usize;

    /// Copy `src` to the start of the caller's buffer.
    fn copy_from(&mut self, src: &[u8]) -> Result<(), Fault>;
}

impl UserSource for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn copy_to(&self, dst: &mut [u8]) -> Result<(), Fault> {
        let src = self.get(..dst.len()).ok_or(Fault)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

impl<const N: usize> UserSource for [u8; N] {
    fn len(&self) -> usize {
        N
    }

    fn copy_to(&self, dst: &mut [u8]) -> Result<(), Fault> {
        self.as_slice().copy_to(dst)
    }
}

impl UserSource for str {
    fn len(&self) -> usize {
        str::len(self)
    }

    fn copy_to(&self, dst: &mut [u8]) -> Result<(), Fault> {
        self.as_bytes().copy_to(dst)
    }
}

impl UserSink for [u8] {
    fn capacity(&self) -> usize {
        self.len()
    }

    fn copy_from(&mut self, src: &[u8]) -> Result<(), Fault> {
        let dst = self.get_mut(..src.len()).ok_or(Fault)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

impl<const N: usize> UserSink for [u8; N] {
    fn capacity(&self) -> usize {
        N
    }

    fn copy_from(&mut self, src: &[u8]) -> Result<(), Fault> {
        self.as_mut_slice().copy_from(src)
    }
}
