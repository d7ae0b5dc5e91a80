//! Extension traits for common IO primitives.

use std::ops::Range;

use crate::ReadAt;

/// Extension trait for [`ReadAt`] readers that must not tolerate short reads.
pub trait ReadAtExt {
    /// Reads exactly the requested range.
    ///
    /// Unlike [`ReadAt::read_at`], which silently clamps the range at end-of-file,
    /// this fails with [`std::io::ErrorKind::UnexpectedEof`] when fewer bytes than
    /// requested are available.
    fn read_exact_at(&self, range: Range<u64>) -> std::io::Result<Vec<u8>>;
}

impl<R> ReadAtExt for R
where
    R: ?Sized + ReadAt,
{
    fn read_exact_at(&self, range: Range<u64>) -> std::io::Result<Vec<u8>> {
        crate::verify!(range.end >= range.start);
        let expected = (range.end - range.start) as usize;
        let buf = self.read_at(range)?;
        if buf.len() != expected {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("short read: expected {expected} bytes, got {}", buf.len()),
            ));
        }
        Ok(buf)
    }
}
