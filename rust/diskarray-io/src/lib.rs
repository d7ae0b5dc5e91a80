//! I/O abstractions:
//! - `ReadAt`: positional reader with the ability to fetch a specified byte range from a file.
//! - `TemporaryFileStore`: the service that names and creates the backing files of a spilling
//!   container, together with the `TemporaryWritable`/`TemporaryBuffer` handles it hands out.
//!
//! Concrete stores live in `diskarray-io-impl`.

use std::{ops::Range, sync::Arc};

pub mod file;
pub mod io_extensions;
pub mod temp_file_store;
pub mod utils;

pub use io_extensions::ReadAtExt;
pub use temp_file_store::{SpillFiles, TemporaryBuffer, TemporaryFileStore, TemporaryWritable};

/// A trait representing a conceptual file or buffer that supports reading from arbitrary
/// positions.
pub trait ReadAt: Send + Sync + 'static {
    /// Returns the size of the underlying object.
    fn size(&self) -> std::io::Result<u64>;

    /// Reads a specified range of bytes from the object.
    ///
    /// **NOTE**: `read_at` should not return with a short read, unless end-of-file
    /// is encountered.
    ///
    /// # Arguments
    ///
    /// * `range` - A `Range<u64>` that specifies the start and end positions for reading.
    ///   The function may return fewer bytes than requested if the range extends beyond
    ///   the end of the object.
    fn read_at(&self, range: Range<u64>) -> std::io::Result<Vec<u8>>;
}

impl<T> ReadAt for Arc<T>
where
    T: ReadAt + ?Sized,
{
    fn size(&self) -> std::io::Result<u64> {
        self.as_ref().size()
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Vec<u8>> {
        self.as_ref().read_at(range)
    }
}

impl<T> ReadAt for Box<T>
where
    T: ReadAt + ?Sized,
{
    fn size(&self) -> std::io::Result<u64> {
        self.as_ref().size()
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Vec<u8>> {
        self.as_ref().read_at(range)
    }
}
