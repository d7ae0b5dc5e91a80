use std::path::Path;

use crate::ReadAt;

/// The `TemporaryFileStore` trait names and creates the backing files of spilling
/// containers.
///
/// A single store is normally constructed once per process and shared (behind an
/// `Arc`) by every container that spills through it. Implementations serialize name
/// allocation internally, so that containers created concurrently from different
/// threads never race on the same backing file name.
pub trait TemporaryFileStore: Send + Sync + 'static {
    /// Allocates a single temporary read/write buffer.
    ///
    /// # Arguments
    ///
    /// * `size_hint` - An optional hint for the expected size of the buffer.
    fn allocate_buffer(
        &self,
        size_hint: Option<usize>,
    ) -> std::io::Result<Box<dyn TemporaryBuffer>>;

    /// Allocates the pair of backing files used by a spilling container: a data file
    /// holding concatenated record bytes and an index file holding their offsets.
    ///
    /// Both files are named and created as one step under the store's allocation lock.
    ///
    /// # Arguments
    ///
    /// * `size_hint` - An optional hint for the expected size of the data file.
    fn allocate_spill_files(&self, size_hint: Option<usize>) -> std::io::Result<SpillFiles>;
}

/// The backing files of one spilling container, as handed out by
/// [`TemporaryFileStore::allocate_spill_files`].
pub struct SpillFiles {
    pub data: Box<dyn TemporaryBuffer>,
    pub index: Box<dyn TemporaryBuffer>,
}

/// A trait representing a temporary write-only stream that can be appended to.
///
/// The storage is released when the object is dropped, unless the store that created
/// it was configured to retain its files.
pub trait TemporaryWritable: std::io::Write + Send + Sync + 'static {
    /// Returns the current size (i.e., the end position) of the stream.
    fn current_size(&self) -> u64;

    /// Truncates the stream to the specified size. Sizes beyond the current end
    /// are ignored.
    ///
    /// # Arguments
    ///
    /// * `end_pos` - The position to truncate the stream to.
    fn truncate(&mut self, end_pos: u64) -> std::io::Result<()>;

    /// Returns the filesystem path of the backing file, if there is one.
    fn path(&self) -> Option<&Path>;

    /// Releases the storage now, reporting any failure to do so.
    ///
    /// Dropping the object performs the same cleanup, ignoring errors.
    fn close(self: Box<Self>) -> std::io::Result<()>;
}

/// A trait representing a temporary read/write buffer that supports appending, reading,
/// and writing at arbitrary positions.
pub trait TemporaryBuffer: TemporaryWritable + ReadAt {
    /// Writes the provided buffer at the specified position, expanding the underlying
    /// storage if necessary.
    ///
    /// # Arguments
    ///
    /// * `pos` - The position at which to write the buffer.
    /// * `buf` - The buffer to write.
    fn write_at(&mut self, pos: u64, buf: &[u8]) -> std::io::Result<()>;
}
