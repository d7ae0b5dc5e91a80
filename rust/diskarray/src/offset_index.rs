//! Offset index: the on-disk framing of spilled records.
//!
//! The index file is a flat array of native-endian `u64` data file offsets. Once
//! anything has been spilled it holds `len() + 1` entries: the start offset of every
//! spilled record, followed by a single trailing sentinel equal to the data file's
//! end after the most recent spill batch. Record `k` therefore always occupies
//! `[entry[k], entry[k + 1])` of the data file, including the last record.
//!
//! ```text
//! data:   | rec 0 | rec 1 |   rec 2   | rec 3 |
//!         0       5       9           17      21
//! index:  [0, 5, 9, 17, 21]      (4 records + sentinel)
//! ```
//!
//! The next batch starts writing at the sentinel's slot. Because the data file is
//! append-only, the old sentinel equals the first new record's start offset, so the
//! slot is overwritten with the same value.

use std::{ops::Range, path::Path};

use diskarray_common::{Error, Result, verify_index};
use diskarray_io::{ReadAt, TemporaryBuffer, TemporaryWritable};

/// Size in bytes of one index entry.
pub const OFFSET_SIZE: u64 = std::mem::size_of::<u64>() as u64;

pub struct OffsetIndex {
    file: Box<dyn TemporaryBuffer>,
    /// Number of records with a committed start offset. The sentinel is not counted.
    records: u64,
}

impl OffsetIndex {
    /// Creates an index over an empty backing file.
    pub fn new(file: Box<dyn TemporaryBuffer>) -> Result<OffsetIndex> {
        if file.current_size() != 0 {
            return Err(Error::invalid_arg(
                "file",
                "offset index must start from an empty file",
            ));
        }
        Ok(OffsetIndex { file, records: 0 })
    }

    /// Number of indexed records.
    #[inline]
    pub fn len(&self) -> u64 {
        self.records
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    /// Size of the index file once the current records and their sentinel are committed.
    fn committed_size(&self) -> u64 {
        if self.records == 0 {
            0
        } else {
            (self.records + 1) * OFFSET_SIZE
        }
    }

    /// Appends the start offsets of a spill batch, followed by the sentinel `end`.
    ///
    /// `starts` must be non-decreasing, begin at the previous sentinel (or at any
    /// offset for the first batch), and all be `<= end`. On failure the index file is
    /// truncated back to its previous committed state.
    pub fn append_batch(&mut self, starts: &[u64], end: u64) -> std::io::Result<()> {
        if starts.is_empty() {
            return Ok(());
        }
        debug_assert!(starts.windows(2).all(|w| w[0] <= w[1]));
        debug_assert!(starts.last().is_some_and(|&last| last <= end));

        let mut entries = Vec::with_capacity(starts.len() + 1);
        entries.extend_from_slice(starts);
        entries.push(end);

        let pos = self.records * OFFSET_SIZE;
        if let Err(e) = self.file.write_at(pos, bytemuck::cast_slice(&entries)) {
            let committed = self.committed_size();
            if let Err(truncate_err) = self.file.truncate(committed) {
                log::warn!(
                    "Failed to roll back offset index to {committed} bytes: {truncate_err}"
                );
            }
            return Err(e);
        }
        self.records += starts.len() as u64;
        Ok(())
    }

    /// Returns the data file byte range of record `k`.
    ///
    /// Fails with `CorruptIndex` if `k` is not an indexed record, the index file is
    /// shorter than the committed entries, or the two offsets are out of order.
    pub fn read_pair(&self, k: u64) -> Result<Range<u64>> {
        verify_index!(k, k < self.records);
        let pos = k * OFFSET_SIZE;
        let bytes = self
            .file
            .read_at(pos..pos + 2 * OFFSET_SIZE)
            .map_err(|e| Error::io("offset index read", e))?;
        verify_index!(k, bytes.len() == 2 * OFFSET_SIZE as usize);
        let start = bytemuck::pod_read_unaligned::<u64>(&bytes[..OFFSET_SIZE as usize]);
        let end = bytemuck::pod_read_unaligned::<u64>(&bytes[OFFSET_SIZE as usize..]);
        verify_index!(k, start <= end);
        Ok(start..end)
    }

    /// Returns the trailing sentinel, i.e. the data file end after the last spill.
    pub fn sentinel(&self) -> Result<Option<u64>> {
        if self.records == 0 {
            return Ok(None);
        }
        let pos = self.records * OFFSET_SIZE;
        let bytes = self
            .file
            .read_at(pos..pos + OFFSET_SIZE)
            .map_err(|e| Error::io("offset index read", e))?;
        verify_index!(self.records, bytes.len() == OFFSET_SIZE as usize);
        Ok(Some(bytemuck::pod_read_unaligned::<u64>(&bytes)))
    }

    pub fn path(&self) -> Option<&Path> {
        self.file.path()
    }

    pub fn close(self) -> std::io::Result<()> {
        self.file.close()
    }
}

/// Reads every entry of an index file, e.g. one retained on disk for inspection.
///
/// The result holds the start offset of each record followed by the sentinel, or
/// is empty if nothing was spilled.
pub fn load_offsets<R>(reader: &R) -> Result<Vec<u64>>
where
    R: ReadAt + ?Sized,
{
    let size = reader.size().map_err(|e| Error::io("offset index size", e))?;
    verify_index!(size / OFFSET_SIZE, size % OFFSET_SIZE == 0);
    let bytes = reader
        .read_at(0..size)
        .map_err(|e| Error::io("offset index read", e))?;
    verify_index!(size / OFFSET_SIZE, bytes.len() as u64 == size);
    let offsets = bytes
        .chunks_exact(OFFSET_SIZE as usize)
        .map(bytemuck::pod_read_unaligned::<u64>)
        .collect::<Vec<_>>();
    if let Some(pos) = offsets.windows(2).position(|w| w[0] > w[1]) {
        return Err(Error::corrupt_index(pos as u64, "offsets are decreasing"));
    }
    Ok(offsets)
}

#[cfg(test)]
mod tests {
    use diskarray_common::ErrorKind;
    use diskarray_io::{TemporaryBuffer, TemporaryFileStore, TemporaryWritable};
    use diskarray_io_impl::temp_file_store;

    use super::{OFFSET_SIZE, OffsetIndex, load_offsets};

    fn new_index() -> OffsetIndex {
        let store = temp_file_store::create_in_memory(1 << 20).unwrap();
        OffsetIndex::new(store.allocate_buffer(None).unwrap()).unwrap()
    }

    #[test]
    fn test_empty_index() {
        let index = new_index();
        assert!(index.is_empty());
        assert_eq!(index.sentinel().unwrap(), None);
        let err = index.read_pair(0).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::CorruptIndex { record: 0, .. }));
    }

    #[test]
    fn test_batches_share_sentinel_slot() {
        let mut index = new_index();
        index.append_batch(&[0, 5, 9], 17).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.sentinel().unwrap(), Some(17));
        assert_eq!(index.read_pair(2).unwrap(), 9..17);

        index.append_batch(&[17], 21).unwrap();
        assert_eq!(index.len(), 4);
        assert_eq!(index.read_pair(0).unwrap(), 0..5);
        assert_eq!(index.read_pair(1).unwrap(), 5..9);
        assert_eq!(index.read_pair(2).unwrap(), 9..17);
        assert_eq!(index.read_pair(3).unwrap(), 17..21);
        assert_eq!(index.sentinel().unwrap(), Some(21));
        assert_eq!(index.file.current_size(), 5 * OFFSET_SIZE);

        assert_eq!(load_offsets(&index.file).unwrap(), vec![0, 5, 9, 17, 21]);
    }

    #[test]
    fn test_empty_records() {
        let mut index = new_index();
        index.append_batch(&[0, 0, 0], 0).unwrap();
        assert_eq!(index.read_pair(1).unwrap(), 0..0);
        assert_eq!(index.read_pair(2).unwrap(), 0..0);
        index.append_batch(&[], 100).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.sentinel().unwrap(), Some(0));
    }

    #[test]
    fn test_decreasing_pair_is_corrupt() {
        let mut index = new_index();
        index.append_batch(&[0, 10], 20).unwrap();
        index
            .file
            .write_at(OFFSET_SIZE, &30u64.to_ne_bytes())
            .unwrap();
        assert_eq!(index.read_pair(0).unwrap(), 0..30);
        let err = index.read_pair(1).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::CorruptIndex { record: 1, .. }));
        assert!(load_offsets(&index.file).is_err());
    }

    #[test]
    fn test_truncated_file_is_corrupt() {
        let mut index = new_index();
        index.append_batch(&[0, 10], 20).unwrap();
        index.file.truncate(2 * OFFSET_SIZE).unwrap();
        let err = index.read_pair(1).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::CorruptIndex { record: 1, .. }));
    }

    #[test]
    fn test_failed_append_rolls_back() {
        // Room for exactly three entries.
        let store = temp_file_store::create_in_memory(3 * OFFSET_SIZE).unwrap();
        let mut index = OffsetIndex::new(store.allocate_buffer(None).unwrap()).unwrap();
        index.append_batch(&[0, 4], 8).unwrap();
        assert!(index.append_batch(&[8, 12], 16).is_err());
        assert_eq!(index.len(), 2);
        assert_eq!(index.sentinel().unwrap(), Some(8));
        assert_eq!(index.read_pair(1).unwrap(), 4..8);
    }

    #[test]
    fn test_non_empty_file_rejected() {
        let store = temp_file_store::create_in_memory(1024).unwrap();
        let mut file = store.allocate_buffer(None).unwrap();
        file.write_all(&[1, 2, 3]).unwrap();
        assert!(OffsetIndex::new(file).is_err());
    }
}
