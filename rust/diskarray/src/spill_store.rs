//! The spill data file: concatenated record bytes in append order, with no header,
//! footer or inline framing.

use std::{ops::Range, path::Path};

use diskarray_common::{Error, Result};
use diskarray_io::{ReadAtExt, TemporaryBuffer, TemporaryWritable};

use crate::record::Record;

/// Staged record bytes are written out whenever they exceed this size.
const STAGING_FLUSH_SIZE: usize = 1024 * 1024;

pub struct SpillStore {
    file: Box<dyn TemporaryBuffer>,
    staging: Vec<u8>,
}

impl SpillStore {
    pub fn new(file: Box<dyn TemporaryBuffer>) -> SpillStore {
        SpillStore {
            file,
            staging: Vec::new(),
        }
    }

    /// Current end of the data file, i.e. the start offset of the next record.
    #[inline]
    pub fn end_offset(&self) -> u64 {
        self.file.current_size()
    }

    /// Serializes one record at the end of the data file and returns its start offset.
    pub fn append_record<T: Record>(&mut self, record: &T) -> Result<u64> {
        let starts = self.append_records(std::iter::once(record))?;
        Ok(starts[0])
    }

    /// Serializes a batch of records at the end of the data file, returning the start
    /// offset of each one.
    ///
    /// Either the whole batch is written or, on failure, the data file is truncated
    /// back to where it was before the call.
    pub fn append_records<'a, T, I>(&mut self, records: I) -> Result<Vec<u64>>
    where
        T: Record + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let base = self.end_offset();
        match self.append_records_impl(base, records) {
            Ok(starts) => Ok(starts),
            Err(e) => {
                self.staging.clear();
                if let Err(truncate_err) = self.file.truncate(base) {
                    log::warn!("Failed to roll back spill data to {base} bytes: {truncate_err}");
                }
                Err(e)
            }
        }
    }

    fn append_records_impl<'a, T, I>(&mut self, base: u64, records: I) -> Result<Vec<u64>>
    where
        T: Record + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let records = records.into_iter();
        let mut starts = Vec::with_capacity(records.size_hint().0);
        let mut write_pos = base;
        self.staging.clear();
        for record in records {
            starts.push(write_pos + self.staging.len() as u64);
            record.serialize_to(&mut self.staging)?;
            if self.staging.len() >= STAGING_FLUSH_SIZE {
                write_pos = self.flush_staging(write_pos)?;
            }
        }
        self.flush_staging(write_pos)?;
        Ok(starts)
    }

    fn flush_staging(&mut self, pos: u64) -> Result<u64> {
        if self.staging.is_empty() {
            return Ok(pos);
        }
        self.file
            .write_at(pos, &self.staging)
            .map_err(|e| Error::io("spill data write", e))?;
        let next = pos + self.staging.len() as u64;
        self.staging.clear();
        Ok(next)
    }

    /// Reads exactly the bytes in `range`.
    pub fn read_range(&self, range: Range<u64>) -> Result<Vec<u8>> {
        self.file
            .read_exact_at(range)
            .map_err(|e| Error::io("spill data read", e))
    }

    /// Discards everything past `end`.
    pub fn truncate(&mut self, end: u64) -> Result<()> {
        self.file
            .truncate(end)
            .map_err(|e| Error::io("spill data truncate", e))
    }

    pub fn path(&self) -> Option<&Path> {
        self.file.path()
    }

    pub fn close(self) -> std::io::Result<()> {
        self.file.close()
    }
}

#[cfg(test)]
mod tests {
    use diskarray_io::TemporaryFileStore;
    use diskarray_io_impl::temp_file_store;

    use super::SpillStore;

    fn new_store(capacity: u64) -> SpillStore {
        let store = temp_file_store::create_in_memory(capacity).unwrap();
        SpillStore::new(store.allocate_buffer(None).unwrap())
    }

    #[test]
    fn test_append_and_read() {
        let mut store = new_store(1 << 20);
        let records = vec![b"first".to_vec(), Vec::new(), b"third!".to_vec()];
        let starts = store.append_records(&records).unwrap();
        assert_eq!(starts, vec![0, 5, 5]);
        assert_eq!(store.end_offset(), 11);

        let start = store.append_record(&b"4".to_vec()).unwrap();
        assert_eq!(start, 11);
        assert_eq!(store.read_range(0..5).unwrap(), b"first");
        assert!(store.read_range(5..5).unwrap().is_empty());
        assert_eq!(store.read_range(5..11).unwrap(), b"third!");
        assert_eq!(store.read_range(11..12).unwrap(), b"4");
        assert!(store.read_range(11..13).is_err());
    }

    #[test]
    fn test_large_batch_flushes_in_chunks() {
        let mut store = new_store(1 << 30);
        let records = (0..40u8)
            .map(|i| vec![i; 100 * 1024])
            .collect::<Vec<_>>();
        let starts = store.append_records(&records).unwrap();
        assert_eq!(starts.len(), 40);
        assert_eq!(store.end_offset(), 40 * 100 * 1024);
        for (i, &start) in starts.iter().enumerate() {
            let bytes = store.read_range(start..start + 100 * 1024).unwrap();
            assert!(bytes.iter().all(|&b| b == i as u8));
        }
    }

    #[test]
    fn test_failed_batch_rolls_back() {
        let mut store = new_store(2 * 1024 * 1024);
        store.append_record(&vec![1u8; 1000]).unwrap();
        let records = (0..4).map(|_| vec![2u8; 700 * 1024]).collect::<Vec<_>>();
        assert!(store.append_records(&records).is_err());
        assert_eq!(store.end_offset(), 1000);
        assert_eq!(store.read_range(0..1000).unwrap(), vec![1u8; 1000]);
    }
}
