use std::{collections::VecDeque, fmt, path::Path};

use diskarray_common::{Error, ErrorKind, Result, verify_index};
use diskarray_io::TemporaryFileStore;

use crate::{
    handle::ElementRef,
    offset_index::OffsetIndex,
    options::DiskArrayOptions,
    policy::SpillPolicy,
    record::Record,
    spill_store::SpillStore,
};

/// Cumulative spill activity of a [`DiskArray`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpillStats {
    /// Number of spill operations that moved at least one element.
    pub spill_batches: u64,
    /// Total number of elements moved to disk.
    pub spilled_records: u64,
    /// Total number of record bytes written to the data file.
    pub spilled_bytes: u64,
}

/// An append-only sequence that keeps its most recent elements in memory and spills
/// the oldest ones to a pair of temporary files.
///
/// Positions `0..spilled_len()` live on disk and positions `spilled_len()..len()` are
/// resident. Elements are always read back in append order, wherever they live.
///
/// The backing files are allocated from a [`TemporaryFileStore`] at construction
/// and released when the array is dropped or [closed](DiskArray::close).
pub struct DiskArray<T: Record> {
    resident: VecDeque<T>,
    spilled: usize,
    store: SpillStore,
    index: OffsetIndex,
    policy: Box<dyn SpillPolicy<T>>,
    stats: SpillStats,
}

impl<T: Record> DiskArray<T> {
    /// Creates an empty array whose spill files are allocated from `store`.
    pub fn new(store: &dyn TemporaryFileStore, options: DiskArrayOptions) -> Result<DiskArray<T>> {
        options.validate()?;
        let policy = options.make_policy();
        Self::with_policy(store, options.capacity_hint, policy)
    }

    /// Creates an empty array driven by a custom spill policy.
    pub fn with_policy(
        store: &dyn TemporaryFileStore,
        capacity_hint: usize,
        policy: Box<dyn SpillPolicy<T>>,
    ) -> Result<DiskArray<T>> {
        let files = store
            .allocate_spill_files(None)
            .map_err(|e| Error::io("spill file allocation", e))?;
        let index = OffsetIndex::new(files.index)?;
        let store = SpillStore::new(files.data);
        log::debug!(
            "Created disk array files: data {:?}, index {:?}",
            store.path(),
            index.path()
        );
        Ok(DiskArray {
            resident: VecDeque::with_capacity(capacity_hint),
            spilled: 0,
            store,
            index,
            policy,
            stats: SpillStats::default(),
        })
    }

    /// Total number of elements, spilled and resident.
    #[inline]
    pub fn len(&self) -> usize {
        self.spilled + self.resident.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of elements stored on disk. These occupy positions `0..spilled_len()`.
    #[inline]
    pub fn spilled_len(&self) -> usize {
        self.spilled
    }

    /// Number of elements held in memory.
    #[inline]
    pub fn resident_len(&self) -> usize {
        self.resident.len()
    }

    pub fn stats(&self) -> SpillStats {
        self.stats
    }

    /// Path of the data file, if the store is file-based.
    pub fn data_path(&self) -> Option<&Path> {
        self.store.path()
    }

    /// Path of the offset index file, if the store is file-based.
    pub fn index_path(&self) -> Option<&Path> {
        self.index.path()
    }

    /// Appends an element, spilling resident elements first if the policy asks for it.
    ///
    /// If the spill fails, the error is returned, the array is left as it was before
    /// the call and `element` is dropped.
    pub fn push(&mut self, element: T) -> Result<()> {
        let count = self.policy.spill_count(&self.resident, &element);
        if count > 0 {
            self.spill_front(count)?;
        }
        self.policy.on_appended(&element);
        self.resident.push_back(element);
        Ok(())
    }

    /// Appends every element of `elements` in order, stopping at the first failure.
    pub fn extend_from<I>(&mut self, elements: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
    {
        for element in elements {
            self.push(element)?;
        }
        Ok(())
    }

    /// Returns the element at `position`.
    ///
    /// Resident elements are borrowed from the in-memory buffer. Spilled elements are
    /// read back from the data file and returned as owned values. Reading does not
    /// modify the backing files.
    pub fn get(&self, position: usize) -> Result<ElementRef<'_, T>> {
        if position >= self.len() {
            return Err(Error::index_out_of_range(
                position as u64,
                self.len() as u64,
            ));
        }
        if position < self.spilled {
            self.read_spilled(position).map(ElementRef::Owned)
        } else {
            Ok(ElementRef::Borrowed(&self.resident[position - self.spilled]))
        }
    }

    fn read_spilled(&self, record: usize) -> Result<T> {
        let range = self.index.read_pair(record as u64)?;
        verify_index!(record, range.end <= self.store.end_offset());
        let bytes = self.store.read_range(range).map_err(|e| {
            let short_read = matches!(
                e.kind(),
                ErrorKind::Io { source, .. } if source.kind() == std::io::ErrorKind::UnexpectedEof
            );
            if short_read {
                Error::corrupt_index(record as u64, "data file is shorter than the indexed range")
            } else {
                e
            }
        })?;
        T::deserialize_from(&bytes)
    }

    /// Returns an iterator over all elements in append order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            array: self,
            position: 0,
        }
    }

    /// Moves the first `count` resident elements to disk, returning how many were
    /// moved. `count` is clamped to the number of resident elements.
    ///
    /// The records are written to the data file first and their offsets to the index
    /// afterwards. If either write fails, both files are truncated back and the
    /// resident buffer is left untouched.
    pub fn spill_front(&mut self, count: usize) -> Result<usize> {
        let count = count.min(self.resident.len());
        if count == 0 {
            return Ok(0);
        }

        let data_end = self.store.end_offset();
        let starts = self.store.append_records(self.resident.range(..count))?;
        let end = self.store.end_offset();
        if let Err(e) = self.index.append_batch(&starts, end) {
            if let Err(truncate_err) = self.store.truncate(data_end) {
                log::warn!("Failed to roll back spill data after index failure: {truncate_err}");
            }
            return Err(Error::io("offset index write", e));
        }

        self.resident.drain(..count);
        self.spilled += count;
        self.stats.spill_batches += 1;
        self.stats.spilled_records += count as u64;
        self.stats.spilled_bytes += end - data_end;
        self.policy.on_spilled(&self.resident);

        log::debug!(
            "Spilled {count} elements ({} bytes), {} spilled in total, {} resident",
            end - data_end,
            self.spilled,
            self.resident.len()
        );
        Ok(count)
    }

    /// Spills every resident element.
    pub fn spill_all(&mut self) -> Result<usize> {
        self.spill_front(self.resident.len())
    }

    /// Closes the backing files, surfacing any error from deleting them.
    pub fn close(self) -> Result<()> {
        let DiskArray { store, index, .. } = self;
        let data_result = store.close().map_err(|e| Error::io("spill data close", e));
        let index_result = index.close().map_err(|e| Error::io("offset index close", e));
        data_result.and(index_result)
    }
}

impl<T: Record> fmt::Debug for DiskArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiskArray")
            .field("len", &self.len())
            .field("spilled", &self.spilled)
            .field("resident", &self.resident.len())
            .field("data_path", &self.data_path())
            .field("stats", &self.stats)
            .finish()
    }
}

impl<'a, T: Record> IntoIterator for &'a DiskArray<T> {
    type Item = Result<ElementRef<'a, T>>;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

/// Iterator over the elements of a [`DiskArray`], see [`DiskArray::iter`].
///
/// Spilled elements are read from disk one at a time, so each item is fallible.
pub struct Iter<'a, T: Record> {
    array: &'a DiskArray<T>,
    position: usize,
}

impl<'a, T: Record> Iterator for Iter<'a, T> {
    type Item = Result<ElementRef<'a, T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.array.len() {
            return None;
        }
        let item = self.array.get(self.position);
        self.position += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.array.len() - self.position;
        (remaining, Some(remaining))
    }
}

impl<T: Record> ExactSizeIterator for Iter<'_, T> {}

#[cfg(test)]
mod tests {
    use diskarray_common::ErrorKind;
    use diskarray_io_impl::temp_file_store;

    use super::DiskArray;
    use crate::options::DiskArrayOptions;

    fn new_array(options: DiskArrayOptions) -> DiskArray<String> {
        let store = temp_file_store::create_in_memory(1 << 30).unwrap();
        DiskArray::new(store.as_ref(), options).unwrap()
    }

    #[test]
    fn test_empty() {
        let array = new_array(DiskArrayOptions::new());
        assert!(array.is_empty());
        assert_eq!(array.iter().count(), 0);
        let err = array.get(0).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::IndexOutOfRange { index: 0, len: 0 }
        ));
    }

    #[test]
    fn test_spill_front_boundary() {
        let mut array = new_array(DiskArrayOptions::new());
        array.extend_from((0..10).map(|i| format!("value-{i}"))).unwrap();
        assert_eq!(array.spill_front(4).unwrap(), 4);
        assert_eq!(array.spilled_len(), 4);
        assert_eq!(array.resident_len(), 6);

        let last_spilled = array.get(3).unwrap();
        assert!(last_spilled.is_owned());
        assert_eq!(*last_spilled, "value-3");
        let first_resident = array.get(4).unwrap();
        assert!(first_resident.is_borrowed());
        assert_eq!(*first_resident, "value-4");
        assert!(array.get(10).is_err());
    }

    #[test]
    fn test_spill_front_clamps() {
        let mut array = new_array(DiskArrayOptions::new());
        assert_eq!(array.spill_front(3).unwrap(), 0);
        array.push("a".to_string()).unwrap();
        array.push(String::new()).unwrap();
        assert_eq!(array.spill_front(100).unwrap(), 2);
        assert_eq!(array.spill_all().unwrap(), 0);
        assert_eq!(*array.get(1).unwrap(), "");

        let stats = array.stats();
        assert_eq!(stats.spill_batches, 1);
        assert_eq!(stats.spilled_records, 2);
        assert_eq!(stats.spilled_bytes, 1);
    }

    #[test]
    fn test_iter_across_boundary() {
        let mut array = new_array(DiskArrayOptions::new().with_max_resident(3));
        array.extend_from((0..20).map(|i| i.to_string())).unwrap();
        assert_eq!(array.resident_len(), 3);
        assert_eq!(array.iter().len(), 20);
        let values = array
            .iter()
            .map(|e| e.map(|e| e.into_owned()))
            .collect::<diskarray_common::Result<Vec<_>>>()
            .unwrap();
        let expected = (0..20).map(|i| i.to_string()).collect::<Vec<_>>();
        assert_eq!(values, expected);
    }

    #[test]
    fn test_invalid_options() {
        let store = temp_file_store::create_in_memory(1 << 20).unwrap();
        let result =
            DiskArray::<String>::new(store.as_ref(), DiskArrayOptions::new().with_max_resident(0));
        assert!(matches!(
            result.unwrap_err().kind(),
            ErrorKind::InvalidArgument { .. }
        ));
    }
}
