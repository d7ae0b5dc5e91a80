use std::{io, ops::Range, path::Path};

use diskarray_io::{
    ReadAt, SpillFiles, TemporaryBuffer, TemporaryFileStore, TemporaryWritable, verify,
};

use crate::capacity::{Capacity, Reservation};

/// A [`TemporaryFileStore`] keeping every buffer in process memory.
///
/// Useful for tests and for callers that only want the capacity accounting of a
/// store, without touching the filesystem.
pub struct InMemoryTempFileStore {
    capacity: Capacity,
}

impl InMemoryTempFileStore {
    pub fn new(capacity: u64) -> InMemoryTempFileStore {
        InMemoryTempFileStore {
            capacity: Capacity::new(capacity),
        }
    }

    /// Bytes still available to the buffers of this store.
    pub fn available_space(&self) -> u64 {
        self.capacity.remaining()
    }

    fn new_buffer(&self, size_hint: Option<usize>) -> MemoryBuffer {
        MemoryBuffer {
            bytes: Vec::with_capacity(size_hint.unwrap_or_default()),
            reservation: self.capacity.reserve_empty(),
        }
    }
}

impl TemporaryFileStore for InMemoryTempFileStore {
    fn allocate_buffer(&self, size_hint: Option<usize>) -> io::Result<Box<dyn TemporaryBuffer>> {
        Ok(Box::new(self.new_buffer(size_hint)))
    }

    fn allocate_spill_files(&self, size_hint: Option<usize>) -> io::Result<SpillFiles> {
        Ok(SpillFiles {
            data: Box::new(self.new_buffer(size_hint)),
            index: Box::new(self.new_buffer(None)),
        })
    }
}

/// A growable byte vector charged against its store's capacity.
///
/// Sequential writes append at the current end.
struct MemoryBuffer {
    bytes: Vec<u8>,
    reservation: Reservation,
}

impl MemoryBuffer {
    fn len(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl io::Write for MemoryBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_at(self.len(), buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ReadAt for MemoryBuffer {
    fn size(&self) -> io::Result<u64> {
        Ok(self.len())
    }

    fn read_at(&self, range: Range<u64>) -> io::Result<Vec<u8>> {
        verify!(range.end >= range.start);
        let start = range.start.min(self.len()) as usize;
        let end = range.end.min(self.len()) as usize;
        Ok(self.bytes[start..end].to_vec())
    }
}

impl TemporaryWritable for MemoryBuffer {
    fn current_size(&self) -> u64 {
        self.len()
    }

    fn truncate(&mut self, end_pos: u64) -> io::Result<()> {
        if end_pos < self.len() {
            self.bytes.truncate(end_pos as usize);
            self.reservation.shrink_to(end_pos);
        }
        Ok(())
    }

    fn path(&self) -> Option<&Path> {
        None
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }
}

impl TemporaryBuffer for MemoryBuffer {
    fn write_at(&mut self, pos: u64, buf: &[u8]) -> io::Result<()> {
        let end = pos + buf.len() as u64;
        self.reservation.ensure_at_least(end)?;
        if end > self.len() {
            self.bytes.resize(end as usize, 0);
        }
        self.bytes[pos as usize..end as usize].copy_from_slice(buf);
        Ok(())
    }
}
