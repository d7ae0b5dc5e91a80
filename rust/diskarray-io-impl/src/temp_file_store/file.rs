use std::{
    ffi::OsString,
    fs::{self, File},
    io,
    ops::Range,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use diskarray_io::{
    ReadAt, SpillFiles, TemporaryBuffer, TemporaryFileStore, TemporaryWritable, verify,
};

use crate::{
    capacity::{Capacity, Reservation},
    names::generate_temp_file_name,
};

/// Length of the random part of a generated file name.
const NAME_LEN: usize = 16;

/// Upper bound on name collisions tolerated before giving up.
const MAX_NAME_ATTEMPTS: usize = 64;

/// Suffix appended to the data file name to form the index file name.
pub const INDEX_FILE_SUFFIX: &str = ".index";

/// Configuration of a [`LocalTempFileStore`].
#[derive(Debug, Clone)]
pub struct FileStoreOptions {
    /// Directory for the backing files. Defaults to the system temporary directory.
    pub parent_path: Option<PathBuf>,
    /// File name prefix.
    pub prefix: String,
    /// Keep the files on disk after their owner is dropped (for debugging and inspection).
    pub retain_files: bool,
    /// Total number of bytes all live files of this store may occupy.
    pub capacity: u64,
}

impl Default for FileStoreOptions {
    fn default() -> Self {
        FileStoreOptions {
            parent_path: None,
            prefix: "diskarray".to_string(),
            retain_files: false,
            capacity: u64::MAX,
        }
    }
}

impl FileStoreOptions {
    pub fn with_parent_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.parent_path = Some(path.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn retain_files(mut self, retain: bool) -> Self {
        self.retain_files = retain;
        self
    }

    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }
}

/// A [`TemporaryFileStore`] that creates uniquely named files in a local directory.
///
/// Name selection and file creation happen under a mutex owned by the store, so
/// containers sharing one store never race on a backing file name. Files are removed
/// when their handle is dropped, unless the store was configured to retain them.
#[derive(Clone)]
pub struct LocalTempFileStore(Arc<LocalTempContainer>);

struct LocalTempContainer {
    directory: PathBuf,
    prefix: String,
    retain_files: bool,
    capacity: Capacity,
    name_lock: Mutex<()>,
}

impl LocalTempFileStore {
    pub fn new(options: FileStoreOptions) -> io::Result<LocalTempFileStore> {
        let directory = options.parent_path.unwrap_or_else(std::env::temp_dir);
        verify!(fs::metadata(&directory)?.is_dir());
        verify!(!options.prefix.is_empty());
        Ok(LocalTempFileStore(Arc::new(LocalTempContainer {
            directory,
            prefix: options.prefix,
            retain_files: options.retain_files,
            capacity: Capacity::new(options.capacity),
            name_lock: Mutex::new(()),
        })))
    }

    pub fn path(&self) -> &Path {
        &self.0.directory
    }

    pub fn retains_files(&self) -> bool {
        self.0.retain_files
    }

    pub fn available_space(&self) -> u64 {
        self.0.capacity.remaining()
    }

    /// Picks a fresh name and creates the data file (plus, optionally, its index
    /// companion). Must be called with the name lock held.
    fn create_files_locked(
        &self,
        with_index: bool,
    ) -> io::Result<(LocalTempFile, Option<LocalTempFile>)> {
        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = generate_temp_file_name(&self.0.prefix, NAME_LEN);
            if let Some(files) = self.create_named_files(name, with_index)? {
                return Ok(files);
            }
        }
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!(
                "failed to allocate a unique temporary file name in {}",
                self.0.directory.display()
            ),
        ))
    }

    /// Creates the files for one candidate name. Returns `None` if either name is
    /// taken, in which case nothing is left behind in the directory.
    fn create_named_files(
        &self,
        name: OsString,
        with_index: bool,
    ) -> io::Result<Option<(LocalTempFile, Option<LocalTempFile>)>> {
        let data = match self.create_new_file(self.0.directory.join(&name)) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => return Err(e),
        };
        if !with_index {
            return Ok(Some((data, None)));
        }

        let mut index_name = name;
        index_name.push(INDEX_FILE_SUFFIX);
        match self.create_new_file(self.0.directory.join(index_name)) {
            Ok(index) => Ok(Some((data, Some(index)))),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let data_path = data.path.clone();
                if let Err(remove_err) = data.discard() {
                    log::warn!(
                        "Failed to remove {} after an index name collision: {remove_err}",
                        data_path.display()
                    );
                }
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn create_new_file(&self, path: PathBuf) -> io::Result<LocalTempFile> {
        let file = File::options()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;
        Ok(LocalTempFile {
            _container: self.0.clone(),
            allocation: self.0.capacity.reserve_empty(),
            file: Some(file),
            path,
            retain: self.0.retain_files,
            pos: 0,
            size: 0,
        })
    }

    fn create_files(
        &self,
        with_index: bool,
    ) -> io::Result<(LocalTempFile, Option<LocalTempFile>)> {
        let _guard = self
            .0
            .name_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.create_files_locked(with_index)
    }
}

impl TemporaryFileStore for LocalTempFileStore {
    fn allocate_buffer(&self, _size_hint: Option<usize>) -> io::Result<Box<dyn TemporaryBuffer>> {
        let (file, _) = self.create_files(false)?;
        log::debug!("Created temporary file {}", file.path.display());
        Ok(Box::new(file))
    }

    fn allocate_spill_files(&self, _size_hint: Option<usize>) -> io::Result<SpillFiles> {
        let (data, index) = self.create_files(true)?;
        let index = index.ok_or_else(|| io::Error::other("index file was not created"))?;
        log::debug!(
            "Created spill files {} and {}",
            data.path.display(),
            index.path.display()
        );
        Ok(SpillFiles {
            data: Box::new(data),
            index: Box::new(index),
        })
    }
}

struct LocalTempFile {
    _container: Arc<LocalTempContainer>,
    allocation: Reservation,
    /// `None` once the file has been closed.
    file: Option<File>,
    path: PathBuf,
    retain: bool,
    pos: u64,
    size: u64,
}

impl LocalTempFile {
    fn file(&self) -> io::Result<&File> {
        self.file
            .as_ref()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn release(&mut self) -> io::Result<()> {
        if self.file.take().is_none() {
            return Ok(());
        }
        if self.retain {
            log::debug!("Retaining {} ({} bytes)", self.path.display(), self.size);
            return Ok(());
        }
        log::debug!("Removing {}", self.path.display());
        fs::remove_file(&self.path)
    }

    /// Removes the file regardless of the store's retain setting.
    fn discard(mut self) -> io::Result<()> {
        self.file = None;
        fs::remove_file(&self.path)
    }
}

impl Drop for LocalTempFile {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::warn!("Failed to remove {}: {e}", self.path.display());
        }
    }
}

impl io::Write for LocalTempFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_at(self.pos, buf)?;
        self.pos += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ReadAt for LocalTempFile {
    fn size(&self) -> io::Result<u64> {
        Ok(self.size)
    }

    fn read_at(&self, range: Range<u64>) -> io::Result<Vec<u8>> {
        verify!(range.end >= range.start);
        let end = range.end.min(self.size);
        if end > range.start {
            let mut buf = vec![0u8; (end - range.start) as usize];
            diskarray_io::file::read_exact_at(self.file()?, range.start, &mut buf)?;
            Ok(buf)
        } else {
            Ok(Vec::new())
        }
    }
}

impl TemporaryWritable for LocalTempFile {
    fn current_size(&self) -> u64 {
        self.size
    }

    fn truncate(&mut self, end_pos: u64) -> io::Result<()> {
        if end_pos < self.size {
            self.file()?.set_len(end_pos)?;
            self.allocation.shrink_to(end_pos);
            self.pos = std::cmp::min(self.pos, end_pos);
            self.size = end_pos;
        }
        Ok(())
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn close(mut self: Box<Self>) -> io::Result<()> {
        self.release()
    }
}

impl TemporaryBuffer for LocalTempFile {
    fn write_at(&mut self, pos: u64, buf: &[u8]) -> io::Result<()> {
        let end_pos = pos + buf.len() as u64;
        self.allocation.ensure_at_least(end_pos)?;
        match diskarray_io::file::write_all_at(self.file()?, pos, buf) {
            Ok(()) => {
                self.size = std::cmp::max(self.size, end_pos);
                Ok(())
            }
            Err(e) => {
                if let Some(file) = self.file.as_ref() {
                    if let Err(rollback_err) = file.set_len(self.size) {
                        log::warn!(
                            "Failed to roll back {} to {} bytes: {rollback_err}",
                            self.path.display(),
                            self.size
                        );
                    }
                }
                self.allocation.shrink_to(self.size);
                Err(e)
            }
        }
    }
}
