//! In-memory and file-based implementations of the `TemporaryFileStore`.

use std::sync::Arc;

use diskarray_io::TemporaryFileStore;

pub mod file;
pub mod memory;
#[cfg(test)]
mod tests;

pub use file::{FileStoreOptions, INDEX_FILE_SUFFIX, LocalTempFileStore};
pub use memory::InMemoryTempFileStore;

pub fn create_in_memory(capacity: u64) -> std::io::Result<Arc<dyn TemporaryFileStore>> {
    Ok(Arc::new(InMemoryTempFileStore::new(capacity)))
}

pub fn create_file_based(
    options: FileStoreOptions,
) -> std::io::Result<Arc<dyn TemporaryFileStore>> {
    Ok(Arc::new(LocalTempFileStore::new(options)?))
}
