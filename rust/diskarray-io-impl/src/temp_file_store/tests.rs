use std::io::Write;
use std::sync::Arc;

use diskarray_io::{
    ReadAt, ReadAtExt, TemporaryBuffer, TemporaryFileStore, TemporaryWritable,
};

use super::FileStoreOptions;

fn create_stores_with_capacity(
    dir: &tempfile::TempDir,
    capacity: u64,
) -> Vec<Arc<dyn TemporaryFileStore>> {
    vec![
        super::create_in_memory(capacity).unwrap(),
        super::create_file_based(
            FileStoreOptions::default()
                .with_parent_path(dir.path())
                .with_capacity(capacity),
        )
        .unwrap(),
    ]
}

fn create_stores(dir: &tempfile::TempDir) -> Vec<Arc<dyn TemporaryFileStore>> {
    create_stores_with_capacity(dir, 10 * 1024 * 1024)
}

fn test_allocate_buffer_impl(store: &Arc<dyn TemporaryFileStore>) {
    let mut buffer = store
        .allocate_buffer(None)
        .expect("Failed to allocate buffer");
    assert_eq!(buffer.current_size(), 0);

    let data = b"Hello, buffer!";
    buffer.write_all(data).expect("Failed to write data");
    assert_eq!(buffer.current_size(), data.len() as u64);

    let read_data = buffer
        .read_at(0..data.len() as u64)
        .expect("Failed to read data");
    assert_eq!(read_data, data);
}

#[test]
fn test_allocate_buffer() {
    let dir = tempfile::tempdir().unwrap();
    for store in create_stores_with_capacity(&dir, 1024) {
        test_allocate_buffer_impl(&store);
    }
}

fn test_truncate_impl(store: &Arc<dyn TemporaryFileStore>) {
    let mut buffer = store
        .allocate_buffer(None)
        .expect("Failed to allocate buffer");
    buffer.write_all(b"Hello, world!").unwrap();

    buffer.truncate(5).expect("Failed to truncate");
    assert_eq!(buffer.current_size(), 5);
    assert_eq!(buffer.read_at(0..100).unwrap(), b"Hello");

    // Appends continue at the new end.
    buffer.write_all(b", again").unwrap();
    assert_eq!(buffer.read_at(0..100).unwrap(), b"Hello, again");

    // Truncating beyond the end is a no-op.
    buffer.truncate(1000).unwrap();
    assert_eq!(buffer.current_size(), 12);
}

#[test]
fn test_truncate() {
    let dir = tempfile::tempdir().unwrap();
    for store in create_stores_with_capacity(&dir, 1024) {
        test_truncate_impl(&store);
    }
}

fn test_write_at_overwrite_and_extend_impl(store: &Arc<dyn TemporaryFileStore>) {
    let mut buffer = store.allocate_buffer(None).unwrap();
    buffer.write_all(&[0u8; 16]).unwrap();
    buffer.write_at(8, &[1u8; 8]).unwrap();
    buffer.write_at(16, &[2u8; 8]).unwrap();
    assert_eq!(buffer.current_size(), 24);

    let bytes = buffer.read_exact_at(0..24).unwrap();
    assert_eq!(&bytes[..8], &[0u8; 8]);
    assert_eq!(&bytes[8..16], &[1u8; 8]);
    assert_eq!(&bytes[16..], &[2u8; 8]);
    assert!(buffer.read_exact_at(20..30).is_err());
}

#[test]
fn test_write_at_overwrite_and_extend() {
    let dir = tempfile::tempdir().unwrap();
    for store in create_stores(&dir) {
        test_write_at_overwrite_and_extend_impl(&store);
    }
}

fn test_spill_files_are_independent_impl(store: &Arc<dyn TemporaryFileStore>) {
    let mut files = store.allocate_spill_files(None).unwrap();
    files.data.write_all(b"record bytes").unwrap();
    files.index.write_all(&0u64.to_ne_bytes()).unwrap();
    assert_eq!(files.data.current_size(), 12);
    assert_eq!(files.index.current_size(), 8);
    assert_eq!(files.index.read_at(0..8).unwrap(), 0u64.to_ne_bytes());
    files.data.close().unwrap();
    files.index.close().unwrap();
}

#[test]
fn test_spill_files_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    for store in create_stores(&dir) {
        test_spill_files_are_independent_impl(&store);
    }
}

fn test_capacity_is_shared_impl(store: &Arc<dyn TemporaryFileStore>) {
    let mut a = store.allocate_buffer(None).unwrap();
    let mut b = store.allocate_buffer(None).unwrap();
    a.write_all(&[7u8; 600]).unwrap();
    let err = b.write_all(&[7u8; 600]).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::Other);
    assert_eq!(b.current_size(), 0);

    drop(a);
    b.write_all(&[7u8; 600]).unwrap();
    assert_eq!(b.current_size(), 600);
}

#[test]
fn test_capacity_is_shared() {
    let dir = tempfile::tempdir().unwrap();
    for store in create_stores_with_capacity(&dir, 1024) {
        test_capacity_is_shared_impl(&store);
    }
}
