//! Positional access to local files.

use std::{fs::File, io, ops::Range, path::Path};

use crate::{ReadAt, verify};

/// Read-only positional access to an existing file, e.g. a spill file retained
/// for inspection after its container was closed.
///
/// The file length is captured when the file is opened. Data appended afterwards
/// is not visible through this reader.
pub struct FileReader {
    file: File,
    len: u64,
}

impl FileReader {
    pub fn open(path: impl AsRef<Path>) -> io::Result<FileReader> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(FileReader { file, len })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl ReadAt for FileReader {
    fn size(&self) -> io::Result<u64> {
        Ok(self.len)
    }

    fn read_at(&self, range: Range<u64>) -> io::Result<Vec<u8>> {
        verify!(range.end >= range.start);
        let end = range.end.min(self.len);
        if end <= range.start {
            return Ok(Vec::new());
        }
        let mut buf = vec![0u8; (end - range.start) as usize];
        read_exact_at(&self.file, range.start, &mut buf)?;
        Ok(buf)
    }
}

/// Fills `buf` from the file starting at `pos`, without moving a shared cursor.
#[cfg(unix)]
pub fn read_exact_at(file: &File, pos: u64, buf: &mut [u8]) -> io::Result<()> {
    std::os::unix::fs::FileExt::read_exact_at(file, buf, pos)
}

/// Writes all of `buf` to the file starting at `pos`, extending the file if needed.
#[cfg(unix)]
pub fn write_all_at(file: &File, pos: u64, buf: &[u8]) -> io::Result<()> {
    std::os::unix::fs::FileExt::write_all_at(file, buf, pos)
}

#[cfg(windows)]
pub fn read_exact_at(file: &File, mut pos: u64, mut buf: &mut [u8]) -> io::Result<()> {
    use std::os::windows::fs::FileExt;

    while !buf.is_empty() {
        let n = file.seek_read(buf, pos)?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "positional read past the end of file",
            ));
        }
        buf = &mut buf[n..];
        pos += n as u64;
    }
    Ok(())
}

#[cfg(windows)]
pub fn write_all_at(file: &File, mut pos: u64, mut buf: &[u8]) -> io::Result<()> {
    use std::os::windows::fs::FileExt;

    while !buf.is_empty() {
        let n = file.seek_write(buf, pos)?;
        if n == 0 {
            return Err(io::ErrorKind::WriteZero.into());
        }
        buf = &buf[n..];
        pos += n as u64;
    }
    Ok(())
}
