//! Positioned byte access for table files
//!
//! The decoder never opens files itself; it asks a [`ByteSource`] for
//! `len` bytes at `offset`. [`FileSource`] serves a file on disk and
//! [`MemorySource`] an owned buffer.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Abstraction over positioned reads.
pub trait ByteSource {
    /// Read exactly `len` bytes starting at `offset`.
    ///
    /// Returns `Ok(None)` when fewer than `len` bytes remain, which callers
    /// treat as end of data.
    fn read_at(&mut self, offset: u64, len: usize) -> io::Result<Option<Vec<u8>>>;
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read_at(&mut self, offset: u64, len: usize) -> io::Result<Option<Vec<u8>>> {
        (**self).read_at(offset, len)
    }
}

/// A source backed by a file on the local filesystem.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    path: PathBuf,
}

impl FileSource {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileSource {
    fn read_at(&mut self, offset: u64, len: usize) -> io::Result<Option<Vec<u8>>> {
        self.file.seek(SeekFrom::Start(offset))?;

        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => return Ok(None),
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(Some(buf))
    }
}

/// A source over bytes already in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    data: Vec<u8>,
}

impl MemorySource {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Vec<u8>> for MemorySource {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl ByteSource for MemorySource {
    fn read_at(&mut self, offset: u64, len: usize) -> io::Result<Option<Vec<u8>>> {
        let Ok(start) = usize::try_from(offset) else {
            return Ok(None);
        };
        let end = match start.checked_add(len) {
            Some(end) if end <= self.data.len() => end,
            _ => return Ok(None),
        };
        Ok(Some(self.data[start..end].to_vec()))
    }
}
