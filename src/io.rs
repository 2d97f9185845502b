//! Byte sources the resample pipeline reads from

use crate::error::{ResampleError, Result};
use bytes::Bytes;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Readable and seekable handle
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// Source of the bytes of a stored volume.
///
/// A source only hands out handles; each resample pass opens its own and
/// drops it before returning.
pub trait VolumeSource {
    /// Open a new handle positioned at the start of the source
    fn open(&self) -> Result<Box<dyn ReadSeek + '_>>;

    /// Total size of the source in bytes
    fn size(&self) -> Result<u64>;

    /// Human readable description for logs and errors
    fn describe(&self) -> String;
}

/// File on the local filesystem
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VolumeSource for FileSource {
    fn open(&self) -> Result<Box<dyn ReadSeek + '_>> {
        let file = File::open(&self.path)?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn size(&self) -> Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Bytes already held in memory
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Bytes,
}

impl MemorySource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

impl VolumeSource for MemorySource {
    fn open(&self) -> Result<Box<dyn ReadSeek + '_>> {
        Ok(Box::new(Cursor::new(self.data.as_ref())))
    }

    fn size(&self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn describe(&self) -> String {
        format!("<memory: {} bytes>", self.data.len())
    }
}

/// Read exactly `buf.len()` bytes at `offset`
pub fn read_exact_at(reader: &mut dyn ReadSeek, offset: u64, buf: &mut [u8]) -> Result<()> {
    reader.seek(SeekFrom::Start(offset))?;
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ResampleError::SizeMismatch {
                expected: offset + buf.len() as u64,
                actual: offset,
            }
        } else {
            ResampleError::Io(e)
        }
    })
}
