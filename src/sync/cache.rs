//! Random-access sources of previously known block content

use std::io::{ErrorKind, SeekFrom};
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Mutex;

/// Positional reads over prior content.
///
/// Reconstruction only ever reads from a cache; it never writes or closes it.
#[async_trait]
pub trait BlockCache: Send + Sync {
    /// Read up to `buf.len()` bytes starting at `offset`.
    ///
    /// Returns fewer bytes only when the end of the cache is reached; an
    /// offset at or past the end returns 0.
    async fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize>;
}

/// In-memory cache over a byte buffer
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    data: Bytes,
}

impl MemoryCache {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl BlockCache for MemoryCache {
    async fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
        let start = match usize::try_from(offset) {
            Ok(start) if start < self.data.len() => start,
            _ => return Ok(0),
        };
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        Ok(n)
    }
}

/// Cache backed by a file on disk.
///
/// Seek and read happen under one lock so concurrent readers cannot
/// interleave positions.
#[derive(Debug)]
pub struct FileCache {
    file: Mutex<File>,
}

impl FileCache {
    pub async fn open(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path).await?;
        Ok(Self::from_file(file))
    }

    pub fn from_file(file: File) -> Self {
        Self {
            file: Mutex::new(file),
        }
    }
}

#[async_trait]
impl BlockCache for FileCache {
    async fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
        let mut file = self.file.lock().await;
        file.seek(SeekFrom::Start(offset)).await?;

        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]).await {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}
