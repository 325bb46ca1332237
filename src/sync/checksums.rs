//! Streaming block checksum generation
//!
//! Reads a source in fixed-size blocks on a background task and hands each
//! block's fingerprint to the consumer over a single-slot channel. The slot is
//! reserved before each read, so the reader is never more than one block ahead
//! of its consumer.

use std::io::ErrorKind;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::config::SyncConfig;
use super::error::{Result, SyncError};
use super::rolling_hash::weak_checksum;
use super::strong_hash::{StrongChecksumMode, StrongHasher};
use super::types::BlockChecksum;

/// Receiving half of a checksum generation task.
///
/// The task reads a block only once the previous record has been taken, so
/// there is never more than one unconsumed record. Ends when the source is
/// exhausted, after a cancellation record, or when the task stops for any
/// other reason. Dropping it stops the task before its next read.
pub struct ChecksumStream {
    rx: mpsc::Receiver<BlockChecksum>,
    handle: JoinHandle<()>,
}

impl ChecksumStream {
    /// Next fingerprint, or `None` once the stream is closed
    pub async fn recv(&mut self) -> Option<BlockChecksum> {
        self.rx.recv().await
    }

    /// Drain every remaining fingerprint
    pub async fn collect_all(mut self) -> Vec<BlockChecksum> {
        let mut out = Vec::new();
        while let Some(checksum) = self.rx.recv().await {
            out.push(checksum);
        }
        out
    }

    /// Whether the generator task has exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Stream for ChecksumStream {
    type Item = BlockChecksum;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Builds checksum streams for one block size and strong hash setup
pub struct ChecksumGenerator {
    block_size: usize,
    mode: StrongChecksumMode,
    hasher: Box<dyn StrongHasher>,
}

impl ChecksumGenerator {
    pub fn new(config: &SyncConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            block_size: config.block_size,
            mode: config.strong_mode,
            hasher: config.strong_hash.hasher(),
        })
    }

    /// Replace the configured strong hasher
    pub fn with_hasher(mut self, hasher: Box<dyn StrongHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Spawn the generator task over `source`.
    ///
    /// Must be called from within a tokio runtime; see [`try_generate`](Self::try_generate)
    /// for a checked variant. The source is owned by the task and dropped when
    /// it ends; the caller keeps anything that needs explicit closing on its
    /// side of the reader.
    pub fn generate<R>(self, source: R, cancel: CancellationToken) -> ChecksumStream
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        self.spawn_on(&Handle::current(), source, cancel)
    }

    /// Like [`generate`](Self::generate), but reports a missing runtime as an error
    pub fn try_generate<R>(self, source: R, cancel: CancellationToken) -> Result<ChecksumStream>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|e| {
            SyncError::InvalidInput(format!("checksum generation needs a tokio runtime: {}", e))
        })?;
        Ok(self.spawn_on(&runtime, source, cancel))
    }

    fn spawn_on<R>(self, runtime: &Handle, source: R, cancel: CancellationToken) -> ChecksumStream
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(1);
        let handle = runtime.spawn(self.run(source, tx, cancel));
        ChecksumStream { rx, handle }
    }

    async fn run<R>(mut self, mut source: R, tx: mpsc::Sender<BlockChecksum>, cancel: CancellationToken)
    where
        R: AsyncRead + Unpin,
    {
        // `tx` is dropped on every return path, which closes the stream.
        let mut buffer = vec![0u8; self.block_size];
        let mut index: u64 = 0;

        loop {
            // Wait for the consumer to free the slot before touching the
            // source, so at most one unconsumed record exists at a time.
            let permit = match tx.reserve().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::debug!("Checksum consumer dropped at block {}", index);
                    return;
                }
            };

            if cancel.is_cancelled() {
                tracing::debug!("Checksum generation cancelled at block {}", index);
                permit.send(BlockChecksum::failed(index, SyncError::Cancelled { index }));
                return;
            }

            let record = match read_block(&mut source, &mut buffer).await {
                Ok(0) => {
                    tracing::debug!("Checksum generation finished after {} blocks", index);
                    return;
                }
                Ok(n) => {
                    let block = &buffer[..n];
                    let weak = weak_checksum(block);
                    let strong = self.mode.compute(self.hasher.as_mut(), block);
                    BlockChecksum::new(index, weak, strong)
                }
                Err(e) => {
                    tracing::warn!("Failed reading block {}: {}", index, e);
                    BlockChecksum::failed(index, SyncError::ReadBlock { index, source: e })
                }
            };

            permit.send(record);
            index += 1;
        }
    }
}

/// Fill `buffer` from `source`, stopping early only at end-of-stream.
///
/// Returns the number of bytes read; 0 means the source was already exhausted.
async fn read_block<R>(source: &mut R, buffer: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buffer.len() {
        match source.read(&mut buffer[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Start generating checksums for `source` with the default configuration.
///
/// `hasher` overrides the default strong hash (128-bit BLAKE3).
pub fn checksums<R>(
    source: R,
    hasher: Option<Box<dyn StrongHasher>>,
    cancel: CancellationToken,
) -> Result<ChecksumStream>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut generator = ChecksumGenerator::new(&SyncConfig::default())?;
    if let Some(hasher) = hasher {
        generator = generator.with_hasher(hasher);
    }
    generator.try_generate(source, cancel)
}
