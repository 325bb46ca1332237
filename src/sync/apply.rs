//! Reconstruction of a destination from block operations
//!
//! Operations are applied one at a time, in arrival order, on the caller's
//! task. The first fatal error aborts the whole reconstruction.
//!
//! Apply does not drain the operation stream when it aborts. A producer
//! feeding it through a channel must either watch the same cancellation
//! token or treat a closed channel as a signal to stop; otherwise it can
//! block forever on its next send.

use futures::{Stream, StreamExt};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use super::cache::BlockCache;
use super::config::SyncConfig;
use super::error::{Result, SyncError};
use super::types::{ApplyStats, BlockOperation};

/// Applies operation streams for one block size
#[derive(Debug, Clone)]
pub struct Reconstructor {
    block_size: usize,
}

impl Reconstructor {
    pub fn new(config: &SyncConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            block_size: config.block_size,
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Write every operation's block to `dst`, in order.
    ///
    /// Returns once `operations` ends. `dst` is flushed but not shut down;
    /// the caller owns `dst` and `cache`.
    pub async fn apply<W, C, S>(
        &self,
        dst: &mut W,
        cache: &C,
        mut operations: S,
        cancel: &CancellationToken,
    ) -> Result<ApplyStats>
    where
        W: AsyncWrite + Unpin + ?Sized,
        C: BlockCache + ?Sized,
        S: Stream<Item = BlockOperation> + Unpin,
    {
        let mut stats = ApplyStats::default();
        let mut buffer = vec![0u8; self.block_size];

        while let Some(mut op) = operations.next().await {
            let index = op.index;
            if cancel.is_cancelled() {
                tracing::debug!(
                    "Apply cancelled before operation {} ({} applied)",
                    index,
                    stats.operations()
                );
                return Err(SyncError::Operation {
                    index,
                    source: Box::new(SyncError::Cancelled { index }),
                });
            }

            if let Some(err) = op.error.take() {
                return Err(SyncError::Operation {
                    index,
                    source: Box::new(err),
                });
            }

            let block: &[u8] = match op.literal_data() {
                Some(data) => {
                    stats.literal_blocks += 1;
                    stats.literal_bytes += data.len() as u64;
                    &data[..]
                }
                None => {
                    let n = self.read_cached(cache, index, &mut buffer).await?;
                    if n < self.block_size {
                        stats.short_reads += 1;
                    }
                    stats.reused_blocks += 1;
                    stats.reused_bytes += n as u64;
                    &buffer[..n]
                }
            };

            dst.write_all(block)
                .await
                .map_err(|source| SyncError::Write { index, source })?;
        }

        dst.flush().await.map_err(|source| SyncError::Write {
            index: stats.operations(),
            source,
        })?;

        tracing::debug!("{}", stats);
        Ok(stats)
    }

    /// Read block `index` from the cache into `buffer`.
    ///
    /// A short read at the end of the cache is tolerated.
    async fn read_cached<C>(&self, cache: &C, index: u64, buffer: &mut [u8]) -> Result<usize>
    where
        C: BlockCache + ?Sized,
    {
        let offset = index.checked_mul(self.block_size as u64).ok_or_else(|| {
            SyncError::InvalidInput(format!(
                "block {} overflows offset with block size {}",
                index, self.block_size
            ))
        })?;

        let n = cache
            .read_at(buffer, offset)
            .await
            .map_err(|source| SyncError::CacheRead {
                index,
                offset,
                source,
            })?;

        if n < buffer.len() {
            tracing::warn!(
                "Short read from cache for block {} at offset {}: {} of {} bytes",
                index,
                offset,
                n,
                buffer.len()
            );
        }

        Ok(n)
    }
}

/// Apply `operations` with the default block size.
pub async fn apply<W, C, S>(
    dst: &mut W,
    cache: &C,
    operations: S,
    cancel: &CancellationToken,
) -> Result<ApplyStats>
where
    W: AsyncWrite + Unpin + ?Sized,
    C: BlockCache + ?Sized,
    S: Stream<Item = BlockOperation> + Unpin,
{
    Reconstructor::new(&SyncConfig::default())?
        .apply(dst, cache, operations, cancel)
        .await
}
