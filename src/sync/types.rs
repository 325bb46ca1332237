use bytes::Bytes;

use super::error::SyncError;
use super::rolling_hash::weak_checksum;
use super::strong_hash::{StrongChecksumMode, StrongHasher};

/// Fingerprint of one source block, as emitted by the checksum generator
#[derive(Debug)]
pub struct BlockChecksum {
    /// Zero-based block number in source order
    pub index: u64,
    /// Weak rolling checksum (Adler-32)
    pub weak: u32,
    /// Strong checksum, see [`StrongChecksumMode`]
    pub strong: Vec<u8>,
    /// When set, `weak` and `strong` carry no meaning
    pub error: Option<SyncError>,
}

impl BlockChecksum {
    pub fn new(index: u64, weak: u32, strong: Vec<u8>) -> Self {
        Self {
            index,
            weak,
            strong,
            error: None,
        }
    }

    pub fn failed(index: u64, error: SyncError) -> Self {
        Self {
            index,
            weak: 0,
            strong: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }

    /// Check a candidate block against this fingerprint.
    ///
    /// The weak checksum is compared first; the strong checksum is only
    /// computed when it agrees. Error records never match.
    pub fn matches(
        &self,
        block: &[u8],
        mode: StrongChecksumMode,
        hasher: &mut dyn StrongHasher,
    ) -> bool {
        if self.is_err() || weak_checksum(block) != self.weak {
            return false;
        }
        mode.compute(hasher, block) == self.strong
    }
}

/// One step of a reconstruction
#[derive(Debug)]
pub struct BlockOperation {
    /// Block position; only used to locate cached content
    pub index: u64,
    /// Literal content for a new or changed block
    pub data: Option<Bytes>,
    /// When set, reconstruction aborts at this operation
    pub error: Option<SyncError>,
}

impl BlockOperation {
    /// Write `data` verbatim
    pub fn literal(index: u64, data: impl Into<Bytes>) -> Self {
        Self {
            index,
            data: Some(data.into()),
            error: None,
        }
    }

    /// Copy block `index` from the cache
    pub fn reuse(index: u64) -> Self {
        Self {
            index,
            data: None,
            error: None,
        }
    }

    pub fn failed(index: u64, error: SyncError) -> Self {
        Self {
            index,
            data: None,
            error: Some(error),
        }
    }

    /// Literal content to write, if any.
    ///
    /// Empty literals count as absent, so they resolve to a cache reuse.
    pub fn literal_data(&self) -> Option<&Bytes> {
        self.data.as_ref().filter(|data| !data.is_empty())
    }
}

/// Summary of a successful reconstruction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub literal_blocks: u64,
    pub reused_blocks: u64,
    pub literal_bytes: u64,
    pub reused_bytes: u64,
    /// Reused blocks that came back shorter than a full block
    pub short_reads: u64,
}

impl ApplyStats {
    pub fn operations(&self) -> u64 {
        self.literal_blocks + self.reused_blocks
    }

    pub fn bytes_written(&self) -> u64 {
        self.literal_bytes + self.reused_bytes
    }

    /// Percentage of output taken from the cache
    pub fn reuse_ratio(&self) -> f64 {
        let total = self.bytes_written();
        if total == 0 {
            return 0.0;
        }
        self.reused_bytes as f64 / total as f64 * 100.0
    }
}

impl std::fmt::Display for ApplyStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Apply: {} ops, {} bytes written, {} reused ({:.1}%), {} literal",
            self.operations(),
            self.bytes_written(),
            self.reused_bytes,
            self.reuse_ratio(),
            self.literal_bytes
        )
    }
}
