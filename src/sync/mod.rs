//! Block-level delta synchronization
//!
//! Two halves of an rsync-style transfer: checksum generation over the old
//! content, and reconstruction of the new content from block operations.
//! The matcher that turns checksums into operations lives elsewhere; the
//! halves share only the records in [`types`] and the block size in
//! [`SyncConfig`].

pub mod apply;
pub mod cache;
pub mod checksums;
pub mod config;
pub mod error;
pub mod rolling_hash;
pub mod strong_hash;
pub mod types;

pub use apply::{apply, Reconstructor};
pub use cache::{BlockCache, FileCache, MemoryCache};
pub use checksums::{checksums, ChecksumGenerator, ChecksumStream};
pub use config::{SyncConfig, DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE};
pub use error::{Result, SyncError};
pub use rolling_hash::{weak_checksum, WeakChecksum};
pub use strong_hash::{
    Blake3Strong, Md5Strong, Sha256Strong, StrongChecksumMode, StrongHashAlgorithm, StrongHasher,
};
pub use types::{ApplyStats, BlockChecksum, BlockOperation};

pub use tokio_util::sync::CancellationToken;
