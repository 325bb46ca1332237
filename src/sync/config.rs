use serde::{Deserialize, Serialize};

use super::error::{Result, SyncError};
use super::strong_hash::{StrongChecksumMode, StrongHashAlgorithm};

/// Default block size (6 KiB)
pub const DEFAULT_BLOCK_SIZE: usize = 6 * 1024;

/// Largest block size a session may use (16 MiB)
pub const MAX_BLOCK_SIZE: usize = 16 * 1024 * 1024;

/// Settings shared by both halves of a sync session.
///
/// The checksum generator and the reconstructor must be built from the same
/// `block_size`, otherwise cache offsets point at the wrong content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncConfig {
    pub block_size: usize,
    pub strong_hash: StrongHashAlgorithm,
    pub strong_mode: StrongChecksumMode,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            strong_hash: StrongHashAlgorithm::default(),
            strong_mode: StrongChecksumMode::default(),
        }
    }
}

impl SyncConfig {
    pub fn with_block_size(block_size: usize) -> Self {
        Self {
            block_size,
            ..Self::default()
        }
    }

    /// Settings that reproduce checksum indexes built by the legacy
    /// implementation: MD5 with the empty digest appended to the block bytes.
    pub fn legacy() -> Self {
        Self {
            strong_hash: StrongHashAlgorithm::Md5,
            strong_mode: StrongChecksumMode::LegacyAppend,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(SyncError::InvalidInput(
                "block size must be greater than zero".to_string(),
            ));
        }
        if self.block_size > MAX_BLOCK_SIZE {
            return Err(SyncError::InvalidInput(format!(
                "block size {} exceeds maximum {}",
                self.block_size, MAX_BLOCK_SIZE
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON config; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SyncConfig = serde_json::from_str(json)
            .map_err(|e| SyncError::InvalidInput(format!("config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }
}
