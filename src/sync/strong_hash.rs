//! Strong (cryptographic) block checksums
//!
//! The generator owns one hasher per stream and resets it before every block.

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of the default strong checksum (BLAKE3 truncated to 128 bits)
pub const STRONG_HASH_LEN: usize = 16;

/// A resettable cryptographic digest.
///
/// Implementations must produce a digest of exactly the bytes passed to
/// `update` since the last `reset`.
pub trait StrongHasher: Send {
    fn reset(&mut self);

    fn update(&mut self, data: &[u8]);

    /// Digest of everything fed since the last reset. Does not reset.
    fn finalize(&self) -> Vec<u8>;

    /// Digest of `block` alone
    fn digest(&mut self, block: &[u8]) -> Vec<u8> {
        self.reset();
        self.update(block);
        self.finalize()
    }
}

/// BLAKE3 truncated to 128 bits
#[derive(Debug, Clone, Default)]
pub struct Blake3Strong {
    hasher: blake3::Hasher,
}

impl Blake3Strong {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StrongHasher for Blake3Strong {
    fn reset(&mut self) {
        self.hasher.reset();
    }

    fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    fn finalize(&self) -> Vec<u8> {
        self.hasher.finalize().as_bytes()[..STRONG_HASH_LEN].to_vec()
    }
}

/// Full 256-bit SHA-256
#[derive(Debug, Clone, Default)]
pub struct Sha256Strong {
    hasher: Sha256,
}

impl Sha256Strong {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StrongHasher for Sha256Strong {
    fn reset(&mut self) {
        Digest::reset(&mut self.hasher);
    }

    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.hasher, data);
    }

    fn finalize(&self) -> Vec<u8> {
        self.hasher.clone().finalize().to_vec()
    }
}

/// 128-bit MD5, the hash older checksum indexes were built with
#[derive(Debug, Clone, Default)]
pub struct Md5Strong {
    hasher: Md5,
}

impl Md5Strong {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StrongHasher for Md5Strong {
    fn reset(&mut self) {
        Digest::reset(&mut self.hasher);
    }

    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.hasher, data);
    }

    fn finalize(&self) -> Vec<u8> {
        self.hasher.clone().finalize().to_vec()
    }
}

/// Built-in strong hash selection for [`SyncConfig`](crate::sync::SyncConfig)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StrongHashAlgorithm {
    #[default]
    Blake3,
    Sha256,
    Md5,
}

impl StrongHashAlgorithm {
    pub fn hasher(self) -> Box<dyn StrongHasher> {
        match self {
            StrongHashAlgorithm::Blake3 => Box::new(Blake3Strong::new()),
            StrongHashAlgorithm::Sha256 => Box::new(Sha256Strong::new()),
            StrongHashAlgorithm::Md5 => Box::new(Md5Strong::new()),
        }
    }
}

/// How the strong checksum of a block is assembled.
///
/// Older checksum indexes were produced by resetting the digest and then
/// reading it without feeding the block, appending the empty-input digest to
/// the raw block bytes. Those indexes used MD5, so `LegacyAppend` only
/// reproduces them when paired with [`StrongHashAlgorithm::Md5`] (see
/// [`SyncConfig::legacy`](crate::sync::SyncConfig::legacy)). New indexes
/// should use `Digest`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StrongChecksumMode {
    /// Digest of the block's bytes alone
    #[default]
    Digest,
    /// Block bytes followed by the digest of empty input
    LegacyAppend,
}

impl StrongChecksumMode {
    pub fn compute(self, hasher: &mut dyn StrongHasher, block: &[u8]) -> Vec<u8> {
        match self {
            StrongChecksumMode::Digest => hasher.digest(block),
            StrongChecksumMode::LegacyAppend => {
                hasher.reset();
                let empty = hasher.finalize();
                let mut strong = Vec::with_capacity(block.len() + empty.len());
                strong.extend_from_slice(block);
                strong.extend_from_slice(&empty);
                strong
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blake3_is_truncated_digest_of_block() {
        let mut hasher = Blake3Strong::new();
        let strong = hasher.digest(b"block contents");

        assert_eq!(strong.len(), STRONG_HASH_LEN);
        assert_eq!(
            strong,
            blake3::hash(b"block contents").as_bytes()[..STRONG_HASH_LEN].to_vec()
        );
    }

    #[test]
    fn test_digest_is_independent_of_previous_blocks() {
        let mut hasher = Sha256Strong::new();
        let _ = hasher.digest(b"first block");
        let second = hasher.digest(b"second block");

        assert_eq!(second, Sha256::digest(b"second block").to_vec());
    }

    #[test]
    fn test_sha256_known_empty_digest() {
        let hasher = Sha256Strong::new();
        assert_eq!(
            hex::encode(hasher.finalize()),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_legacy_append_layout() {
        let mut hasher = Blake3Strong::new();
        hasher.update(b"stale state");

        let strong = StrongChecksumMode::LegacyAppend.compute(&mut hasher, b"ABCD");

        assert_eq!(&strong[..4], b"ABCD");
        assert_eq!(
            &strong[4..],
            &blake3::hash(b"").as_bytes()[..STRONG_HASH_LEN]
        );
    }

    #[test]
    fn test_md5_known_digest() {
        let mut hasher = Md5Strong::new();
        assert_eq!(
            hex::encode(hasher.digest(b"abc")),
            "900150983cd24fb0d6963f7d28e17f72"
        );
    }

    #[test]
    fn test_legacy_append_with_md5_matches_old_indexes() {
        let mut hasher = StrongHashAlgorithm::Md5.hasher();
        let strong = StrongChecksumMode::LegacyAppend.compute(hasher.as_mut(), b"ABCD");

        assert_eq!(&strong[..4], b"ABCD");
        assert_eq!(hex::encode(&strong[4..]), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_algorithm_selection() {
        assert_eq!(StrongHashAlgorithm::default(), StrongHashAlgorithm::Blake3);
        assert_eq!(StrongHashAlgorithm::Sha256.hasher().digest(b"x").len(), 32);
        assert_eq!(StrongHashAlgorithm::Blake3.hasher().digest(b"x").len(), 16);
        assert_eq!(StrongHashAlgorithm::Md5.hasher().digest(b"x").len(), 16);
    }
}
