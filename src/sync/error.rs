use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cancelled at block {index}")]
    Cancelled { index: u64 },

    #[error("Failed reading block {index}: {source}")]
    ReadBlock {
        index: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed applying operation {index}: {source}")]
    Operation {
        index: u64,
        #[source]
        source: Box<SyncError>,
    },

    #[error("Failed reading cached block {index} at offset {offset}: {source}")]
    CacheRead {
        index: u64,
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed writing block {index} to destination: {source}")]
    Write {
        index: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("Upstream error: {0}")]
    Upstream(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl SyncError {
    /// Wrap an error raised by a collaborator outside this crate (e.g. the matcher)
    pub fn upstream<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        SyncError::Upstream(err.into())
    }

    /// True if this error, or the error it wraps, is a cancellation
    pub fn is_cancelled(&self) -> bool {
        match self {
            SyncError::Cancelled { .. } => true,
            SyncError::Operation { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_wrapped_source_is_preserved() {
        let err = SyncError::CacheRead {
            index: 3,
            offset: 12,
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };

        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "denied");
        assert!(err.to_string().contains("offset 12"));
    }

    #[test]
    fn test_cancellation_is_detected_through_wrapping() {
        let err = SyncError::Operation {
            index: 7,
            source: Box::new(SyncError::Cancelled { index: 7 }),
        };
        assert!(err.is_cancelled());
        assert!(!SyncError::upstream("matcher failed").is_cancelled());
    }
}
