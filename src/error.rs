use crate::types::Rank;

pub type Result<T> = std::result::Result<T, CohortError>;

#[derive(Debug, thiserror::Error)]
pub enum CohortError {
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("{operation} failed at rank {rank}: {reason}")]
    CollectiveFailed {
        operation: &'static str,
        rank: Rank,
        reason: String,
    },

    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("invalid rank {rank}: communicator size is {world_size}")]
    InvalidRank { rank: Rank, world_size: u32 },

    #[error("unsupported data type: {dtype:?} for operation {op}")]
    UnsupportedDType {
        dtype: crate::types::DataType,
        op: &'static str,
    },

    #[error("scratch allocation of {bytes} bytes failed")]
    AllocationFailed { bytes: usize },

    #[error("invalid hierarchy: {0}")]
    InvalidHierarchy(String),

    #[error("{operation} expects {expected} per-peer entries, got {actual}")]
    ScheduleMismatch {
        operation: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("internal lock poisoned: {0}")]
    LockPoisoned(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CohortError {
    /// Create a `Transport` error with just a message.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a `Transport` error with a message and a source error.
    pub fn transport_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }
}
