//! Error types for RowStore
//!
//! Provides a unified error type for all operations.
//!
//! The enum is `Clone` so that an iterator which reached a terminal error can
//! hand the same error back on every later pull.

use std::sync::Arc;

use thiserror::Error;

/// Result type alias using RowError
pub type Result<T> = std::result::Result<T, RowError>;

/// Unified error type for RowStore operations
#[derive(Debug, Clone, Error)]
pub enum RowError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    KeyNotFound,

    #[error("Store is closed")]
    StoreClosed,

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Internal consistency error: {0}")]
    InternalConsistency(String),

    #[error("Invalid bucket: {0}")]
    InvalidBucket(String),

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("Codec error: {0}")]
    Codec(String),

    // -------------------------------------------------------------------------
    // Iteration Errors
    // -------------------------------------------------------------------------
    #[error("Scan cancelled")]
    Cancelled,

    #[error("Scan deadline exceeded")]
    DeadlineExceeded,

    #[error("Iterator complete")]
    IteratorDone,

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RowError {
    /// True for errors raised by a fired cancellation or deadline signal
    pub fn is_cancellation(&self) -> bool {
        matches!(self, RowError::Cancelled | RowError::DeadlineExceeded)
    }

    /// The I/O error kind, if this wraps an I/O error
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            RowError::Io(e) => Some(e.kind()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RowError {
    fn from(e: std::io::Error) -> Self {
        RowError::Io(Arc::new(e))
    }
}

impl From<bincode::Error> for RowError {
    fn from(e: bincode::Error) -> Self {
        RowError::Codec(e.to_string())
    }
}

// Every redb failure is an engine failure; none are retried.
macro_rules! engine_error {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for RowError {
                fn from(e: $ty) -> Self {
                    RowError::Engine(e.to_string())
                }
            }
        )*
    };
}

engine_error!(
    redb::Error,
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);
