//! Error types for calgrid.

use std::fmt;

use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur while setting up calgrid (configuration, zones, ranges).
#[derive(Error, Debug)]
pub enum CalgridError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown time zone: {0}")]
    TimeZone(String),

    #[error("Invalid time range: {0}")]
    TimeRange(String),
}

/// Result type alias for calgrid operations.
pub type CalgridResult<T> = Result<T, CalgridError>;

/// The kind of write a gateway call attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for WriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriteOp::Insert => "insert",
            WriteOp::Update => "update",
            WriteOp::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Failures reported by the calendar gateway.
///
/// An absent result cursor is not an error: reads simply come back empty.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Calendar access has not been granted")]
    PermissionDenied,

    #[error("Row is missing column '{column}'")]
    MalformedRow { column: String },

    #[error("Calendar store rejected the {0}")]
    WriteRejected(WriteOp),

    #[error("Calendar store error: {0}")]
    Store(String),
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::PermissionDenied => GatewayError::PermissionDenied,
            other => GatewayError::Store(other.to_string()),
        }
    }
}

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
