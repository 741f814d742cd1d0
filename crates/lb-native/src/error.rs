//! Errors reported by native modules.

use thiserror::Error;

/// Native module errors.
#[derive(Debug, Error)]
pub enum NativeError {
    /// The platform module is not linked into the host application.
    #[error("native module `{0}` is unavailable")]
    Unavailable(&'static str),
    /// The native SDK rejected the call.
    #[error("{operation} failed: {message}")]
    Failed {
        operation: &'static str,
        message: String,
    },
    /// An event payload emitted by native code could not be decoded.
    #[error("invalid native event payload: {0}")]
    InvalidEvent(#[from] serde_json::Error),
}

/// Result alias for native module calls.
pub type NativeResult<T> = Result<T, NativeError>;
