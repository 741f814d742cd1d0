//! Error taxonomy shared by every linkbridge crate.
//!
//! Consumers branch on [`BridgeError::kind`] rather than on payloads, so the
//! variant set is closed: validation failures, calls made before
//! configuration, failed native hand-offs, and isolated listener failures.

use std::fmt;

use thiserror::Error;

use crate::dispatcher::ListenerId;

/// Boxed error coming out of a native module.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Validation errors for values crossing the bridge.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The provided value was empty or whitespace-only.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// The environment name is not one of the recognized values.
    #[error("unknown environment: {value} (expected development, staging or production)")]
    UnknownEnvironment { value: String },

    /// The SKAdNetwork conversion value was outside \[0, 63\].
    #[error("conversion value must be between 0 and 63, got {value}")]
    ConversionValueOutOfRange { value: i64 },

    /// The currency is not a three-letter ISO 4217 code.
    #[error("invalid currency code: {value:?}")]
    InvalidCurrency { value: String },

    /// The purchase amount was negative, NaN or infinite.
    #[error("purchase amount must be a finite, non-negative number, got {value}")]
    InvalidAmount { value: f64 },

    /// A batch with no events was submitted.
    #[error("event batch cannot be empty")]
    EmptyBatch,

    /// A URL could not be parsed.
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Unknown tracking authorization status string.
    #[error("unknown tracking authorization status: {value}")]
    UnknownTrackingAuthorization { value: String },
}

/// Errors surfaced by the bridge to application code.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// An operation was attempted before `configure` succeeded.
    #[error("linkbridge is not configured; call configure() first")]
    NotConfigured,

    /// A parameter was outside its documented domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] ValidationError),

    /// The platform call failed or the platform module is unavailable.
    #[error("native call `{operation}` failed: {source}")]
    NativeBridge {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    /// A deep-link listener failed during dispatch.
    #[error("deep link listener {listener} failed: {message}")]
    ListenerCallback { listener: ListenerId, message: String },
}

impl BridgeError {
    /// Wraps a native failure for the named operation.
    pub fn native(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self::NativeBridge {
            operation,
            source: source.into(),
        }
    }

    /// The category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotConfigured => ErrorKind::NotConfigured,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::NativeBridge { .. } => ErrorKind::NativeBridge,
            Self::ListenerCallback { .. } => ErrorKind::ListenerCallback,
        }
    }
}

/// Stable error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotConfigured,
    InvalidArgument,
    NativeBridge,
    ListenerCallback,
}

impl ErrorKind {
    /// Wire name, matching the error codes exposed to the JavaScript layer.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotConfigured => "NotConfiguredError",
            Self::InvalidArgument => "InvalidArgumentError",
            Self::NativeBridge => "NativeBridgeError",
            Self::ListenerCallback => "ListenerCallbackError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    #[test]
    fn not_configured_message() {
        assert_snapshot!(
            BridgeError::NotConfigured.to_string(),
            @"linkbridge is not configured; call configure() first"
        );
    }

    #[test]
    fn invalid_argument_wraps_validation_error() {
        let err = BridgeError::from(ValidationError::ConversionValueOutOfRange { value: 64 });
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_snapshot!(
            err.to_string(),
            @"invalid argument: conversion value must be between 0 and 63, got 64"
        );
    }

    #[test]
    fn native_error_keeps_source() {
        let err = BridgeError::native("trackEvent", "module unavailable");
        assert_eq!(err.kind(), ErrorKind::NativeBridge);
        assert_snapshot!(err.to_string(), @"native call `trackEvent` failed: module unavailable");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn kind_wire_names() {
        assert_eq!(ErrorKind::NotConfigured.as_str(), "NotConfiguredError");
        assert_eq!(ErrorKind::InvalidArgument.as_str(), "InvalidArgumentError");
        assert_eq!(ErrorKind::NativeBridge.as_str(), "NativeBridgeError");
        assert_eq!(ErrorKind::ListenerCallback.as_str(), "ListenerCallbackError");
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BridgeError>();
        assert_send_sync::<ValidationError>();
    }
}
