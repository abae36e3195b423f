//! Client Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;

/// A client error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// Resolution-time failures (`UnsupportedScheme`, `Resolution`) are always
/// fatal to a call; the per-entry kinds (`NotFound`, `Access`, `TransientIo`,
/// `Listing`) are recoverable under skip-and-report.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The URI scheme matches no known provider.
    #[display("unsupported scheme: {_0}")]
    UnsupportedScheme(#[error(not(source))] String),
    /// Provider construction failed (bad credentials, unusable options).
    /// Indicates a configuration problem, never retried.
    #[display("could not resolve a client for {_0}")]
    Resolution(#[error(not(source))] String),
    /// Object key contains invalid characters or escapes the storage root.
    #[display("invalid object key: {_0}")]
    InvalidKey(#[error(not(source))] String),
    /// Object (or the requested version of it) does not exist.
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Access denied (permissions or credentials).
    #[display("access denied: {_0}")]
    Access(#[error(not(source))] String),
    /// Network-level fault (connection, timeout). Retrying might succeed,
    /// but any retry policy belongs to the underlying provider client.
    #[display("transient I/O failure: {_0}")]
    TransientIo(#[error(not(source))] String),
    /// Listing a prefix failed part-way through a traversal.
    #[display("listing failed under {_0}")]
    Listing(#[error(not(source))] String),
    /// Underlying I/O error.
    #[display("I/O error: {_0}")]
    Io(IoError),
}

impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientIo(_) | Self::Io(_))
    }

    /// Returns `true` for setup-time failures that abort the whole call.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnsupportedScheme(_) | Self::Resolution(_))
    }
}
