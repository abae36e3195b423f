//! Iteration Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Provider-level failures from
//! `forage_client` are raised into these kinds so callers see which phase of
//! an iteration failed while the full error tree stays attached.

use derive_more::{Display, Error};

/// An iteration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for iteration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies which phase of an iteration failed.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The root URI could not be resolved to a provider client. Covers
    /// unsupported schemes and adapter construction failures; always fatal.
    #[display("could not resolve `{_0}`")]
    Resolve(#[error(not(source))] String),
    /// The filename filter is not a valid glob pattern.
    #[display("invalid filename pattern `{_0}`")]
    Pattern(#[error(not(source))] String),
    /// Discovery failed while listing entries under the root.
    #[display("listing failed under `{_0}`")]
    Listing(#[error(not(source))] String),
    /// Fetching a discovered entry's contents failed.
    ///
    /// Whether a retry could help is a property of the wrapped client
    /// error (`forage_client::ErrorKind::is_retryable`), not of this kind.
    #[display("failed to fetch `{_0}`")]
    Fetch(#[error(not(source))] String),
}
