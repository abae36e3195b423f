//! Per-call iteration options.

use forage_client::ClientConfig;
use std::collections::HashMap;

/// Default bound on concurrently in-flight fetches.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// What to do when a single entry fails to list or fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorMode {
    /// Terminate the traversal on the first failure, yielding it as an
    /// `Err` item.
    #[default]
    FailFast,
    /// Omit the failed entry, record it, and keep going. Records are
    /// retrievable from [`Traversal::skipped`](crate::Traversal::skipped)
    /// once the stream is exhausted.
    SkipAndReport,
}

/// Options for one [`get_entries`](crate::get_entries) call.
///
/// Constructed per call and consumed by it; no state survives across calls.
///
/// # Examples
///
/// ```
/// use forage::{ErrorMode, Options};
///
/// let options = Options::default()
///     .with_anon(true)
///     .with_max_concurrency(4)
///     .with_glob("**/*.csv")
///     .with_error_mode(ErrorMode::SkipAndReport);
/// ```
#[derive(Debug, Clone)]
pub struct Options {
    /// Access the storage unit without credentials (public buckets).
    pub anon: bool,
    /// Provider-specific settings, forwarded verbatim to the adapter.
    pub storage_options: HashMap<String, String>,
    /// Bound on concurrently in-flight fetches. `0` behaves as `1`.
    pub max_concurrency: usize,
    /// Failure-tolerance mode.
    pub on_error: ErrorMode,
    /// Optional glob filter applied to entry keys during discovery.
    pub glob: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            anon: false,
            storage_options: HashMap::new(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            on_error: ErrorMode::default(),
            glob: None,
        }
    }
}

impl Options {
    pub fn with_anon(mut self, anon: bool) -> Self {
        self.anon = anon;
        self
    }

    pub fn with_storage_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.storage_options.insert(key.into(), value.into());
        self
    }

    pub fn with_storage_options(mut self, options: HashMap<String, String>) -> Self {
        self.storage_options.extend(options);
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_error_mode(mut self, on_error: ErrorMode) -> Self {
        self.on_error = on_error;
        self
    }

    pub fn with_glob(mut self, glob: impl Into<String>) -> Self {
        self.glob = Some(glob.into());
        self
    }

    /// The concurrency bound actually applied: zero clamps to one.
    pub(crate) fn effective_concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }

    pub(crate) fn client_config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_anon(self.anon)
            .with_storage_options(self.storage_options.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert!(!options.anon);
        assert!(options.storage_options.is_empty());
        assert_eq!(options.max_concurrency, DEFAULT_MAX_CONCURRENCY);
        assert_eq!(options.on_error, ErrorMode::FailFast);
        assert!(options.glob.is_none());
    }

    #[test]
    fn test_zero_concurrency_clamps_to_one() {
        let options = Options::default().with_max_concurrency(0);
        assert_eq!(options.effective_concurrency(), 1);
    }

    #[test]
    fn test_client_config_carries_storage_options() {
        let options = Options::default()
            .with_anon(true)
            .with_storage_option("region", "eu-west-2");
        let config = options.client_config();
        assert!(config.anon);
        assert_eq!(config.storage_options.get("region").map(String::as_str), Some("eu-west-2"));
    }
}
