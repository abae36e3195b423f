//! Per-call client configuration.

use std::collections::HashMap;

/// Options consumed when constructing a provider adapter.
///
/// Built once per top-level call and discarded with the client; owns no
/// state across calls.
///
/// # Examples
///
/// ```
/// use forage_client::ClientConfig;
///
/// let config = ClientConfig::default()
///     .with_anon(true)
///     .with_storage_option("region", "us-east-1");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Use anonymous/unauthenticated access.
    pub anon: bool,
    /// Provider-specific options, forwarded to the adapter's constructor.
    /// The native S3 adapter recognizes `region`, `endpoint_url`,
    /// `access_key_id`, `secret_access_key` and `session_token`; the
    /// `object_store`-backed adapters accept that crate's config keys
    /// verbatim.
    pub storage_options: HashMap<String, String>,
}

impl ClientConfig {
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

    pub(crate) fn option(&self, key: &str) -> Option<&str> {
        self.storage_options.get(key).map(String::as_str)
    }
}
