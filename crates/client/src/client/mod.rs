//! Provider capability trait and implementations.
//!
//! This module defines the [`Client`] trait, the minimal capability every
//! provider adapter exposes: list the entries under a prefix, and read one
//! entry's bytes (version-pinned when the provider supports it). Which
//! adapter backs a call is decided exactly once, by [`resolve`].

mod local;
#[cfg(feature = "mock")]
mod mock;
mod s3;
mod store;

pub use self::local::LocalClient;
#[cfg(feature = "mock")]
pub use self::mock::MockClient;
pub use self::s3::S3Client;
pub use self::store::ObjectStoreClient;

use crate::config::ClientConfig;
use crate::entry::EntryPointer;
use crate::error::Result;
use crate::uri::{Scheme, split_uri};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;

/// Lazy sequence of discovered entry pointers.
pub type PointerStream<'a> = Pin<Box<dyn Stream<Item = Result<EntryPointer>> + Send + 'a>>;

/// A resolved provider client, shared read-only across one call's fetches.
/// Never reused across separate top-level calls.
pub type ClientHandle = Arc<dyn Client>;

/// Minimal capability contract over a storage provider.
///
/// Three operations: construct (via [`resolve`] or the adapter's own
/// constructor), list, read. The iteration core depends on nothing beyond
/// this. Authentication, retry and wire protocols live inside the concrete
/// SDK clients the adapters wrap.
#[async_trait]
pub trait Client: Send + Sync + std::fmt::Debug {
    /// Provider name (used for logging only).
    fn name(&self) -> &str;

    /// Canonical URI of the storage unit this client is bound to,
    /// e.g. `s3://bucket` or `file:///data/root`.
    fn source(&self) -> &str;

    /// Recursively list entries under a key prefix.
    ///
    /// Yields one pointer per live version where the provider exposes
    /// versioning, otherwise one per current object with no version token.
    /// Directory markers are traversed but never yielded. Page order is
    /// preserved as the provider delivers it; the stream is lazy and not
    /// restartable — a fresh call re-lists.
    fn list_stream<'a>(&'a self, prefix: &'a str) -> PointerStream<'a>;

    /// Read an object's bytes.
    ///
    /// When `version` is given the read is pinned to that token, so the
    /// result matches what a listing observed even if the object has been
    /// overwritten since. Without a token the read races with writers.
    async fn read(&self, path: &str, version: Option<&str>) -> Result<Vec<u8>>;
}

/// Resolves a root URI into a provider client plus the key prefix to
/// traverse under it.
///
/// Fails with [`UnsupportedScheme`](crate::error::ErrorKind::UnsupportedScheme)
/// before any network call for unknown schemes, and with
/// [`Resolution`](crate::error::ErrorKind::Resolution) when adapter
/// construction fails — configuration problems, surfaced immediately and
/// never retried.
pub async fn resolve(uri: &str, config: &ClientConfig) -> Result<(ClientHandle, String)> {
    let root = split_uri(uri)?;
    tracing::debug!(scheme = %root.scheme, unit = %root.unit, prefix = %root.prefix, "resolved root URI");
    let client: ClientHandle = match root.scheme {
        Scheme::S3 => Arc::new(S3Client::connect(&root.unit, config).await?),
        Scheme::Gcs => Arc::new(ObjectStoreClient::gcs(&root.unit, config)?),
        Scheme::Azure => Arc::new(ObjectStoreClient::azure(&root.unit, root.account.as_deref(), config)?),
        Scheme::Local => Arc::new(LocalClient::new(&root.unit)?),
    };
    Ok((client, root.prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn test_resolve_azure_authority_form() {
        let config = ClientConfig::default().with_anon(true);
        let (client, prefix) = resolve("abfs://mycontainer@myaccount.dfs.core.windows.net/data", &config)
            .await
            .unwrap();
        assert_eq!(client.name(), "azure");
        assert_eq!(client.source(), "az://mycontainer");
        assert_eq!(prefix, "data");
    }

    #[tokio::test]
    async fn test_resolve_unsupported_scheme() {
        let err = resolve("ftp://host/path", &ClientConfig::default()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedScheme(_)));
    }
}
