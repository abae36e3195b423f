//! `object_store`-backed provider adapters (GCS, Azure Blob).
//!
//! These providers go through the `object_store` crate's generic filesystem
//! layer rather than a native SDK. Listing is flat-recursive and yields the
//! current object only; when the store reports a version token in listing
//! metadata it is carried through and pinned on fetch via
//! [`GetOptions::version`], otherwise fetches read latest and accept the
//! discovery-to-fetch race window. That window is the documented trade-off
//! of these adapters — S3 gets full version enumeration through its native
//! adapter instead.

use crate::client::{Client, PointerStream};
use crate::config::ClientConfig;
use crate::entry::EntryPointer;
use crate::error::{ErrorKind, Result};
use crate::key::{is_listable, validate_key};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use futures::StreamExt;
use object_store::azure::{AzureConfigKey, MicrosoftAzureBuilder};
use object_store::gcp::{GoogleCloudStorageBuilder, GoogleConfigKey};
use object_store::path::Path;
use object_store::{GetOptions, ObjectMeta, ObjectStore};
use std::str::FromStr;
use std::sync::Arc;
use time::OffsetDateTime;

/// Provider adapter over an [`ObjectStore`] instance.
#[derive(Debug)]
pub struct ObjectStoreClient {
    store: Arc<dyn ObjectStore>,
    name: &'static str,
    source: String,
}

impl ObjectStoreClient {
    /// Google Cloud Storage, bound to one bucket.
    ///
    /// `storage_options` keys are forwarded verbatim as [`GoogleConfigKey`]s;
    /// an unknown key is a configuration error. Anonymous mode maps to the
    /// store's skip-signature option.
    pub fn gcs(bucket: &str, config: &ClientConfig) -> Result<Self> {
        let source = format!("gs://{bucket}");
        let mut builder = GoogleCloudStorageBuilder::new().with_bucket_name(bucket);
        for (key, value) in &config.storage_options {
            let key = GoogleConfigKey::from_str(key).or_raise(|| ErrorKind::Resolution(source.clone()))?;
            builder = builder.with_config(key, value);
        }
        if config.anon {
            let skip = GoogleConfigKey::from_str("google_skip_signature")
                .or_raise(|| ErrorKind::Resolution(source.clone()))?;
            builder = builder.with_config(skip, "true");
        }
        let store = builder.build().or_raise(|| ErrorKind::Resolution(source.clone()))?;
        Ok(Self::from_store(Arc::new(store), "gcs", source))
    }

    /// Azure Blob Storage, bound to one container.
    ///
    /// The account comes from the URI's `container@account.host` authority
    /// when present; a `storage_options` key can still override it.
    pub fn azure(container: &str, account: Option<&str>, config: &ClientConfig) -> Result<Self> {
        let source = format!("az://{container}");
        let mut builder = MicrosoftAzureBuilder::new().with_container_name(container);
        if let Some(account) = account {
            builder = builder.with_account(account);
        }
        for (key, value) in &config.storage_options {
            let key = AzureConfigKey::from_str(key).or_raise(|| ErrorKind::Resolution(source.clone()))?;
            builder = builder.with_config(key, value);
        }
        if config.anon {
            let skip = AzureConfigKey::from_str("azure_skip_signature")
                .or_raise(|| ErrorKind::Resolution(source.clone()))?;
            builder = builder.with_config(skip, "true");
        }
        let store = builder.build().or_raise(|| ErrorKind::Resolution(source.clone()))?;
        Ok(Self::from_store(Arc::new(store), "azure", source))
    }

    /// Wrap an arbitrary store. Used by the provider constructors and by
    /// tests that inject [`object_store::memory::InMemory`].
    pub fn from_store(store: Arc<dyn ObjectStore>, name: &'static str, source: impl Into<String>) -> Self {
        Self {
            store,
            name,
            source: source.into(),
        }
    }

    fn pointer(&self, meta: ObjectMeta) -> EntryPointer {
        let modified = meta.last_modified.timestamp_nanos_opt().map_or(OffsetDateTime::UNIX_EPOCH, |nanos| {
            OffsetDateTime::from_unix_timestamp_nanos(i128::from(nanos)).unwrap_or(OffsetDateTime::UNIX_EPOCH)
        });
        let mut pointer = EntryPointer::new(self.source.clone(), meta.location.as_ref(), meta.size)
            .with_last_modified(modified);
        if let Some(version) = meta.version {
            pointer = pointer.with_version(version);
        }
        if let Some(etag) = meta.e_tag {
            pointer = pointer.with_metadata("etag", etag);
        }
        pointer
    }

    fn classify(err: object_store::Error, subject: &str) -> ErrorKind {
        match err {
            object_store::Error::NotFound { .. } => ErrorKind::NotFound(subject.to_string()),
            object_store::Error::PermissionDenied { .. } | object_store::Error::Unauthenticated { .. } => {
                ErrorKind::Access(subject.to_string())
            }
            other => ErrorKind::TransientIo(format!("{subject}: {other}")),
        }
    }
}

#[async_trait]
impl Client for ObjectStoreClient {
    fn name(&self) -> &str {
        self.name
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn list_stream<'a>(&'a self, prefix: &'a str) -> PointerStream<'a> {
        Box::pin(stream! {
            let prefix_path = (!prefix.is_empty()).then(|| Path::from(prefix));
            let mut listing = self.store.list(prefix_path.as_ref());
            let mut entries = 0usize;
            while let Some(item) = listing.next().await {
                match item {
                    Ok(meta) => {
                        if !is_listable(meta.location.as_ref()) {
                            continue;
                        }
                        entries += 1;
                        yield Ok(self.pointer(meta));
                    }
                    Err(err) => {
                        let classified = exn::Exn::from(Self::classify(err, prefix));
                        yield Err(classified.raise(ErrorKind::Listing(format!("{}/{prefix}", self.source))));
                        return;
                    }
                }
            }
            tracing::debug!(source = %self.source, prefix, entries, "finished object-store listing");
        })
    }

    async fn read(&self, path: &str, version: Option<&str>) -> Result<Vec<u8>> {
        let key = validate_key(path)?;
        let location = Path::from(key.as_str());
        let options = GetOptions {
            version: version.map(str::to_string),
            ..Default::default()
        };
        let result = self
            .store
            .get_opts(&location, options)
            .await
            .map_err(|err| Self::classify(err, &key))?;
        let bytes = result.bytes().await.map_err(|err| Self::classify(err, &key))?;
        Ok(bytes.to_vec())
    }
}
