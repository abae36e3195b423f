//! S3-compatible provider adapter.
//!
//! Works against AWS S3 and S3-compatible services (MinIO, LocalStack,
//! Backblaze B2). This is the only adapter that enumerates object versions:
//! listing goes through `ListObjectVersions`, so a versioned bucket yields
//! one pointer per live version and every fetch can be pinned to the exact
//! bytes the listing observed. Buckets without versioning report the
//! sentinel version id `"null"`, which normalizes to no token at all.
//!
//! # Credentials
//!
//! Explicit `access_key_id`/`secret_access_key` storage options win,
//! otherwise the SDK's default provider chain applies, and `anon` disables
//! signing entirely. Retry/backoff for transient faults stays inside the
//! SDK (standard retry config); this adapter only classifies outcomes.

use crate::client::{Client, PointerStream};
use crate::config::ClientConfig;
use crate::entry::EntryPointer;
use crate::error::{ErrorKind, Result};
use crate::key::{is_listable, validate_key};
use async_stream::stream;
use async_trait::async_trait;
use aws_sdk_s3::{
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
    error::{ProvideErrorMetadata, SdkError},
    primitives::DateTime,
};
use exn::ResultExt;
use time::OffsetDateTime;

/// Storage option keys this adapter consumes; anything else is ignored.
const RECOGNIZED_OPTIONS: &[&str] = &[
    "region",
    "endpoint_url",
    "access_key_id",
    "secret_access_key",
    "session_token",
];

/// S3-compatible provider client, bound to one bucket.
#[derive(Debug, Clone)]
pub struct S3Client {
    client: aws_sdk_s3::Client,
    bucket: String,
    source: String,
}

impl S3Client {
    /// Construct a client for `bucket` from per-call configuration.
    ///
    /// Credential failures surface on the first request, not here; the SDK
    /// resolves its provider chain lazily. Option handling:
    /// - `anon` — unsigned requests.
    /// - `region`, `endpoint_url` — forwarded to the SDK config.
    /// - explicit keys — used as a static credentials provider.
    pub async fn connect(bucket: &str, config: &ClientConfig) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if config.anon {
            loader = loader.no_credentials();
        } else if let (Some(key_id), Some(key_secret)) =
            (config.option("access_key_id"), config.option("secret_access_key"))
        {
            let session = config.option("session_token").map(str::to_string);
            loader = loader.credentials_provider(Credentials::new(key_id, key_secret, session, None, "forage-options"));
        }
        if let Some(region) = config.option("region") {
            loader = loader.region(Region::new(region.to_string()));
        }
        if let Some(endpoint) = config.option("endpoint_url") {
            loader = loader.endpoint_url(endpoint);
        }
        for key in config.storage_options.keys() {
            if !RECOGNIZED_OPTIONS.contains(&key.as_str()) {
                tracing::debug!(key, "ignoring unrecognized S3 storage option");
            }
        }
        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            // Retry policy with exponential backoff (1 initial + 3 retries)
            // lives here, in the collaborator, not in the iteration core.
            .retry_config(RetryConfig::standard().with_max_attempts(4))
            // Path-style addressing for better compatibility with
            // S3-compatible services (Backblaze, MinIO, etc.) behind a
            // custom endpoint.
            .force_path_style(config.option("endpoint_url").is_some())
            .build();
        Ok(Self::from_client(aws_sdk_s3::Client::from_conf(s3_config), bucket))
    }

    /// Wrap an already-built SDK client. Used by [`connect`](Self::connect)
    /// and by tests that inject a mocked client.
    pub fn from_client(client: aws_sdk_s3::Client, bucket: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            source: format!("s3://{bucket}"),
        }
    }

    /// S3 reports `"null"` as the version id on buckets without versioning;
    /// that is not a token a fetch could pin, so it maps to no token.
    fn clean_version(version: Option<&str>) -> Option<String> {
        match version {
            None | Some("") | Some("null") => None,
            Some(version) => Some(version.to_string()),
        }
    }

    /// Convert AWS DateTime, falling back to the epoch on out-of-range
    /// values instead of failing a whole listing page.
    fn parse_datetime(dt: &DateTime) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp_nanos(dt.as_nanos()).unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    /// Classify an SDK failure into the client taxonomy.
    fn classify<E>(err: &SdkError<E>, subject: &str) -> ErrorKind
    where
        E: ProvideErrorMetadata,
    {
        match err {
            SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
                ErrorKind::TransientIo(format!("{subject}: {err}"))
            }
            _ => match err.code() {
                Some("NoSuchKey") | Some("NoSuchVersion") | Some("NoSuchBucket") => {
                    ErrorKind::NotFound(subject.to_string())
                }
                Some("AccessDenied") | Some("InvalidAccessKeyId") | Some("SignatureDoesNotMatch")
                | Some("ExpiredToken") => ErrorKind::Access(subject.to_string()),
                _ => ErrorKind::TransientIo(format!("{subject}: {err}")),
            },
        }
    }
}

#[async_trait]
impl Client for S3Client {
    fn name(&self) -> &str {
        "s3"
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn list_stream<'a>(&'a self, prefix: &'a str) -> PointerStream<'a> {
        Box::pin(stream! {
            let mut key_marker: Option<String> = None;
            let mut version_marker: Option<String> = None;
            let mut pages = 0usize;
            loop {
                let mut request = self.client.list_object_versions().bucket(&self.bucket).prefix(prefix);
                if let Some(marker) = &key_marker {
                    request = request.key_marker(marker);
                }
                if let Some(marker) = &version_marker {
                    request = request.version_id_marker(marker);
                }
                let response = match request.send().await {
                    Ok(response) => response,
                    Err(err) => {
                        let classified = exn::Exn::from(Self::classify(&err, prefix));
                        yield Err(classified.raise(ErrorKind::Listing(format!("{}/{prefix}", self.source))));
                        return;
                    }
                };
                pages += 1;

                // Delete markers are excluded by construction: only the
                // `Versions` side of the response carries fetchable bytes.
                for version in response.versions() {
                    let Some(key) = version.key() else { continue };
                    // Directory markers and malformed keys are provider
                    // noise, not entries.
                    if !is_listable(key) {
                        continue;
                    }
                    let size = u64::try_from(version.size().unwrap_or_default()).unwrap_or_default();
                    let mut pointer = EntryPointer::new(self.source.clone(), key, size);
                    if let Some(token) = Self::clean_version(version.version_id()) {
                        pointer = pointer.with_version(token);
                    }
                    if let Some(modified) = version.last_modified() {
                        pointer = pointer.with_last_modified(Self::parse_datetime(modified));
                    }
                    if let Some(etag) = version.e_tag() {
                        pointer = pointer.with_metadata("etag", etag);
                    }
                    if let Some(latest) = version.is_latest() {
                        pointer = pointer.with_metadata("is_latest", latest.to_string());
                    }
                    if let Some(class) = version.storage_class() {
                        pointer = pointer.with_metadata("storage_class", class.as_str());
                    }
                    yield Ok(pointer);
                }

                if response.is_truncated() == Some(true) {
                    key_marker = response.next_key_marker().map(str::to_string);
                    version_marker = response.next_version_id_marker().map(str::to_string);
                    // A truncated page with no continuation markers would
                    // re-request the same page forever. Surface it instead
                    // of silently reporting a partial listing.
                    if key_marker.is_none() && version_marker.is_none() {
                        yield Err(exn::Exn::from(ErrorKind::Listing(format!(
                            "{}/{prefix}: truncated response without continuation markers",
                            self.source
                        ))));
                        return;
                    }
                } else {
                    break;
                }
            }
            tracing::debug!(source = %self.source, prefix, pages, "finished S3 version listing");
        })
    }

    async fn read(&self, path: &str, version: Option<&str>) -> Result<Vec<u8>> {
        let key = validate_key(path)?;
        let mut request = self.client.get_object().bucket(&self.bucket).key(&key);
        if let Some(version) = version {
            request = request.version_id(version);
        }
        let response = request
            .send()
            .await
            .map_err(|err| Self::classify(&err, &key))?;
        let body = response
            .body
            .collect()
            .await
            .or_raise(|| ErrorKind::TransientIo(format!("reading body of {key}")))?;
        Ok(body.into_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::operation::get_object::{GetObjectError, GetObjectOutput};
    use aws_sdk_s3::operation::list_object_versions::ListObjectVersionsOutput;
    use aws_sdk_s3::primitives::ByteStream;
    use aws_sdk_s3::types::ObjectVersion;
    use aws_sdk_s3::types::error::NoSuchKey;
    use aws_smithy_mocks::{RuleMode, mock, mock_client};
    use futures::{StreamExt, TryStreamExt};

    fn version(key: &str, size: i64, id: &str, latest: bool) -> ObjectVersion {
        ObjectVersion::builder()
            .key(key)
            .size(size)
            .version_id(id)
            .is_latest(latest)
            .build()
    }

    #[test]
    fn test_clean_version() {
        assert_eq!(S3Client::clean_version(Some("abc")), Some("abc".to_string()));
        // Unversioned buckets report the "null" sentinel
        assert_eq!(S3Client::clean_version(Some("null")), None);
        assert_eq!(S3Client::clean_version(Some("")), None);
        assert_eq!(S3Client::clean_version(None), None);
    }

    #[test]
    fn test_parse_datetime() {
        let dt = DateTime::from_secs(1_700_000_000);
        assert_eq!(S3Client::parse_datetime(&dt).unix_timestamp(), 1_700_000_000);
    }

    #[tokio::test]
    async fn test_list_stream_enumerates_versions() {
        let list_rule = mock!(aws_sdk_s3::Client::list_object_versions).then_output(|| {
            ListObjectVersionsOutput::builder()
                .versions(version("data/a.csv", 3, "v2", true))
                .versions(version("data/a.csv", 5, "v1", false))
                // Directory marker must be skipped, not yielded
                .versions(version("data/", 0, "null", false))
                .is_truncated(false)
                .build()
        });
        let sdk = mock_client!(aws_sdk_s3, RuleMode::MatchAny, [&list_rule]);
        let s3 = S3Client::from_client(sdk, "bucket");

        let pointers: Vec<_> = s3.list_stream("data").try_collect().await.unwrap();
        assert_eq!(pointers.len(), 2);
        assert_eq!(pointers[0].path, "data/a.csv");
        assert_eq!(pointers[0].version.as_deref(), Some("v2"));
        assert_eq!(pointers[0].metadata.get("is_latest").map(String::as_str), Some("true"));
        assert_eq!(pointers[1].version.as_deref(), Some("v1"));
        assert_eq!(pointers[1].size, 5);
    }

    #[tokio::test]
    async fn test_list_stream_unversioned_bucket() {
        let list_rule = mock!(aws_sdk_s3::Client::list_object_versions).then_output(|| {
            ListObjectVersionsOutput::builder()
                .versions(version("file.txt", 1, "null", true))
                .is_truncated(false)
                .build()
        });
        let sdk = mock_client!(aws_sdk_s3, RuleMode::MatchAny, [&list_rule]);
        let s3 = S3Client::from_client(sdk, "bucket");

        let pointers: Vec<_> = s3.list_stream("").try_collect().await.unwrap();
        assert_eq!(pointers.len(), 1);
        assert_eq!(pointers[0].version, None);
    }

    #[tokio::test]
    async fn test_list_stream_truncation_without_markers() {
        let list_rule = mock!(aws_sdk_s3::Client::list_object_versions).then_output(|| {
            ListObjectVersionsOutput::builder()
                .versions(version("file.txt", 1, "v1", true))
                .is_truncated(true)
                .build()
        });
        let sdk = mock_client!(aws_sdk_s3, RuleMode::MatchAny, [&list_rule]);
        let s3 = S3Client::from_client(sdk, "bucket");

        let mut listing = s3.list_stream("");
        let first = listing.next().await.unwrap().unwrap();
        assert_eq!(first.path, "file.txt");
        // Truncated but no markers to continue from: an error, not a loop
        // and not a silently partial listing.
        let err = listing.next().await.unwrap().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Listing(_)));
        assert!(listing.next().await.is_none());
    }

    #[tokio::test]
    async fn test_read_pins_version() {
        let get_rule = mock!(aws_sdk_s3::Client::get_object)
            .match_requests(|req| req.version_id() == Some("v1"))
            .then_output(|| GetObjectOutput::builder().body(ByteStream::from_static(b"old bytes")).build());
        let sdk = mock_client!(aws_sdk_s3, RuleMode::MatchAny, [&get_rule]);
        let s3 = S3Client::from_client(sdk, "bucket");

        let contents = s3.read("file.txt", Some("v1")).await.unwrap();
        assert_eq!(contents, b"old bytes");
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let get_rule = mock!(aws_sdk_s3::Client::get_object).then_error(|| {
            GetObjectError::NoSuchKey(
                NoSuchKey::builder()
                    .meta(aws_sdk_s3::error::ErrorMetadata::builder().code("NoSuchKey").build())
                    .build(),
            )
        });
        let sdk = mock_client!(aws_sdk_s3, RuleMode::MatchAny, [&get_rule]);
        let s3 = S3Client::from_client(sdk, "bucket");

        let err = s3.read("missing.txt", None).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_read_rejects_invalid_key() {
        // Must fail before any request is issued; no rules registered.
        let sdk = mock_client!(aws_sdk_s3, RuleMode::MatchAny, []);
        let s3 = S3Client::from_client(sdk, "bucket");
        let err = s3.read("../escape", None).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidKey(_)));
    }
}
