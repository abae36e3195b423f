//! In-memory provider adapter for testing.
//!
//! Unlike the real adapters this one supports versioning *and* fault
//! injection: objects keep their full overwrite history, reads can be made
//! to fail per key, and counters record how many reads ran and how many
//! overlapped. That makes it the test vehicle for the iteration core's
//! concurrency and failure-tolerance guarantees.

use crate::client::{Client, PointerStream};
use crate::entry::EntryPointer;
use crate::error::{ErrorKind, Result};
use crate::key::validate_key;
use async_stream::stream;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::RwLock;

#[derive(Debug)]
struct MockVersion {
    token: String,
    inserted: OffsetDateTime,
    data: Vec<u8>,
}

/// In-memory versioned client for tests.
///
/// Object histories live in a `BTreeMap` behind an [`RwLock`], so all trait
/// methods work on `&self` and tests can keep an `Arc<MockClient>` around
/// to mutate the store mid-iteration.
///
/// # Examples
///
/// ```
/// use forage_client::{Client, MockClient};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let client = MockClient::with_files([("works/123.csv", b"a,b,c")]);
/// let contents = client.read("works/123.csv", None).await.unwrap();
/// assert_eq!(contents, b"a,b,c");
/// # }
/// ```
#[derive(Debug)]
pub struct MockClient {
    source: String,
    storage: RwLock<BTreeMap<String, Vec<MockVersion>>>,
    fail_reads: RwLock<HashSet<String>>,
    fail_listing: AtomicBool,
    read_delay: Option<Duration>,
    reads_started: AtomicUsize,
    reads_in_flight: AtomicUsize,
    max_concurrent_reads: AtomicUsize,
}

impl MockClient {
    /// Create a mock client pre-populated with files (one version each).
    ///
    /// Panics on invalid keys. The panic is DELIBERATE: this type only
    /// exists for tests, and a broken fixture should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let client = Self {
            source: "mock://unit".to_string(),
            storage: RwLock::new(BTreeMap::new()),
            fail_reads: RwLock::new(HashSet::new()),
            fail_listing: AtomicBool::new(false),
            read_delay: None,
            reads_started: AtomicUsize::new(0),
            reads_in_flight: AtomicUsize::new(0),
            max_concurrent_reads: AtomicUsize::new(0),
        };
        {
            let mut guard = client.storage.try_write().expect("fresh lock");
            for (key, data) in files {
                let key = key.into();
                let Ok(validated) = validate_key(&key) else {
                    panic!("MockClient::with_files: invalid key {key}");
                };
                guard.insert(
                    validated,
                    vec![MockVersion {
                        token: "v1".to_string(),
                        inserted: OffsetDateTime::now_utc(),
                        data: data.into(),
                    }],
                );
            }
        }
        client
    }

    /// Delay every read by `delay`, so concurrent reads overlap and the
    /// concurrency counters mean something.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Overwrite an object, appending a new live version.
    pub async fn overwrite(&self, key: &str, data: impl Into<Vec<u8>>) {
        let key = validate_key(key).expect("valid key");
        let mut guard = self.storage.write().await;
        let history = guard.entry(key).or_default();
        let token = format!("v{}", history.len() + 1);
        history.push(MockVersion {
            token,
            inserted: OffsetDateTime::now_utc(),
            data: data.into(),
        });
    }

    /// Make every read of `key` fail with a transient error.
    pub async fn fail_reads_of(&self, key: &str) {
        self.fail_reads.write().await.insert(key.to_string());
    }

    /// Make listing fail after yielding all matching pointers.
    pub fn fail_listing(&self) {
        self.fail_listing.store(true, Ordering::SeqCst);
    }

    /// Total number of reads that were started.
    pub fn reads_started(&self) -> usize {
        self.reads_started.load(Ordering::SeqCst)
    }

    /// High-water mark of overlapping reads.
    pub fn max_concurrent_reads(&self) -> usize {
        self.max_concurrent_reads.load(Ordering::SeqCst)
    }
}

impl Default for MockClient {
    fn default() -> Self {
        let files: [(&str, &[u8]); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl Client for MockClient {
    fn name(&self) -> &str {
        "mock"
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn list_stream<'a>(&'a self, prefix: &'a str) -> PointerStream<'a> {
        Box::pin(stream! {
            // Snapshot matching histories under the read lock, then drop it
            // before yielding to avoid holding the lock across yield points.
            let snapshot: Vec<EntryPointer> = {
                let guard = self.storage.read().await;
                guard
                    .iter()
                    .filter(|(key, _)| {
                        prefix.is_empty() || *key == prefix || key.starts_with(&format!("{prefix}/"))
                    })
                    .flat_map(|(key, history)| {
                        // Newest first, matching how S3 reports versions.
                        history.iter().rev().map(|version| {
                            EntryPointer::new(self.source.clone(), key.clone(), version.data.len() as u64)
                                .with_version(version.token.clone())
                                .with_last_modified(version.inserted)
                        })
                    })
                    .collect()
            };
            for pointer in snapshot {
                yield Ok(pointer);
            }
            if self.fail_listing.load(Ordering::SeqCst) {
                yield Err(exn::Exn::from(ErrorKind::Listing(format!("{}/{prefix}", self.source))));
            }
        })
    }

    async fn read(&self, path: &str, version: Option<&str>) -> Result<Vec<u8>> {
        let key = validate_key(path)?;
        self.reads_started.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.reads_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent_reads.fetch_max(in_flight, Ordering::SeqCst);
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        let result = async {
            if self.fail_reads.read().await.contains(&key) {
                exn::bail!(ErrorKind::TransientIo(format!("injected failure for {key}")));
            }
            let guard = self.storage.read().await;
            let history = guard
                .get(&key)
                .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key.clone())))?;
            let version = match version {
                Some(token) => history.iter().find(|v| v.token == token),
                None => history.last(),
            };
            match version {
                Some(version) => Ok(version.data.clone()),
                // The object exists but that exact version is gone.
                None => Err(exn::Exn::from(ErrorKind::NotFound(key.clone()))),
            }
        }
        .await;
        self.reads_in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_read_latest_and_pinned() {
        let client = MockClient::with_files([("file.txt", b"first")]);
        client.overwrite("file.txt", b"second".to_vec()).await;

        assert_eq!(client.read("file.txt", None).await.unwrap(), b"second");
        assert_eq!(client.read("file.txt", Some("v1")).await.unwrap(), b"first");
        assert_eq!(client.read("file.txt", Some("v2")).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_read_missing_version() {
        let client = MockClient::with_files([("file.txt", b"data")]);
        let err = client.read("file.txt", Some("v9")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_yields_one_pointer_per_version() {
        let client = MockClient::with_files([("file.txt", b"first")]);
        client.overwrite("file.txt", b"second".to_vec()).await;

        let pointers: Vec<_> = client.list_stream("").try_collect().await.unwrap();
        assert_eq!(pointers.len(), 2);
        assert_eq!(pointers[0].version.as_deref(), Some("v2"));
        assert_eq!(pointers[1].version.as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn test_list_prefix_is_segment_based() {
        let client = MockClient::with_files([
            ("a/sub/file.txt", b"x" as &[u8]),
            ("a/subdir/file.txt", b"y"),
            ("a/subfile.txt", b"z"),
        ]);
        let pointers: Vec<_> = client.list_stream("a/sub").try_collect().await.unwrap();
        assert_eq!(pointers.len(), 1);
        assert_eq!(pointers[0].path, "a/sub/file.txt");
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let client = MockClient::with_files([("file.txt", b"data")]);
        client.fail_reads_of("file.txt").await;
        let err = client.read("file.txt", None).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    #[should_panic(expected = "invalid key")]
    fn test_with_files_panics_on_bad_key() {
        MockClient::with_files([("../escape", b"bad" as &[u8])]);
    }
}
