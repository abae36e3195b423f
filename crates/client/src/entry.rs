//! Entry models.
//!
//! These types describe one discovered object: the pointer produced by a
//! listing, and the pointer-plus-contents pair produced by a fetch.

use std::collections::HashMap;
use time::OffsetDateTime;

/// Metadata for one object discovered under a traversal root.
///
/// Immutable once produced. A single traversal never yields two pointers
/// with an identical `(path, version)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPointer {
    /// Canonical URI of the storage unit (e.g. `s3://bucket`).
    pub source: String,
    /// Object key relative to `source`, `/`-delimited.
    pub path: String,
    /// Size in bytes, known at discovery time.
    pub size: u64,
    /// Opaque provider version token. `Some` pins a fetch to the exact
    /// bytes observed at discovery; `None` reads whatever is latest.
    pub version: Option<String>,
    /// Last modified timestamp; Unix epoch when the provider reports none.
    pub last_modified: OffsetDateTime,
    /// Provider-specific passthrough (etag, storage class, ...). Forwarded,
    /// never interpreted.
    pub metadata: HashMap<String, String>,
}

impl EntryPointer {
    pub fn new(source: impl Into<String>, path: impl Into<String>, size: u64) -> Self {
        Self {
            source: source.into(),
            path: path.into(),
            size,
            version: None,
            last_modified: OffsetDateTime::UNIX_EPOCH,
            metadata: HashMap::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_last_modified(mut self, at: OffsetDateTime) -> Self {
        self.last_modified = at;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Full URI of the object, with the version token appended when pinned.
    ///
    /// # Examples
    ///
    /// ```
    /// use forage_client::EntryPointer;
    ///
    /// let pointer = EntryPointer::new("s3://bucket", "a/b.csv", 3).with_version("xyz");
    /// assert_eq!(pointer.uri(), "s3://bucket/a/b.csv?versionId=xyz");
    /// ```
    pub fn uri(&self) -> String {
        match &self.version {
            Some(version) => format!("{}/{}?versionId={}", self.source, self.path, version),
            None => format!("{}/{}", self.source, self.path),
        }
    }
}

/// One fetched object: the pointer it was discovered as, plus its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub pointer: EntryPointer,
    pub contents: Vec<u8>,
}

impl Entry {
    pub fn from_parts(pointer: EntryPointer, contents: Vec<u8>) -> Self {
        Self { pointer, contents }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_without_version() {
        let pointer = EntryPointer::new("gs://bucket", "dir/file.txt", 10);
        assert_eq!(pointer.uri(), "gs://bucket/dir/file.txt");
    }

    #[test]
    fn test_uri_with_version() {
        let pointer = EntryPointer::new("s3://bucket", "file.txt", 10).with_version("abc123");
        assert_eq!(pointer.uri(), "s3://bucket/file.txt?versionId=abc123");
    }

    #[test]
    fn test_metadata_passthrough() {
        let pointer = EntryPointer::new("s3://bucket", "file.txt", 1)
            .with_metadata("etag", "\"d41d8\"")
            .with_metadata("storage_class", "STANDARD");
        assert_eq!(pointer.metadata.get("etag").map(String::as_str), Some("\"d41d8\""));
        assert_eq!(pointer.metadata.len(), 2);
    }

    #[test]
    fn test_from_parts() {
        let pointer = EntryPointer::new("file:///root", "a.txt", 5);
        let entry = Entry::from_parts(pointer.clone(), b"hello".to_vec());
        assert_eq!(entry.pointer, pointer);
        assert_eq!(entry.contents, b"hello");
    }
}
