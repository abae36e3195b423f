//! Local filesystem provider adapter.
//!
//! Backs the default (schemeless / `file://`) root URIs using `tokio::fs`.
//! The filesystem has no version tokens, so every pointer reads latest and
//! the discovery-to-fetch race window is inherent. Listing is a stack-based
//! recursive walk with per-directory sorting, so traversal order is
//! deterministic for a fixed tree.

use crate::client::{Client, PointerStream};
use crate::entry::EntryPointer;
use crate::error::{ErrorKind, Result};
use crate::key::validate_key;
use async_stream::stream;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};

enum WalkEntry {
    File(EntryPointer),
    Descend(PathBuf),
    Skip,
}

/// Local filesystem client, rooted at an absolute directory.
#[derive(Debug, Clone)]
pub struct LocalClient {
    root: PathBuf,
    source: String,
}

impl LocalClient {
    /// Create a client rooted at `root`.
    ///
    /// The root must be an absolute path. It does not have to exist —
    /// listing a missing root yields an empty sequence, consistent with the
    /// cloud adapters — but if it exists it must be a directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() || (root.exists() && !root.is_dir()) {
            exn::bail!(ErrorKind::Resolution(root.display().to_string()));
        }
        let source = format!("file://{}", root.display());
        Ok(Self { root, source })
    }

    /// Absolute path for a validated key under the root.
    fn absolute_path(&self, key: &str) -> Result<PathBuf> {
        let validated = validate_key(key)?;
        Ok(self.root.join(validated))
    }

    /// Strip the root from an absolute path, giving the entry key.
    fn relative_key(&self, absolute: &Path) -> Result<String> {
        let relative = absolute.strip_prefix(&self.root).map_err(|_| {
            ErrorKind::Listing(format!("path `{}` is not within `{}`", absolute.display(), self.root.display()))
        })?;
        validate_key(&relative.to_string_lossy())
    }

    fn map_io_error(err: std::io::Error, subject: &str) -> ErrorKind {
        match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(subject.to_string()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::Access(subject.to_string()),
            std::io::ErrorKind::TimedOut => ErrorKind::TransientIo(subject.to_string()),
            _ => ErrorKind::Io(err),
        }
    }

    async fn process_entry(&self, entry: DirEntry, prefix: &str) -> Result<WalkEntry> {
        let path = entry.path();
        let key = self.relative_key(&path)?;
        let metadata = entry
            .metadata()
            .await
            .map_err(|err| Self::map_io_error(err, &key))?;
        if metadata.is_dir() {
            return Ok(WalkEntry::Descend(path));
        }
        if !metadata.is_file() {
            // Note: silently drop what is most likely a broken symlink.
            return Ok(WalkEntry::Skip);
        }
        // Key-wise prefix match must be segment-based: the prefix "a/sub"
        // matches "a/sub/file" but never "a/subdir/file".
        if !prefix.is_empty() {
            let matched = key == prefix || key.starts_with(&format!("{prefix}/"));
            if !matched {
                return Ok(WalkEntry::Skip);
            }
        }
        let modified = metadata
            .modified()
            .map(time::OffsetDateTime::from)
            .unwrap_or(time::OffsetDateTime::UNIX_EPOCH);
        Ok(WalkEntry::File(
            EntryPointer::new(self.source.clone(), key, metadata.len()).with_last_modified(modified),
        ))
    }
}

#[async_trait]
impl Client for LocalClient {
    fn name(&self) -> &str {
        "local"
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn list_stream<'a>(&'a self, prefix: &'a str) -> PointerStream<'a> {
        let validated_prefix = match prefix.is_empty() {
            true => Ok(String::new()),
            false => validate_key(prefix),
        };
        let validated_prefix = match validated_prefix {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };

        // Walk from the parent directory of the prefix path. Ensures the
        // walk starts at a directory even when the prefix's leaf component
        // names a file or doesn't exist yet; non-matching siblings are
        // filtered out per entry.
        let start_dir = match validated_prefix.is_empty() {
            true => self.root.clone(),
            false => {
                let full = self.root.join(&validated_prefix);
                full.parent().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone())
            }
        };
        let mut stack = vec![start_dir];

        Box::pin(stream! {
            'dirs: while let Some(current) = stack.pop() {
                let mut reader = match fs::read_dir(&current).await {
                    Ok(reader) => reader,
                    // To stay consistent with the cloud adapters, asking for
                    // the contents of a directory that doesn't exist gives
                    // an empty list, not an error.
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(err) => {
                        let classified = exn::Exn::from(Self::map_io_error(err, &current.to_string_lossy()));
                        yield Err(classified.raise(ErrorKind::Listing(current.display().to_string())));
                        continue 'dirs;
                    }
                };

                // Collect and sort so traversal order is deterministic for
                // a fixed tree; read_dir order is filesystem-dependent.
                let mut entries: Vec<DirEntry> = Vec::new();
                loop {
                    match reader.next_entry().await {
                        Ok(Some(entry)) => entries.push(entry),
                        Ok(None) => break,
                        Err(err) => {
                            let classified = exn::Exn::from(Self::map_io_error(err, &current.to_string_lossy()));
                            yield Err(classified.raise(ErrorKind::Listing(current.display().to_string())));
                            continue 'dirs;
                        }
                    }
                }
                entries.sort_by_key(|entry| entry.file_name());

                for entry in entries {
                    match self.process_entry(entry, &validated_prefix).await {
                        Ok(WalkEntry::File(pointer)) => yield Ok(pointer),
                        Ok(WalkEntry::Descend(dir)) => stack.push(dir),
                        Ok(WalkEntry::Skip) => {}
                        Err(e) => yield Err(e),
                    }
                }
            }
        })
    }

    async fn read(&self, path: &str, _version: Option<&str>) -> Result<Vec<u8>> {
        // The filesystem exposes no version tokens; pointers discovered here
        // never carry one, so a read is always of the current bytes.
        let abs_path = self.absolute_path(path)?;
        Ok(fs::read(&abs_path).await.map_err(|err| Self::map_io_error(err, path))?)
    }
}
