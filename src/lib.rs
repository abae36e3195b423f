//! Unified discovery and fetching of files across object-storage providers.
//!
//! Point [`get_entries`] at a root URI — `s3://`, `gs://`, `az://`,
//! `file://` or a bare local path — and iterate a lazy stream of
//! `(pointer, contents)` pairs for every file under it. Fetches run with
//! bounded concurrency, entries arrive in completion order, and where the
//! provider supports versioning each fetch is pinned to the exact bytes the
//! listing observed.
//!
//! ```no_run
//! use forage::{Options, get_entries};
//! use futures::TryStreamExt;
//!
//! # async fn example() -> forage::Result<()> {
//! let mut traversal = get_entries("gs://editions/works", Options::default().with_anon(true)).await?;
//! while let Some(entry) = traversal.try_next().await? {
//!     println!("{} ({} bytes)", entry.pointer.uri(), entry.contents.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Provider clients live in [`forage_client`], re-exported as [`client`]
//! for callers that want to list or read single objects directly.

pub mod error;
mod options;
mod stream;

pub use forage_client as client;

pub use crate::error::{Error, ErrorKind, Result};
pub use crate::options::{DEFAULT_MAX_CONCURRENCY, ErrorMode, Options};
pub use crate::stream::{Skipped, Traversal, get_entries};
pub use forage_client::{Entry, EntryPointer};
