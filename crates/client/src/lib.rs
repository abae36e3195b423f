//! Provider clients for cloud and local object storage.
//!
//! This crate resolves root URIs (`s3://`, `gs://`, `az://`, `file://` or a
//! bare path) into a [`Client`] bound to a single storage unit, and defines
//! the data model for discovered entries. The iteration core in the `forage`
//! crate drives these clients; nothing here spawns tasks or fetches more
//! than one object at a time.

pub mod client;
pub mod config;
pub mod entry;
pub mod error;
mod key;
mod uri;

pub use crate::client::{Client, ClientHandle, LocalClient, ObjectStoreClient, PointerStream, S3Client, resolve};
#[cfg(feature = "mock")]
pub use crate::client::MockClient;
pub use crate::config::ClientConfig;
pub use crate::entry::{Entry, EntryPointer};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::key::validate_key;
pub use crate::uri::{RootUri, Scheme, split_uri};
