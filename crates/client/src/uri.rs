//! Root-URI parsing and provider detection.
//!
//! A root URI names a storage unit (bucket, container, or local directory)
//! plus an optional key prefix inside it. The scheme picks the provider
//! adapter; everything after it is split into `(unit, prefix)`.

use crate::error::{ErrorKind, Result};
use std::fmt;

/// Storage provider detected from a URI scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Amazon S3 or S3-compatible (MinIO, LocalStack, Backblaze B2).
    S3,
    /// Google Cloud Storage.
    Gcs,
    /// Azure Blob Storage / ADLS Gen2.
    Azure,
    /// Local filesystem (no credentials needed).
    Local,
}

impl Scheme {
    /// Detects the provider from a root URI.
    ///
    /// Anything without a `scheme://` marker is treated as a local path;
    /// an unrecognized scheme is rejected before any network call.
    ///
    /// # Examples
    ///
    /// ```
    /// use forage_client::Scheme;
    ///
    /// assert_eq!(Scheme::detect("s3://bucket/path").unwrap(), Scheme::S3);
    /// assert_eq!(Scheme::detect("gs://bucket/path").unwrap(), Scheme::Gcs);
    /// assert_eq!(Scheme::detect("az://container/path").unwrap(), Scheme::Azure);
    /// assert_eq!(Scheme::detect("/local/path").unwrap(), Scheme::Local);
    /// assert!(Scheme::detect("ftp://host/path").is_err());
    /// ```
    pub fn detect(uri: &str) -> Result<Self> {
        let Some((scheme, _)) = uri.split_once("://") else {
            return Ok(Self::Local);
        };
        match scheme.to_ascii_lowercase().as_str() {
            "s3" | "s3a" => Ok(Self::S3),
            "gs" | "gcs" => Ok(Self::Gcs),
            "az" | "abfs" | "abfss" | "wasb" | "wasbs" => Ok(Self::Azure),
            "file" => Ok(Self::Local),
            other => exn::bail!(ErrorKind::UnsupportedScheme(other.to_string())),
        }
    }

    /// Returns true if this provider requires cloud credentials.
    pub const fn requires_credentials(self) -> bool {
        !matches!(self, Self::Local)
    }

    /// Display name for this provider (logging only).
    pub const fn name(self) -> &'static str {
        match self {
            Self::S3 => "s3",
            Self::Gcs => "gcs",
            Self::Azure => "azure",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A root URI split into its provider, storage unit, and key prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootUri {
    pub scheme: Scheme,
    /// Bucket/container name, or the directory path for local roots.
    pub unit: String,
    /// Azure storage account, extracted when the URI uses the
    /// `container@account.host` authority form (`abfs`, `abfss`, `wasb`).
    pub account: Option<String>,
    /// Key prefix under the unit; empty means the whole unit.
    pub prefix: String,
}

/// Splits a root URI into `(scheme, unit, prefix)`.
///
/// For cloud schemes the unit is the bucket/container (required) and the
/// prefix is everything after the first delimiter, with any trailing
/// delimiter stripped. For local roots the unit is the whole path and the
/// prefix is empty — traversal starts at the directory itself.
///
/// # Examples
///
/// ```
/// use forage_client::{split_uri, Scheme};
///
/// let root = split_uri("s3://my-bucket/data/2024/").unwrap();
/// assert_eq!(root.scheme, Scheme::S3);
/// assert_eq!(root.unit, "my-bucket");
/// assert_eq!(root.prefix, "data/2024");
/// ```
pub fn split_uri(uri: &str) -> Result<RootUri> {
    let scheme = Scheme::detect(uri)?;
    if scheme == Scheme::Local {
        let path = uri.strip_prefix("file://").unwrap_or(uri);
        if path.is_empty() {
            exn::bail!(ErrorKind::Resolution(uri.to_string()));
        }
        return Ok(RootUri {
            scheme,
            unit: path.trim_end_matches('/').to_string(),
            account: None,
            prefix: String::new(),
        });
    }

    // Everything past `scheme://`, split on the first delimiter.
    let rest = uri
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or_default();
    let (unit, prefix) = match rest.split_once('/') {
        Some((unit, prefix)) => (unit, prefix.trim_end_matches('/')),
        None => (rest, ""),
    };
    if unit.is_empty() {
        exn::bail!(ErrorKind::Resolution(format!("missing bucket/container in {uri}")));
    }
    // Azure URIs name the account in the authority: `container@account.host`.
    let (unit, account) = match (scheme, unit.split_once('@')) {
        (Scheme::Azure, Some((container, authority))) => {
            let account = authority.split('.').next().unwrap_or_default();
            if container.is_empty() || account.is_empty() {
                exn::bail!(ErrorKind::Resolution(format!("malformed container@account in {uri}")));
            }
            (container, Some(account.to_string()))
        }
        _ => (unit, None),
    };
    Ok(RootUri {
        scheme,
        unit: unit.to_string(),
        account,
        prefix: prefix.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("s3://bucket/path", Scheme::S3)]
    #[case("S3://Bucket/Path", Scheme::S3)]
    #[case("s3a://bucket/path", Scheme::S3)]
    #[case("gs://bucket/path", Scheme::Gcs)]
    #[case("gcs://bucket/path", Scheme::Gcs)]
    #[case("az://container/path", Scheme::Azure)]
    #[case("abfs://container@account/path", Scheme::Azure)]
    #[case("abfss://container@account.dfs.core.windows.net/p", Scheme::Azure)]
    #[case("wasbs://container@account.blob.core.windows.net/p", Scheme::Azure)]
    #[case("file:///data/tables", Scheme::Local)]
    #[case("/data/tables", Scheme::Local)]
    #[case("./relative", Scheme::Local)]
    fn test_detect(#[case] uri: &str, #[case] expected: Scheme) {
        assert_eq!(Scheme::detect(uri).unwrap(), expected);
    }

    #[rstest]
    #[case("ftp://host/path")]
    #[case("http://example.com/file.csv")]
    #[case("redis://localhost")]
    fn test_detect_unsupported(#[case] uri: &str) {
        let err = Scheme::detect(uri).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedScheme(_)));
    }

    #[test]
    fn test_split_bucket_and_prefix() {
        let root = split_uri("s3://my-bucket/path/to/data").unwrap();
        assert_eq!(root.unit, "my-bucket");
        assert_eq!(root.prefix, "path/to/data");
    }

    #[test]
    fn test_split_bucket_only() {
        let root = split_uri("gs://my-bucket").unwrap();
        assert_eq!(root.unit, "my-bucket");
        assert_eq!(root.prefix, "");
        let root = split_uri("gs://my-bucket/").unwrap();
        assert_eq!(root.prefix, "");
    }

    #[test]
    fn test_split_trailing_delimiter_stripped() {
        let root = split_uri("az://container/some/prefix/").unwrap();
        assert_eq!(root.prefix, "some/prefix");
    }

    #[test]
    fn test_split_azure_authority_form() {
        let root = split_uri("abfs://mycontainer@myaccount.dfs.core.windows.net/data").unwrap();
        assert_eq!(root.scheme, Scheme::Azure);
        assert_eq!(root.unit, "mycontainer");
        assert_eq!(root.account.as_deref(), Some("myaccount"));
        assert_eq!(root.prefix, "data");

        let root = split_uri("wasbs://logs@archive.blob.core.windows.net").unwrap();
        assert_eq!(root.unit, "logs");
        assert_eq!(root.account.as_deref(), Some("archive"));
    }

    #[test]
    fn test_split_azure_plain_container() {
        // Account comes from storage options in this form.
        let root = split_uri("az://container/prefix").unwrap();
        assert_eq!(root.unit, "container");
        assert_eq!(root.account, None);
    }

    #[test]
    fn test_split_azure_malformed_authority() {
        assert!(split_uri("abfs://@account.dfs.core.windows.net/x").is_err());
        assert!(split_uri("abfs://container@/x").is_err());
    }

    #[test]
    fn test_split_missing_bucket() {
        assert!(split_uri("s3://").is_err());
    }

    #[test]
    fn test_split_local() {
        let root = split_uri("file:///data/dir/").unwrap();
        assert_eq!(root.scheme, Scheme::Local);
        assert_eq!(root.unit, "/data/dir");
        assert_eq!(root.prefix, "");

        let root = split_uri("/plain/path").unwrap();
        assert_eq!(root.unit, "/plain/path");
    }

    #[test]
    fn test_requires_credentials() {
        assert!(Scheme::S3.requires_credentials());
        assert!(Scheme::Gcs.requires_credentials());
        assert!(Scheme::Azure.requires_credentials());
        assert!(!Scheme::Local.requires_credentials());
    }
}
