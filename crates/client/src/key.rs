//! Object-key validation and normalization.
//!
//! Keys are the `/`-delimited identifiers object stores use. Providers will
//! happily list keys that don't map to anything file-like (directory markers,
//! doubled delimiters); those are skipped during traversal, and keys supplied
//! by callers are rejected before any request goes out.

use crate::error::{ErrorKind, Result};

const DELIMITER: char = '/';

/// Validates an object key for correctness and safety.
/// Ensures that keys stay inside the storage unit (no `..` traversal).
///
/// # Returns
/// The normalized key (empty segments and `.` components dropped, trailing
/// delimiter stripped) or [`InvalidKey`](crate::error::ErrorKind::InvalidKey).
///
/// # Examples
///
/// ```
/// use forage_client::validate_key;
/// // Valid keys
/// assert!(validate_key("dir/file.csv").is_ok());
/// assert!(validate_key("a/b/c/file.parquet").is_ok());
/// // Invalid keys
/// assert!(validate_key("../escape").is_err());
/// assert!(validate_key("a/../../b").is_err());
/// assert!(validate_key("a\0b").is_err());
/// // Keys get normalized
/// assert_eq!(validate_key("wrong/.././right//file.txt/").unwrap(), "right/file.txt");
/// ```
pub fn validate_key(key: &str) -> Result<String> {
    // Null bytes pass through string handling fine but cause truncation in
    // C-based syscalls on the local adapter. Reject them explicitly.
    if key.contains('\0') {
        exn::bail!(ErrorKind::InvalidKey(key.to_string()));
    }
    let mut segments: Vec<&str> = Vec::new();
    for segment in key.split(DELIMITER) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidKey(key.to_string()));
                }
            }
            normal => segments.push(normal),
        }
    }
    match segments.is_empty() {
        true => exn::bail!(ErrorKind::InvalidKey(key.to_string())),
        false => Ok(segments.join("/")),
    }
}

/// Whether a listed key looks like an actual object.
///
/// Providers surface directory markers (trailing delimiter) and malformed
/// keys (leading delimiter, doubled delimiter); traversal drops them rather
/// than erroring, since they arrive from the provider and not the caller.
pub fn is_listable(key: &str) -> bool {
    !(key.is_empty() || key.starts_with(DELIMITER) || key.ends_with(DELIMITER) || key.contains("//"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_keys() {
        assert_eq!(validate_key("dir/file.csv").unwrap(), "dir/file.csv");
        assert_eq!(validate_key("a/b/c/file.txt").unwrap(), "a/b/c/file.txt");
        assert_eq!(validate_key("simple.txt").unwrap(), "simple.txt");
    }

    #[test]
    fn test_key_normalization() {
        // Doubled delimiters are collapsed
        assert_eq!(validate_key("a//b//c").unwrap(), "a/b/c");
        // Current directory references removed
        assert_eq!(validate_key("a/./b/./c").unwrap(), "a/b/c");
        // Leading delimiter stripped
        assert_eq!(validate_key("/a/b").unwrap(), "a/b");
    }

    #[test]
    fn test_traversal_attempts() {
        // Basic parent reference
        assert!(validate_key("../etc/passwd").is_err());
        // Traversal in the middle
        assert!(validate_key("a/../../b").is_err());
        // Only parent references
        assert!(validate_key("..").is_err());
        assert!(validate_key("../..").is_err());
    }

    #[test]
    fn test_reverse_attempts() {
        // Traversal remains within the storage unit
        assert_eq!(validate_key("a/b/..").unwrap(), "a");
    }

    #[test]
    fn test_invalid_characters() {
        assert!(validate_key("a\0b").is_err());
        assert!(validate_key("\0").is_err());
    }

    #[test]
    fn test_empty_keys() {
        assert!(validate_key("").is_err());
        assert!(validate_key(".").is_err());
        assert!(validate_key("./").is_err());
        assert!(validate_key("//").is_err());
    }

    #[test]
    fn test_trailing_delimiters() {
        assert_eq!(validate_key("dir/").unwrap(), "dir");
        assert_eq!(validate_key("a/b/c/").unwrap(), "a/b/c");
        assert_eq!(validate_key("dir///").unwrap(), "dir");
    }

    #[test]
    fn test_is_listable() {
        assert!(is_listable("dir/file.csv"));
        assert!(is_listable("file.csv"));
        // Directory markers and malformed provider keys
        assert!(!is_listable("dir/"));
        assert!(!is_listable("/rooted"));
        assert!(!is_listable("a//b"));
        assert!(!is_listable(""));
    }
}
