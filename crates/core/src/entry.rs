//! Directory entries and record normalization
//!
//! Storage clients describe listings as [`RawRecord`]s. The normalizer turns each
//! record into a [`DirectoryEntry`], the single entry shape handed to callers
//! regardless of backend.

use std::fmt;
use std::ops::BitOr;

use bytes::Bytes;
use futures::stream::BoxStream;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::path::DELIMITER;

/// Mime type reported for containers and key prefixes
pub const DIRECTORY_MIME: &str = "inode/directory";

/// Lazily consumed object content
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Coarse access bitmask attached to every entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessBits(u8);

impl AccessBits {
    pub const READ: AccessBits = AccessBits(4);
    pub const WRITE: AccessBits = AccessBits(2);
    pub const READ_WRITE: AccessBits = AccessBits(4 | 2);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn readable(self) -> bool {
        self.0 & Self::READ.0 != 0
    }

    pub fn writable(self) -> bool {
        self.0 & Self::WRITE.0 != 0
    }
}

impl Default for AccessBits {
    /// Object stores expose no per-object permissions, so everything is read+write
    fn default() -> Self {
        Self::READ_WRITE
    }
}

impl BitOr for AccessBits {
    type Output = AccessBits;

    fn bitor(self, rhs: Self) -> Self::Output {
        AccessBits(self.0 | rhs.0)
    }
}

/// Canonical listing record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Full virtual path, e.g. `/docs/sub`
    pub path: String,
    /// Last path segment
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    /// Modification time in milliseconds since the Unix epoch
    pub modified_at: i64,
    pub access: AccessBits,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl DirectoryEntry {
    /// Create a zero-size directory entry stamped with the current time
    pub fn directory(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            mime_type: DIRECTORY_MIME.to_string(),
            size_bytes: 0,
            modified_at: Timestamp::now().as_millisecond(),
            access: AccessBits::default(),
            etag: None,
        }
    }

    /// Create a file entry, inferring the mime type from the name
    pub fn file(path: impl Into<String>, name: impl Into<String>, size_bytes: u64) -> Self {
        let name = name.into();
        Self {
            path: path.into(),
            mime_type: infer_mime_type(&name),
            name,
            size_bytes,
            modified_at: Timestamp::now().as_millisecond(),
            access: AccessBits::default(),
            etag: None,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.mime_type == DIRECTORY_MIME
    }
}

/// Metadata returned by a read, optionally with the content stream
pub struct FileMeta {
    pub etag: Option<String>,
    pub size_bytes: u64,
    pub mime_type: String,
    /// Set when the caller's entity tag matched; no content is attached then
    pub is_unmodified: bool,
    pub content: Option<ByteStream>,
}

impl fmt::Debug for FileMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileMeta")
            .field("etag", &self.etag)
            .field("size_bytes", &self.size_bytes)
            .field("mime_type", &self.mime_type)
            .field("is_unmodified", &self.is_unmodified)
            .field("content", &self.content.as_ref().map(|_| "<stream>"))
            .finish()
    }
}

/// Metadata returned by a HEAD request on a single object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectHead {
    pub etag: Option<String>,
    pub size: u64,
    pub content_type: Option<String>,
    pub last_modified: Option<Timestamp>,
}

/// A record as produced by a storage client listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRecord {
    /// A container (bucket) from a root listing
    Container { name: String },
    /// A common prefix from a delimiter listing, including the trailing delimiter
    KeyPrefix { prefix: String },
    /// An object from a delimiter listing
    Object {
        key: String,
        size: u64,
        last_modified: Option<Timestamp>,
        etag: Option<String>,
    },
}

impl RawRecord {
    /// Key used to order records the way object stores do
    pub fn sort_key(&self) -> &str {
        match self {
            RawRecord::Container { name } => name,
            RawRecord::KeyPrefix { prefix } => prefix,
            RawRecord::Object { key, .. } => key,
        }
    }
}

/// Where a batch of records was listed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingContext {
    /// Listing of all containers
    Root,
    /// Listing of `root` (a key prefix, possibly empty) inside `container`
    Container { container: String, root: String },
}

impl ListingContext {
    pub fn container(container: impl Into<String>, root: impl Into<String>) -> Self {
        ListingContext::Container {
            container: container.into(),
            root: root.into(),
        }
    }
}

/// Normalize a raw record into a directory entry
pub fn normalize(record: RawRecord, context: &ListingContext) -> Result<DirectoryEntry> {
    match (record, context) {
        (RawRecord::Container { name }, ListingContext::Root) => {
            if name.is_empty() {
                return Err(Error::UnsupportedRecord("container with empty name".into()));
            }
            Ok(DirectoryEntry::directory(format!("/{name}"), name))
        }
        (RawRecord::KeyPrefix { prefix }, ListingContext::Container { container, root }) => {
            let trimmed = prefix.strip_suffix(DELIMITER).unwrap_or(&prefix);
            let name = relative_name(trimmed, root)?;
            Ok(DirectoryEntry::directory(
                format!("/{container}/{trimmed}"),
                name,
            ))
        }
        (
            RawRecord::Object {
                key,
                size,
                last_modified,
                etag,
            },
            ListingContext::Container { container, root },
        ) => {
            let name = relative_name(&key, root)?;
            let mut entry = DirectoryEntry::file(format!("/{container}/{key}"), name, size);
            if let Some(modified) = last_modified {
                entry.modified_at = modified.as_millisecond();
            }
            entry.etag = etag;
            Ok(entry)
        }
        (record, context) => Err(Error::UnsupportedRecord(format!(
            "{record:?} in {context:?}"
        ))),
    }
}

fn relative_name<'a>(key: &'a str, root: &str) -> Result<&'a str> {
    let name = key
        .strip_prefix(root)
        .ok_or_else(|| Error::UnsupportedRecord(format!("key '{key}' is outside '{root}'")))?;
    if name.is_empty() {
        return Err(Error::UnsupportedRecord(format!(
            "key '{key}' has no name below '{root}'"
        )));
    }
    Ok(name)
}

/// Infer a mime type from a file name, defaulting to `application/octet-stream`
pub fn infer_mime_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs_root() -> ListingContext {
        ListingContext::container("docs", "")
    }

    #[test]
    fn test_access_bits() {
        let access = AccessBits::default();
        assert_eq!(access.bits(), 6);
        assert!(access.readable());
        assert!(access.writable());
        assert_eq!(AccessBits::READ | AccessBits::WRITE, AccessBits::READ_WRITE);
        assert!(!AccessBits::READ.writable());
    }

    #[test]
    fn test_normalize_container() {
        let entry = normalize(
            RawRecord::Container {
                name: "docs".into(),
            },
            &ListingContext::Root,
        )
        .unwrap();
        assert_eq!(entry.path, "/docs");
        assert_eq!(entry.name, "docs");
        assert_eq!(entry.size_bytes, 0);
        assert!(entry.is_dir());
        assert!(entry.modified_at > 0);
    }

    #[test]
    fn test_normalize_prefix_strips_root_and_delimiter() {
        let ctx = ListingContext::container("docs", "sub/");
        let entry = normalize(
            RawRecord::KeyPrefix {
                prefix: "sub/deeper/".into(),
            },
            &ctx,
        )
        .unwrap();
        assert_eq!(entry.path, "/docs/sub/deeper");
        assert_eq!(entry.name, "deeper");
        assert_eq!(entry.mime_type, DIRECTORY_MIME);
        assert_eq!(entry.size_bytes, 0);
    }

    #[test]
    fn test_normalize_object() {
        let modified = Timestamp::from_second(1_700_000_000).unwrap();
        let entry = normalize(
            RawRecord::Object {
                key: "a.txt".into(),
                size: 10,
                last_modified: Some(modified),
                etag: Some("abc".into()),
            },
            &docs_root(),
        )
        .unwrap();
        assert_eq!(entry.path, "/docs/a.txt");
        assert_eq!(entry.name, "a.txt");
        assert_eq!(entry.size_bytes, 10);
        assert_eq!(entry.mime_type, "text/plain");
        assert_eq!(entry.modified_at, 1_700_000_000_000);
        assert_eq!(entry.etag.as_deref(), Some("abc"));
        assert!(!entry.is_dir());
    }

    #[test]
    fn test_normalize_rejects_mismatched_context() {
        let err = normalize(
            RawRecord::Container {
                name: "docs".into(),
            },
            &docs_root(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedRecord(_)));

        let err = normalize(
            RawRecord::KeyPrefix {
                prefix: "sub/".into(),
            },
            &ListingContext::Root,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedRecord(_)));
    }

    #[test]
    fn test_normalize_rejects_key_outside_root() {
        let ctx = ListingContext::container("docs", "sub/");
        let err = normalize(
            RawRecord::Object {
                key: "other/x.bin".into(),
                size: 1,
                last_modified: None,
                etag: None,
            },
            &ctx,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedRecord(_)));

        let err = normalize(
            RawRecord::Object {
                key: "sub/".into(),
                size: 0,
                last_modified: None,
                etag: None,
            },
            &ctx,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedRecord(_)));
    }

    #[test]
    fn test_infer_mime_type() {
        assert_eq!(infer_mime_type("a.txt"), "text/plain");
        assert_eq!(infer_mime_type("photo.png"), "image/png");
        assert_eq!(infer_mime_type("no_extension"), "application/octet-stream");
        assert_eq!(infer_mime_type("x.unknownext"), "application/octet-stream");
    }
}
