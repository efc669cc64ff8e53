//! Local directory storage client
//!
//! Top-level directories under the root are containers. Files below them are
//! objects keyed by their relative path; every sub-directory is reported as a
//! directory marker (`dir/`) so empty directories stay visible in listings.

use std::collections::BTreeMap;
use std::fs::Metadata;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use jiff::Timestamp;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use walkdir::WalkDir;

use super::group_page;
use crate::entry::{ByteStream, ObjectHead, RawRecord};
use crate::error::{Error, Result};
use crate::path::DELIMITER;
use crate::traits::{ContainerInfo, ListPage, ListRequest, StorageClient};

const CHUNK_SIZE: usize = 64 * 1024;

/// Storage client backed by a directory tree
#[derive(Debug, Clone)]
pub struct LocalClient {
    root: PathBuf,
}

impl LocalClient {
    /// Create a client rooted at an existing directory
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::Config(format!(
                "Local root is not a directory: {}",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    fn container_dir(&self, container: &str) -> Result<PathBuf> {
        if container.is_empty()
            || container == "."
            || container == ".."
            || container.contains(DELIMITER)
        {
            return Err(Error::InvalidOperation(format!(
                "Invalid container name: '{container}'"
            )));
        }
        Ok(self.root.join(container))
    }

    fn object_path(&self, container: &str, key: &str) -> Result<PathBuf> {
        let mut path = self.container_dir(container)?;
        for segment in key.split(DELIMITER).filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." {
                return Err(Error::InvalidOperation(format!("Invalid key: '{key}'")));
            }
            path.push(segment);
        }
        Ok(path)
    }

    async fn file_metadata(&self, container: &str, key: &str) -> Result<Metadata> {
        let path = self.object_path(container, key)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(meta),
            Ok(_) => Err(Error::NotFound(format!("/{container}/{key}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("/{container}/{key}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn require_container(&self, container: &str) -> Result<PathBuf> {
        let dir = self.container_dir(container)?;
        if tokio::fs::metadata(&dir).await.is_ok_and(|m| m.is_dir()) {
            Ok(dir)
        } else {
            Err(Error::NotFound(format!("Container not found: {container}")))
        }
    }
}

fn modified(meta: &Metadata) -> Option<Timestamp> {
    meta.modified().ok().and_then(|t| Timestamp::try_from(t).ok())
}

/// Weak entity tag from size and modification time
fn local_etag(meta: &Metadata) -> String {
    let nanos = modified(meta).map(|t| t.as_nanosecond()).unwrap_or_default();
    format!("{:x}-{:x}", meta.len(), nanos)
}

async fn read_chunk(mut file: File) -> Result<Option<(Bytes, File)>> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let n = file.read(&mut buf).await?;
    if n == 0 {
        return Ok(None);
    }
    buf.truncate(n);
    Ok(Some((Bytes::from(buf), file)))
}

/// Collect object records below `base`, keyed relative to `container_dir`
///
/// Entries that cannot be read or named are returned as failures next to the
/// records.
fn scan(container_dir: &Path, base: &Path, max_depth: Option<usize>) -> (Vec<RawRecord>, Vec<Error>) {
    let mut walker = WalkDir::new(base).min_depth(1);
    if let Some(depth) = max_depth {
        walker = walker.max_depth(depth);
    }

    let mut records = BTreeMap::new();
    let mut failures = Vec::new();
    for entry in walker {
        match scan_entry(container_dir, entry) {
            Ok(Some(record)) => {
                records.insert(record.sort_key().to_string(), record);
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, "unreadable entry in local listing");
                failures.push(err);
            }
        }
    }
    (records.into_values().collect(), failures)
}

fn scan_entry(
    container_dir: &Path,
    entry: walkdir::Result<walkdir::DirEntry>,
) -> Result<Option<RawRecord>> {
    let entry = entry.map_err(std::io::Error::from)?;
    let Ok(relative) = entry.path().strip_prefix(container_dir) else {
        return Ok(None);
    };
    let segments: Option<Vec<&str>> = relative.iter().map(|s| s.to_str()).collect();
    let Some(segments) = segments else {
        return Err(Error::UnsupportedRecord(format!(
            "name is not valid UTF-8: {}",
            entry.path().display()
        )));
    };
    let mut key = segments.join(DELIMITER);

    let meta = entry.metadata().map_err(std::io::Error::from)?;
    let (size, etag) = if meta.is_dir() {
        key.push_str(DELIMITER);
        (0, None)
    } else {
        (meta.len(), Some(local_etag(&meta)))
    };

    Ok(Some(RawRecord::Object {
        key,
        size,
        last_modified: modified(&meta),
        etag,
    }))
}

#[async_trait]
impl StorageClient for LocalClient {
    async fn head_object(&self, container: &str, key: &str) -> Result<ObjectHead> {
        let meta = self.file_metadata(container, key).await?;
        Ok(ObjectHead {
            etag: Some(local_etag(&meta)),
            size: meta.len(),
            content_type: None,
            last_modified: modified(&meta),
        })
    }

    async fn get_object_stream(
        &self,
        container: &str,
        key: &str,
        if_none_match: Option<String>,
    ) -> Result<ByteStream> {
        let meta = self.file_metadata(container, key).await?;
        if if_none_match.as_deref() == Some(local_etag(&meta).as_str()) {
            return Err(Error::NotModified(format!("/{container}/{key}")));
        }

        let file = File::open(self.object_path(container, key)?).await?;
        Ok(futures::stream::try_unfold(file, read_chunk).boxed())
    }

    async fn list_objects(&self, request: &ListRequest) -> Result<ListPage> {
        let container_dir = self.require_container(&request.container).await?;

        // Only the directory holding the prefix can contain matching keys
        let base_key = request
            .prefix
            .rsplit_once(DELIMITER)
            .map(|(dir, _)| dir)
            .unwrap_or_default();
        let base = self.object_path(&request.container, base_key)?;
        if !tokio::fs::metadata(&base).await.is_ok_and(|m| m.is_dir()) {
            return Ok(ListPage::default());
        }

        // With the path delimiter, anything deeper than one level groups into a prefix
        let max_depth = (request.delimiter == DELIMITER).then_some(1);
        let (records, failures) =
            tokio::task::spawn_blocking(move || scan(&container_dir, &base, max_depth))
                .await
                .map_err(|e| Error::General(format!("directory scan failed: {e}")))?;

        let mut page = group_page(records, request);
        // Every page rescans the directory; report failures once, with the first page
        if request.continuation_token.is_none() {
            page.failures = failures;
        }
        Ok(page)
    }

    async fn list_containers(&self) -> Result<Vec<ContainerInfo>> {
        let mut containers = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                return Err(Error::UnsupportedRecord(format!(
                    "container name is not valid UTF-8: {}",
                    entry.path().display()
                )));
            };
            containers.push(ContainerInfo::new(name));
        }
        containers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(containers)
    }

    async fn head_container(&self, container: &str) -> Result<()> {
        self.require_container(container).await.map(|_| ())
    }

    async fn put_object(&self, container: &str, key: &str, body: Bytes) -> Result<()> {
        self.require_container(container).await?;
        let path = self.object_path(container, key)?;

        if key.ends_with(DELIMITER) && body.is_empty() {
            tokio::fs::create_dir_all(&path).await?;
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &body).await?;
        Ok(())
    }
}
