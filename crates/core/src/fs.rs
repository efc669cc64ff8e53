//! Filesystem adapter over a storage client
//!
//! [`ObjectFs`] gives object storage a filesystem-shaped surface. Containers
//! appear as top-level directories, and key prefixes ending in the delimiter
//! appear as nested directories.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;

use crate::entry::{DirectoryEntry, FileMeta, ListingContext, RawRecord, infer_mime_type};
use crate::error::{Error, Result};
use crate::path::{DELIMITER, resolve};
use crate::stream::{EntryStream, RecordStream};
use crate::traits::{ListPage, ListRequest, StorageClient};

/// Options for [`ObjectFs::readfile`]
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Entity tag the caller already holds
    pub etag: Option<String>,
}

/// Options for [`ObjectFs::readdir`]
#[derive(Debug, Clone, Default)]
pub struct ReaddirOptions {
    /// Records per backend page, overriding the adapter default
    pub page_size: Option<i32>,
}

/// Options for operations that have no implementation yet
#[derive(Debug, Clone, Default)]
pub struct OpOptions {
    /// Destination for rename, copy and symlink
    pub target: Option<String>,
}

/// Filesystem-style operations on top of a [`StorageClient`]
#[derive(Clone)]
pub struct ObjectFs {
    client: Arc<dyn StorageClient>,
    page_size: Option<i32>,
}

impl ObjectFs {
    pub fn new(client: Arc<dyn StorageClient>) -> Self {
        Self {
            client,
            page_size: None,
        }
    }

    /// Set the default number of records per backend listing page
    pub fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Describe a path
    ///
    /// A key the backend does not know is reported as an empty directory, since
    /// object stores keep no directory markers for implicit prefixes.
    pub async fn stat(&self, path: &str) -> Result<DirectoryEntry> {
        let resolved = resolve(path);
        tracing::debug!(container = %resolved.container, key = %resolved.key, "stat");

        if resolved.is_root() {
            return Ok(DirectoryEntry::directory("/", "/"));
        }

        if resolved.is_container() {
            self.client.head_container(&resolved.container).await?;
            return Ok(DirectoryEntry::directory(
                resolved.to_string(),
                resolved.container.as_str(),
            ));
        }

        match self
            .client
            .head_object(&resolved.container, &resolved.key)
            .await
        {
            Ok(head) => {
                let mut entry = DirectoryEntry::file(resolved.to_string(), resolved.name(), head.size);
                if let Some(content_type) = head.content_type {
                    entry.mime_type = content_type;
                }
                if let Some(modified) = head.last_modified {
                    entry.modified_at = modified.as_millisecond();
                }
                entry.etag = head.etag;
                Ok(entry)
            }
            Err(Error::NotFound(_)) => {
                tracing::debug!(path = %resolved, "no object at key, reporting a directory");
                Ok(DirectoryEntry::directory(resolved.to_string(), resolved.name()))
            }
            Err(e) => Err(e),
        }
    }

    /// Read an object
    ///
    /// When `options.etag` matches the current tag the result is flagged
    /// unmodified and carries no content.
    pub async fn readfile(&self, path: &str, options: &ReadOptions) -> Result<FileMeta> {
        let resolved = resolve(path);
        tracing::debug!(container = %resolved.container, key = %resolved.key, "readfile");

        if resolved.key.is_empty() {
            return Err(Error::InvalidOperation(format!(
                "readfile: '{resolved}' is a directory"
            )));
        }

        let head = self
            .client
            .head_object(&resolved.container, &resolved.key)
            .await?;

        let mut meta = FileMeta {
            mime_type: head
                .content_type
                .unwrap_or_else(|| infer_mime_type(resolved.name())),
            etag: head.etag,
            size_bytes: head.size,
            is_unmodified: false,
            content: None,
        };

        if options.etag.is_some() && options.etag == meta.etag {
            meta.is_unmodified = true;
            return Ok(meta);
        }

        match self
            .client
            .get_object_stream(&resolved.container, &resolved.key, options.etag.clone())
            .await
        {
            Ok(stream) => meta.content = Some(stream),
            // The object changed back to the caller's version after the HEAD request
            Err(Error::NotModified(_)) => meta.is_unmodified = true,
            Err(e) => return Err(e),
        }
        Ok(meta)
    }

    /// List a directory as a stream of entries
    ///
    /// The root lists containers; any other path lists keys one level below it.
    /// The first backend page is fetched before returning, so a failing request
    /// is reported here rather than through the stream.
    pub async fn readdir(&self, path: &str, options: &ReaddirOptions) -> Result<EntryStream> {
        let resolved = resolve(path);
        tracing::debug!(container = %resolved.container, key = %resolved.key, "readdir");

        if resolved.is_root() {
            let records = self
                .client
                .list_containers()
                .await?
                .into_iter()
                .map(|c| RawRecord::Container { name: c.name })
                .collect();
            return Ok(EntryStream::from_records(records, ListingContext::Root));
        }

        let prefix = resolved.list_prefix();
        let request = ListRequest::new(&resolved.container, &prefix)
            .with_max_keys(options.page_size.or(self.page_size));
        let first = self.client.list_objects(&request).await?;
        tracing::debug!(
            records = first.records.len(),
            failures = first.failures.len(),
            more = first.next_token.is_some(),
            "first listing page"
        );

        let records = paged_records(self.client.clone(), request, first);
        Ok(EntryStream::new(
            records,
            ListingContext::container(resolved.container, prefix),
        ))
    }

    /// Create a directory marker
    pub async fn mkdir(&self, path: &str) -> Result<()> {
        let resolved = resolve(path);
        tracing::debug!(container = %resolved.container, key = %resolved.key, "mkdir");

        if resolved.is_root() {
            return Err(Error::InvalidOperation(
                "mkdir: creating root directory not allowed".into(),
            ));
        }
        if resolved.is_container() {
            return Err(Error::InvalidOperation(
                "mkdir: creating container not supported".into(),
            ));
        }

        let marker = format!("{}{DELIMITER}", resolved.key);
        self.client
            .put_object(&resolved.container, &marker, Bytes::new())
            .await
    }

    pub async fn mkfile(&self, path: &str, options: &OpOptions) -> Result<()> {
        not_implemented("mkfile", path, options)
    }

    pub async fn rmfile(&self, path: &str, options: &OpOptions) -> Result<()> {
        not_implemented("rmfile", path, options)
    }

    pub async fn rmdir(&self, path: &str, options: &OpOptions) -> Result<()> {
        not_implemented("rmdir", path, options)
    }

    pub async fn rename(&self, path: &str, options: &OpOptions) -> Result<()> {
        not_implemented("rename", path, options)
    }

    pub async fn copy(&self, path: &str, options: &OpOptions) -> Result<()> {
        not_implemented("copy", path, options)
    }

    pub async fn symlink(&self, path: &str, options: &OpOptions) -> Result<()> {
        not_implemented("symlink", path, options)
    }
}

fn not_implemented(op: &'static str, path: &str, options: &OpOptions) -> Result<()> {
    tracing::debug!(op, path, target = ?options.target, "operation not implemented");
    Err(Error::NotImplemented(op))
}

struct Pager {
    client: Arc<dyn StorageClient>,
    request: ListRequest,
    buffer: VecDeque<Result<RawRecord>>,
    next_token: Option<String>,
}

impl Pager {
    /// The listing root's own marker object is not one of its children
    fn is_own_marker(&self, item: &Result<RawRecord>) -> bool {
        matches!(item, Ok(RawRecord::Object { key, .. })
            if !self.request.prefix.is_empty() && *key == self.request.prefix)
    }

    /// Queue a page; its failures come out ahead of its records
    fn load(&mut self, page: ListPage) {
        self.buffer = page
            .failures
            .into_iter()
            .map(Err)
            .chain(page.records.into_iter().map(Ok))
            .collect();
        self.next_token = page.next_token;
    }
}

/// Yield records page by page, fetching the next page only once the current one is drained
fn paged_records(client: Arc<dyn StorageClient>, request: ListRequest, first: ListPage) -> RecordStream {
    let mut pager = Pager {
        client,
        request,
        buffer: VecDeque::new(),
        next_token: None,
    };
    pager.load(first);

    futures::stream::unfold(pager, next_record).boxed()
}

async fn next_record(mut pager: Pager) -> Option<(Result<RawRecord>, Pager)> {
    loop {
        if let Some(item) = pager.buffer.pop_front() {
            if pager.is_own_marker(&item) {
                continue;
            }
            return Some((item, pager));
        }

        // A failed page leaves no token behind, so its error is the last item
        let token = pager.next_token.take()?;
        pager.request.continuation_token = Some(token);
        match pager.client.list_objects(&pager.request).await {
            Ok(page) => {
                tracing::debug!(
                    records = page.records.len(),
                    failures = page.failures.len(),
                    more = page.next_token.is_some(),
                    "next listing page"
                );
                pager.load(page);
            }
            Err(err) => return Some((Err(err), pager)),
        }
    }
}
