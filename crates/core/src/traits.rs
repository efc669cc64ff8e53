//! Storage client abstraction
//!
//! Every backend implements [`StorageClient`]. The filesystem adapter only talks
//! to this trait, so backends are chosen once at startup and never branched on
//! per call.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::entry::{ByteStream, ObjectHead, RawRecord};
use crate::error::{Error, Result};
use crate::path::DELIMITER;

/// A container (bucket) as reported by a root listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub name: String,
}

impl ContainerInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Parameters of a delimiter listing inside one container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub container: String,
    /// Only keys starting with this prefix are listed
    pub prefix: String,
    /// Keys are grouped into common prefixes up to the next delimiter
    pub delimiter: String,
    /// Maximum records per page
    pub max_keys: Option<i32>,
    /// Token returned by the previous page
    pub continuation_token: Option<String>,
}

impl ListRequest {
    pub fn new(container: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            prefix: prefix.into(),
            delimiter: DELIMITER.to_string(),
            max_keys: None,
            continuation_token: None,
        }
    }

    pub fn with_max_keys(mut self, max_keys: Option<i32>) -> Self {
        self.max_keys = max_keys;
        self
    }
}

/// One page of a delimiter listing
///
/// Records hold the page's common prefixes first, then its objects.
#[derive(Debug, Default)]
pub struct ListPage {
    pub records: Vec<RawRecord>,
    /// Entries the backend saw but could not turn into records
    pub failures: Vec<Error>,
    /// Present when more pages follow
    pub next_token: Option<String>,
}

/// Capability interface shared by all storage backends
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Probe object metadata; `Error::NotFound` when the key is absent
    async fn head_object(&self, container: &str, key: &str) -> Result<ObjectHead>;

    /// Open the object content as a byte stream
    ///
    /// When `if_none_match` equals the current entity tag the call fails with
    /// `Error::NotModified`.
    async fn get_object_stream(
        &self,
        container: &str,
        key: &str,
        if_none_match: Option<String>,
    ) -> Result<ByteStream>;

    /// List one page of keys, grouped by the request delimiter
    async fn list_objects(&self, request: &ListRequest) -> Result<ListPage>;

    /// List all containers
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>>;

    /// Check that a container exists; `Error::NotFound` otherwise
    async fn head_container(&self, container: &str) -> Result<()>;

    /// Store an object, replacing any previous content
    async fn put_object(&self, container: &str, key: &str, body: Bytes) -> Result<()>;
}
