//! In-memory storage client

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use jiff::Timestamp;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use super::group_page;
use crate::entry::{ByteStream, ObjectHead, RawRecord, infer_mime_type};
use crate::error::{Error, Result};
use crate::traits::{ContainerInfo, ListPage, ListRequest, StorageClient};

const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    etag: String,
    last_modified: Timestamp,
}

impl StoredObject {
    fn new(data: Bytes) -> Self {
        let digest = Sha256::digest(&data);
        Self {
            etag: hex::encode(&digest[..16]),
            data,
            last_modified: Timestamp::now(),
        }
    }
}

/// Storage client keeping every container in process memory
///
/// Content is lost when the client is dropped.
#[derive(Debug, Default)]
pub struct MemoryClient {
    containers: RwLock<BTreeMap<String, BTreeMap<String, StoredObject>>>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty container; existing containers are left untouched
    pub async fn create_container(&self, name: &str) {
        self.containers
            .write()
            .await
            .entry(name.to_string())
            .or_default();
    }

    /// Store an object, creating its container when needed
    pub async fn insert(&self, container: &str, key: &str, data: impl Into<Bytes>) {
        self.containers
            .write()
            .await
            .entry(container.to_string())
            .or_default()
            .insert(key.to_string(), StoredObject::new(data.into()));
    }

    async fn object(&self, container: &str, key: &str) -> Result<StoredObject> {
        let containers = self.containers.read().await;
        containers
            .get(container)
            .ok_or_else(|| Error::NotFound(format!("Container not found: {container}")))?
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("/{container}/{key}")))
    }
}

#[async_trait]
impl StorageClient for MemoryClient {
    async fn head_object(&self, container: &str, key: &str) -> Result<ObjectHead> {
        let object = self.object(container, key).await?;
        Ok(ObjectHead {
            etag: Some(object.etag),
            size: object.data.len() as u64,
            content_type: Some(infer_mime_type(key)),
            last_modified: Some(object.last_modified),
        })
    }

    async fn get_object_stream(
        &self,
        container: &str,
        key: &str,
        if_none_match: Option<String>,
    ) -> Result<ByteStream> {
        let object = self.object(container, key).await?;
        if if_none_match.as_deref() == Some(object.etag.as_str()) {
            return Err(Error::NotModified(format!("/{container}/{key}")));
        }

        let data = object.data;
        let chunks: Vec<Result<Bytes>> = (0..data.len())
            .step_by(CHUNK_SIZE)
            .map(|start| Ok(data.slice(start..(start + CHUNK_SIZE).min(data.len()))))
            .collect();
        Ok(futures::stream::iter(chunks).boxed())
    }

    async fn list_objects(&self, request: &ListRequest) -> Result<ListPage> {
        let containers = self.containers.read().await;
        let objects = containers.get(&request.container).ok_or_else(|| {
            Error::NotFound(format!("Container not found: {}", request.container))
        })?;

        let records = objects.iter().map(|(key, object)| RawRecord::Object {
            key: key.clone(),
            size: object.data.len() as u64,
            last_modified: Some(object.last_modified),
            etag: Some(object.etag.clone()),
        });
        Ok(group_page(records, request))
    }

    async fn list_containers(&self) -> Result<Vec<ContainerInfo>> {
        let containers = self.containers.read().await;
        Ok(containers.keys().map(ContainerInfo::new).collect())
    }

    async fn head_container(&self, container: &str) -> Result<()> {
        if self.containers.read().await.contains_key(container) {
            Ok(())
        } else {
            Err(Error::NotFound(format!("Container not found: {container}")))
        }
    }

    async fn put_object(&self, container: &str, key: &str, body: Bytes) -> Result<()> {
        let mut containers = self.containers.write().await;
        let objects = containers
            .get_mut(container)
            .ok_or_else(|| Error::NotFound(format!("Container not found: {container}")))?;
        objects.insert(key.to_string(), StoredObject::new(body));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_put_and_read_back() {
        let client = MemoryClient::new();
        client.create_container("docs").await;
        client
            .put_object("docs", "a.txt", Bytes::from_static(b"hello"))
            .await
            .unwrap();

        let head = client.head_object("docs", "a.txt").await.unwrap();
        assert_eq!(head.size, 5);
        assert_eq!(head.content_type.as_deref(), Some("text/plain"));

        let stream = client.get_object_stream("docs", "a.txt", None).await.unwrap();
        let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"hello");
    }

    #[tokio::test]
    async fn test_conditional_get_matches_etag() {
        let client = MemoryClient::new();
        client.insert("docs", "a.txt", "hello").await;
        let etag = client.head_object("docs", "a.txt").await.unwrap().etag;

        let err = client
            .get_object_stream("docs", "a.txt", etag)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::NotModified(_)));
    }

    #[tokio::test]
    async fn test_missing_container_and_key() {
        let client = MemoryClient::new();
        assert!(client.head_container("nope").await.unwrap_err().is_not_found());
        assert!(
            client
                .put_object("nope", "k", Bytes::new())
                .await
                .unwrap_err()
                .is_not_found()
        );

        client.create_container("docs").await;
        assert!(client.head_object("docs", "k").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_large_object_is_chunked() {
        let client = MemoryClient::new();
        client.insert("docs", "big.bin", vec![7u8; CHUNK_SIZE * 2 + 1]).await;

        let stream = client.get_object_stream("docs", "big.bin", None).await.unwrap();
        let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.iter().map(Bytes::len).sum::<usize>(), CHUNK_SIZE * 2 + 1);
    }
}
