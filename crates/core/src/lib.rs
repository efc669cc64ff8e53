//! bucketfs-core: Core library for bucketfs
//!
//! This crate provides a filesystem-shaped view over object storage:
//! - Path resolution from virtual paths to container and key
//! - Normalization of backend listing records into directory entries
//! - Pausable entry streams for large directory listings
//! - The `ObjectFs` adapter and the `StorageClient` trait it drives
//! - Configuration, retry helpers and in-process backends
//!
//! This crate is independent of any specific S3 SDK; the S3 client lives in
//! `bucketfs-s3`.

pub mod backend;
pub mod config;
pub mod entry;
pub mod error;
pub mod fs;
pub mod path;
pub mod retry;
pub mod stream;
pub mod traits;

pub use backend::{LocalClient, MemoryClient};
pub use config::{BackendConfig, Config, ConfigManager, ListingConfig, RetryConfig, S3Config};
pub use entry::{
    AccessBits, ByteStream, DIRECTORY_MIME, DirectoryEntry, FileMeta, ListingContext, ObjectHead,
    RawRecord, infer_mime_type, normalize,
};
pub use error::{Error, Result};
pub use fs::{ObjectFs, OpOptions, ReadOptions, ReaddirOptions};
pub use path::{DELIMITER, ResolvedPath, resolve};
pub use retry::{is_retryable_error, retry_with_backoff};
pub use stream::{EntryStream, PauseHandle, RecordStream, StreamEvent, StreamState};
pub use traits::{ContainerInfo, ListPage, ListRequest, StorageClient};
