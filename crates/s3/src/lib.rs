//! bucketfs-s3: S3 storage client for bucketfs
//!
//! Implements the `StorageClient` trait from `bucketfs-core` on top of aws-sdk-s3,
//! so any S3-compatible service can back an `ObjectFs`.

mod client;

pub use client::S3Client;
