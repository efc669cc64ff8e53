//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the StorageClient trait from bucketfs-core.

use async_trait::async_trait;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_smithy_runtime_api::http::Response as HttpResponse;
use bytes::Bytes;
use futures::StreamExt;
use jiff::Timestamp;

use bucketfs_core::{
    ByteStream, ContainerInfo, Error, ListPage, ListRequest, ObjectHead, RawRecord, Result,
    RetryConfig, S3Config, StorageClient, is_retryable_error, retry_with_backoff,
};

/// S3 client wrapper
pub struct S3Client {
    inner: aws_sdk_s3::Client,
    retry: RetryConfig,
}

impl S3Client {
    /// Create a new S3 client from connection settings
    pub async fn new(config: &S3Config, retry: RetryConfig) -> Result<Self> {
        let credentials = aws_credential_types::Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None, // session token
            None, // expiry
            "bucketfs-static-credentials",
        );

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .load()
            .await;

        // Path-style addressing works with most S3-compatible servers
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.bucket_lookup == "path" || config.bucket_lookup == "auto")
            .build();

        tracing::debug!(endpoint = %config.endpoint, region = %config.region, "created S3 client");

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
            retry,
        })
    }

    /// Format AWS SDK error into a detailed error message
    fn format_sdk_error<E: std::fmt::Display>(error: &SdkError<E, HttpResponse>) -> String {
        match error {
            SdkError::ServiceError(service_err) => {
                let mut msg = format!("Service error: {}", service_err.err());
                if let Some(code) = service_err.raw().headers().get("x-amz-error-code") {
                    msg.push_str(&format!(" (code: {code})"));
                }
                msg
            }
            SdkError::ConstructionFailure(err) => {
                format!("Request construction failed: {err:?}")
            }
            SdkError::TimeoutError(_) => "Request timeout".to_string(),
            SdkError::DispatchFailure(err) => format!("Network dispatch error: {err:?}"),
            SdkError::ResponseError(err) => format!("Response error: {err:?}"),
            _ => error.to_string(),
        }
    }

    /// Translate an SDK failure into a bucketfs error
    ///
    /// Classification uses the HTTP status and the service error code; the
    /// status is kept at the front of the message.
    fn map_sdk_error<E>(error: SdkError<E, HttpResponse>, what: &str) -> Error
    where
        E: ProvideErrorMetadata + std::fmt::Display,
    {
        let status = error.raw_response().map(|r| r.status().as_u16());
        let code = match &error {
            SdkError::ServiceError(service_err) => service_err.err().code(),
            _ => None,
        };
        let detail = match status {
            Some(status) => format!("HTTP {status}: {}", Self::format_sdk_error(&error)),
            None => Self::format_sdk_error(&error),
        };

        match (&error, status) {
            (_, Some(304)) => Error::NotModified(what.to_string()),
            (_, Some(404)) => Error::NotFound(what.to_string()),
            (_, Some(401 | 403)) => Error::Auth(detail),
            (_, Some(429 | 503)) => Error::Throttled(detail),
            _ if code.is_some_and(|c| THROTTLE_CODES.contains(&c)) => Error::Throttled(detail),
            (SdkError::TimeoutError(_) | SdkError::DispatchFailure(_), _) => Error::Network(detail),
            _ => Error::Backend(detail),
        }
    }
}

/// Service error codes asking the client to slow down
const THROTTLE_CODES: &[&str] = &[
    "SlowDown",
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "TooManyRequests",
];

fn to_timestamp(dt: &aws_smithy_types::DateTime) -> Option<Timestamp> {
    Timestamp::new(dt.secs(), dt.subsec_nanos() as i32).ok()
}

fn trim_etag(etag: &str) -> String {
    etag.trim_matches('"').to_string()
}

#[async_trait]
impl StorageClient for S3Client {
    async fn head_object(&self, container: &str, key: &str) -> Result<ObjectHead> {
        let what = format!("/{container}/{key}");
        let response = retry_with_backoff(
            &self.retry,
            || async {
                self.inner
                    .head_object()
                    .bucket(container)
                    .key(key)
                    .send()
                    .await
                    .map_err(|e| Self::map_sdk_error(e, &what))
            },
            is_retryable_error,
        )
        .await?;

        Ok(ObjectHead {
            etag: response.e_tag().map(trim_etag),
            size: response.content_length().unwrap_or(0).max(0) as u64,
            content_type: response.content_type().map(str::to_string),
            last_modified: response.last_modified().and_then(to_timestamp),
        })
    }

    async fn get_object_stream(
        &self,
        container: &str,
        key: &str,
        if_none_match: Option<String>,
    ) -> Result<ByteStream> {
        let what = format!("/{container}/{key}");
        let response = retry_with_backoff(
            &self.retry,
            || async {
                self.inner
                    .get_object()
                    .bucket(container)
                    .key(key)
                    .set_if_none_match(if_none_match.clone())
                    .send()
                    .await
                    .map_err(|e| Self::map_sdk_error(e, &what))
            },
            is_retryable_error,
        )
        .await?;

        // Read the body chunk by chunk; stop after the first failure
        let body = futures::stream::unfold(Some(response.body), |body| async move {
            let mut body = body?;
            match body.try_next().await {
                Ok(Some(chunk)) => Some((Ok(chunk), Some(body))),
                Ok(None) => None,
                Err(e) => Some((Err(Error::Network(e.to_string())), None)),
            }
        });
        Ok(body.boxed())
    }

    async fn list_objects(&self, request: &ListRequest) -> Result<ListPage> {
        let what = format!("Container not found: {}", request.container);
        let response = retry_with_backoff(
            &self.retry,
            || async {
                let mut call = self
                    .inner
                    .list_objects_v2()
                    .bucket(&request.container)
                    .delimiter(&request.delimiter)
                    .set_max_keys(request.max_keys)
                    .set_continuation_token(request.continuation_token.clone());
                if !request.prefix.is_empty() {
                    call = call.prefix(&request.prefix);
                }
                call.send().await.map_err(|e| Self::map_sdk_error(e, &what))
            },
            is_retryable_error,
        )
        .await?;

        let mut records = Vec::new();
        let mut failures = Vec::new();

        for prefix in response.common_prefixes() {
            if let Some(p) = prefix.prefix() {
                records.push(RawRecord::KeyPrefix {
                    prefix: p.to_string(),
                });
            }
        }

        for object in response.contents() {
            let Some(key) = object.key() else {
                failures.push(Error::UnsupportedRecord(format!(
                    "object without a key in {}",
                    request.container
                )));
                continue;
            };
            records.push(RawRecord::Object {
                key: key.to_string(),
                size: object.size().unwrap_or(0).max(0) as u64,
                last_modified: object.last_modified().and_then(to_timestamp),
                etag: object.e_tag().map(trim_etag),
            });
        }

        let next_token = if response.is_truncated().unwrap_or(false) {
            response.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ListPage {
            records,
            failures,
            next_token,
        })
    }

    async fn list_containers(&self) -> Result<Vec<ContainerInfo>> {
        let response = retry_with_backoff(
            &self.retry,
            || async {
                self.inner
                    .list_buckets()
                    .send()
                    .await
                    .map_err(|e| Self::map_sdk_error(e, "buckets"))
            },
            is_retryable_error,
        )
        .await?;

        Ok(response
            .buckets()
            .iter()
            .filter_map(|b| b.name())
            .map(ContainerInfo::new)
            .collect())
    }

    async fn head_container(&self, container: &str) -> Result<()> {
        let what = format!("Container not found: {container}");
        retry_with_backoff(
            &self.retry,
            || async {
                self.inner
                    .head_bucket()
                    .bucket(container)
                    .send()
                    .await
                    .map_err(|e| Self::map_sdk_error(e, &what))
            },
            is_retryable_error,
        )
        .await?;
        Ok(())
    }

    async fn put_object(&self, container: &str, key: &str, body: Bytes) -> Result<()> {
        self.inner
            .put_object()
            .bucket(container)
            .key(key)
            .body(aws_sdk_s3::primitives::ByteStream::from(body))
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, &format!("/{container}/{key}")))?;
        Ok(())
    }
}
