// Bucketwise - Multi-bucket object storage provider
// Copyright (C) 2025 Bucketwise Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! AWS S3 transport implementation
//!
//! Provides an [`ObjectTransport`] for AWS S3 and S3-compatible services:
//! - AWS SDK configuration using credential chains (environment, IAM, profiles)
//! - Optional custom endpoint with path-style addressing (MinIO, Spaces, R2, ...)
//! - Cross-bucket server-side copies
//! - Presigned GET URLs
//! - Exponential backoff for retryable failures
//!
//! One client serves every bucket; the bucket is chosen per call.
//!
//! # Examples
//!
//! ```rust,no_run
//! use bucketwise_storage::{ObjectTransport, S3Transport, S3TransportConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let transport = S3Transport::with_config(S3TransportConfig {
//!         endpoint: Some("http://127.0.0.1:9000".to_string()),
//!         region: Some("us-east-1".to_string()),
//!         force_path_style: true,
//!         ..Default::default()
//!     })
//!     .await;
//!
//!     let url = transport
//!         .presign("real-private", "docs/report.pdf", Duration::from_secs(900))
//!         .await?;
//!     println!("{url}");
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! SDK errors are classified by service error kind and HTTP status:
//! missing objects become [`StorageError::NotFound`], HTTP 403 becomes
//! [`StorageError::PermissionDenied`], everything else is a retryable
//! [`StorageError::Backend`].

use crate::{validate_key, ObjectBody, ObjectParams, ObjectTransport, StorageError, StorageResult};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::copy_object::CopyObjectError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Configuration for the S3 transport
#[derive(Clone, Debug)]
pub struct S3TransportConfig {
    /// Optional custom S3 endpoint (for S3-compatible services like MinIO)
    pub endpoint: Option<String>,

    /// Region; falls back to the AWS default provider chain
    pub region: Option<String>,

    /// Use path-style addressing (`endpoint/bucket/key`)
    pub force_path_style: bool,

    /// Maximum number of attempts for retryable failures (default: 3)
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (default: 100ms)
    pub initial_retry_delay_ms: u64,
}

impl Default for S3TransportConfig {
    fn default() -> Self {
        S3TransportConfig {
            endpoint: None,
            region: None,
            force_path_style: false,
            max_retries: 3,
            initial_retry_delay_ms: 100,
        }
    }
}

/// Transfer counters for the S3 transport
#[derive(Debug, Default)]
struct S3Stats {
    total_bytes_uploaded: AtomicU64,
    total_bytes_downloaded: AtomicU64,
    total_objects_deleted: AtomicU64,
    total_objects_copied: AtomicU64,
}

/// Snapshot of [`S3Transport`] counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct S3StatsSnapshot {
    /// Bytes sent by `put_object`
    pub bytes_uploaded: u64,
    /// Bytes received by `get_object`
    pub bytes_downloaded: u64,
    /// Successful deletes
    pub objects_deleted: u64,
    /// Successful copies
    pub objects_copied: u64,
}

/// AWS S3 transport
///
/// `Send + Sync` and cheap to clone; clones share the SDK client and counters.
#[derive(Clone)]
pub struct S3Transport {
    client: Client,
    config: Arc<S3TransportConfig>,
    stats: Arc<S3Stats>,
}

type BoxedAttempt<T> = Pin<Box<dyn Future<Output = StorageResult<T>> + Send>>;

impl S3Transport {
    /// Create a transport with default configuration
    ///
    /// Uses automatic AWS credential and region detection from:
    /// - Environment variables
    /// - IAM role (EC2, ECS, Lambda)
    /// - AWS profile files
    pub async fn new() -> Self {
        Self::with_config(S3TransportConfig::default()).await
    }

    /// Create a transport with custom configuration
    pub async fn with_config(config: S3TransportConfig) -> Self {
        let region = RegionProviderChain::first_try(config.region.clone().map(Region::new))
            .or_default_provider();
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region)
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint {
            debug!("Using custom S3 endpoint: {}", endpoint);
            builder = builder.endpoint_url(endpoint.clone());
        }
        let client = Client::from_conf(builder.force_path_style(config.force_path_style).build());

        debug!(
            region = ?sdk_config.region(),
            endpoint = ?config.endpoint,
            "S3 transport ready"
        );

        Self::from_client(client, config)
    }

    /// Wrap an already configured SDK client
    pub fn from_client(client: Client, config: S3TransportConfig) -> Self {
        S3Transport {
            client,
            config: Arc::new(config),
            stats: Arc::new(S3Stats::default()),
        }
    }

    /// Current transfer counters
    pub fn stats(&self) -> S3StatsSnapshot {
        S3StatsSnapshot {
            bytes_uploaded: self.stats.total_bytes_uploaded.load(Ordering::Relaxed),
            bytes_downloaded: self.stats.total_bytes_downloaded.load(Ordering::Relaxed),
            objects_deleted: self.stats.total_objects_deleted.load(Ordering::Relaxed),
            objects_copied: self.stats.total_objects_copied.load(Ordering::Relaxed),
        }
    }

    /// Perform operation with exponential backoff retry logic
    ///
    /// Only [`StorageError::is_retryable`] failures are repeated.
    async fn with_retry<F, T>(&self, mut operation: F) -> StorageResult<T>
    where
        F: FnMut() -> BoxedAttempt<T>,
    {
        let mut attempt = 0;
        let mut delay_ms = self.config.initial_retry_delay_ms;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    attempt += 1;
                    if !e.is_retryable() || attempt >= self.config.max_retries {
                        return Err(e);
                    }

                    warn!(
                        "Operation failed (attempt {}/{}), retrying in {}ms: {}",
                        attempt, self.config.max_retries, delay_ms, e
                    );

                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    delay_ms = (delay_ms * 2).min(10_000);
                }
            }
        }
    }
}

/// Map an SDK failure onto the transport taxonomy
///
/// `missing` tells whether the service error means the object does not exist.
fn classify<E>(err: &SdkError<E, HttpResponse>, missing: bool, bucket: &str, key: &str) -> StorageError
where
    E: std::error::Error + 'static,
{
    if missing {
        return StorageError::not_found(bucket, key);
    }
    if err.raw_response().map(|r| r.status().as_u16()) == Some(403) {
        return StorageError::permission_denied(format!("{bucket}/{key}"));
    }
    match err {
        SdkError::TimeoutError(_) => StorageError::timeout(format!("{bucket}/{key}")),
        other => StorageError::backend(format!("{bucket}/{key}: {}", DisplayErrorContext(other))),
    }
}

/// The copy source header: `bucket/key` with the key URL-encoded
fn copy_source(bucket: &str, key: &str) -> String {
    format!("{}/{}", bucket, urlencoding::encode(key))
}

/// CopyObject has no modeled not-found error; S3 reports it by code.
fn is_missing_source(err: &CopyObjectError) -> bool {
    err.code() == Some("NoSuchKey")
}

impl fmt::Debug for S3Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Transport")
            .field("endpoint", &self.config.endpoint)
            .field("region", &self.config.region)
            .field("force_path_style", &self.config.force_path_style)
            .field("max_retries", &self.config.max_retries)
            .finish()
    }
}

#[async_trait]
impl ObjectTransport for S3Transport {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ObjectBody,
        content_type: &str,
        params: &ObjectParams,
    ) -> StorageResult<()> {
        validate_key(key)?;
        let start = Instant::now();
        // Streams are drained once so retries can resend the same bytes.
        let data = body.into_bytes().await?;
        let size = data.len() as u64;

        let client = self.client.clone();
        let bucket_owned = bucket.to_string();
        let key_owned = key.to_string();
        let content_type = content_type.to_string();
        let params = params.clone();

        self.with_retry(|| {
            let client = client.clone();
            let bucket = bucket_owned.clone();
            let key = key_owned.clone();
            let content_type = content_type.clone();
            let params = params.clone();
            let data = data.clone();

            Box::pin(async move {
                let metadata: Option<HashMap<String, String>> = if params.metadata.is_empty() {
                    None
                } else {
                    Some(params.metadata.into_iter().collect())
                };

                client
                    .put_object()
                    .bucket(&bucket)
                    .key(&key)
                    .body(ByteStream::from(data))
                    .content_type(content_type)
                    .set_acl(params.acl.as_deref().map(ObjectCannedAcl::from))
                    .set_cache_control(params.cache_control)
                    .set_content_disposition(params.content_disposition)
                    .set_metadata(metadata)
                    .send()
                    .await
                    .map_err(|e| classify(&e, false, &bucket, &key))?;
                Ok::<_, StorageError>(())
            })
        })
        .await
        .inspect_err(|e| {
            error!(
                error = %e,
                bucket = %bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 put failed"
            );
        })?;

        self.stats
            .total_bytes_uploaded
            .fetch_add(size, Ordering::Relaxed);
        debug!(
            bucket = %bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 put successful"
        );
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        validate_key(key)?;

        let client = self.client.clone();
        let bucket_owned = bucket.to_string();
        let key_owned = key.to_string();

        let data = self
            .with_retry(|| {
                let client = client.clone();
                let bucket = bucket_owned.clone();
                let key = key_owned.clone();

                Box::pin(async move {
                    let response = client
                        .get_object()
                        .bucket(&bucket)
                        .key(&key)
                        .send()
                        .await
                        .map_err(|e| {
                            let missing = e
                                .as_service_error()
                                .map(|s| s.is_no_such_key())
                                .unwrap_or(false);
                            classify(&e, missing, &bucket, &key)
                        })?;

                    let body = response
                        .body
                        .collect()
                        .await
                        .map_err(|e| StorageError::backend(format!("failed to read body: {e}")))?;
                    Ok::<_, StorageError>(body.into_bytes().to_vec())
                })
            })
            .await?;

        self.stats
            .total_bytes_downloaded
            .fetch_add(data.len() as u64, Ordering::Relaxed);
        Ok(data)
    }

    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        validate_key(key)?;

        let client = self.client.clone();
        let bucket_owned = bucket.to_string();
        let key_owned = key.to_string();

        self.with_retry(|| {
            let client = client.clone();
            let bucket = bucket_owned.clone();
            let key = key_owned.clone();

            Box::pin(async move {
                match client.head_object().bucket(&bucket).key(&key).send().await {
                    Ok(_) => Ok(true),
                    Err(e) => {
                        let missing = e
                            .as_service_error()
                            .map(|s| s.is_not_found())
                            .unwrap_or(false);
                        if missing {
                            debug!(bucket = %bucket, key = %key, "object does not exist");
                            Ok(false)
                        } else {
                            Err(classify(&e, false, &bucket, &key))
                        }
                    }
                }
            })
        })
        .await
    }

    async fn delete_object(
        &self,
        bucket: &str,
        key: &str,
        _params: &ObjectParams,
    ) -> StorageResult<()> {
        validate_key(key)?;

        let client = self.client.clone();
        let bucket_owned = bucket.to_string();
        let key_owned = key.to_string();

        self.with_retry(|| {
            let client = client.clone();
            let bucket = bucket_owned.clone();
            let key = key_owned.clone();

            Box::pin(async move {
                debug!(bucket = %bucket, key = %key, "deleting object from S3");
                client
                    .delete_object()
                    .bucket(&bucket)
                    .key(&key)
                    .send()
                    .await
                    .map_err(|e| classify(&e, false, &bucket, &key))?;
                Ok::<_, StorageError>(())
            })
        })
        .await?;

        self.stats
            .total_objects_deleted
            .fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn copy_object(
        &self,
        source_bucket: &str,
        source_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> StorageResult<()> {
        validate_key(source_key)?;
        validate_key(dest_key)?;
        let start = Instant::now();

        let copy_source = copy_source(source_bucket, source_key);
        let client = self.client.clone();
        let dest_bucket_owned = dest_bucket.to_string();
        let dest_key_owned = dest_key.to_string();
        let source_bucket_owned = source_bucket.to_string();
        let source_key_owned = source_key.to_string();

        self.with_retry(|| {
            let client = client.clone();
            let copy_source = copy_source.clone();
            let dest_bucket = dest_bucket_owned.clone();
            let dest_key = dest_key_owned.clone();
            let source_bucket = source_bucket_owned.clone();
            let source_key = source_key_owned.clone();

            Box::pin(async move {
                client
                    .copy_object()
                    .copy_source(copy_source)
                    .bucket(&dest_bucket)
                    .key(&dest_key)
                    .send()
                    .await
                    .map_err(|e| {
                        let missing = e.as_service_error().is_some_and(is_missing_source);
                        classify(&e, missing, &source_bucket, &source_key)
                    })?;
                Ok::<_, StorageError>(())
            })
        })
        .await?;

        self.stats
            .total_objects_copied
            .fetch_add(1, Ordering::Relaxed);
        debug!(
            source_bucket = %source_bucket,
            source_key = %source_key,
            dest_bucket = %dest_bucket,
            dest_key = %dest_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 copy successful"
        );
        Ok(())
    }

    async fn presign(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        validate_key(key)?;

        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::backend(format!("invalid presign expiry: {e}")))?;

        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| classify(&e, false, bucket, key))?;

        Ok(request.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = S3TransportConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_retry_delay_ms, 100);
        assert!(!config.force_path_style);
        assert!(config.endpoint.is_none());
    }

    #[test]
    fn test_stats_snapshot_default() {
        let snapshot = S3StatsSnapshot::default();
        assert_eq!(snapshot.objects_copied, 0);
        assert_eq!(snapshot.bytes_uploaded, 0);
    }

    #[test]
    fn test_copy_source_is_url_encoded() {
        assert_eq!(
            copy_source("real-uploads", "a b/é.png"),
            "real-uploads/a%20b%2F%C3%A9.png"
        );
        assert_eq!(copy_source("real-uploads", "abc.png"), "real-uploads/abc.png");
    }

    #[test]
    fn test_missing_copy_source_detected_by_code() {
        use aws_sdk_s3::error::ErrorMetadata;

        let missing = CopyObjectError::generic(ErrorMetadata::builder().code("NoSuchKey").build());
        assert!(is_missing_source(&missing));

        let denied = CopyObjectError::generic(ErrorMetadata::builder().code("AccessDenied").build());
        assert!(!is_missing_source(&denied));
    }
}
