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

//! Object transport layer for Bucketwise
//!
//! This crate provides the single-object operations the provider core is
//! built on. Every call is addressed by a physical bucket name plus an object
//! key, so one transport serves any number of buckets:
//! - AWS S3 and S3-compatible services (via [`s3::S3Transport`])
//! - An in-memory store for tests and local wiring (via [`mock::MockTransport`])
//!
//! # Core Concepts
//!
//! - **Bucket**: the physical bucket name as the object store knows it
//! - **Key**: the object identifier inside that bucket (non-empty, no leading `/`)
//! - **Body**: either a buffer or an async reader, see [`ObjectBody`]
//! - **Params**: extra upload parameters such as ACL and cache headers, see [`ObjectParams`]
//!
//! # Examples
//!
//! ```no_run
//! use bucketwise_storage::{mock::MockTransport, ObjectBody, ObjectParams, ObjectTransport};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let transport = MockTransport::new();
//!     let params = ObjectParams::default();
//!
//!     transport
//!         .put_object("real-uploads", "a/b/abc.png", ObjectBody::from(&b"png"[..]), "image/png", &params)
//!         .await?;
//!     transport
//!         .copy_object("real-uploads", "a/b/abc.png", "real-private", "x/abc.png")
//!         .await?;
//!     assert!(transport.exists("real-private", "x/abc.png").await?);
//!
//!     let url = transport
//!         .presign("real-private", "x/abc.png", Duration::from_secs(900))
//!         .await?;
//!     println!("{url}");
//!     Ok(())
//! }
//! ```
//!
//! # Implementation Guide
//!
//! When implementing `ObjectTransport`:
//!
//! 1. Use `#[async_trait]` on the impl block
//! 2. Report a missing object as [`StorageError::NotFound`], never as a generic error
//! 3. Make `delete_object` idempotent
//! 4. Reject empty keys and keys starting with `/` with [`StorageError::InvalidKey`]

pub mod error;
pub mod mock;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::pin::Pin;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};

pub use error::{StorageError, StorageResult};
pub use mock::MockTransport;
pub use s3::{S3Transport, S3TransportConfig};

/// Upper bound on the buffer preallocated from a declared stream length
const MAX_STREAM_PREALLOC: u64 = 8 * 1024 * 1024;

/// Boxed reader used for streamed uploads
pub type ContentStream = Pin<Box<dyn AsyncRead + Send + Unpin>>;

/// Content handed to [`ObjectTransport::put_object`]
pub enum ObjectBody {
    /// Fully buffered content
    Bytes(Bytes),
    /// Content read from a stream until EOF
    Stream {
        /// Source of the content
        reader: ContentStream,
        /// Declared length, if the caller knows it
        length: Option<u64>,
    },
}

impl ObjectBody {
    /// Wrap a reader as a streamed body
    pub fn stream(reader: ContentStream, length: Option<u64>) -> Self {
        ObjectBody::Stream { reader, length }
    }

    /// Declared or known length of the body
    pub fn len_hint(&self) -> Option<u64> {
        match self {
            ObjectBody::Bytes(bytes) => Some(bytes.len() as u64),
            ObjectBody::Stream { length, .. } => *length,
        }
    }

    /// Drain the body into memory
    pub async fn into_bytes(self) -> StorageResult<Bytes> {
        match self {
            ObjectBody::Bytes(bytes) => Ok(bytes),
            ObjectBody::Stream { mut reader, length } => {
                // Declared lengths are hints; the reader decides the real size.
                let capacity = length.map_or(8192, |l| l.min(MAX_STREAM_PREALLOC) as usize);
                let mut buffer = Vec::with_capacity(capacity);
                reader.read_to_end(&mut buffer).await?;
                Ok(Bytes::from(buffer))
            }
        }
    }
}

impl From<Bytes> for ObjectBody {
    fn from(bytes: Bytes) -> Self {
        ObjectBody::Bytes(bytes)
    }
}

impl From<Vec<u8>> for ObjectBody {
    fn from(data: Vec<u8>) -> Self {
        ObjectBody::Bytes(Bytes::from(data))
    }
}

impl From<&[u8]> for ObjectBody {
    fn from(data: &[u8]) -> Self {
        ObjectBody::Bytes(Bytes::copy_from_slice(data))
    }
}

impl fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectBody::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            ObjectBody::Stream { length, .. } => {
                f.debug_struct("Stream").field("length", length).finish()
            }
        }
    }
}

/// Extra parameters applied to uploads and deletes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectParams {
    /// Canned ACL, e.g. `public-read` or `private`
    pub acl: Option<String>,
    /// `Cache-Control` header stored with the object
    pub cache_control: Option<String>,
    /// `Content-Disposition` header stored with the object
    pub content_disposition: Option<String>,
    /// User metadata (`x-amz-meta-*`)
    pub metadata: BTreeMap<String, String>,
}

impl ObjectParams {
    /// Set the canned ACL
    pub fn with_acl(mut self, acl: impl Into<String>) -> Self {
        self.acl = Some(acl.into());
        self
    }

    /// Set the `Cache-Control` header
    pub fn with_cache_control(mut self, value: impl Into<String>) -> Self {
        self.cache_control = Some(value.into());
        self
    }

    /// Set the `Content-Disposition` header
    pub fn with_content_disposition(mut self, value: impl Into<String>) -> Self {
        self.content_disposition = Some(value.into());
        self
    }

    /// Add one user metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Overlay these params on `defaults`; fields set here win.
    pub fn merged_over(&self, defaults: &ObjectParams) -> ObjectParams {
        let mut metadata = defaults.metadata.clone();
        metadata.extend(self.metadata.iter().map(|(k, v)| (k.clone(), v.clone())));
        ObjectParams {
            acl: self.acl.clone().or_else(|| defaults.acl.clone()),
            cache_control: self
                .cache_control
                .clone()
                .or_else(|| defaults.cache_control.clone()),
            content_disposition: self
                .content_disposition
                .clone()
                .or_else(|| defaults.content_disposition.clone()),
            metadata,
        }
    }
}

/// Bucket-addressed object transport
///
/// The provider core never talks to an object store directly; it goes through
/// this trait. Implementations must be `Send + Sync + Debug` so a single
/// instance can be shared behind an `Arc` by concurrent operations.
///
/// # Errors
///
/// - `get_object` on a missing object returns [`StorageError::NotFound`]
/// - `delete_object` succeeds when the object is already gone
/// - no method retries on behalf of the caller unless the implementation
///   documents its own retry policy
#[async_trait]
pub trait ObjectTransport: Send + Sync + Debug {
    /// Store `body` under `(bucket, key)`, overwriting any previous object
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ObjectBody,
        content_type: &str,
        params: &ObjectParams,
    ) -> StorageResult<()>;

    /// Read the whole object at `(bucket, key)`
    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>>;

    /// Check whether an object exists
    ///
    /// The default implementation reads the object and treats
    /// [`StorageError::NotFound`] as absence.
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        match self.get_object(bucket, key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Delete the object at `(bucket, key)`; idempotent
    async fn delete_object(&self, bucket: &str, key: &str, params: &ObjectParams)
        -> StorageResult<()>;

    /// Server-side copy, possibly across buckets
    async fn copy_object(
        &self,
        source_bucket: &str,
        source_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> StorageResult<()>;

    /// Produce a time-boxed GET URL for `(bucket, key)`
    async fn presign(&self, bucket: &str, key: &str, expires_in: Duration)
        -> StorageResult<String>;
}

/// Validate a key for correctness
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::invalid_key("key cannot be empty"));
    }
    if key.starts_with('/') {
        return Err(StorageError::invalid_key(format!(
            "key cannot start with '/': {key}"
        )));
    }
    Ok(())
}
