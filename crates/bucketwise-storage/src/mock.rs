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

//! In-memory transport for tests and local wiring
//!
//! Objects live in an `Arc<RwLock<..>>` keyed by `(bucket, key)`, so clones
//! share state. Every call is appended to a call log, and individual
//! `(operation, bucket, key)` triples can be told to fail.
//!
//! # Examples
//!
//! ```rust,no_run
//! use bucketwise_storage::mock::{MockTransport, TransportOp};
//! use bucketwise_storage::{ObjectParams, ObjectTransport};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let transport = MockTransport::new();
//!     transport.insert_object("photos", "cat.png", b"png").await;
//!
//!     transport.fail_on(TransportOp::Delete, "photos", "cat.png").await;
//!     assert!(transport
//!         .delete_object("photos", "cat.png", &ObjectParams::default())
//!         .await
//!         .is_err());
//!
//!     assert_eq!(transport.calls_of(TransportOp::Delete).await.len(), 1);
//!     Ok(())
//! }
//! ```

use crate::{validate_key, ObjectBody, ObjectParams, ObjectTransport, StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Operation kinds recorded by [`MockTransport`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportOp {
    /// `put_object`
    Put,
    /// `get_object` (also used by the default existence probe)
    Get,
    /// `delete_object`
    Delete,
    /// `copy_object`; failures are keyed by the copy source
    Copy,
    /// `presign`
    Presign,
}

/// One recorded transport call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportCall {
    /// Operation kind
    pub op: TransportOp,
    /// Addressed bucket (copy source for copies)
    pub bucket: String,
    /// Addressed key (copy source for copies)
    pub key: String,
    /// Copy destination, if any
    pub destination: Option<(String, String)>,
}

/// An object held by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Object content
    pub data: Vec<u8>,
    /// Content type given at upload
    pub content_type: String,
    /// Params given at upload
    pub params: ObjectParams,
}

#[derive(Default)]
struct MockState {
    objects: HashMap<(String, String), StoredObject>,
    calls: Vec<TransportCall>,
    failures: HashSet<(TransportOp, String, String)>,
}

impl MockState {
    fn record(&mut self, op: TransportOp, bucket: &str, key: &str) -> StorageResult<()> {
        self.calls.push(TransportCall {
            op,
            bucket: bucket.to_string(),
            key: key.to_string(),
            destination: None,
        });
        self.check_failure(op, bucket, key)
    }

    fn check_failure(&self, op: TransportOp, bucket: &str, key: &str) -> StorageResult<()> {
        if self
            .failures
            .contains(&(op, bucket.to_string(), key.to_string()))
        {
            return Err(StorageError::backend(format!(
                "injected {op:?} failure for {bucket}/{key}"
            )));
        }
        Ok(())
    }
}

/// In-memory, bucket-aware transport
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<RwLock<MockState>>,
}

impl MockTransport {
    /// Create a new empty transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without recording a call
    pub async fn insert_object(&self, bucket: &str, key: &str, data: &[u8]) {
        self.state.write().await.objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                data: data.to_vec(),
                content_type: "application/octet-stream".to_string(),
                params: ObjectParams::default(),
            },
        );
    }

    /// Look at an object without recording a call
    pub async fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.state
            .read()
            .await
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Whether an object is present, without recording a call
    pub async fn contains(&self, bucket: &str, key: &str) -> bool {
        self.object(bucket, key).await.is_some()
    }

    /// Number of objects across all buckets
    pub async fn len(&self) -> usize {
        self.state.read().await.objects.len()
    }

    /// Whether no object is stored at all
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.objects.is_empty()
    }

    /// Sorted keys stored in `bucket`
    pub async fn keys(&self, bucket: &str) -> Vec<String> {
        let state = self.state.read().await;
        let mut keys: Vec<String> = state
            .objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Make every future `op` on `(bucket, key)` fail with a backend error
    pub async fn fail_on(&self, op: TransportOp, bucket: &str, key: &str) {
        self.state
            .write()
            .await
            .failures
            .insert((op, bucket.to_string(), key.to_string()));
    }

    /// Remove all injected failures
    pub async fn clear_failures(&self) {
        self.state.write().await.failures.clear();
    }

    /// All recorded calls, in order
    pub async fn calls(&self) -> Vec<TransportCall> {
        self.state.read().await.calls.clone()
    }

    /// Recorded calls of one kind, in order
    pub async fn calls_of(&self, op: TransportOp) -> Vec<TransportCall> {
        self.state
            .read()
            .await
            .calls
            .iter()
            .filter(|c| c.op == op)
            .cloned()
            .collect()
    }

    /// Forget recorded calls
    pub async fn clear_calls(&self) {
        self.state.write().await.calls.clear();
    }
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport").finish()
    }
}

#[async_trait]
impl ObjectTransport for MockTransport {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ObjectBody,
        content_type: &str,
        params: &ObjectParams,
    ) -> StorageResult<()> {
        validate_key(key)?;
        let data = body.into_bytes().await?;

        let mut state = self.state.write().await;
        state.record(TransportOp::Put, bucket, key)?;
        debug!(bucket = %bucket, key = %key, size_bytes = data.len(), "mock put");
        state.objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                data: data.to_vec(),
                content_type: content_type.to_string(),
                params: params.clone(),
            },
        );
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        validate_key(key)?;

        let mut state = self.state.write().await;
        state.record(TransportOp::Get, bucket, key)?;
        state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.data.clone())
            .ok_or_else(|| StorageError::not_found(bucket, key))
    }

    async fn delete_object(
        &self,
        bucket: &str,
        key: &str,
        _params: &ObjectParams,
    ) -> StorageResult<()> {
        validate_key(key)?;

        let mut state = self.state.write().await;
        state.record(TransportOp::Delete, bucket, key)?;
        state.objects.remove(&(bucket.to_string(), key.to_string()));
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

        let mut state = self.state.write().await;
        state.calls.push(TransportCall {
            op: TransportOp::Copy,
            bucket: source_bucket.to_string(),
            key: source_key.to_string(),
            destination: Some((dest_bucket.to_string(), dest_key.to_string())),
        });
        state.check_failure(TransportOp::Copy, source_bucket, source_key)?;

        let object = state
            .objects
            .get(&(source_bucket.to_string(), source_key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::not_found(source_bucket, source_key))?;
        state
            .objects
            .insert((dest_bucket.to_string(), dest_key.to_string()), object);
        Ok(())
    }

    async fn presign(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        validate_key(key)?;

        let mut state = self.state.write().await;
        state.record(TransportOp::Presign, bucket, key)?;
        Ok(format!(
            "https://presigned.invalid/{}/{}?X-Amz-Expires={}",
            bucket,
            key,
            expires_in.as_secs()
        ))
    }
}
