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
//! Lifecycle operations: store, delete, sign, move and replace.
//!
//! The provider holds no per-file state and does no locking. Hosts must not
//! run two operations on the same record at once.

use crate::error::{DeleteFailure, ProviderError, ProviderResult};
use crate::file::{FileRecord, ProviderMetadata};
use crate::keys::{derive_key, file_name, folder_of, object_key};
use crate::policy::{self, UrlTarget};
use crate::resolver::{resolve_bucket, ResolvedBucket};
use crate::selector::parse_bucket_selector;
use bucketwise_config::{ProviderConfig, ProviderOptions};
use bucketwise_storage::{ObjectParams, ObjectTransport, S3Transport, S3TransportConfig};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Explicit overrides for [`BucketProvider::store_with`]
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    /// Logical bucket to store into instead of resolving from the path
    pub bucket: Option<String>,
    /// Folder to use instead of the one in the path
    pub folder: Option<String>,
    /// Upload parameters, layered over the configured defaults
    pub params: ObjectParams,
}

impl StoreOptions {
    /// Store into `logical` regardless of the path
    pub fn in_bucket(mut self, logical: impl Into<String>) -> Self {
        self.bucket = Some(logical.into());
        self
    }

    /// Store under `folder` regardless of the path
    pub fn in_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    /// Upload parameters for this call
    pub fn with_params(mut self, params: ObjectParams) -> Self {
        self.params = params;
        self
    }
}

/// Outcome of a successful move
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveReport {
    /// Records (primary and variants) whose metadata now points at the destination
    pub moved: usize,
    /// Sources that were copied but could not be deleted. The object now
    /// exists at both locations; nothing was lost.
    pub stale_sources: Vec<DeleteFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Primary,
    Format(String),
}

#[derive(Debug)]
struct MoveStep {
    slot: Slot,
    source: ResolvedBucket,
    source_key: String,
    dest_key: String,
}

impl MoveStep {
    fn in_place(&self, dest: &ResolvedBucket) -> bool {
        self.source.physical == dest.physical && self.source_key == self.dest_key
    }
}

/// Destination keys keep only the file name, so entries from different
/// folders can land on the same key. Two different sources must never share
/// a destination.
fn check_collisions(plan: &[MoveStep], dest: &ResolvedBucket) -> ProviderResult<()> {
    let mut claimed: BTreeMap<&str, (&str, &str)> = BTreeMap::new();
    for step in plan {
        let source = (step.source.physical.as_str(), step.source_key.as_str());
        match claimed.insert(step.dest_key.as_str(), source) {
            Some(previous) if previous != source => {
                warn!(
                    bucket = %dest.logical,
                    key = %step.dest_key,
                    "two move entries share a destination"
                );
                return Err(ProviderError::Conflict {
                    bucket: dest.logical.clone(),
                    key: step.dest_key.clone(),
                });
            }
            _ => {}
        }
    }
    Ok(())
}

/// Multi-bucket storage provider
///
/// Routes each file to a bucket, derives its key, uploads through the
/// transport and records where it went in the file's `provider_metadata`.
#[derive(Clone)]
pub struct BucketProvider {
    transport: Arc<dyn ObjectTransport>,
    config: Arc<ProviderConfig>,
}

impl fmt::Debug for BucketProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BucketProvider")
            .field("transport", &self.transport)
            .field("buckets", &self.config.buckets)
            .finish()
    }
}

impl BucketProvider {
    /// Create a provider over an already normalized configuration
    pub fn new(transport: Arc<dyn ObjectTransport>, config: ProviderConfig) -> Self {
        BucketProvider {
            transport,
            config: Arc::new(config),
        }
    }

    /// Normalize a raw host option bag and create a provider
    pub fn from_options(
        transport: Arc<dyn ObjectTransport>,
        options: ProviderOptions,
    ) -> ProviderResult<Self> {
        let config = options
            .normalize()
            .map_err(|e| ProviderError::configuration(e.to_string()))?;
        Ok(Self::new(transport, config))
    }

    /// Create a provider backed by S3, using the configuration's endpoint,
    /// region and addressing style
    pub async fn connect_s3(config: ProviderConfig) -> Self {
        let transport = S3Transport::with_config(S3TransportConfig {
            endpoint: config.endpoint.clone(),
            region: config.region.clone(),
            force_path_style: config.force_path_style,
            ..Default::default()
        })
        .await;
        Self::new(Arc::new(transport), config)
    }

    /// The configuration in use
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Whether files stored without a selector land in a private bucket.
    ///
    /// Hosts use this to decide whether URLs need [`Self::get_signed_url`].
    pub fn is_private(&self) -> ProviderResult<bool> {
        let bucket = resolve_bucket(None, &self.config)?;
        Ok(policy::is_private(&bucket.logical, &self.config))
    }

    /// Reject files larger than the configured size limit
    pub fn check_file_size(&self, file: &FileRecord) -> ProviderResult<()> {
        match (self.config.size_limit, file.effective_size()) {
            (Some(limit), Some(size)) if size > limit => Err(ProviderError::input(format!(
                "{} is {size} bytes, over the {limit} byte limit",
                file.file_name()
            ))),
            _ => Ok(()),
        }
    }

    /// Upload `file` and record its URL and location.
    pub async fn store(&self, file: &mut FileRecord, params: ObjectParams) -> ProviderResult<()> {
        self.store_with(file, StoreOptions::default().with_params(params))
            .await
    }

    /// Upload `file` with explicit bucket and folder overrides.
    ///
    /// The content is consumed. A failed upload is not cleaned up.
    #[instrument(skip(self, file, options), fields(file = %file.file_name()))]
    pub async fn store_with(&self, file: &mut FileRecord, options: StoreOptions) -> ProviderResult<()> {
        self.check_file_size(file)?;

        let bucket = match options.bucket.as_deref() {
            Some(logical) => ResolvedBucket::require(logical, &self.config)?,
            None => resolve_bucket(file.path.as_deref(), &self.config)?,
        };
        let key = derive_key(file, &self.config, options.folder.as_deref());
        let is_private = policy::is_private(&bucket.logical, &self.config);

        let body = file.content.take().ok_or_else(|| {
            ProviderError::input(format!(
                "{} has neither a stream nor a buffer",
                file.file_name()
            ))
        })?;

        let params = options.params.merged_over(&self.upload_defaults());
        self.transport
            .put_object(&bucket.physical, &key, body, &file.mime, &params)
            .await?;

        let url = policy::build_url(
            self.transport.as_ref(),
            &self.config,
            UrlTarget {
                logical: &bucket.logical,
                physical: &bucket.physical,
                key: &key,
                is_private,
            },
            None,
        )
        .await?;

        info!(
            bucket = %bucket.logical,
            key = %key,
            is_private,
            "stored file"
        );

        let extra = file
            .provider_metadata
            .take()
            .map(|meta| meta.extra)
            .unwrap_or_default();
        file.url = Some(url);
        file.provider_metadata = Some(ProviderMetadata {
            bucket: bucket.logical,
            key,
            is_private,
            extra,
        });
        Ok(())
    }

    /// Delete the file's object and every variant's object.
    ///
    /// All deletes are attempted even when some fail; failures are reported
    /// together. Records without stored metadata are skipped.
    #[instrument(skip(self, file, params), fields(file = %file.file_name()))]
    pub async fn delete(&self, file: &FileRecord, params: &ObjectParams) -> ProviderResult<()> {
        let mut failures = Vec::new();
        // (physical, key) -> logical; one delete per distinct object
        let mut targets: BTreeMap<(String, String), String> = BTreeMap::new();

        for meta in stored_metadata(file) {
            let Some((logical, key)) = meta.location() else {
                debug!("skipping record without a stored location");
                continue;
            };
            match self.config.physical_bucket(logical) {
                Some(physical) => {
                    targets
                        .entry((physical.to_string(), key.to_string()))
                        .or_insert_with(|| logical.to_string());
                }
                None => failures.push(DeleteFailure {
                    bucket: logical.to_string(),
                    key: key.to_string(),
                    reason: format!("bucket '{logical}' is not configured"),
                }),
            }
        }

        let deletes = targets.iter().map(|((physical, key), logical)| async move {
            let result = self.transport.delete_object(physical, key, params).await;
            (logical, key, result)
        });

        for (logical, key, result) in join_all(deletes).await {
            if let Err(e) = result {
                warn!(bucket = %logical, key = %key, error = %e, "delete failed");
                failures.push(DeleteFailure {
                    bucket: logical.clone(),
                    key: key.clone(),
                    reason: e.to_string(),
                });
            }
        }

        if failures.is_empty() {
            debug!(objects = targets.len(), "deleted file");
            Ok(())
        } else {
            Err(ProviderError::AggregateDelete { failures })
        }
    }

    /// URL for reading the file.
    ///
    /// Public files (or files with no privacy flag) get their stored URL back
    /// without touching the transport. Private files get a fresh signed URL.
    pub async fn get_signed_url(
        &self,
        file: &FileRecord,
        expires_in: Option<Duration>,
    ) -> ProviderResult<String> {
        let meta = match file.provider_metadata.as_ref() {
            Some(meta) if meta.is_private => meta,
            _ => {
                return file
                    .url
                    .clone()
                    .ok_or_else(|| ProviderError::state("file has no stored URL"))
            }
        };

        let (logical, key) = meta
            .location()
            .ok_or_else(|| ProviderError::state("private file is missing its bucket or key"))?;
        let bucket = ResolvedBucket::require(logical, &self.config)?;

        policy::build_url(
            self.transport.as_ref(),
            &self.config,
            UrlTarget {
                logical: &bucket.logical,
                physical: &bucket.physical,
                key,
                is_private: true,
            },
            expires_in,
        )
        .await
    }

    /// Move the file and all its variants to `destination`
    /// (`bucket:<logical>:<folder>`).
    ///
    /// Entries from different sources that would share a destination key are
    /// rejected with [`ProviderError::Conflict`] before any transport call,
    /// even with `overwrite`.
    ///
    /// Phases run strictly in order: existence guard (unless `overwrite`),
    /// copy everything, delete every source, then rewrite metadata. A failed
    /// copy aborts with already-copied objects left at the destination. A
    /// failed source delete is reported in [`MoveReport::stale_sources`].
    #[instrument(skip(self, file), fields(file = %file.file_name()))]
    pub async fn move_file(
        &self,
        file: &mut FileRecord,
        destination: &str,
        overwrite: bool,
    ) -> ProviderResult<MoveReport> {
        let selector = parse_bucket_selector(Some(destination)).ok_or_else(|| {
            ProviderError::input(format!(
                "destination '{destination}' is not of the form bucket:<name>:<folder>"
            ))
        })?;
        let dest = ResolvedBucket::require(selector.logical_bucket, &self.config)?;
        let dest_private = policy::is_private(&dest.logical, &self.config);

        let plan = self.plan_move(file, selector.remainder)?;
        if plan.is_empty() {
            debug!("nothing to move");
            return Ok(MoveReport::default());
        }
        check_collisions(&plan, &dest)?;
        let pending: Vec<&MoveStep> = plan.iter().filter(|step| !step.in_place(&dest)).collect();

        if !overwrite {
            for step in &pending {
                if self.transport.exists(&dest.physical, &step.dest_key).await? {
                    return Err(ProviderError::Conflict {
                        bucket: dest.logical.clone(),
                        key: step.dest_key.clone(),
                    });
                }
            }
        }

        let mut copied = Vec::with_capacity(pending.len());
        for step in &pending {
            let result = self
                .transport
                .copy_object(
                    &step.source.physical,
                    &step.source_key,
                    &dest.physical,
                    &step.dest_key,
                )
                .await;
            if let Err(source) = result {
                warn!(
                    bucket = %step.source.logical,
                    key = %step.source_key,
                    orphans = copied.len(),
                    "copy failed, aborting move"
                );
                return Err(ProviderError::CopyFailed {
                    bucket: step.source.logical.clone(),
                    key: step.source_key.clone(),
                    copied,
                    source,
                });
            }
            copied.push(step.dest_key.clone());
        }

        let no_params = ObjectParams::default();
        let deletes = pending.iter().map(|step| {
            let params = &no_params;
            async move {
                let result = self
                    .transport
                    .delete_object(&step.source.physical, &step.source_key, params)
                    .await;
                (step, result)
            }
        });
        let mut stale_sources = Vec::new();
        for (step, result) in join_all(deletes).await {
            if let Err(e) = result {
                warn!(
                    bucket = %step.source.logical,
                    key = %step.source_key,
                    error = %e,
                    "source delete failed, object left at both locations"
                );
                stale_sources.push(DeleteFailure {
                    bucket: step.source.logical.clone(),
                    key: step.source_key.clone(),
                    reason: e.to_string(),
                });
            }
        }

        let mut primary_key = None;
        for step in &plan {
            let meta = match &step.slot {
                Slot::Primary => {
                    primary_key = Some(step.dest_key.as_str());
                    file.provider_metadata.as_mut()
                }
                Slot::Format(label) => file
                    .formats
                    .get_mut(label)
                    .and_then(|format| format.provider_metadata.as_mut()),
            };
            if let Some(meta) = meta {
                meta.relocate(&dest.logical, &step.dest_key, dest_private);
            }
        }

        if let Some(key) = primary_key {
            let url = policy::build_url(
                self.transport.as_ref(),
                &self.config,
                UrlTarget {
                    logical: &dest.logical,
                    physical: &dest.physical,
                    key,
                    is_private: dest_private,
                },
                None,
            )
            .await?;
            file.url = Some(url);
        }

        info!(
            bucket = %dest.logical,
            moved = plan.len(),
            stale = stale_sources.len(),
            "moved file"
        );
        Ok(MoveReport {
            moved: plan.len(),
            stale_sources,
        })
    }

    /// Replace the file's content in place.
    ///
    /// Deletes the old object and variants, then stores the new content into
    /// the same bucket and folder. Fails with a state error, before touching
    /// anything, when the file was never stored.
    #[instrument(skip(self, file, params), fields(file = %file.file_name()))]
    pub async fn replace(&self, file: &mut FileRecord, params: ObjectParams) -> ProviderResult<()> {
        let (logical, key) = file
            .provider_metadata
            .as_ref()
            .and_then(ProviderMetadata::location)
            .map(|(bucket, key)| (bucket.to_string(), key.to_string()))
            .ok_or_else(|| ProviderError::state("cannot replace a file that has no stored location"))?;
        if file.content.is_none() {
            return Err(ProviderError::input(format!(
                "{} has neither a stream nor a buffer",
                file.file_name()
            )));
        }
        self.check_file_size(file)?;

        let folder = folder_of(&key, &self.config).map(str::to_string);
        let bucket = self.config.is_configured(&logical).then_some(logical);

        self.delete(file, &params).await?;
        file.formats.clear();

        let mut options = StoreOptions::default().with_params(params);
        options.bucket = bucket;
        options.folder = folder;
        self.store_with(file, options).await
    }

    fn plan_move(&self, file: &FileRecord, folder: &str) -> ProviderResult<Vec<MoveStep>> {
        let primary = file
            .provider_metadata
            .as_ref()
            .map(|meta| (Slot::Primary, meta));
        let formats = file.formats.iter().filter_map(|(label, format)| {
            format
                .provider_metadata
                .as_ref()
                .map(|meta| (Slot::Format(label.clone()), meta))
        });

        let mut plan = Vec::new();
        for (slot, meta) in primary.into_iter().chain(formats) {
            let Some((logical, key)) = meta.location() else {
                continue;
            };
            let source = ResolvedBucket::require(logical, &self.config)?;
            let dest_key = object_key(Some(folder), file_name(key), &self.config);
            plan.push(MoveStep {
                slot,
                source,
                source_key: key.to_string(),
                dest_key,
            });
        }
        Ok(plan)
    }

    fn upload_defaults(&self) -> ObjectParams {
        let defaults = &self.config.upload_defaults;
        ObjectParams {
            acl: defaults.acl.clone(),
            cache_control: defaults.cache_control.clone(),
            ..Default::default()
        }
    }
}

fn stored_metadata(file: &FileRecord) -> impl Iterator<Item = &ProviderMetadata> {
    file.provider_metadata.iter().chain(
        file.formats
            .values()
            .filter_map(|format| format.provider_metadata.as_ref()),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bucketwise_storage::mock::TransportOp;
    use bucketwise_storage::MockTransport;

    fn config() -> ProviderConfig {
        ProviderConfig::default()
            .with_bucket("uploads", "real-uploads")
            .with_bucket("private", "real-private")
            .with_public_domain("uploads", "https://cdn.x")
            .with_default_bucket("uploads")
    }

    fn provider(transport: &MockTransport, config: ProviderConfig) -> BucketProvider {
        BucketProvider::new(Arc::new(transport.clone()), config)
    }

    #[tokio::test]
    async fn test_store_requires_content() {
        let transport = MockTransport::new();
        let provider = provider(&transport, config());
        let mut file = FileRecord::new("abc", ".png", "image/png");

        let err = provider.store(&mut file, ObjectParams::default()).await.unwrap_err();
        assert!(err.is_input());
        assert!(transport.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_store_applies_upload_defaults() {
        let transport = MockTransport::new();
        let mut config = config();
        config.upload_defaults.cache_control = Some("max-age=60".into());
        let provider = provider(&transport, config);
        let mut file = FileRecord::new("abc", ".png", "image/png").with_buffer(&b"png"[..]);

        provider
            .store(&mut file, ObjectParams::default().with_acl("public-read"))
            .await
            .unwrap();

        let stored = transport.object("real-uploads", "abc.png").await.unwrap();
        assert_eq!(stored.content_type, "image/png");
        assert_eq!(stored.params.acl.as_deref(), Some("public-read"));
        assert_eq!(stored.params.cache_control.as_deref(), Some("max-age=60"));
    }

    #[tokio::test]
    async fn test_store_keeps_host_metadata_fields() {
        let transport = MockTransport::new();
        let provider = provider(&transport, config());
        let mut meta = ProviderMetadata::default();
        meta.extra.insert("etag".into(), "old".into());
        let mut file = FileRecord::new("abc", ".png", "image/png").with_buffer(&b"png"[..]);
        file.provider_metadata = Some(meta);

        provider.store(&mut file, ObjectParams::default()).await.unwrap();

        let meta = file.provider_metadata.unwrap();
        assert_eq!(meta.location(), Some(("uploads", "abc.png")));
        assert!(meta.extra.contains_key("etag"));
    }

    #[tokio::test]
    async fn test_size_limit() {
        let transport = MockTransport::new();
        let provider = provider(&transport, config().with_size_limit(4));
        let mut file = FileRecord::new("abc", ".txt", "text/plain").with_buffer(&b"too long"[..]);

        let err = provider.store(&mut file, ObjectParams::default()).await.unwrap_err();
        assert!(err.is_input());
        assert!(transport.is_empty().await);
    }

    #[tokio::test]
    async fn test_is_private_follows_default_bucket() {
        let transport = MockTransport::new();
        assert!(!provider(&transport, config()).is_private().unwrap());
        assert!(provider(&transport, config().with_default_bucket("private"))
            .is_private()
            .unwrap());
        assert!(provider(&transport, ProviderConfig::default())
            .is_private()
            .unwrap_err()
            .is_configuration());
    }

    #[tokio::test]
    async fn test_move_rejects_bad_destination() {
        let transport = MockTransport::new();
        let provider = provider(&transport, config());
        let mut file = FileRecord::new("abc", ".png", "image/png");
        file.provider_metadata = Some(ProviderMetadata::new("uploads", "abc.png", false));

        let err = provider.move_file(&mut file, "private/docs", false).await.unwrap_err();
        assert!(err.is_input());

        let err = provider
            .move_file(&mut file, "bucket:archive:docs", false)
            .await
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(transport.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_move_without_metadata_is_noop() {
        let transport = MockTransport::new();
        let provider = provider(&transport, config());
        let mut file = FileRecord::new("abc", ".png", "image/png");

        let report = provider
            .move_file(&mut file, "bucket:private:docs", false)
            .await
            .unwrap();
        assert_eq!(report, MoveReport::default());
        assert!(transport.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_move_in_place_touches_nothing() {
        let transport = MockTransport::new();
        transport.insert_object("real-uploads", "docs/abc.png", b"png").await;
        let provider = provider(&transport, config());
        let mut file = FileRecord::new("abc", ".png", "image/png");
        file.provider_metadata = Some(ProviderMetadata::new("uploads", "docs/abc.png", false));

        let report = provider
            .move_file(&mut file, "bucket:uploads:docs", true)
            .await
            .unwrap();
        assert_eq!(report.moved, 1);
        assert!(transport.contains("real-uploads", "docs/abc.png").await);
        assert!(transport.calls_of(TransportOp::Copy).await.is_empty());
        assert!(transport.calls_of(TransportOp::Delete).await.is_empty());
    }

    #[tokio::test]
    async fn test_move_from_unconfigured_source_fails_first() {
        let transport = MockTransport::new();
        let provider = provider(&transport, config());
        let mut file = FileRecord::new("abc", ".png", "image/png");
        file.provider_metadata = Some(ProviderMetadata::new("retired", "abc.png", true));

        let err = provider
            .move_file(&mut file, "bucket:private:docs", false)
            .await
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(transport.calls().await.is_empty());
        assert_eq!(file.provider_metadata.unwrap().bucket, "retired");
    }

    #[tokio::test]
    async fn test_replace_without_metadata_is_state_error() {
        let transport = MockTransport::new();
        let provider = provider(&transport, config());
        let mut file = FileRecord::new("abc", ".png", "image/png").with_buffer(&b"png"[..]);

        let err = provider.replace(&mut file, ObjectParams::default()).await.unwrap_err();
        assert!(err.is_state());
        assert!(transport.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_signed_url_for_private_without_key() {
        let transport = MockTransport::new();
        let provider = provider(&transport, config());
        let mut file = FileRecord::new("abc", ".png", "image/png");
        file.provider_metadata = Some(ProviderMetadata {
            bucket: "private".into(),
            is_private: true,
            ..Default::default()
        });

        let err = provider.get_signed_url(&file, None).await.unwrap_err();
        assert!(err.is_state());
    }

    #[test]
    fn test_from_options_maps_config_errors() {
        let transport: Arc<dyn ObjectTransport> = Arc::new(MockTransport::new());
        let options = ProviderOptions {
            bucket: Some("Bad_Bucket".into()),
            ..Default::default()
        };
        let err = BucketProvider::from_options(transport, options).unwrap_err();
        assert!(err.is_configuration());
    }
}
