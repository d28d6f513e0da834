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
//! Normalization of raw host option bags.
//!
//! Hosts hand over provider options in one of two historical shapes:
//!
//! - **legacy flat**: `bucket`, `region`, `endpoint` and `params` at the top level
//! - **nested**: everything S3-specific under `s3Options`
//!
//! Both may also carry the multi-bucket fields (`buckets`, `publicDomains`,
//! `defaultBucket`, `pool`, `baseUrl`, `rootPath`). [`ProviderOptions::normalize`]
//! folds either shape into one validated [`ProviderConfig`].

use crate::error::ConfigResult;
use crate::schema::{ProviderConfig, UploadDefaults, DEFAULT_SIGNED_URL_EXPIRES};
use crate::validation::Validator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Logical name given to a lone legacy bucket
pub const LEGACY_BUCKET_NAME: &str = "default";

/// Raw provider options as supplied by the host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderOptions {
    /// Legacy single physical bucket
    pub bucket: Option<String>,
    /// Legacy region
    pub region: Option<String>,
    /// Legacy endpoint
    pub endpoint: Option<String>,
    /// Legacy request params
    pub params: Option<S3Params>,

    /// Nested S3 options
    pub s3_options: Option<S3Options>,

    /// Logical -> physical bucket names
    pub buckets: BTreeMap<String, String>,
    /// Logical -> public base URL
    pub public_domains: BTreeMap<String, String>,
    /// Default logical bucket
    pub default_bucket: Option<String>,
    /// Flat key namespace
    pub pool: Option<bool>,
    /// Public base URL override
    pub base_url: Option<String>,
    /// Key prefix
    pub root_path: Option<String>,
    /// Upload size limit in bytes
    pub size_limit: Option<u64>,
}

/// Nested S3 client options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct S3Options {
    /// Region
    pub region: Option<String>,
    /// Endpoint for S3-compatible services
    pub endpoint: Option<String>,
    /// Path-style addressing
    pub force_path_style: Option<bool>,
    /// Request params
    pub params: Option<S3Params>,
}

/// Request params in the S3 API's own casing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Params {
    /// Physical bucket
    #[serde(rename = "Bucket")]
    pub bucket: Option<String>,
    /// Canned ACL
    #[serde(rename = "ACL")]
    pub acl: Option<String>,
    /// Cache-Control header
    #[serde(rename = "CacheControl")]
    pub cache_control: Option<String>,
    /// Signed URL lifetime in seconds
    #[serde(rename = "signedUrlExpires")]
    pub signed_url_expires: Option<u64>,
}

impl S3Params {
    /// Overlay `self` on `base`; values set in `self` win
    fn overlay(self, base: S3Params) -> S3Params {
        S3Params {
            bucket: self.bucket.or(base.bucket),
            acl: self.acl.or(base.acl),
            cache_control: self.cache_control.or(base.cache_control),
            signed_url_expires: self.signed_url_expires.or(base.signed_url_expires),
        }
    }
}

impl ProviderOptions {
    /// Parse an option bag from JSON
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Fold legacy and nested shapes into one validated [`ProviderConfig`].
    ///
    /// Nested values win over legacy ones. A legacy bucket is registered as
    /// logical bucket [`LEGACY_BUCKET_NAME`] unless that name is already taken,
    /// and becomes the default bucket when none is set.
    pub fn normalize(self) -> ConfigResult<ProviderConfig> {
        let nested = self.s3_options.unwrap_or_default();
        let params = nested
            .params
            .unwrap_or_default()
            .overlay(self.params.unwrap_or_default());

        let mut buckets = self.buckets;
        let mut default_bucket = self.default_bucket;
        if let Some(physical) = params.bucket.clone().or(self.bucket) {
            if !buckets.contains_key(LEGACY_BUCKET_NAME) {
                debug!(physical = %physical, "registering legacy bucket as '{}'", LEGACY_BUCKET_NAME);
                buckets.insert(LEGACY_BUCKET_NAME.to_string(), physical);
            }
            if default_bucket.is_none() {
                default_bucket = Some(LEGACY_BUCKET_NAME.to_string());
            }
        }

        let key_prefix = self
            .root_path
            .map(|p| p.trim_matches('/').to_string())
            .filter(|p| !p.is_empty());

        let config = ProviderConfig {
            buckets,
            public_domains: self.public_domains,
            default_bucket,
            pool: self.pool.unwrap_or(false),
            signed_url_expires: params
                .signed_url_expires
                .unwrap_or(DEFAULT_SIGNED_URL_EXPIRES),
            key_prefix,
            base_url: self.base_url,
            endpoint: nested.endpoint.or(self.endpoint),
            region: nested.region.or(self.region),
            force_path_style: nested.force_path_style.unwrap_or(false),
            size_limit: self.size_limit,
            upload_defaults: UploadDefaults {
                acl: params.acl,
                cache_control: params.cache_control,
            },
        };

        config.validate()?;
        Ok(config)
    }
}
