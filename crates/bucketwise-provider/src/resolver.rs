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
//! Bucket resolution.
//!
//! Resolution order, first match wins:
//!
//! 1. a selector in the path naming a configured bucket
//! 2. the configured default bucket, if it is itself configured
//! 3. the lexicographically first configured logical bucket
//!
//! Selectors naming unknown buckets fall through silently. Only an empty
//! bucket map is an error.

use crate::error::{ProviderError, ProviderResult};
use crate::selector::parse_bucket_selector;
use bucketwise_config::ProviderConfig;
use tracing::debug;

/// A logical bucket and the physical bucket it maps to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBucket {
    /// Name used in paths, metadata and public domain lookups
    pub logical: String,
    /// Name of the bucket at the object store
    pub physical: String,
}

impl ResolvedBucket {
    /// Look up a logical bucket by name; `None` when unconfigured
    pub fn named(logical: &str, config: &ProviderConfig) -> Option<Self> {
        config.physical_bucket(logical).map(|physical| ResolvedBucket {
            logical: logical.to_string(),
            physical: physical.to_string(),
        })
    }

    /// Look up a logical bucket that must be configured
    pub fn require(logical: &str, config: &ProviderConfig) -> ProviderResult<Self> {
        Self::named(logical, config).ok_or_else(|| {
            ProviderError::configuration(format!("bucket '{logical}' is not configured"))
        })
    }
}

/// Resolve the bucket a file with logical `path` belongs to
pub fn resolve_bucket(path: Option<&str>, config: &ProviderConfig) -> ProviderResult<ResolvedBucket> {
    if let Some(selector) = parse_bucket_selector(path) {
        if let Some(resolved) = ResolvedBucket::named(selector.logical_bucket, config) {
            return Ok(resolved);
        }
        debug!(
            logical_bucket = selector.logical_bucket,
            "selector names an unconfigured bucket, falling back"
        );
    }

    if let Some(default) = config.default_bucket.as_deref() {
        if let Some(resolved) = ResolvedBucket::named(default, config) {
            return Ok(resolved);
        }
    }

    config
        .buckets
        .iter()
        .next()
        .map(|(logical, physical)| ResolvedBucket {
            logical: logical.clone(),
            physical: physical.clone(),
        })
        .ok_or_else(|| ProviderError::configuration("no bucket configured"))
}
