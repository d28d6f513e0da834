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
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Default lifetime of signed URLs, in seconds
pub const DEFAULT_SIGNED_URL_EXPIRES: u64 = 15 * 60;

/// Top-level configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Bucket routing and URL policy
    pub provider: ProviderConfig,

    /// Logging settings
    pub observability: ObservabilityConfig,
}

/// Normalized provider configuration
///
/// This is the only configuration shape the provider core reads. Raw host
/// option bags go through [`crate::ProviderOptions::normalize`] first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    /// Logical bucket name -> physical bucket name
    pub buckets: BTreeMap<String, String>,

    /// Logical bucket name -> public base URL; presence makes a bucket public
    pub public_domains: BTreeMap<String, String>,

    /// Logical bucket used when a path carries no usable selector
    pub default_bucket: Option<String>,

    /// Flat namespace: keys are the file name only
    pub pool: bool,

    /// Signed URL lifetime in seconds
    #[serde(default = "default_signed_url_expires")]
    pub signed_url_expires: u64,

    /// Prefix prepended to every derived key
    pub key_prefix: Option<String>,

    /// Base URL overriding every public URL
    pub base_url: Option<String>,

    /// Object store endpoint, used for public URLs without a domain
    pub endpoint: Option<String>,

    /// Object store region
    pub region: Option<String>,

    /// Path-style addressing for S3-compatible endpoints
    pub force_path_style: bool,

    /// Maximum accepted upload size in bytes
    pub size_limit: Option<u64>,

    /// Parameters applied to every upload unless the call overrides them
    pub upload_defaults: UploadDefaults,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            buckets: BTreeMap::new(),
            public_domains: BTreeMap::new(),
            default_bucket: None,
            pool: false,
            signed_url_expires: default_signed_url_expires(),
            key_prefix: None,
            base_url: None,
            endpoint: None,
            region: None,
            force_path_style: false,
            size_limit: None,
            upload_defaults: UploadDefaults::default(),
        }
    }
}

impl ProviderConfig {
    /// Register a logical bucket
    pub fn with_bucket(mut self, logical: impl Into<String>, physical: impl Into<String>) -> Self {
        self.buckets.insert(logical.into(), physical.into());
        self
    }

    /// Make a logical bucket public under `domain`
    pub fn with_public_domain(mut self, logical: impl Into<String>, domain: impl Into<String>) -> Self {
        self.public_domains.insert(logical.into(), domain.into());
        self
    }

    /// Set the default logical bucket
    pub fn with_default_bucket(mut self, logical: impl Into<String>) -> Self {
        self.default_bucket = Some(logical.into());
        self
    }

    /// Enable or disable the flat key namespace
    pub fn with_pool(mut self, pool: bool) -> Self {
        self.pool = pool;
        self
    }

    /// Set the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Set the public base URL override
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the object store endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the signed URL lifetime in seconds
    pub fn with_signed_url_expires(mut self, seconds: u64) -> Self {
        self.signed_url_expires = seconds;
        self
    }

    /// Set the upload size limit in bytes
    pub fn with_size_limit(mut self, bytes: u64) -> Self {
        self.size_limit = Some(bytes);
        self
    }

    /// Physical bucket for a logical name
    pub fn physical_bucket(&self, logical: &str) -> Option<&str> {
        self.buckets.get(logical).map(String::as_str)
    }

    /// Whether a logical bucket is configured
    pub fn is_configured(&self, logical: &str) -> bool {
        self.buckets.contains_key(logical)
    }

    /// Public base URL for a logical bucket
    pub fn public_domain(&self, logical: &str) -> Option<&str> {
        self.public_domains.get(logical).map(String::as_str)
    }

    /// Key prefix with surrounding slashes removed; `None` when blank
    pub fn normalized_key_prefix(&self) -> Option<&str> {
        self.key_prefix
            .as_deref()
            .map(|p| p.trim_matches('/'))
            .filter(|p| !p.is_empty())
    }

    /// Default signed URL lifetime
    pub fn signed_url_expiry(&self) -> Duration {
        Duration::from_secs(self.signed_url_expires)
    }
}

/// Upload parameters applied by default
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct UploadDefaults {
    /// Canned ACL, e.g. `public-read`
    pub acl: Option<String>,

    /// `Cache-Control` header
    pub cache_control: Option<String>,
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: pretty, compact or json
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        ObservabilityConfig {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_signed_url_expires() -> u64 {
    DEFAULT_SIGNED_URL_EXPIRES
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
