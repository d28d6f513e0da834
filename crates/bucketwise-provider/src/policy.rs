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
//! Public/private URL policy.
//!
//! A bucket is public exactly when it has a public domain configured.
//! Public objects get a stable URL built from configuration; private objects
//! get a time-boxed signed URL from the transport, which must not be cached
//! past its expiry.

use crate::error::{ProviderError, ProviderResult};
use bucketwise_config::ProviderConfig;
use bucketwise_storage::ObjectTransport;
use std::time::Duration;
use tracing::debug;

/// Whether objects in `logical_bucket` need signed URLs
pub fn is_private(logical_bucket: &str, config: &ProviderConfig) -> bool {
    config.public_domain(logical_bucket).is_none()
}

/// Everything needed to address one object
#[derive(Debug, Clone, Copy)]
pub struct UrlTarget<'a> {
    /// Logical bucket
    pub logical: &'a str,
    /// Physical bucket
    pub physical: &'a str,
    /// Object key
    pub key: &'a str,
    /// Privacy flag as recorded for the object
    pub is_private: bool,
}

/// Base URL for a public object, in priority order: the global base URL,
/// the bucket's public domain, then `endpoint/physical`.
pub fn public_base(logical: &str, physical: &str, config: &ProviderConfig) -> ProviderResult<String> {
    if let Some(base) = config.base_url.as_deref() {
        return Ok(trim_base(base).to_string());
    }
    if let Some(domain) = config.public_domain(logical) {
        return Ok(trim_base(domain).to_string());
    }
    match config.endpoint.as_deref() {
        Some(endpoint) => Ok(format!("{}/{physical}", trim_base(endpoint))),
        None => Err(ProviderError::configuration(format!(
            "bucket '{logical}' is public but has no public domain, base URL or endpoint"
        ))),
    }
}

/// Build the URL for `target`.
///
/// Private targets are presigned with `expires_override`, or the configured
/// default lifetime.
pub async fn build_url(
    transport: &dyn ObjectTransport,
    config: &ProviderConfig,
    target: UrlTarget<'_>,
    expires_override: Option<Duration>,
) -> ProviderResult<String> {
    if target.is_private {
        let expires = expires_override.unwrap_or_else(|| config.signed_url_expiry());
        debug!(
            bucket = target.physical,
            key = target.key,
            expires_secs = expires.as_secs(),
            "presigning URL"
        );
        return Ok(transport.presign(target.physical, target.key, expires).await?);
    }

    let base = public_base(target.logical, target.physical, config)?;
    Ok(format!("{base}/{}", target.key))
}

fn trim_base(base: &str) -> &str {
    base.trim_end_matches('/')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bucketwise_storage::mock::TransportOp;
    use bucketwise_storage::MockTransport;

    fn target(logical: &'static str, is_private: bool) -> UrlTarget<'static> {
        UrlTarget {
            logical,
            physical: "real-bucket",
            key: "a/b/abc.png",
            is_private,
        }
    }

    #[test]
    fn test_privacy_follows_public_domains() {
        let config = ProviderConfig::default()
            .with_bucket("uploads", "real-uploads")
            .with_bucket("private", "real-private")
            .with_public_domain("uploads", "https://cdn.x");
        assert!(!is_private("uploads", &config));
        assert!(is_private("private", &config));
        assert!(is_private("unknown", &config));
    }

    #[tokio::test]
    async fn test_public_domain_url() {
        let transport = MockTransport::new();
        let config = ProviderConfig::default().with_public_domain("uploads", "https://cdn.x/");
        let url = build_url(&transport, &config, target("uploads", false), None)
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.x/a/b/abc.png");
        assert!(transport.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_base_url_overrides_public_domain() {
        let transport = MockTransport::new();
        let config = ProviderConfig::default()
            .with_public_domain("uploads", "https://cdn.x")
            .with_base_url("https://assets.example.com");
        let url = build_url(&transport, &config, target("uploads", false), None)
            .await
            .unwrap();
        assert_eq!(url, "https://assets.example.com/a/b/abc.png");
    }

    #[tokio::test]
    async fn test_endpoint_fallback_and_missing_endpoint() {
        let transport = MockTransport::new();
        let config = ProviderConfig::default().with_endpoint("http://localhost:4566");
        let url = build_url(&transport, &config, target("open", false), None)
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:4566/real-bucket/a/b/abc.png");

        let err = build_url(&transport, &ProviderConfig::default(), target("open", false), None)
            .await
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_private_is_presigned_even_with_base_url() {
        let transport = MockTransport::new();
        let config = ProviderConfig::default()
            .with_base_url("https://assets.example.com")
            .with_signed_url_expires(60);

        let url = build_url(&transport, &config, target("private", true), None)
            .await
            .unwrap();
        assert!(url.contains("X-Amz-Expires=60"));

        let url = build_url(
            &transport,
            &config,
            target("private", true),
            Some(Duration::from_secs(5)),
        )
        .await
        .unwrap();
        assert!(url.contains("X-Amz-Expires=5"));
        assert_eq!(transport.calls_of(TransportOp::Presign).await.len(), 2);
    }
}
