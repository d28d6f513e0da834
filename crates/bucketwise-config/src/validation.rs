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
use crate::error::{ConfigError, ConfigResult};
use crate::schema::*;
use tracing::warn;

/// Validator for configuration settings
pub trait Validator {
    fn validate(&self) -> ConfigResult<()>;
}

impl Validator for Config {
    fn validate(&self) -> ConfigResult<()> {
        self.provider.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}

impl Validator for ProviderConfig {
    fn validate(&self) -> ConfigResult<()> {
        for (logical, physical) in &self.buckets {
            validate_logical_name(logical)?;
            validate_physical_bucket(&format!("provider.buckets.{logical}"), physical)?;
        }

        for (logical, domain) in &self.public_domains {
            validate_logical_name(logical)?;
            validate_http_url(&format!("provider.public_domains.{logical}"), domain)?;
            if !self.buckets.contains_key(logical) {
                warn!(
                    logical_bucket = %logical,
                    "public domain configured for a bucket that is not configured"
                );
            }
        }

        // Resolution falls through to another bucket, so this is not fatal.
        if let Some(default) = &self.default_bucket {
            if !self.buckets.contains_key(default) {
                warn!(
                    default_bucket = %default,
                    "default bucket is not configured; the first configured bucket will be used"
                );
            }
        }

        if self.signed_url_expires == 0 {
            return Err(ConfigError::invalid_value(
                "provider.signed_url_expires",
                "must be greater than zero",
            ));
        }

        if self.size_limit == Some(0) {
            return Err(ConfigError::invalid_value(
                "provider.size_limit",
                "must be greater than zero when set",
            ));
        }

        if let Some(base_url) = &self.base_url {
            validate_http_url("provider.base_url", base_url)?;
        }
        if let Some(endpoint) = &self.endpoint {
            validate_http_url("provider.endpoint", endpoint)?;
        }

        Ok(())
    }
}

impl Validator for ObservabilityConfig {
    fn validate(&self) -> ConfigResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "observability.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.log_format.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "observability.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        Ok(())
    }
}

/// Logical names appear inside `bucket:<name>:<path>` selectors.
fn validate_logical_name(name: &str) -> ConfigResult<()> {
    if name.is_empty() {
        return Err(ConfigError::MissingRequired(
            "provider.buckets (logical name)".to_string(),
        ));
    }
    if name.contains(':') {
        return Err(ConfigError::invalid_value(
            format!("provider.buckets.{name}"),
            "logical bucket names cannot contain ':'",
        ));
    }
    Ok(())
}

fn validate_physical_bucket(field: &str, bucket: &str) -> ConfigResult<()> {
    if bucket.is_empty() {
        return Err(ConfigError::MissingRequired(field.to_string()));
    }

    // S3 bucket names must be 3-63 characters long
    if bucket.len() < 3 || bucket.len() > 63 {
        return Err(ConfigError::invalid_value(
            field,
            "bucket name must be 3-63 characters long",
        ));
    }

    if !bucket
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(ConfigError::invalid_value(
            field,
            "bucket name must contain only lowercase letters, digits, hyphens, and dots",
        ));
    }

    Ok(())
}

fn validate_http_url(field: &str, url: &str) -> ConfigResult<()> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(ConfigError::invalid_value(
            field,
            format!("must be an http(s) URL, got '{url}'"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_provider() -> ProviderConfig {
        ProviderConfig::default()
            .with_bucket("uploads", "real-uploads")
            .with_public_domain("uploads", "https://cdn.x")
            .with_default_bucket("uploads")
    }

    #[test]
    fn test_valid_provider_config() {
        assert!(valid_provider().validate().is_ok());
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_physical_bucket_naming() {
        assert!(validate_physical_bucket("f", "real-uploads").is_ok());
        assert!(validate_physical_bucket("f", "assets.v2").is_ok());
        assert!(validate_physical_bucket("f", "").is_err());
        assert!(validate_physical_bucket("f", "ab").is_err());
        assert!(validate_physical_bucket("f", &"a".repeat(64)).is_err());
        assert!(validate_physical_bucket("f", "Upper_Case").is_err());
    }

    #[test]
    fn test_logical_name_rejects_colon() {
        let config = ProviderConfig::default().with_bucket("a:b", "real-bucket");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_public_domain_must_be_url() {
        let config = valid_provider().with_public_domain("uploads", "cdn.x");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unconfigured_default_is_tolerated() {
        let config = valid_provider().with_default_bucket("missing");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_expiry_rejected() {
        let config = valid_provider().with_signed_url_expires(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_size_limit_rejected() {
        let config = valid_provider().with_size_limit(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoint_and_base_url_checked() {
        assert!(valid_provider().with_endpoint("http://127.0.0.1:9000").validate().is_ok());
        assert!(valid_provider().with_endpoint("127.0.0.1:9000").validate().is_err());
        assert!(valid_provider().with_base_url("https://").validate().is_err());
    }

    #[test]
    fn test_observability_values() {
        let mut config = ObservabilityConfig::default();
        assert!(config.validate().is_ok());

        config.log_level = "verbose".to_string();
        assert!(config.validate().is_err());

        config.log_level = "DEBUG".to_string();
        config.log_format = "xml".to_string();
        assert!(config.validate().is_err());
    }
}
