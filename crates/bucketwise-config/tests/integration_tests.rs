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
#![allow(clippy::unwrap_used)]

use bucketwise_config::{ConfigError, ConfigFormat, ConfigLoader, ProviderOptions, Validator};
use std::fs;
use tempfile::TempDir;

const TOML_CONFIG: &str = r#"
[provider]
default_bucket = "uploads"
key_prefix = "tenant-a"

[provider.buckets]
uploads = "real-uploads"
private = "real-private"

[provider.public_domains]
uploads = "https://cdn.x"

[provider.upload_defaults]
acl = "public-read"
cache_control = "max-age=3600"

[observability]
log_level = "debug"
log_format = "compact"
"#;

#[tokio::test]
async fn test_load_toml_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bucketwise.toml");
    fs::write(&path, TOML_CONFIG).unwrap();

    let config = ConfigLoader::new().load_file(&path).await.unwrap();
    assert_eq!(config.provider.buckets.len(), 2);
    assert_eq!(config.provider.physical_bucket("uploads"), Some("real-uploads"));
    assert_eq!(config.provider.public_domain("private"), None);
    assert_eq!(config.provider.normalized_key_prefix(), Some("tenant-a"));
    assert_eq!(
        config.provider.upload_defaults.cache_control.as_deref(),
        Some("max-age=3600")
    );
    assert_eq!(config.observability.log_format, "compact");
}

#[tokio::test]
async fn test_load_yaml_and_json_files_agree() {
    let dir = TempDir::new().unwrap();

    let yaml_path = dir.path().join("bucketwise.yml");
    fs::write(
        &yaml_path,
        r#"provider:
  default_bucket: uploads
  buckets:
    uploads: real-uploads
"#,
    )
    .unwrap();

    let json_path = dir.path().join("bucketwise.json");
    fs::write(
        &json_path,
        r#"{"provider": {"default_bucket": "uploads", "buckets": {"uploads": "real-uploads"}}}"#,
    )
    .unwrap();

    let loader = ConfigLoader::new();
    let from_yaml = loader.load_file(&yaml_path).await.unwrap();
    let from_json = loader.load_file(&json_path).await.unwrap();
    assert_eq!(from_yaml, from_json);
}

#[tokio::test]
async fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let result = ConfigLoader::new()
        .load_file(dir.path().join("absent.toml"))
        .await;
    assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
}

#[tokio::test]
async fn test_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bucketwise.ini");
    fs::write(&path, "provider=1").unwrap();

    let result = ConfigLoader::new().load_file(&path).await;
    assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
}

#[tokio::test]
async fn test_invalid_bucket_name_rejected_on_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bucketwise.toml");
    fs::write(
        &path,
        r#"
[provider.buckets]
uploads = "Not_A_Bucket"
"#,
    )
    .unwrap();

    let result = ConfigLoader::new().load_file(&path).await;
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[test]
fn test_legacy_and_nested_options_normalize_alike() {
    let legacy = ProviderOptions::from_json(
        r#"{"bucket": "media-bucket", "region": "us-east-1", "params": {"ACL": "private"}}"#,
    )
    .unwrap()
    .normalize()
    .unwrap();

    let nested = ProviderOptions::from_json(
        r#"{"s3Options": {"region": "us-east-1", "params": {"Bucket": "media-bucket", "ACL": "private"}}}"#,
    )
    .unwrap()
    .normalize()
    .unwrap();

    assert_eq!(legacy, nested);
    assert!(legacy.validate().is_ok());
}

#[test]
fn test_options_from_toml() {
    let config = ConfigLoader::new()
        .load_options(
            r#"
defaultBucket = "private"
pool = true

[buckets]
uploads = "real-uploads"
private = "real-private"
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

    assert_eq!(config.default_bucket.as_deref(), Some("private"));
    assert!(config.pool);
    assert!(config.public_domains.is_empty());
}
