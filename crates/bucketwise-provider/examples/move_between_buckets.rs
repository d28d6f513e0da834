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
//! Store a file in a public bucket, move it to a private one, sign a URL and
//! delete it, all against the in-memory transport.
//!
//! Run with: `cargo run -p bucketwise-provider --example move_between_buckets`

use bucketwise_config::{Config, ConfigLoader, ProviderOptions};
use bucketwise_observability::{init_tracing_with_config, LogConfig};
use bucketwise_provider::{BucketProvider, FileRecord, FormatRecord};
use bucketwise_storage::{MockTransport, ObjectParams};
use std::sync::Arc;
use std::time::Duration;

const OPTIONS: &str = r#"{
    "s3Options": {
        "region": "eu-west-1",
        "params": { "ACL": "private", "signedUrlExpires": 300 }
    },
    "buckets": { "media": "acme-media", "vault": "acme-vault" },
    "publicDomains": { "media": "https://media.acme.test" },
    "defaultBucket": "media"
}"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = Config::default();
    config.observability.log_format = "compact".to_string();
    ConfigLoader::new().apply_env_overrides(&mut config)?;
    init_tracing_with_config(LogConfig::from_settings(
        &config.observability.log_level,
        &config.observability.log_format,
    )?)?;

    let options = ProviderOptions::from_json(OPTIONS)?;
    let transport = MockTransport::new();
    let provider = BucketProvider::from_options(Arc::new(transport.clone()), options)?;

    let mut thumbnail = FileRecord::new("thumb_4f1c", ".jpg", "image/jpeg")
        .with_path("bucket:media:campaigns/spring")
        .with_buffer(&b"thumbnail bytes"[..]);
    provider.store(&mut thumbnail, ObjectParams::default()).await?;

    let mut file = FileRecord::new("4f1c", ".jpg", "image/jpeg")
        .with_path("bucket:media:campaigns/spring")
        .with_buffer(&b"full size bytes"[..]);
    provider.store(&mut file, ObjectParams::default()).await?;
    let mut file = file.with_format("thumbnail", FormatRecord::from(thumbnail));
    println!("stored:  {}", file.url.as_deref().unwrap_or_default());

    let report = provider
        .move_file(&mut file, "bucket:vault:archive/2025", false)
        .await?;
    println!(
        "moved:   {} records, {} stale sources",
        report.moved,
        report.stale_sources.len()
    );

    let url = provider
        .get_signed_url(&file, Some(Duration::from_secs(60)))
        .await?;
    println!("signed:  {url}");
    println!("vault:   {:?}", transport.keys("acme-vault").await);

    provider.delete(&file, &ObjectParams::default()).await?;
    println!("objects left: {}", transport.len().await);

    Ok(())
}
